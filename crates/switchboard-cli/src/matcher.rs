//! Help listings and closest-command suggestions.

use crate::registry::{CommandRegistry, CommandTable, MatchMode};

/// Width of the command column in listings.
pub const LISTING_WIDTH: usize = 20;

/// One line of a command listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSummary {
    /// Word-path joined with single spaces.
    pub path: String,
    /// One-line description.
    pub summary: String,
}

impl CommandTable {
    /// Commands in merged order whose joined path starts with the joined
    /// `prefix` (ASCII case-insensitive). `None` lists everything.
    ///
    /// The iterator is lazy; call again to restart.
    pub fn list_matching<'a>(
        &'a self,
        prefix: Option<&[&str]>,
    ) -> impl Iterator<Item = CommandSummary> + 'a {
        let filter = prefix.map(|words| words.join(" ").to_ascii_lowercase());
        self.iter().filter_map(move |cmd| {
            let path = cmd.words().join(" ");
            if let Some(filter) = &filter
                && !path.to_ascii_lowercase().starts_with(filter.as_str())
            {
                return None;
            }
            Some(CommandSummary {
                path,
                summary: cmd.summary().to_string(),
            })
        })
    }

    /// The longest leading run of `words` that still names (a prefix of)
    /// some command, joined with spaces. Empty when nothing matches.
    pub fn best_prefix(&self, words: &[&str]) -> String {
        let mut len = 0;
        while len < words.len() && self.find(&words[..=len], MatchMode::Prefix).is_some() {
            len += 1;
        }
        words[..len].join(" ")
    }
}

impl CommandRegistry {
    /// Snapshot of [`CommandTable::list_matching`].
    pub fn list_matching(&self, prefix: Option<&[&str]>) -> Vec<CommandSummary> {
        self.lock().list_matching(prefix).collect()
    }

    /// See [`CommandTable::best_prefix`].
    pub fn best_prefix(&self, words: &[&str]) -> String {
        self.lock().best_prefix(words)
    }
}

/// Render a two-column listing: path padded to [`LISTING_WIDTH`], summary.
pub fn format_listing(entries: &[CommandSummary]) -> String {
    let mut out = String::new();
    for entry in entries {
        out.push_str(&format!(
            "{:<width$} {}\n",
            entry.path,
            entry.summary,
            width = LISTING_WIDTH
        ));
    }
    out
}

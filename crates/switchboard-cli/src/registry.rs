//! Command registry: built-in and dynamically registered commands.
//!
//! Two sources feed one sorted view. Built-ins are fixed when the registry
//! is created; dynamic commands come and go as subsystems load and unload.
//! Both are kept ordered by joined word-path (ASCII case-insensitive), and
//! every lookup walks their merge so "first match" means "first in
//! alphabetical order" regardless of where a command came from.
//!
//! One mutex serializes every read and write. Dispatch is low-frequency and
//! human-driven, so readers do not need to run in parallel.

use std::collections::BTreeMap;
use std::collections::btree_map;
use std::iter::Peekable;
use std::slice;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use switchboard_types::error::{ConsoleError, Result};

use crate::command::{Command, MAX_CMD_WORDS};

/// How typed words are compared against a command's word-path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Typed words and the word-path are identical.
    Exact,
    /// The word-path is a prefix of the typed words; the remainder are
    /// the command's arguments.
    Arguments,
    /// The typed words are a prefix of the word-path, which may be longer.
    Prefix,
}

/// Whether `path` matches `typed` under `mode`, ignoring ASCII case.
pub(crate) fn path_matches(path: &[String], typed: &[&str], mode: MatchMode) -> bool {
    let fits = match mode {
        MatchMode::Exact => path.len() == typed.len(),
        MatchMode::Arguments => path.len() <= typed.len(),
        MatchMode::Prefix => typed.len() <= path.len(),
    };
    fits && path
        .iter()
        .zip(typed)
        .all(|(have, want)| have.eq_ignore_ascii_case(want))
}

/// Ordering key for a word-path: words joined by single spaces, lowercased.
pub(crate) fn sort_key<S: AsRef<str>>(words: &[S]) -> String {
    let mut key = String::new();
    for (i, word) in words.iter().enumerate() {
        if i > 0 {
            key.push(' ');
        }
        key.push_str(&word.as_ref().to_ascii_lowercase());
    }
    key
}

/// Whether `path` and `words` could not both be registered: one equals or
/// is a prefix of the other.
fn overlaps(path: &[String], words: &[&str]) -> bool {
    path_matches(path, words, MatchMode::Prefix)
        || path_matches(path, words, MatchMode::Arguments)
}

fn validate_path(words: &[String]) -> Result<()> {
    if words.is_empty() {
        return Err(ConsoleError::InvalidCommand("empty word-path".into()));
    }
    if words.len() > MAX_CMD_WORDS {
        return Err(ConsoleError::InvalidCommand(format!(
            "'{}' has more than {MAX_CMD_WORDS} words",
            words.join(" ")
        )));
    }
    if let Some(bad) = words
        .iter()
        .find(|w| w.is_empty() || w.chars().any(char::is_whitespace))
    {
        return Err(ConsoleError::InvalidCommand(format!(
            "word '{bad}' in '{}' is empty or contains whitespace",
            words.join(" ")
        )));
    }
    Ok(())
}

/// The registry contents. Only reachable through [`CommandRegistry::lock`].
pub struct CommandTable {
    /// Sorted by key at construction, never mutated afterwards.
    builtins: Vec<(String, Arc<dyn Command>)>,
    dynamic: BTreeMap<String, Arc<dyn Command>>,
}

impl CommandTable {
    /// All commands in merged alphabetical order.
    pub fn iter(&self) -> Merged<'_> {
        Merged {
            builtins: self.builtins.iter().peekable(),
            dynamic: self.dynamic.iter().peekable(),
        }
    }

    /// The first command, in merged order, whose path matches `words`.
    pub fn find(&self, words: &[&str], mode: MatchMode) -> Option<&Arc<dyn Command>> {
        self.iter().find(|cmd| path_matches(cmd.words(), words, mode))
    }

    /// Total number of commands.
    pub fn len(&self) -> usize {
        self.builtins.len() + self.dynamic.len()
    }

    /// Whether the table holds no commands at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[cfg(test)]
    pub(crate) fn dynamic_len(&self) -> usize {
        self.dynamic.len()
    }
}

/// Two-cursor merge over the built-in list and the dynamic map.
pub struct Merged<'a> {
    builtins: Peekable<slice::Iter<'a, (String, Arc<dyn Command>)>>,
    dynamic: Peekable<btree_map::Iter<'a, String, Arc<dyn Command>>>,
}

impl<'a> Iterator for Merged<'a> {
    type Item = &'a Arc<dyn Command>;

    fn next(&mut self) -> Option<Self::Item> {
        let take_builtin = match (self.builtins.peek(), self.dynamic.peek()) {
            (Some((b, _)), Some((d, _))) => b <= *d,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => return None,
        };
        if take_builtin {
            self.builtins.next().map(|(_, cmd)| cmd)
        } else {
            self.dynamic.next().map(|(_, cmd)| cmd)
        }
    }
}

/// Thread-safe registry of console commands.
pub struct CommandRegistry {
    table: Mutex<CommandTable>,
}

impl CommandRegistry {
    /// Create a registry with no built-in commands.
    pub fn new() -> Self {
        Self::with_builtins(Vec::new())
    }

    /// Create a registry around a fixed set of built-in commands.
    ///
    /// Built-ins are sorted here once and cannot be unregistered. They obey
    /// the same path rules as [`register`](Self::register): an invalid path,
    /// or one that equals, extends, or is a prefix of an earlier built-in in
    /// sorted order, is dropped with a warning.
    pub fn with_builtins(builtins: Vec<Arc<dyn Command>>) -> Self {
        let mut sorted: Vec<(String, Arc<dyn Command>)> = builtins
            .into_iter()
            .map(|cmd| (sort_key(cmd.words()), cmd))
            .collect();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));

        let mut accepted: Vec<(String, Arc<dyn Command>)> = Vec::with_capacity(sorted.len());
        for (key, cmd) in sorted {
            if let Err(e) = validate_path(cmd.words()) {
                log::warn!("dropping built-in command: {e}");
                continue;
            }
            let words: Vec<&str> = cmd.words().iter().map(String::as_str).collect();
            if let Some((kept, _)) = accepted
                .iter()
                .find(|(_, other)| overlaps(other.words(), &words))
            {
                log::warn!("dropping built-in command '{key}': conflicts with '{kept}'");
                continue;
            }
            accepted.push((key, cmd));
        }

        Self {
            table: Mutex::new(CommandTable {
                builtins: accepted,
                dynamic: BTreeMap::new(),
            }),
        }
    }

    /// Enter the registry's critical section.
    ///
    /// Hold the guard only for lookups; never across a command handler.
    pub fn lock(&self) -> MutexGuard<'_, CommandTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a command.
    ///
    /// Fails with [`ConsoleError::DuplicateCommand`] when the path equals an
    /// existing one, is a prefix of a longer one (it could never be
    /// resolved exactly), or extends an existing one (dispatch would always
    /// stop at the shorter command). The registry is unchanged on failure.
    pub fn register(&self, cmd: Arc<dyn Command>) -> Result<()> {
        validate_path(cmd.words())?;
        let words: Vec<&str> = cmd.words().iter().map(String::as_str).collect();
        let joined = words.join(" ");

        let mut table = self.lock();
        if table.find(&words, MatchMode::Prefix).is_some()
            || table.find(&words, MatchMode::Arguments).is_some()
        {
            log::warn!("command '{joined}' already registered (or something close enough)");
            return Err(ConsoleError::DuplicateCommand(joined));
        }
        table.dynamic.insert(sort_key(&words), cmd);
        log::debug!("registered command '{joined}'");
        Ok(())
    }

    /// Detach a previously registered command.
    ///
    /// Matches by identity, not by path. Returns `false` when the entry was
    /// not registered (including built-ins), which is not an error.
    pub fn unregister(&self, cmd: &Arc<dyn Command>) -> bool {
        let key = sort_key(cmd.words());
        let mut table = self.lock();
        let registered = table
            .dynamic
            .get(&key)
            .is_some_and(|existing| Arc::ptr_eq(existing, cmd));
        if registered {
            table.dynamic.remove(&key);
            log::debug!("unregistered command '{key}'");
        }
        registered
    }

    /// Look up a command; see [`MatchMode`].
    pub fn find(&self, words: &[&str], mode: MatchMode) -> Option<Arc<dyn Command>> {
        self.lock().find(words, mode).map(Arc::clone)
    }

    /// Total number of commands, built-in and dynamic.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no commands are known.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::command::{CliEntry, CommandStatus};

    use proptest::prelude::*;

    pub(crate) fn entry(words: &[&str]) -> Arc<dyn Command> {
        let summary = format!("{} summary", words.join(" "));
        Arc::new(CliEntry::new(words, &summary, "Usage: test\n", |_, _| {
            Ok(CommandStatus::Success)
        }))
    }

    fn paths(registry: &CommandRegistry) -> Vec<String> {
        registry
            .lock()
            .iter()
            .map(|cmd| cmd.words().join(" "))
            .collect()
    }

    #[test]
    fn new_registry_is_empty() {
        let reg = CommandRegistry::new();
        assert!(reg.is_empty());
        assert!(reg.find(&["help"], MatchMode::Arguments).is_none());
    }

    #[test]
    fn register_then_find_exact() {
        let reg = CommandRegistry::new();
        reg.register(entry(&["show", "channels"])).unwrap();
        let found = reg.find(&["show", "channels"], MatchMode::Exact).unwrap();
        assert_eq!(found.words(), ["show", "channels"]);
    }

    #[test]
    fn find_is_case_insensitive() {
        let reg = CommandRegistry::new();
        reg.register(entry(&["show", "channels"])).unwrap();
        assert!(reg.find(&["SHOW", "Channels"], MatchMode::Exact).is_some());
    }

    #[test]
    fn arguments_mode_allows_trailing_words() {
        let reg = CommandRegistry::new();
        reg.register(entry(&["show", "channel"])).unwrap();
        assert!(reg.find(&["show", "channel", "SIP/100"], MatchMode::Arguments).is_some());
        assert!(reg.find(&["show", "channel", "SIP/100"], MatchMode::Exact).is_none());
        assert!(reg.find(&["show"], MatchMode::Arguments).is_none());
    }

    #[test]
    fn prefix_mode_allows_longer_paths() {
        let reg = CommandRegistry::new();
        reg.register(entry(&["show", "channels"])).unwrap();
        assert!(reg.find(&["show"], MatchMode::Prefix).is_some());
        assert!(reg.find(&["show", "channels", "x"], MatchMode::Prefix).is_none());
        assert!(reg.find(&["show", "chan"], MatchMode::Prefix).is_none());
    }

    #[test]
    fn find_returns_first_in_merged_order() {
        let reg = CommandRegistry::with_builtins(vec![entry(&["show", "modules"])]);
        reg.register(entry(&["show", "channels"])).unwrap();
        let first = reg.find(&["show"], MatchMode::Prefix).unwrap();
        assert_eq!(first.words(), ["show", "channels"]);
    }

    #[test]
    fn duplicate_path_is_rejected() {
        let reg = CommandRegistry::new();
        reg.register(entry(&["show", "channels"])).unwrap();
        let err = reg.register(entry(&["Show", "Channels"])).unwrap_err();
        assert!(matches!(err, ConsoleError::DuplicateCommand(ref p) if p == "Show Channels"));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn prefix_of_existing_path_is_rejected() {
        let reg = CommandRegistry::new();
        reg.register(entry(&["show", "channels"])).unwrap();
        assert!(matches!(
            reg.register(entry(&["show"])),
            Err(ConsoleError::DuplicateCommand(_))
        ));
    }

    #[test]
    fn extension_of_existing_path_is_rejected() {
        let reg = CommandRegistry::new();
        reg.register(entry(&["show", "channel"])).unwrap();
        assert!(matches!(
            reg.register(entry(&["show", "channel", "peers"])),
            Err(ConsoleError::DuplicateCommand(_))
        ));
    }

    #[test]
    fn conflict_with_builtin_is_rejected() {
        let reg = CommandRegistry::with_builtins(vec![entry(&["help"])]);
        assert!(reg.register(entry(&["help"])).is_err());
        assert_eq!(reg.lock().dynamic_len(), 0);
    }

    #[test]
    fn sibling_paths_are_accepted() {
        let reg = CommandRegistry::new();
        reg.register(entry(&["show", "channel"])).unwrap();
        reg.register(entry(&["show", "channels"])).unwrap();
        reg.register(entry(&["show", "modules"])).unwrap();
        assert_eq!(reg.len(), 3);
    }

    #[test]
    fn invalid_paths_are_rejected() {
        let reg = CommandRegistry::new();
        assert!(matches!(
            reg.register(entry(&[])),
            Err(ConsoleError::InvalidCommand(_))
        ));
        assert!(matches!(
            reg.register(entry(&["show", ""])),
            Err(ConsoleError::InvalidCommand(_))
        ));
        assert!(matches!(
            reg.register(entry(&["two words"])),
            Err(ConsoleError::InvalidCommand(_))
        ));
        let long: Vec<String> = (0..=MAX_CMD_WORDS).map(|i| format!("w{i}")).collect();
        let long: Vec<&str> = long.iter().map(String::as_str).collect();
        assert!(matches!(
            reg.register(entry(&long)),
            Err(ConsoleError::InvalidCommand(_))
        ));
        assert!(reg.is_empty());
    }

    #[test]
    fn register_then_unregister_restores_state() {
        let reg = CommandRegistry::new();
        let cmd = entry(&["queue", "show"]);
        reg.register(Arc::clone(&cmd)).unwrap();
        assert!(reg.unregister(&cmd));
        assert!(reg.find(&["queue", "show"], MatchMode::Exact).is_none());
        assert!(reg.find(&["queue"], MatchMode::Prefix).is_none());
        assert!(reg.is_empty());
    }

    #[test]
    fn unregister_is_idempotent() {
        let reg = CommandRegistry::new();
        let cmd = entry(&["queue", "show"]);
        reg.register(Arc::clone(&cmd)).unwrap();
        assert!(reg.unregister(&cmd));
        assert!(!reg.unregister(&cmd));
    }

    #[test]
    fn unregister_matches_by_identity() {
        let reg = CommandRegistry::new();
        let registered = entry(&["queue", "show"]);
        let lookalike = entry(&["queue", "show"]);
        reg.register(Arc::clone(&registered)).unwrap();
        assert!(!reg.unregister(&lookalike));
        assert!(reg.find(&["queue", "show"], MatchMode::Exact).is_some());
    }

    #[test]
    fn builtin_with_empty_path_is_dropped() {
        let reg = CommandRegistry::with_builtins(vec![entry(&[]), entry(&["help"])]);
        assert_eq!(paths(&reg), vec!["help"]);
        assert!(reg.find(&["frobnicate"], MatchMode::Arguments).is_none());
        let mut out = Vec::new();
        assert!(matches!(
            reg.execute(&mut out, "frobnicate now"),
            Err(ConsoleError::NoSuchCommand { .. })
        ));
    }

    #[test]
    fn overlapping_builtins_keep_the_first_in_sorted_order() {
        let reg = CommandRegistry::with_builtins(vec![
            entry(&["show", "channels"]),
            entry(&["show"]),
            entry(&["SHOW"]),
            entry(&["help"]),
        ]);
        assert_eq!(paths(&reg), vec!["help", "show"]);
        assert!(reg.find(&["show", "channels"], MatchMode::Exact).is_none());
    }

    #[test]
    fn poisoned_lock_is_recovered() {
        let reg = CommandRegistry::new();
        reg.register(entry(&["help"])).unwrap();
        let crashed = std::thread::scope(|s| {
            s.spawn(|| {
                let _table = reg.lock();
                panic!("handler panicked while holding the registry");
            })
            .join()
        });
        assert!(crashed.is_err());
        assert!(reg.table.is_poisoned());

        reg.register(entry(&["load"])).unwrap();
        assert_eq!(paths(&reg), vec!["help", "load"]);
        assert!(reg.find(&["help"], MatchMode::Exact).is_some());
    }

    #[test]
    fn builtins_cannot_be_unregistered() {
        let help = entry(&["help"]);
        let reg = CommandRegistry::with_builtins(vec![Arc::clone(&help)]);
        assert!(!reg.unregister(&help));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn builtins_are_sorted_at_construction() {
        let reg = CommandRegistry::with_builtins(vec![
            entry(&["unload"]),
            entry(&["help"]),
            entry(&["show", "modules"]),
            entry(&["load"]),
        ]);
        assert_eq!(paths(&reg), vec!["help", "load", "show modules", "unload"]);
    }

    #[test]
    fn merge_interleaves_both_sources() {
        let reg = CommandRegistry::with_builtins(vec![entry(&["help"]), entry(&["show", "modules"])]);
        reg.register(entry(&["zap"])).unwrap();
        reg.register(entry(&["Dial"])).unwrap();
        reg.register(entry(&["show", "channels"])).unwrap();
        assert_eq!(
            paths(&reg),
            vec!["Dial", "help", "show channels", "show modules", "zap"]
        );
    }

    #[test]
    fn shorter_path_sorts_before_its_extension_by_characters() {
        let reg = CommandRegistry::new();
        reg.register(entry(&["show", "channels"])).unwrap();
        reg.register(entry(&["show", "channel"])).unwrap();
        assert_eq!(paths(&reg), vec!["show channel", "show channels"]);
    }

    #[test]
    fn concurrent_registration_of_distinct_paths() {
        const N: usize = 32;
        let reg = CommandRegistry::new();
        std::thread::scope(|s| {
            for i in 0..N {
                let reg = &reg;
                s.spawn(move || {
                    let name = format!("cmd{i:02}");
                    reg.register(entry(&["module", name.as_str()])).unwrap();
                });
            }
        });
        assert_eq!(reg.len(), N);
        let listed = paths(&reg);
        let mut sorted = listed.clone();
        sorted.sort();
        assert_eq!(listed, sorted);
    }

    #[test]
    fn concurrent_register_and_unregister() {
        let reg = CommandRegistry::new();
        let keep = entry(&["stable"]);
        reg.register(Arc::clone(&keep)).unwrap();
        std::thread::scope(|s| {
            for i in 0..8 {
                let reg = &reg;
                s.spawn(move || {
                    let name = format!("t{i}");
                    for _ in 0..50 {
                        let cmd = entry(&["churn", name.as_str()]);
                        reg.register(Arc::clone(&cmd)).unwrap();
                        assert!(reg.unregister(&cmd));
                    }
                });
            }
        });
        assert_eq!(reg.len(), 1);
        assert!(reg.find(&["stable"], MatchMode::Exact).is_some());
    }

    fn arb_path() -> impl Strategy<Value = Vec<String>> {
        proptest::collection::vec("[a-zA-Z]{1,6}", 1..4)
    }

    proptest! {
        #[test]
        fn merged_walk_is_sorted(
            builtin_paths in proptest::collection::vec(arb_path(), 0..6),
            dynamic_paths in proptest::collection::vec(arb_path(), 0..20),
        ) {
            let builtins = builtin_paths
                .iter()
                .map(|p| entry(&p.iter().map(String::as_str).collect::<Vec<_>>()))
                .collect();
            let reg = CommandRegistry::with_builtins(builtins);
            for path in &dynamic_paths {
                let words: Vec<&str> = path.iter().map(String::as_str).collect();
                let _ = reg.register(entry(&words));
            }
            let keys: Vec<String> = reg
                .lock()
                .iter()
                .map(|cmd| sort_key(cmd.words()))
                .collect();
            for pair in keys.windows(2) {
                prop_assert!(pair[0] <= pair[1], "{} > {}", pair[0], pair[1]);
            }
        }

        #[test]
        fn rejected_registration_leaves_registry_unchanged(
            existing in proptest::collection::vec(arb_path(), 1..10),
            candidate in arb_path(),
        ) {
            let reg = CommandRegistry::new();
            for path in &existing {
                let words: Vec<&str> = path.iter().map(String::as_str).collect();
                let _ = reg.register(entry(&words));
            }
            let before = paths(&reg);
            let words: Vec<&str> = candidate.iter().map(String::as_str).collect();
            let ambiguous = reg.find(&words, MatchMode::Prefix).is_some()
                || reg.find(&words, MatchMode::Arguments).is_some();
            let result = reg.register(entry(&words));
            if ambiguous {
                prop_assert!(matches!(result, Err(ConsoleError::DuplicateCommand(_))));
                prop_assert_eq!(paths(&reg), before);
            } else {
                prop_assert!(result.is_ok());
                prop_assert_eq!(paths(&reg).len(), before.len() + 1);
            }
        }
    }
}

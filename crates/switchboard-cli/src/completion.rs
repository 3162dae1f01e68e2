//! Tab completion.
//!
//! Line editors ask for candidates one at a time with an increasing
//! `state`. Here one request computes the whole candidate list, and
//! `complete` just indexes into it, so successive calls cannot disagree.
//!
//! Candidates come from two places: the next fixed word of every command
//! whose path continues what has been typed, then, once a command's whole
//! path has been typed, that command's own argument completer.

use std::sync::Arc;

use switchboard_types::error::Result;

use crate::command::Command;
use crate::registry::{CommandRegistry, CommandTable};
use crate::tokenizer::tokenize;

/// Upper bound on candidates pulled from one argument completer.
pub const MAX_COMPLETIONS: usize = 256;

/// Result of walking the table for one completion request.
pub(crate) struct CompletionPlan {
    /// Next fixed words, merged order, adjacent duplicates collapsed.
    pub(crate) words: Vec<String>,
    /// First fully typed command with an argument completer, and the index
    /// of the word being completed.
    pub(crate) delegate: Option<(Arc<dyn Command>, usize)>,
}

/// ASCII case-insensitive `starts_with`.
pub(crate) fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    text.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

fn words_equal(path: &[String], typed: &[&str]) -> bool {
    path.len() == typed.len()
        && path
            .iter()
            .zip(typed)
            .all(|(have, want)| have.eq_ignore_ascii_case(want))
}

impl CommandTable {
    /// Work out what can follow `typed`.
    ///
    /// `word` is the partial word under the cursor; empty means the cursor
    /// sits after whitespace and a fresh word is being started.
    pub(crate) fn completion_plan(&self, typed: &[&str], word: &str) -> CompletionPlan {
        let (done, partial) = if word.is_empty() {
            (typed, "")
        } else {
            match typed.split_last() {
                Some((last, done)) => (done, *last),
                None => (typed, word),
            }
        };
        let index = done.len();

        let mut words: Vec<String> = Vec::new();
        let mut delegate = None;
        for cmd in self.iter() {
            let path = cmd.words();
            if path.len() > index
                && words_equal(&path[..index], done)
                && starts_with_ignore_case(&path[index], partial)
                && !words
                    .last()
                    .is_some_and(|prev| prev.eq_ignore_ascii_case(&path[index]))
            {
                words.push(path[index].clone());
            }
            if delegate.is_none()
                && cmd.completer().is_some()
                && path.len() <= index
                && words_equal(path, &done[..path.len()])
            {
                delegate = Some((Arc::clone(cmd), index));
            }
        }
        CompletionPlan { words, delegate }
    }
}

impl CommandRegistry {
    /// Every completion candidate for `line` with `word` under the cursor.
    ///
    /// Argument completers run after the registry lock is released.
    pub fn completions(&self, line: &str, word: &str) -> Result<Vec<String>> {
        let tokens = tokenize(line)?;
        let argv = tokens.argv();
        let CompletionPlan {
            mut words,
            delegate,
        } = self.lock().completion_plan(&argv, word);

        if let Some((cmd, index)) = delegate
            && let Some(completer) = cmd.completer()
        {
            for state in 0..MAX_COMPLETIONS {
                match completer.complete(line, word, index, state) {
                    Some(candidate) => words.push(candidate),
                    None => break,
                }
            }
        }
        Ok(words)
    }

    /// Candidate number `state` for `line`, or `None` when exhausted.
    ///
    /// Each call rebuilds the whole list, argument completers included, so
    /// walking every state costs quadratic time. Callers that want more than
    /// a candidate or two should call [`completions`](Self::completions)
    /// once and iterate the result.
    pub fn complete(&self, line: &str, word: &str, state: usize) -> Option<String> {
        match self.completions(line, word) {
            Ok(candidates) => candidates.into_iter().nth(state),
            Err(e) => {
                log::warn!("completion of '{line}' failed: {e}");
                None
            },
        }
    }
}

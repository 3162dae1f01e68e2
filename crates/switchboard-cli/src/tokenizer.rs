//! Console line tokenizer.
//!
//! Splits a raw line into an argument vector. Double quotes group words,
//! a backslash makes the next character literal. Every argument is a slice
//! of one owned buffer, so a tokenized line costs a single string
//! allocation plus the span table.

use std::ops::Range;

use switchboard_types::error::{ConsoleError, Result};

/// Maximum number of arguments kept from one line. Extra words are dropped.
pub const MAX_ARGS: usize = 64;

/// A tokenized line: one buffer holding every argument back to back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tokens {
    buf: String,
    spans: Vec<Range<usize>>,
}

impl Tokens {
    /// Number of arguments.
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    /// Whether the line held no arguments at all.
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// The argument at `index`, if present.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.spans.get(index).map(|span| &self.buf[span.clone()])
    }

    /// Iterate over the arguments in order.
    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.spans.iter().map(|span| &self.buf[span.clone()])
    }

    /// Borrow the arguments as an argv-style vector.
    pub fn argv(&self) -> Vec<&str> {
        self.iter().collect()
    }

    /// The arguments joined with single spaces.
    pub fn joined(&self) -> String {
        self.argv().join(" ")
    }
}

/// Tokenize a console line.
///
/// - `"` toggles quoting; whitespace inside quotes is kept.
/// - `\` makes the following character literal (including `"`, `\`, and
///   whitespace). A trailing lone backslash is discarded.
/// - An unterminated quote runs to the end of the line; nothing is lost.
///
/// Fails only when the working buffer cannot be allocated.
pub fn tokenize(line: &str) -> Result<Tokens> {
    let mut buf = String::new();
    buf.try_reserve(line.len()).map_err(|_| ConsoleError::OutOfMemory)?;
    let mut spans: Vec<Range<usize>> = Vec::new();
    spans
        .try_reserve(MAX_ARGS.min(line.len() / 2 + 1))
        .map_err(|_| ConsoleError::OutOfMemory)?;

    let mut quoted = false;
    let mut escaped = false;
    let mut at_word_start = true;
    let mut truncated = false;

    for ch in line.chars() {
        match ch {
            '"' if !escaped => {
                quoted = !quoted;
                continue;
            },
            ' ' | '\t' if !quoted && !escaped => {
                at_word_start = true;
                continue;
            },
            '\\' if !escaped => {
                escaped = true;
                continue;
            },
            _ => {},
        }

        escaped = false;
        if at_word_start {
            if spans.len() >= MAX_ARGS {
                truncated = true;
                continue;
            }
            spans.push(buf.len()..buf.len());
            at_word_start = false;
        }
        buf.push(ch);
        if let Some(span) = spans.last_mut() {
            span.end = buf.len();
        }
    }

    if truncated {
        log::warn!("too many arguments, truncating to {MAX_ARGS}");
    }

    Ok(Tokens { buf, spans })
}

//! The command trait and the closure-backed entry used by subsystems.

use std::fmt;
use std::io::Write;

use switchboard_types::error::Result;

use crate::registry::CommandRegistry;

/// Maximum number of fixed words in a command path.
pub const MAX_CMD_WORDS: usize = 16;

/// What a handler reports back to the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    /// The command ran.
    Success,
    /// The command ran and failed; it has already explained why.
    Failure,
    /// The arguments were wrong; the dispatcher prints the usage text.
    ShowUsage,
}

/// What a handler sees while it runs.
pub struct Environment<'a> {
    /// Console output sink for this session.
    pub out: &'a mut dyn Write,
    /// The registry that dispatched the command. Not locked while the
    /// handler runs, so handlers may list, register, or unregister.
    pub registry: &'a CommandRegistry,
}

/// Completes free-form arguments after a command's fixed words.
///
/// Called with `state = 0, 1, 2, ...` until it returns `None`; must return
/// the same candidate for the same inputs.
pub trait ArgumentCompleter: Send + Sync {
    /// Candidate number `state` for the word being typed at `word_index`.
    fn complete(
        &self,
        line: &str,
        word: &str,
        word_index: usize,
        state: usize,
    ) -> Option<String>;
}

impl<F> ArgumentCompleter for F
where
    F: Fn(&str, &str, usize, usize) -> Option<String> + Send + Sync,
{
    fn complete(
        &self,
        line: &str,
        word: &str,
        word_index: usize,
        state: usize,
    ) -> Option<String> {
        self(line, word, word_index, state)
    }
}

/// A console command identified by a multi-word path.
pub trait Command: Send + Sync {
    /// The fixed words the operator types, e.g. `["show", "channels"]`.
    fn words(&self) -> &[String];

    /// One-line description for listings.
    fn summary(&self) -> &str;

    /// Full help text, printed on `help <command>` or a `ShowUsage` result.
    fn usage(&self) -> &str;

    /// Run the command. `args` is the tokenized line, fixed words included.
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandStatus>;

    /// Completion for trailing arguments, if the command takes any.
    fn completer(&self) -> Option<&dyn ArgumentCompleter> {
        None
    }
}

type Handler = dyn Fn(&[&str], &mut Environment<'_>) -> Result<CommandStatus> + Send + Sync;

/// A command assembled from a word-path, help text, and a handler closure.
pub struct CliEntry {
    words: Vec<String>,
    summary: String,
    usage: String,
    handler: Box<Handler>,
    completer: Option<Box<dyn ArgumentCompleter>>,
}

impl CliEntry {
    /// Create an entry without argument completion.
    pub fn new<F>(words: &[&str], summary: &str, usage: &str, handler: F) -> Self
    where
        F: Fn(&[&str], &mut Environment<'_>) -> Result<CommandStatus> + Send + Sync + 'static,
    {
        Self {
            words: words.iter().map(|w| (*w).to_string()).collect(),
            summary: summary.to_string(),
            usage: usage.to_string(),
            handler: Box::new(handler),
            completer: None,
        }
    }

    /// Attach a completer for the command's trailing arguments.
    pub fn with_completer<C>(mut self, completer: C) -> Self
    where
        C: ArgumentCompleter + 'static,
    {
        self.completer = Some(Box::new(completer));
        self
    }
}

impl Command for CliEntry {
    fn words(&self) -> &[String] {
        &self.words
    }

    fn summary(&self) -> &str {
        &self.summary
    }

    fn usage(&self) -> &str {
        &self.usage
    }

    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandStatus> {
        (self.handler)(args, env)
    }

    fn completer(&self) -> Option<&dyn ArgumentCompleter> {
        self.completer.as_deref()
    }
}

impl fmt::Debug for CliEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CliEntry")
            .field("words", &self.words)
            .field("summary", &self.summary)
            .field("completer", &self.completer.is_some())
            .finish()
    }
}

//! Operator console core.
//!
//! Commands are identified by a path of one or more words ("show channels")
//! and live in a [`CommandRegistry`]: a fixed, sorted set of built-ins plus
//! commands that modules register and unregister at runtime. The registry
//! tokenizes console lines, resolves them against both sets, and dispatches
//! to the command's handler. It also produces help listings, closest-match
//! suggestions, and tab-completion candidates.

mod builtins;
mod command;
mod completion;
mod dispatch;
mod matcher;
mod registry;
mod services;
mod tokenizer;

/// The built-in command set (help, load, unload, show ...).
pub use builtins::builtin_commands;
/// Per-command argument completion hook.
pub use command::ArgumentCompleter;
/// A command defined by a word-path, help text, and handler closure.
pub use command::CliEntry;
/// A single console command.
pub use command::Command;
/// Outcome of running a command handler.
pub use command::CommandStatus;
/// What a running handler can reach: output sink and the registry.
pub use command::Environment;
/// Maximum number of words in a command path.
pub use command::MAX_CMD_WORDS;
/// Upper bound on candidates taken from one argument completer.
pub use completion::MAX_COMPLETIONS;
/// One line of a help listing.
pub use matcher::CommandSummary;
/// Render a help listing.
pub use matcher::format_listing;
pub use matcher::LISTING_WIDTH;
/// Registry of built-in and dynamic commands.
pub use registry::CommandRegistry;
/// Locked view of the registry.
pub use registry::CommandTable;
/// How a word-path is compared against typed words.
pub use registry::MatchMode;
/// Merged, sorted walk over all commands.
pub use registry::Merged;
/// Channel listing service used by `show channel(s)`.
pub use services::{ChannelDirectory, ChannelInfo};
/// Module loading service used by `load`, `unload`, `show modules`.
pub use services::{ModuleInfo, ModuleLoader, UnloadMode};
/// Split a console line into words.
pub use tokenizer::tokenize;
pub use tokenizer::{MAX_ARGS, Tokens};

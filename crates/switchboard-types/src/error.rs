//! Error types for switchboard.

use std::io;

/// Errors produced by the command registry, dispatcher, and their collaborators.
#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    #[error("command '{0}' already registered (or something close enough)")]
    DuplicateCommand(String),

    #[error("invalid command: {0}")]
    InvalidCommand(String),

    #[error("no such command '{typed}'")]
    NoSuchCommand {
        /// The words as typed, joined with single spaces.
        typed: String,
        /// Longest typed prefix that still names something registered.
        suggestion: String,
    },

    #[error("out of memory")]
    OutOfMemory,

    #[error("module error: {0}")]
    Module(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, ConsoleError>;

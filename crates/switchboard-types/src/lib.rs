//! Foundation types for switchboard.
//!
//! Shared by every switchboard crate: the error taxonomy used by the
//! command registry and dispatcher, and the console configuration.

pub mod config;
pub mod error;

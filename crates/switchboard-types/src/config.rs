//! Console configuration.
//!
//! Loaded from a TOML file; every key is optional.
//!
//! ```toml
//! prompt = "*CLI> "
//! module_dir = "/usr/lib/switchboard/modules"
//! log_filter = "debug"
//! banner = false
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{ConsoleError, Result};

/// Runtime configuration for a console front-end.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConsoleConfig {
    /// Prompt printed before each interactive line.
    pub prompt: String,
    /// Directory scanned when completing module file names for `load`.
    pub module_dir: PathBuf,
    /// `env_logger` filter used when `RUST_LOG` is unset.
    pub log_filter: String,
    /// Print a greeting line when an interactive session starts.
    pub banner: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            prompt: "*CLI> ".to_string(),
            module_dir: PathBuf::from("modules"),
            log_filter: "info".to_string(),
            banner: true,
        }
    }
}

impl ConsoleConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        if config.log_filter.trim().is_empty() {
            return Err(ConsoleError::Config("log_filter must not be empty".into()));
        }
        Ok(config)
    }

    /// Read and parse a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        log::debug!("loaded console config from {}", path.display());
        Ok(config)
    }
}

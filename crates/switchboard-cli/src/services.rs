//! Collaborators the built-in commands talk to.
//!
//! The console core does not load modules or track channels itself; the
//! host process plugs in implementations of these traits.

use std::path::PathBuf;

use switchboard_types::error::Result;

use crate::registry::CommandRegistry;

// ---------------------------------------------------------------------------
// Modules
// ---------------------------------------------------------------------------

/// How hard to try when unloading a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnloadMode {
    /// Refuse if the module is in use.
    Soft,
    /// Unload even if in use.
    Firm,
    /// Unload even if the module itself objects.
    Hard,
}

/// One row of `show modules`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleInfo {
    pub name: String,
    pub description: String,
    pub use_count: usize,
}

/// Loads and unloads subsystems that contribute console commands.
///
/// Both operations receive the registry so a module can register its
/// commands on load and unregister them on unload.
pub trait ModuleLoader: Send + Sync {
    /// Load a module by name.
    fn load(&self, name: &str, registry: &CommandRegistry) -> Result<()>;

    /// Unload a loaded module.
    fn unload(&self, name: &str, mode: UnloadMode, registry: &CommandRegistry) -> Result<()>;

    /// Currently loaded modules.
    fn modules(&self) -> Vec<ModuleInfo>;

    /// Directory searched when completing module file names.
    fn module_dir(&self) -> Option<PathBuf> {
        None
    }
}

// ---------------------------------------------------------------------------
// Channels
// ---------------------------------------------------------------------------

/// Snapshot of one live channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelInfo {
    /// Unique channel name, e.g. `SIP/100-0001`.
    pub name: String,
    /// Channel technology.
    pub kind: String,
    pub state: String,
    pub caller_id: Option<String>,
    /// Dialplan position.
    pub context: String,
    pub extension: String,
    pub priority: u32,
    /// Application currently running, if any.
    pub application: Option<String>,
    /// Arguments of that application.
    pub data: Option<String>,
    /// What the channel is blocked in, if anything.
    pub blocking_in: Option<String>,
}

/// Read access to the live channel list.
pub trait ChannelDirectory: Send + Sync {
    /// All channels, in a stable order.
    fn channels(&self) -> Vec<ChannelInfo>;

    /// Look up one channel by name, ignoring ASCII case.
    fn find(&self, name: &str) -> Option<ChannelInfo> {
        self.channels()
            .into_iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }
}

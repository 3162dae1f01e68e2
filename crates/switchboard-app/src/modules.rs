//! Demo module loader.
//!
//! Modules are compiled in; "loading" one registers its console commands
//! and "unloading" takes them away again. `chan_demo` drives the shared
//! [`DemoChannels`] table and counts its live channels as users.

use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use switchboard_cli::{
    ChannelDirectory, CliEntry, Command, CommandRegistry, CommandStatus, ModuleInfo,
    ModuleLoader, UnloadMode,
};
use switchboard_types::error::{ConsoleError, Result};

use crate::channels::DemoChannels;

/// Modules this build knows how to load.
const CATALOG: &[(&str, &str)] = &[
    ("app_echo", "Simple Echo Application"),
    ("chan_demo", "In-memory Demo Channel Driver"),
];

struct LoadedModule {
    name: &'static str,
    description: &'static str,
    commands: Vec<Arc<dyn Command>>,
}

pub struct DemoModules {
    module_dir: PathBuf,
    channels: Arc<DemoChannels>,
    loaded: Mutex<Vec<LoadedModule>>,
}

impl DemoModules {
    pub fn new(module_dir: PathBuf, channels: Arc<DemoChannels>) -> Self {
        Self {
            module_dir,
            channels,
            loaded: Mutex::new(Vec::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<LoadedModule>> {
        self.loaded.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn use_count(&self, name: &str) -> usize {
        match name {
            "chan_demo" => self.channels.len(),
            _ => 0,
        }
    }

    fn commands_for(&self, name: &str) -> Vec<Arc<dyn Command>> {
        match name {
            "app_echo" => vec![echo_command()],
            "chan_demo" => demo_channel_commands(&self.channels),
            _ => Vec::new(),
        }
    }
}

/// `chan_demo.so` and `chan_demo` name the same module.
fn module_name(name: &str) -> &str {
    name.strip_suffix(".so").unwrap_or(name)
}

impl ModuleLoader for DemoModules {
    fn load(&self, name: &str, registry: &CommandRegistry) -> Result<()> {
        let name = module_name(name);
        let Some(&(name, description)) = CATALOG.iter().find(|(known, _)| *known == name) else {
            return Err(ConsoleError::Module(format!("no module named '{name}'")));
        };
        let mut loaded = self.lock();
        if loaded.iter().any(|m| m.name == name) {
            return Err(ConsoleError::Module(format!("{name} is already loaded")));
        }

        let commands = self.commands_for(name);
        for (i, cmd) in commands.iter().enumerate() {
            if let Err(e) = registry.register(Arc::clone(cmd)) {
                for done in &commands[..i] {
                    registry.unregister(done);
                }
                return Err(e);
            }
        }
        loaded.push(LoadedModule {
            name,
            description,
            commands,
        });
        Ok(())
    }

    fn unload(&self, name: &str, mode: UnloadMode, registry: &CommandRegistry) -> Result<()> {
        let name = module_name(name);
        let mut loaded = self.lock();
        let Some(pos) = loaded.iter().position(|m| m.name == name) else {
            return Err(ConsoleError::Module(format!("{name} is not loaded")));
        };
        let users = self.use_count(name);
        if users > 0 && mode == UnloadMode::Soft {
            return Err(ConsoleError::Module(format!(
                "{name} is in use by {users} channel(s)"
            )));
        }

        let module = loaded.remove(pos);
        for cmd in &module.commands {
            registry.unregister(cmd);
        }
        if module.name == "chan_demo" && !self.channels.is_empty() {
            log::warn!("dropping {users} live demo channel(s)");
            self.channels.clear();
        }
        Ok(())
    }

    fn modules(&self) -> Vec<ModuleInfo> {
        self.lock()
            .iter()
            .map(|m| ModuleInfo {
                name: m.name.to_string(),
                description: m.description.to_string(),
                use_count: self.use_count(m.name),
            })
            .collect()
    }

    fn module_dir(&self) -> Option<PathBuf> {
        Some(self.module_dir.clone())
    }
}

fn echo_command() -> Arc<dyn Command> {
    Arc::new(CliEntry::new(
        &["echo"],
        "Print the arguments back",
        "Usage: echo <text>\n       Prints its arguments, separated by single spaces.\n",
        |args, env| {
            writeln!(env.out, "{}", args[1..].join(" "))?;
            Ok(CommandStatus::Success)
        },
    ))
}

fn demo_channel_commands(channels: &Arc<DemoChannels>) -> Vec<Arc<dyn Command>> {
    let originate = {
        let channels = Arc::clone(channels);
        CliEntry::new(
            &["demo", "originate"],
            "Bring up a demo channel",
            "Usage: demo originate <extension>\n       Creates a demo channel running Echo.\n",
            move |args, env| {
                if args.len() != 3 {
                    return Ok(CommandStatus::ShowUsage);
                }
                let name = channels.originate(args[2]);
                writeln!(env.out, "Created {name}")?;
                Ok(CommandStatus::Success)
            },
        )
    };

    let hangup = {
        let names = Arc::clone(channels);
        let channels = Arc::clone(channels);
        CliEntry::new(
            &["demo", "hangup"],
            "Tear down a demo channel",
            "Usage: demo hangup <channel>\n       Hangs up the named demo channel.\n",
            move |args, env| {
                if args.len() != 3 {
                    return Ok(CommandStatus::ShowUsage);
                }
                if channels.hangup(args[2]) {
                    Ok(CommandStatus::Success)
                } else {
                    writeln!(env.out, "{} is not a known channel", args[2])?;
                    Ok(CommandStatus::Failure)
                }
            },
        )
        .with_completer(move |_: &str, word: &str, pos: usize, state: usize| {
            if pos != 2 {
                return None;
            }
            names
                .channels()
                .into_iter()
                .map(|c| c.name)
                .filter(|n| {
                    n.get(..word.len())
                        .is_some_and(|head| head.eq_ignore_ascii_case(word))
                })
                .nth(state)
        })
    };

    vec![Arc::new(originate), Arc::new(hangup)]
}

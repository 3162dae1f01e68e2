//! Built-in console commands: help, module load/unload, channel and module
//! listings.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use switchboard_types::error::Result;

use crate::command::{CliEntry, Command, CommandStatus, Environment};
use crate::completion::starts_with_ignore_case;
use crate::matcher::format_listing;
use crate::registry::MatchMode;
use crate::services::{ChannelDirectory, ChannelInfo, ModuleLoader, UnloadMode};

const HELP_USAGE: &str = "\
Usage: help [topic]
       When called with a topic as an argument, displays usage
       information on the given command.  If called without a
       topic, it provides a list of commands.
";

const LOAD_USAGE: &str = "\
Usage: load <module name>
       Loads the specified module into the server.
";

const UNLOAD_USAGE: &str = "\
Usage: unload [-f|-h] <module name>
       Unloads the specified module from the server.  The -f
       option unloads the module even if it is in use (may cause
       a crash) and the -h option unloads the module even if the
       module says it cannot, which almost always causes a crash.
";

const SHOW_CHANNEL_USAGE: &str = "\
Usage: show channel <channel>
       Shows lots of information about the specified channel.
";

const SHOW_CHANNELS_USAGE: &str = "\
Usage: show channels
       Lists currently defined channels and some information about
       them.
";

const SHOW_MODULES_USAGE: &str = "\
Usage: show modules
       Shows the modules currently loaded, and usage statistics.
";

/// The fixed command set every console starts with.
pub fn builtin_commands(
    modules: Arc<dyn ModuleLoader>,
    channels: Arc<dyn ChannelDirectory>,
) -> Vec<Arc<dyn Command>> {
    let load = {
        let loader = Arc::clone(&modules);
        let dir_source = Arc::clone(&modules);
        CliEntry::new(
            &["load"],
            "Load a dynamic module by name",
            LOAD_USAGE,
            move |args, env| handle_load(loader.as_ref(), args, env),
        )
        .with_completer(move |_: &str, word: &str, pos: usize, state: usize| {
            if pos != 1 {
                return None;
            }
            complete_file_name(dir_source.module_dir().as_deref(), word, state)
        })
    };

    let unload = {
        let loader = Arc::clone(&modules);
        let names_source = Arc::clone(&modules);
        CliEntry::new(
            &["unload"],
            "Unload a dynamic module by name",
            UNLOAD_USAGE,
            move |args, env| handle_unload(loader.as_ref(), args, env),
        )
        .with_completer(move |_: &str, word: &str, pos: usize, state: usize| {
            if pos == 0 || word.starts_with('-') {
                return None;
            }
            names_source
                .modules()
                .into_iter()
                .map(|m| m.name)
                .filter(|name| starts_with_ignore_case(name, word))
                .nth(state)
        })
    };

    let show_channel = {
        let directory = Arc::clone(&channels);
        let names_source = Arc::clone(&channels);
        CliEntry::new(
            &["show", "channel"],
            "Display information on a specific channel",
            SHOW_CHANNEL_USAGE,
            move |args, env| handle_show_channel(directory.as_ref(), args, env),
        )
        .with_completer(move |_: &str, word: &str, pos: usize, state: usize| {
            if pos != 2 {
                return None;
            }
            names_source
                .channels()
                .into_iter()
                .map(|c| c.name)
                .filter(|name| starts_with_ignore_case(name, word))
                .nth(state)
        })
    };

    let show_channels = {
        let directory = Arc::clone(&channels);
        CliEntry::new(
            &["show", "channels"],
            "Display information on channels",
            SHOW_CHANNELS_USAGE,
            move |args, env| handle_show_channels(directory.as_ref(), args, env),
        )
    };

    let show_modules = {
        let loader = Arc::clone(&modules);
        CliEntry::new(
            &["show", "modules"],
            "List modules and info",
            SHOW_MODULES_USAGE,
            move |args, env| handle_show_modules(loader.as_ref(), args, env),
        )
    };

    let help = CliEntry::new(
        &["help"],
        "Display help list, or specific help on a command",
        HELP_USAGE,
        handle_help,
    );

    vec![
        Arc::new(help),
        Arc::new(load),
        Arc::new(show_channel),
        Arc::new(show_channels),
        Arc::new(show_modules),
        Arc::new(unload),
    ]
}

// ---------------------------------------------------------------------------
// help
// ---------------------------------------------------------------------------

fn handle_help(args: &[&str], env: &mut Environment<'_>) -> Result<CommandStatus> {
    let Some(topic) = args.get(1..).filter(|t| !t.is_empty()) else {
        let listing = env.registry.list_matching(None);
        env.out.write_all(format_listing(&listing).as_bytes())?;
        return Ok(CommandStatus::Success);
    };

    if let Some(cmd) = env.registry.find(topic, MatchMode::Exact) {
        let usage = cmd.usage();
        env.out.write_all(usage.as_bytes())?;
        if !usage.ends_with('\n') {
            env.out.write_all(b"\n")?;
        }
    } else if env.registry.find(topic, MatchMode::Prefix).is_some() {
        let listing = env.registry.list_matching(Some(topic));
        env.out.write_all(format_listing(&listing).as_bytes())?;
    } else {
        writeln!(env.out, "No such command '{}'.", topic.join(" "))?;
    }
    Ok(CommandStatus::Success)
}

// ---------------------------------------------------------------------------
// load / unload
// ---------------------------------------------------------------------------

fn handle_load(
    loader: &dyn ModuleLoader,
    args: &[&str],
    env: &mut Environment<'_>,
) -> Result<CommandStatus> {
    if args.len() != 2 {
        return Ok(CommandStatus::ShowUsage);
    }
    let name = args[1];
    match loader.load(name, env.registry) {
        Ok(()) => {
            log::info!("loaded module {name}");
            Ok(CommandStatus::Success)
        },
        Err(e) => {
            log::warn!("unable to load module {name}: {e}");
            writeln!(env.out, "Unable to load module {name}: {e}")?;
            Ok(CommandStatus::Failure)
        },
    }
}

fn handle_unload(
    loader: &dyn ModuleLoader,
    args: &[&str],
    env: &mut Environment<'_>,
) -> Result<CommandStatus> {
    let Some((name, flags)) = args.get(1..).and_then(|rest| rest.split_last()) else {
        return Ok(CommandStatus::ShowUsage);
    };
    let mut mode = UnloadMode::Soft;
    for flag in flags {
        mode = match *flag {
            "-f" => UnloadMode::Firm,
            "-h" => UnloadMode::Hard,
            _ => return Ok(CommandStatus::ShowUsage),
        };
    }
    if name.starts_with('-') {
        return Ok(CommandStatus::ShowUsage);
    }

    match loader.unload(name, mode, env.registry) {
        Ok(()) => {
            log::info!("unloaded module {name} ({mode:?})");
            Ok(CommandStatus::Success)
        },
        Err(e) => {
            log::warn!("unable to unload module {name}: {e}");
            writeln!(env.out, "Unable to unload resource {name}: {e}")?;
            Ok(CommandStatus::Failure)
        },
    }
}

/// Complete a file name relative to `base` (or absolute, if `word` starts
/// with `/`). Directories get a trailing `/`; dot-files only show up when
/// the typed name starts with a dot.
fn complete_file_name(base: Option<&Path>, word: &str, state: usize) -> Option<String> {
    let (dir_part, stem) = match word.rfind('/') {
        Some(i) => (&word[..=i], &word[i + 1..]),
        None => ("", word),
    };
    let search: PathBuf = if word.starts_with('/') {
        PathBuf::from(dir_part)
    } else {
        base?.join(dir_part)
    };

    let mut names: Vec<String> = fs::read_dir(&search)
        .ok()?
        .filter_map(|entry| {
            let entry = entry.ok()?;
            let name = entry.file_name().into_string().ok()?;
            if !name.starts_with(stem) || (name.starts_with('.') && !stem.starts_with('.')) {
                return None;
            }
            let is_dir = entry.file_type().is_ok_and(|t| t.is_dir());
            Some(if is_dir { format!("{name}/") } else { name })
        })
        .collect();
    names.sort();
    names
        .into_iter()
        .nth(state)
        .map(|name| format!("{dir_part}{name}"))
}

// ---------------------------------------------------------------------------
// show channel / show channels
// ---------------------------------------------------------------------------

fn or_none(value: Option<&str>) -> &str {
    value.unwrap_or("(None)")
}

fn data_text(value: Option<&str>) -> &str {
    match value {
        None => "(None)",
        Some("") => "(Empty)",
        Some(data) => data,
    }
}

fn handle_show_channels(
    directory: &dyn ChannelDirectory,
    args: &[&str],
    env: &mut Environment<'_>,
) -> Result<CommandStatus> {
    if args.len() != 2 {
        return Ok(CommandStatus::ShowUsage);
    }
    writeln!(
        env.out,
        "{:>15}  ({:<10} {:<12} {:<4})  {:<12}  {:<15}",
        "Channel", "Context", "Extension", "Pri", "Appl.", "Data"
    )?;
    for c in directory.channels() {
        writeln!(
            env.out,
            "{:>15}  ({:<10} {:<12} {:<4})  {:<12}  {:<15}",
            c.name,
            c.context,
            c.extension,
            c.priority,
            or_none(c.application.as_deref()),
            data_text(c.data.as_deref()),
        )?;
    }
    Ok(CommandStatus::Success)
}

fn write_channel_detail(out: &mut dyn Write, c: &ChannelInfo) -> std::io::Result<()> {
    writeln!(out, " -- General --")?;
    writeln!(out, "           Name: {}", c.name)?;
    writeln!(out, "           Type: {}", c.kind)?;
    writeln!(out, "      Caller ID: {}", c.caller_id.as_deref().unwrap_or("(N/A)"))?;
    writeln!(out, "          State: {}", c.state)?;
    writeln!(out, " --   PBX   --")?;
    writeln!(out, "        Context: {}", c.context)?;
    writeln!(out, "      Extension: {}", c.extension)?;
    writeln!(out, "       Priority: {}", c.priority)?;
    writeln!(out, "    Application: {}", c.application.as_deref().unwrap_or("(N/A)"))?;
    writeln!(out, "           Data: {}", data_text(c.data.as_deref()))?;
    writeln!(
        out,
        "    Blocking in: {}",
        c.blocking_in.as_deref().unwrap_or("(Not Blocking)")
    )
}

fn handle_show_channel(
    directory: &dyn ChannelDirectory,
    args: &[&str],
    env: &mut Environment<'_>,
) -> Result<CommandStatus> {
    if args.len() != 3 {
        return Ok(CommandStatus::ShowUsage);
    }
    match directory.find(args[2]) {
        Some(channel) => write_channel_detail(env.out, &channel)?,
        None => writeln!(env.out, "{} is not a known channel", args[2])?,
    }
    Ok(CommandStatus::Success)
}

// ---------------------------------------------------------------------------
// show modules
// ---------------------------------------------------------------------------

fn handle_show_modules(
    loader: &dyn ModuleLoader,
    args: &[&str],
    env: &mut Environment<'_>,
) -> Result<CommandStatus> {
    if args.len() != 2 {
        return Ok(CommandStatus::ShowUsage);
    }
    writeln!(
        env.out,
        "{:<20} {:<40.40} {:<10}",
        "Module", "Description", "Use Count"
    )?;
    for m in loader.modules() {
        writeln!(
            env.out,
            "{:<20} {:<40.40} {:<10}",
            m.name, m.description, m.use_count
        )?;
    }
    Ok(CommandStatus::Success)
}

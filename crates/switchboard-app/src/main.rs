//! switchboard operator console.
//!
//! Reads console lines from stdin and runs them against the command
//! registry. `-x <command>` runs a single line and exits; `--complete
//! <line>` prints the completion candidates for a partial line.
//! The configuration file comes from `--config <path>` or the
//! `SWITCHBOARD_CONFIG` environment variable.

mod channels;
mod modules;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, bail};

use channels::DemoChannels;
use modules::DemoModules;
use switchboard_cli::{
    ChannelDirectory, CommandRegistry, CommandStatus, ModuleLoader, builtin_commands, tokenize,
};
use switchboard_types::config::ConsoleConfig;

/// What the command line asked for.
#[derive(Debug, Default, PartialEq, Eq)]
struct Options {
    config: Option<PathBuf>,
    execute: Option<String>,
    complete: Option<String>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Options> {
    let mut opts = Options::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                opts.config = Some(args.next().context("--config needs a path")?.into());
            },
            "-x" => {
                opts.execute = Some(args.next().context("-x needs a command")?);
            },
            "--complete" => {
                opts.complete = Some(args.next().context("--complete needs a line")?);
            },
            other => bail!("unknown argument '{other}'"),
        }
    }
    Ok(opts)
}

fn load_config(path: Option<PathBuf>) -> Result<ConsoleConfig> {
    let path = path.or_else(|| std::env::var_os("SWITCHBOARD_CONFIG").map(PathBuf::from));
    match path {
        Some(path) => ConsoleConfig::load(&path)
            .with_context(|| format!("reading config {}", path.display())),
        None => Ok(ConsoleConfig::default()),
    }
}

/// The word under the cursor, as the tokenizer sees it.
///
/// Empty when the line ends between words; otherwise the last token, with
/// quotes and escapes already resolved.
fn completion_word(line: &str) -> Result<String> {
    let tokens = tokenize(line)?;
    let extended = tokenize(&format!("{line}x"))?;
    if extended.len() > tokens.len() {
        return Ok(String::new());
    }
    Ok(tokens.iter().last().unwrap_or("").to_string())
}

fn build_registry(config: &ConsoleConfig) -> CommandRegistry {
    let channels = Arc::new(DemoChannels::new());
    let modules: Arc<dyn ModuleLoader> = Arc::new(DemoModules::new(
        config.module_dir.clone(),
        Arc::clone(&channels),
    ));
    let channels: Arc<dyn ChannelDirectory> = channels;
    CommandRegistry::with_builtins(builtin_commands(modules, channels))
}

/// Run one line and map the outcome to a process exit code.
fn run_once(registry: &CommandRegistry, line: &str) -> ExitCode {
    let mut stdout = io::stdout().lock();
    match registry.execute(&mut stdout, line) {
        Ok(CommandStatus::Success) => ExitCode::SUCCESS,
        Ok(_) | Err(_) => ExitCode::FAILURE,
    }
}

fn interactive(registry: &CommandRegistry, config: &ConsoleConfig) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    if config.banner {
        writeln!(
            stdout,
            "switchboard {} console. Type 'help' for a list of commands.",
            env!("CARGO_PKG_VERSION")
        )?;
    }

    let mut lines = stdin.lock().lines();
    loop {
        write!(stdout, "{}", config.prompt)?;
        stdout.flush()?;
        let Some(line) = lines.next() else {
            writeln!(stdout)?;
            break;
        };
        let line = line.context("reading console input")?;
        let trimmed = line.trim();
        if trimmed.eq_ignore_ascii_case("quit") || trimmed.eq_ignore_ascii_case("exit") {
            break;
        }
        // Errors have already been written to the console.
        if let Err(e) = registry.execute(&mut stdout, &line) {
            log::debug!("'{trimmed}': {e}");
        }
    }
    Ok(())
}

fn main() -> Result<ExitCode> {
    let opts = parse_args(std::env::args().skip(1))?;
    let config = load_config(opts.config)?;

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.log_filter.as_str()),
    )
    .init();
    log::debug!("console config: {config:?}");

    let registry = build_registry(&config);

    if let Some(line) = opts.complete {
        let candidates = registry.completions(&line, &completion_word(&line)?)?;
        let mut stdout = io::stdout().lock();
        for candidate in candidates {
            writeln!(stdout, "{candidate}")?;
        }
        return Ok(ExitCode::SUCCESS);
    }
    if let Some(line) = opts.execute {
        return Ok(run_once(&registry, &line));
    }

    interactive(&registry, &config)?;
    log::info!("console session ended");
    Ok(ExitCode::SUCCESS)
}

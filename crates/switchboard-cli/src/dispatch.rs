//! Line dispatch: tokenize, resolve, run, report.

use std::io::Write;
use std::sync::Arc;

use switchboard_types::error::{ConsoleError, Result};

use crate::command::{CommandStatus, Environment};
use crate::registry::{CommandRegistry, MatchMode};
use crate::tokenizer::tokenize;

impl CommandRegistry {
    /// Parse and execute one console line, writing all output to `out`.
    ///
    /// Blank lines succeed without doing anything. An unknown command is
    /// reported on `out` together with the closest known prefix, and
    /// returned as [`ConsoleError::NoSuchCommand`]. The registry lock covers
    /// the lookup only; the handler runs unlocked.
    pub fn execute(&self, out: &mut dyn Write, line: &str) -> Result<CommandStatus> {
        let tokens = match tokenize(line) {
            Ok(tokens) => tokens,
            Err(e) => {
                log::warn!("cannot tokenize console line: {e}");
                return Err(e);
            },
        };
        let argv = tokens.argv();
        if argv.is_empty() {
            return Ok(CommandStatus::Success);
        }

        let resolved = {
            let table = self.lock();
            match table.find(&argv, MatchMode::Arguments) {
                Some(cmd) => Ok(Arc::clone(cmd)),
                None => Err(ConsoleError::NoSuchCommand {
                    typed: argv.join(" "),
                    suggestion: table.best_prefix(&argv),
                }),
            }
        };
        let cmd = match resolved {
            Ok(cmd) => cmd,
            Err(err) => {
                report_unknown(out, &err)?;
                return Err(err);
            },
        };

        log::debug!("dispatching '{}'", cmd.words().join(" "));
        let mut env = Environment {
            out,
            registry: self,
        };
        match cmd.execute(&argv, &mut env) {
            Ok(CommandStatus::ShowUsage) => {
                let usage = cmd.usage();
                env.out.write_all(usage.as_bytes())?;
                if !usage.ends_with('\n') {
                    env.out.write_all(b"\n")?;
                }
                Ok(CommandStatus::ShowUsage)
            },
            Ok(status) => Ok(status),
            Err(e) => {
                log::warn!("command '{}' failed: {e}", argv.join(" "));
                writeln!(env.out, "error: {e}")?;
                Err(e)
            },
        }
    }
}

fn report_unknown(out: &mut dyn Write, err: &ConsoleError) -> Result<()> {
    if let ConsoleError::NoSuchCommand { typed, suggestion } = err {
        writeln!(out, "No such command '{typed}' (type 'help' for help)")?;
        if !suggestion.is_empty() && suggestion != typed {
            writeln!(out, "Closest match: '{suggestion}'")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::command::{CliEntry, Command};
    use crate::registry::tests::entry;

    /// Records the argv of every call so tests can check what ran.
    fn recording(words: &[&str], calls: Arc<Mutex<Vec<Vec<String>>>>) -> Arc<dyn Command> {
        Arc::new(CliEntry::new(words, "recorded", "Usage: recorded\n", move |args, env| {
            calls
                .lock()
                .unwrap()
                .push(args.iter().map(|a| (*a).to_string()).collect());
            writeln!(env.out, "ran {}", args.join(" "))?;
            Ok(CommandStatus::Success)
        }))
    }

    fn run(reg: &CommandRegistry, line: &str) -> (Result<CommandStatus>, String) {
        let mut out = Vec::new();
        let result = reg.execute(&mut out, line);
        (result, String::from_utf8(out).unwrap())
    }

    #[test]
    fn dispatches_to_exact_command_with_full_argv() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let reg = CommandRegistry::new();
        reg.register(recording(&["show", "channels"], Arc::clone(&calls))).unwrap();
        reg.register(entry(&["show", "modules"])).unwrap();

        let (result, out) = run(&reg, "show channels");
        assert_eq!(result.unwrap(), CommandStatus::Success);
        assert_eq!(out, "ran show channels\n");
        assert_eq!(*calls.lock().unwrap(), vec![vec!["show", "channels"]]);
    }

    #[test]
    fn trailing_arguments_reach_the_handler() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let reg = CommandRegistry::new();
        reg.register(recording(&["show", "channel"], Arc::clone(&calls))).unwrap();
        reg.register(entry(&["show", "channels"])).unwrap();

        let (result, _) = run(&reg, r#"show channel "My Phone""#);
        assert!(result.is_ok());
        assert_eq!(
            *calls.lock().unwrap(),
            vec![vec!["show", "channel", "My Phone"]]
        );
    }

    #[test]
    fn words_match_case_insensitively() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let reg = CommandRegistry::new();
        reg.register(recording(&["show", "channels"], Arc::clone(&calls))).unwrap();
        let (result, _) = run(&reg, "SHOW Channels");
        assert!(result.is_ok());
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn incomplete_command_is_no_such_command_with_suggestion() {
        let reg = CommandRegistry::new();
        reg.register(entry(&["show", "channels"])).unwrap();
        reg.register(entry(&["show", "modules"])).unwrap();

        let (result, out) = run(&reg, "show");
        match result {
            Err(ConsoleError::NoSuchCommand { typed, suggestion }) => {
                assert_eq!(typed, "show");
                assert_eq!(suggestion, "show");
            },
            other => panic!("expected NoSuchCommand, got {other:?}"),
        }
        assert_eq!(out, "No such command 'show' (type 'help' for help)\n");
    }

    #[test]
    fn unknown_subcommand_reports_closest_match() {
        let reg = CommandRegistry::new();
        reg.register(entry(&["show", "channels"])).unwrap();
        let (result, out) = run(&reg, "show peers now");
        assert!(matches!(
            result,
            Err(ConsoleError::NoSuchCommand { ref suggestion, .. }) if suggestion == "show"
        ));
        assert!(out.contains("No such command 'show peers now'"));
        assert!(out.contains("Closest match: 'show'"));
    }

    #[test]
    fn completely_unknown_command_has_empty_suggestion() {
        let reg = CommandRegistry::new();
        let (result, out) = run(&reg, "frobnicate");
        assert!(matches!(
            result,
            Err(ConsoleError::NoSuchCommand { ref suggestion, .. }) if suggestion.is_empty()
        ));
        assert!(!out.contains("Closest match"));
    }

    #[test]
    fn blank_line_is_a_no_op() {
        let reg = CommandRegistry::new();
        for line in ["", "   ", "\t"] {
            let (result, out) = run(&reg, line);
            assert_eq!(result.unwrap(), CommandStatus::Success);
            assert!(out.is_empty());
        }
    }

    #[test]
    fn show_usage_prints_usage_text() {
        let reg = CommandRegistry::new();
        let cmd: Arc<dyn Command> = Arc::new(CliEntry::new(
            &["load"],
            "Load a module",
            "Usage: load <module name>",
            |args, _| {
                if args.len() != 2 {
                    return Ok(CommandStatus::ShowUsage);
                }
                Ok(CommandStatus::Success)
            },
        ));
        reg.register(cmd).unwrap();
        let (result, out) = run(&reg, "load");
        assert_eq!(result.unwrap(), CommandStatus::ShowUsage);
        assert_eq!(out, "Usage: load <module name>\n");
    }

    #[test]
    fn handler_error_is_reported_and_returned() {
        let reg = CommandRegistry::new();
        let cmd: Arc<dyn Command> = Arc::new(CliEntry::new(&["fail"], "Fails", "", |_, _| {
            Err(ConsoleError::Module("backend gone".into()))
        }));
        reg.register(cmd).unwrap();
        let (result, out) = run(&reg, "fail");
        assert!(matches!(result, Err(ConsoleError::Module(_))));
        assert_eq!(out, "error: module error: backend gone\n");
    }

    #[test]
    fn handler_may_register_commands_while_running() {
        let reg = CommandRegistry::new();
        let cmd: Arc<dyn Command> = Arc::new(CliEntry::new(&["spawn"], "Spawn", "", |_, env| {
            env.registry.register(entry(&["spawned"]))?;
            Ok(CommandStatus::Success)
        }));
        reg.register(cmd).unwrap();
        assert!(run(&reg, "spawn").0.is_ok());
        assert!(run(&reg, "spawned").0.is_ok());
    }

    #[test]
    fn concurrent_sessions_dispatch_independently() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let reg = CommandRegistry::new();
        reg.register(recording(&["ping"], Arc::clone(&calls))).unwrap();
        std::thread::scope(|s| {
            for i in 0..8 {
                let reg = &reg;
                s.spawn(move || {
                    let mut out = Vec::new();
                    reg.execute(&mut out, &format!("ping {i}")).unwrap();
                    assert_eq!(String::from_utf8(out).unwrap(), format!("ran ping {i}\n"));
                });
            }
        });
        assert_eq!(calls.lock().unwrap().len(), 8);
    }
}

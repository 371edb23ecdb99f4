//! Interactive read-eval-print loop.

use colored::Colorize;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tamarind::{Interpreter, InterpreterConfig, LangError, LogDomain, Runner};

use crate::ExitCode;

#[derive(Debug, PartialEq)]
enum ReplCommand<'a> {
    Help,
    Quit,
    ShowLog,
    Log(LogDomain, bool),
    Bench(u32, &'a str),
}

impl<'a> ReplCommand<'a> {
    /// Parse a `?command` line. `None` means the line is ordinary code.
    fn parse(line: &'a str) -> Option<Result<Self, String>> {
        let body = line.trim().strip_prefix('?')?;
        let (name, rest) = body.split_once(char::is_whitespace).unwrap_or((body, ""));
        let rest = rest.trim();
        Some(match name {
            "help" => Ok(ReplCommand::Help),
            "quit" => Ok(ReplCommand::Quit),
            "log" if rest.is_empty() => Ok(ReplCommand::ShowLog),
            "log" => Self::parse_log(rest),
            "bench" => Self::parse_bench(rest),
            other => Err(format!("unknown command ?{other}, try ?help")),
        })
    }

    fn parse_log(rest: &str) -> Result<Self, String> {
        let mut parts = rest.split_whitespace();
        let (Some(domain), Some(state), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err("usage: ?log <eval|read|expand> <on|off>".to_string());
        };
        let domain =
            LogDomain::from_name(domain).ok_or_else(|| format!("unknown log domain '{domain}'"))?;
        let enabled = match state {
            "on" => true,
            "off" => false,
            other => return Err(format!("expected on or off, got '{other}'")),
        };
        Ok(ReplCommand::Log(domain, enabled))
    }

    fn parse_bench(rest: &'a str) -> Result<Self, String> {
        let (count, form) = rest
            .split_once(char::is_whitespace)
            .ok_or("usage: ?bench <iterations> <form>")?;
        let iterations = count
            .parse::<u32>()
            .map_err(|_| format!("invalid iteration count '{count}'"))?;
        Ok(ReplCommand::Bench(iterations, form.trim()))
    }
}

fn print_repl_help() {
    println!("Enter forms to evaluate them. Incomplete forms continue on the next line.");
    println!();
    println!("    ?help                        Show this help");
    println!("    ?quit                        Leave the REPL");
    println!("    ?log                         Show enabled trace domains");
    println!("    ?log <domain> <on|off>       Toggle tracing for eval, read or expand");
    println!("    ?bench <iterations> <form>   Time repeated evaluation of a form");
    println!();
    println!("    *1 *2 *3                     The last three results");
}

pub fn run_repl(config: InterpreterConfig) -> Result<(), ExitCode> {
    let interpreter = Interpreter::new(config).map_err(|e| {
        eprintln!("{e}");
        ExitCode::RuntimeError
    })?;
    let mut editor = DefaultEditor::new().map_err(|e| {
        eprintln!("Failed to initialize REPL: {e}");
        ExitCode::RuntimeError
    })?;

    println!("Tamarind REPL. Type ?help for commands.");

    let mut pending = String::new();
    loop {
        let prompt = if pending.is_empty() {
            format!("{}=> ", interpreter.current_namespace())
        } else {
            format!("{}.. ", " ".repeat(interpreter.current_namespace().len()))
        };

        match editor.readline(&prompt) {
            Ok(line) => {
                if pending.is_empty() {
                    if line.trim().is_empty() {
                        continue;
                    }
                    if let Some(command) = ReplCommand::parse(&line) {
                        editor.add_history_entry(&line).ok();
                        match command {
                            Ok(ReplCommand::Quit) => break,
                            Ok(command) => run_command(&interpreter, command),
                            Err(message) => eprintln!("{}", message.red()),
                        }
                        continue;
                    }
                } else {
                    pending.push('\n');
                }
                pending.push_str(&line);

                match interpreter.read(&pending) {
                    Err(e) if e.is_incomplete() => continue,
                    Err(e) => print_error(&e),
                    Ok(forms) => {
                        for form in &forms {
                            match interpreter.evaluate(form) {
                                Ok(value) => {
                                    match interpreter.describe(&value, true) {
                                        Ok(rendered) => println!("{rendered}"),
                                        Err(e) => print_error(&LangError::Eval(e)),
                                    }
                                    interpreter.record_result(value);
                                }
                                Err(e) => {
                                    print_error(&LangError::Eval(e));
                                    break;
                                }
                            }
                        }
                    }
                }
                editor.add_history_entry(&pending).ok();
                pending.clear();
            }
            Err(ReadlineError::Interrupted) if !pending.is_empty() => {
                pending.clear();
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Error: {e}");
                return Err(ExitCode::RuntimeError);
            }
        }
    }

    Ok(())
}

fn run_command(interpreter: &Interpreter, command: ReplCommand<'_>) {
    match command {
        ReplCommand::Help => print_repl_help(),
        ReplCommand::Quit => {}
        ReplCommand::ShowLog => println!("log: {}", interpreter.runtime().log_domains()),
        ReplCommand::Log(domain, enabled) => {
            interpreter.set_log(domain, enabled);
            println!("log: {}", interpreter.runtime().log_domains());
        }
        ReplCommand::Bench(iterations, form) => match Runner::new(interpreter).bench(form, iterations) {
            Ok(result) => println!(
                "{} iterations, {:?} per evaluation",
                result.iterations,
                result.mean()
            ),
            Err(e) => print_error(&e),
        },
    }
}

fn print_error(error: &LangError) {
    eprintln!("{}", error.to_string().red());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_code_is_not_a_command() {
        assert_eq!(ReplCommand::parse("(+ 1 2)"), None);
    }

    #[test]
    fn parses_simple_commands() {
        assert_eq!(ReplCommand::parse("?help"), Some(Ok(ReplCommand::Help)));
        assert_eq!(ReplCommand::parse("  ?quit "), Some(Ok(ReplCommand::Quit)));
        assert_eq!(ReplCommand::parse("?log"), Some(Ok(ReplCommand::ShowLog)));
    }

    #[test]
    fn parses_log_toggle() {
        assert_eq!(
            ReplCommand::parse("?log expand on"),
            Some(Ok(ReplCommand::Log(LogDomain::Expand, true)))
        );
        assert!(matches!(ReplCommand::parse("?log gc on"), Some(Err(_))));
        assert!(matches!(ReplCommand::parse("?log eval maybe"), Some(Err(_))));
    }

    #[test]
    fn parses_bench_with_a_form() {
        assert_eq!(
            ReplCommand::parse("?bench 100 (reduce + (range 10))"),
            Some(Ok(ReplCommand::Bench(100, "(reduce + (range 10))")))
        );
        assert!(matches!(ReplCommand::parse("?bench many (+ 1 2)"), Some(Err(_))));
        assert!(matches!(ReplCommand::parse("?bench"), Some(Err(_))));
    }

    #[test]
    fn unknown_commands_are_errors() {
        assert!(matches!(ReplCommand::parse("?frobnicate"), Some(Err(_))));
    }
}

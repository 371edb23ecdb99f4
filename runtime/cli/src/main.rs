mod output;
mod repl;

use output::{ConsoleCapture, OutputMode};
use std::env;
use std::fs;
use std::io::{Read, Write};
use std::process;
use std::thread;
use tamarind::{Interpreter, InterpreterConfig, LangError, LogDomains, Runner};
use tracing_subscriber::EnvFilter;

#[cfg(feature = "profile")]
use std::fs::File;

/// Deeply nested evaluation recurses on the native stack.
const INTERPRETER_STACK_SIZE: usize = 256 * 1024 * 1024;

fn main() {
    let args: Vec<String> = env::args().collect();

    let options = match parse_args(&args) {
        Ok(Command::Help) => {
            print_help();
            process::exit(0);
        }
        Ok(Command::Run(options)) => options,
        Err(message) => {
            eprintln!("Error: {message}");
            process::exit(ExitCode::ArgumentError as i32);
        }
    };

    init_tracing(options.repl || options.log.any());

    let worker = thread::Builder::new()
        .name("tamarind".to_string())
        .stack_size(INTERPRETER_STACK_SIZE)
        .spawn(move || run(options));

    let code = match worker.map(|handle| handle.join()) {
        Ok(Ok(Ok(()))) => 0,
        Ok(Ok(Err(code))) => code as i32,
        Ok(Err(_)) => ExitCode::RuntimeError as i32,
        Err(e) => {
            eprintln!("Error: failed to start interpreter thread: {e}");
            ExitCode::RuntimeError as i32
        }
    };
    process::exit(code);
}

#[derive(Debug, Clone, Copy)]
enum ExitCode {
    ArgumentError = 1,
    RuntimeError = 2,
}

#[derive(Debug)]
enum Command {
    Help,
    Run(Options),
}

#[derive(Debug)]
struct Options {
    repl: bool,
    eval_script: Option<String>,
    script_path: Option<String>,
    output_mode: OutputMode,
    load_stdlib: bool,
    log: LogDomains,
    #[cfg_attr(not(feature = "profile"), allow(dead_code))]
    profile: bool,
}

fn parse_args(args: &[String]) -> Result<Command, String> {
    let mut options = Options {
        repl: false,
        eval_script: None,
        script_path: None,
        output_mode: OutputMode::Text,
        load_stdlib: true,
        log: LogDomains::none(),
        profile: false,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => return Ok(Command::Help),
            "-r" | "--repl" => options.repl = true,
            "-p" | "--profile" => options.profile = true,
            "--no-stdlib" => options.load_stdlib = false,
            "-e" | "--eval" => {
                i += 1;
                let script = args.get(i).ok_or("-e requires a script argument")?;
                options.eval_script = Some(script.clone());
            }
            "-o" | "--output" => {
                i += 1;
                let mode = args.get(i).ok_or("-o requires a format (text or json)")?;
                options.output_mode = OutputMode::parse(mode)
                    .ok_or_else(|| format!("unknown output format '{mode}'"))?;
            }
            "--log" => {
                i += 1;
                let domains = args.get(i).ok_or("--log requires a list of domains")?;
                options.log = LogDomains::parse(domains)?;
            }
            arg if !arg.starts_with('-') => {
                options.script_path = Some(arg.to_string());
            }
            unknown => return Err(format!("unknown option: {unknown}")),
        }
        i += 1;
    }

    Ok(Command::Run(options))
}

fn print_help() {
    println!("Tamarind - a small Clojure-like interpreter");
    println!();
    println!("USAGE:");
    println!("    tamarind-cli <SCRIPT>        Run a script file");
    println!("    tamarind-cli -e <CODE>       Evaluate inline code");
    println!("    tamarind-cli -r              Start REPL");
    println!("    tamarind-cli -h              Show this help");
    println!("    cat file | tamarind-cli      Read script from stdin");
    println!();
    println!("OPTIONS:");
    println!("    -e, --eval <CODE>            Evaluate inline code");
    println!("    -o, --output <FORMAT>        Output format: text (default) or json");
    println!("        --no-stdlib              Start without the embedded stdlib");
    println!("        --log <DOMAINS>          Trace interpreter domains: eval,read,expand,all,none");
    println!("    -p, --profile                Enable CPU profiling (outputs flamegraph.svg)");
    println!();
    println!("ENVIRONMENT:");
    println!("    TAMARIND_LOG                 tracing filter directives (default: warn)");
}

/// `TAMARIND_LOG` wins; otherwise only warnings unless interpreter tracing may be switched on.
fn init_tracing(verbose: bool) {
    let default = if verbose { "warn,tamarind=debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("TAMARIND_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

fn run(options: Options) -> Result<(), ExitCode> {
    let config = InterpreterConfig::default()
        .with_stdlib(options.load_stdlib)
        .with_log(options.log);

    if options.repl {
        return repl::run_repl(config);
    }

    // Determine source: -e > file > stdin
    let source = if let Some(script) = options.eval_script {
        script
    } else if let Some(path) = options.script_path {
        fs::read_to_string(&path).map_err(|e| {
            eprintln!("Error reading file '{path}': {e}");
            ExitCode::ArgumentError
        })?
    } else if !atty::is(atty::Stream::Stdin) {
        let mut source = String::new();
        std::io::stdin().read_to_string(&mut source).map_err(|e| {
            eprintln!("Error reading from stdin: {e}");
            ExitCode::ArgumentError
        })?;
        source
    } else {
        print_help();
        return Err(ExitCode::ArgumentError);
    };

    #[cfg(feature = "profile")]
    let guard = if options.profile {
        start_profiler()
    } else {
        None
    };

    let result = match options.output_mode {
        OutputMode::Text => run_script_text(&source, config),
        OutputMode::Json => run_script_json(&source, config),
    };

    #[cfg(feature = "profile")]
    if let Some(guard) = guard {
        stop_profiler(guard);
    }

    result
}

fn run_script_text(source: &str, config: InterpreterConfig) -> Result<(), ExitCode> {
    let interpreter = Interpreter::new(config).map_err(|e| report_error(&e, source))?;
    let result = Runner::new(&interpreter)
        .run_script(source)
        .map_err(|e| report_error(&e, source))?;

    if result.value != tamarind::Value::Nil {
        let rendered = interpreter
            .describe(&result.value, true)
            .map_err(|e| report_error(&LangError::Eval(e), source))?;
        println!("{rendered}");
    }
    Ok(())
}

fn run_script_json(source: &str, config: InterpreterConfig) -> Result<(), ExitCode> {
    let console = ConsoleCapture::default();
    let outcome = Interpreter::with_output(config, Box::new(console.clone())).and_then(|interpreter| {
        let result = Runner::new(&interpreter).run_script(source)?;
        let rendered = interpreter.describe(&result.value, true)?;
        Ok((rendered, result.duration))
    });

    let mut stdout = std::io::stdout();
    match outcome {
        Ok((value, duration)) => {
            let json = output::format_script_json(value, duration.as_millis() as u64, console.contents());
            writeln!(stdout, "{json}").map_err(|_| ExitCode::RuntimeError)?;
            Ok(())
        }
        Err(e) => {
            let json = output::format_error_json(&e, console.contents());
            writeln!(stdout, "{json}").map_err(|_| ExitCode::RuntimeError)?;
            Err(ExitCode::RuntimeError)
        }
    }
}

/// Print an error with source context to stderr.
fn report_error(error: &LangError, source: &str) -> ExitCode {
    if atty::is(atty::Stream::Stderr) {
        eprintln!("{}", error.format_colored(source));
    } else {
        eprintln!("{}", error.format_with_source(source));
    }
    ExitCode::RuntimeError
}

#[cfg(feature = "profile")]
fn start_profiler() -> Option<pprof::ProfilerGuard<'static>> {
    match pprof::ProfilerGuardBuilder::default()
        .frequency(1000)
        .blocklist(&["libc", "libgcc", "pthread", "vdso"])
        .build()
    {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Failed to start profiler: {e}");
            None
        }
    }
}

#[cfg(feature = "profile")]
fn stop_profiler(guard: pprof::ProfilerGuard<'static>) {
    use pprof::protos::Message;

    let Ok(report) = guard.report().build() else {
        eprintln!("Failed to build profile report");
        return;
    };

    match File::create("flamegraph.svg").map(|file| report.flamegraph(file)) {
        Ok(Ok(())) => eprintln!("Wrote flamegraph.svg"),
        Ok(Err(e)) => eprintln!("Failed to write flamegraph: {e}"),
        Err(e) => eprintln!("Failed to create flamegraph.svg: {e}"),
    }

    let written = report.pprof().map_err(|e| e.to_string()).and_then(|profile| {
        let file = File::create("profile.pb").map_err(|e| e.to_string())?;
        profile
            .write_to_writer(&mut std::io::BufWriter::new(file))
            .map_err(|e| e.to_string())
    });
    match written {
        Ok(()) => eprintln!("Wrote profile.pb"),
        Err(e) => eprintln!("Failed to write profile.pb: {e}"),
    }
}

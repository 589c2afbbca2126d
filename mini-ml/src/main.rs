use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;

use clap::{ArgAction, Parser};
use log::{error, LevelFilter};

use mini_ml::{
    repl,
    session::{Report, Session, SessionConfig},
};

const DEFAULT_STACK_MIB: usize = 256;

#[derive(Parser)]
#[command(name = "mini-ml", version, about = "Type-inferring interpreter for a small ML")]
struct Cli {
    /// Programs to load, in order
    files: Vec<PathBuf>,

    /// Run one statement after the files are loaded
    #[arg(short, long, value_name = "SRC")]
    expression: Option<String>,

    /// Start the REPL even when files or an expression are given
    #[arg(short, long)]
    interactive: bool,

    /// Start without the standard prelude
    #[arg(long)]
    no_prelude: bool,

    /// Evaluate statements even if they fail to type check
    #[arg(long)]
    unchecked: bool,

    /// Print the inference derivation of every statement
    #[arg(long)]
    trace: bool,

    /// Skip failing statements while loading files
    #[arg(long)]
    keep_going: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Interpreter stack size in MiB. Deep recursion needs several times
    /// more stack in debug builds than in release builds
    #[arg(long, value_name = "MIB", default_value_t = DEFAULT_STACK_MIB)]
    stack_size: usize,
}

impl Cli {
    fn config(&self) -> SessionConfig {
        SessionConfig {
            load_prelude: !self.no_prelude,
            strict_types: !self.unchecked,
            trace: self.trace,
            keep_going: self.keep_going,
        }
    }
}

fn init_logger(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .parse_default_env()
        .init();
}

fn print_report(report: &Report) {
    if let Some(tree) = &report.trace {
        print!("{}", tree);
    }
    println!("{}", report);
}

fn run(cli: Cli) -> ExitCode {
    let mut session = match Session::new(cli.config()) {
        Ok(session) => session,
        Err(err) => {
            eprintln!("error: {}", err);
            return ExitCode::FAILURE;
        }
    };

    for file in &cli.files {
        match session.load_file(file) {
            Ok(reports) => reports.iter().for_each(print_report),
            Err(err) => {
                eprintln!("error: {}", err);
                return ExitCode::FAILURE;
            }
        }
    }

    if let Some(src) = &cli.expression {
        match session.run_line(src) {
            Ok(report) => print_report(&report),
            Err(err) => {
                eprintln!("error: {}", err);
                return ExitCode::FAILURE;
            }
        }
    }

    if cli.interactive || (cli.files.is_empty() && cli.expression.is_none()) {
        if let Err(err) = repl::run(&mut session, io::stdin().lock(), io::stdout()) {
            eprintln!("error: {}", err);
            return ExitCode::FAILURE;
        }
    }

    ExitCode::SUCCESS
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    // Evaluation recurses on the native stack
    let stack_size = cli.stack_size.saturating_mul(1024 * 1024);
    let worker = thread::Builder::new()
        .name("interpreter".to_string())
        .stack_size(stack_size)
        .spawn(move || run(cli));

    match worker {
        Ok(handle) => handle.join().unwrap_or_else(|_| {
            error!("interpreter thread panicked");
            ExitCode::FAILURE
        }),
        Err(err) => {
            error!("cannot start interpreter thread: {}", err);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults() {
        let cli = Cli::parse_from(["mini-ml"]);
        assert_eq!(cli.stack_size, DEFAULT_STACK_MIB);
        let config = cli.config();
        assert!(config.load_prelude && config.strict_types);
        assert!(!config.trace && !config.keep_going);
    }

    #[test]
    fn stack_size_flag() {
        let cli = Cli::parse_from(["mini-ml", "--stack-size", "512", "prog.ml"]);
        assert_eq!(cli.stack_size, 512);
        assert_eq!(cli.files, vec![PathBuf::from("prog.ml")]);
    }
}

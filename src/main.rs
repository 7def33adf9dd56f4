use std::{
    fs, io,
    path::{Path, PathBuf},
    process::ExitCode,
};

use clap::Parser;
use rustyline::{error::ReadlineError, DefaultEditor};
use uwu::{Config, Error, VM};

/// Run an uwu script, or start a prompt when no script is given.
#[derive(Debug, Parser)]
#[command(name = "uwu", version, about)]
struct Cli {
    /// Path to a `.uwu` script
    path: Option<PathBuf>,
    /// Disassemble every function after it compiles
    #[arg(short = 'p', long)]
    print_code: bool,
    /// Print the stack and each instruction while running
    #[arg(short = 'e', long)]
    trace_execution: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = Config {
        print_code: cli.print_code,
        trace_execution: cli.trace_execution,
        ..Config::default()
    };
    match cli.path {
        Some(path) => run_file(&path, config),
        None => {
            repl(config);
            ExitCode::SUCCESS
        }
    }
}

fn run_file(path: &Path, config: Config) -> ExitCode {
    if path.extension().map_or(true, |ext| ext != "uwu") {
        eprintln!("error: '{}' is not a '.uwu' file", path.display());
        return ExitCode::from(66);
    }
    let src = match fs::read_to_string(path) {
        Ok(src) => src,
        Err(err) => {
            eprintln!("error: unable to read file \"{}\": {}", path.display(), err);
            return ExitCode::from(67);
        }
    };

    let mut vm = VM::with_config(config, io::stdin().lock(), io::stdout());
    match vm.interpret(&src) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err @ Error::Compile(_)) => {
            eprintln!("{}", err);
            ExitCode::from(70)
        }
        Err(err @ Error::Runtime { .. }) => {
            eprintln!("{}", err);
            ExitCode::from(71)
        }
    }
}

fn repl(config: Config) {
    let mut editor = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(err) => {
            eprintln!("{:?}", err);
            return;
        }
    };
    let mut vm = VM::with_config(config, io::stdin().lock(), io::stdout());

    loop {
        match editor.readline("> ") {
            Ok(line) => {
                editor.add_history_entry(line.as_str()).ok();
                if let Err(err) = vm.interpret(&line) {
                    eprintln!("{}", err);
                }
                println!();
            }
            Err(ReadlineError::Interrupted) => {}
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("{:?}", err);
                break;
            }
        }
    }
}

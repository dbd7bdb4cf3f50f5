use std::fs;
use std::process::exit;

use lox_vm::{interpret, interpret_in, LoxError, Vm};
use rustyline::error::ReadlineError;
use rustyline::Editor;

fn main() {
    let mut args = std::env::args();
    let _program = args.next();
    match (args.next(), args.next()) {
        (None, _) => run_repl(),
        (Some(path), None) => run_file(&path),
        _ => {
            eprintln!("Usage: lox [script]");
            exit(exitcode::USAGE);
        }
    }
}

fn run_file(path: &str) {
    let source = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("lox: cannot read '{path}': {e}");
            exit(exitcode::IOERR);
        }
    };
    match interpret(&source) {
        Ok(_) => {}
        Err(e) => {
            report(&e);
            exit(e.exit_code());
        }
    }
}

/// Reads a line at a time, interpreting each one as its own script, the way
/// clox's REPL does — a fresh statement per line, sharing one VM so globals
/// and function definitions persist across lines.
fn run_repl() {
    let mut rl = Editor::<()>::new();
    let mut vm = Vm::new();
    loop {
        match rl.readline("> ") {
            Ok(line) => {
                rl.add_history_entry(&line);
                if let Err(e) = interpret_in(&mut vm, &line) {
                    report(&e);
                }
            }
            Err(ReadlineError::Eof) | Err(ReadlineError::Interrupted) => break,
            Err(e) => {
                eprintln!("lox: {e}");
                break;
            }
        }
    }
}

fn report(err: &LoxError) {
    eprintln!("{err}");
}

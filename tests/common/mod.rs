#![allow(dead_code)]

use std::io::Cursor;

use uwu::{CompileError, Error, RuntimeError, TraceFrame, VM};

/// Run a program without input, returning what it printed and how it ended.
pub fn run(src: &str) -> (String, Result<(), Error>) {
    run_with_input(src, "")
}

/// Run a program that reads its lines from `input`.
pub fn run_with_input(src: &str, input: &str) -> (String, Result<(), Error>) {
    let (out, result) = run_with_bytes(src, input.as_bytes());
    let out = String::from_utf8(out).expect("output is utf-8");
    (out, result)
}

/// Run a program on raw input bytes and return the raw bytes it printed.
pub fn run_with_bytes(src: &str, input: &[u8]) -> (Vec<u8>, Result<(), Error>) {
    let mut vm = VM::new(Cursor::new(input.to_vec()), Vec::new());
    let result = vm.interpret(src);
    (vm.into_output(), result)
}

/// Run a program that must succeed and return what it printed.
pub fn output(src: &str) -> String {
    let (out, result) = run(src);
    if let Err(err) = result {
        panic!("program failed:\n{}", err);
    }
    out
}

/// Compile a program that must be rejected and return the errors.
pub fn compile_errors(src: &str) -> Vec<CompileError> {
    match run(src).1 {
        Err(Error::Compile(errors)) => errors,
        other => panic!("expected compile errors, got {:?}", other),
    }
}

/// Run a program that must fail at runtime and return the error with its traceback.
pub fn runtime_error(src: &str) -> (RuntimeError, Vec<TraceFrame>) {
    match run(src).1 {
        Err(Error::Runtime { error, trace }) => (error, trace),
        other => panic!("expected a runtime error, got {:?}", other),
    }
}

mod common;
use common::*;

use uwu::{CompileErrorKind, Location, RuntimeError, ScanError, TraceFrame};

fn kinds(src: &str) -> Vec<CompileErrorKind> {
    compile_errors(src).into_iter().map(|e| e.kind).collect()
}

#[test]
fn test_arity_is_enforced() {
    let add = "fwun add(a, b) [: out a + b >> :]\n";

    let (error, trace) = runtime_error(&format!("{}add(1)", add));
    assert!(matches!(
        error,
        RuntimeError::ArityMismatch {
            expected: 2,
            got: 1
        }
    ));
    assert_eq!(error.to_string(), "Expected 2 arguments but got 1.");
    assert_eq!(
        trace,
        vec![TraceFrame {
            line: 2,
            function: None
        }]
    );

    let (error, _) = runtime_error(&format!("{}add(1, 2, 3)", add));
    assert!(matches!(
        error,
        RuntimeError::ArityMismatch {
            expected: 2,
            got: 3
        }
    ));

    let (error, _) = runtime_error("pow(2)");
    assert!(matches!(
        error,
        RuntimeError::ArityMismatch {
            expected: 2,
            got: 1
        }
    ));
}

#[test]
fn test_stack_overflow() {
    let (error, trace) = runtime_error("fwun f() [: out f() >> :] f()");
    assert!(matches!(error, RuntimeError::StackOverflow));
    assert_eq!(error.to_string(), "Stack overflow.");
    assert_eq!(trace.len(), uwu::MAX_FRAMES);
    assert_eq!(trace[0].function.as_deref(), Some("f"));
    assert_eq!(trace.last().and_then(|f| f.function.clone()), None);
}

#[test]
fn test_traceback() {
    let src = r#"fwun outer() [:
  out inner() >>
:]
fwun inner() [:
  out missing >>
:]
outer()"#;
    let (out, result) = run(src);
    assert_eq!(out, "");
    let err = result.expect_err("runtime error");
    assert_eq!(
        err.to_string(),
        "error: Undefined variable 'missing'.\n\
         [line 5] in inner\n\
         [line 2] in outer\n\
         [line 7] in script"
    );
}

#[test]
fn test_output_before_a_runtime_error_is_kept() {
    let (out, result) = run(r#"ouo "before" >> ouo -"x" >>"#);
    assert_eq!(out, "before");
    assert!(result.is_err());
}

#[test]
fn test_type_errors() {
    let (error, _) = runtime_error(r#"ouo -"x" >>"#);
    assert!(matches!(error, RuntimeError::ExpectedOneNumber));
    let (error, _) = runtime_error(r#"ouo 1 < "a" >>"#);
    assert!(matches!(error, RuntimeError::ExpectedTwoNumbers));
    let (error, _) = runtime_error("ouo `a` * 2 >>");
    assert!(matches!(error, RuntimeError::ExpectedTwoNumbers));
    let (error, _) = runtime_error("ouo 1 + twue >>");
    assert!(matches!(error, RuntimeError::InvalidAddOperands));
    let (error, _) = runtime_error(r#"ouo "a" + 1 >>"#);
    assert!(matches!(error, RuntimeError::InvalidAddOperands));
    let (error, _) = runtime_error("uwu x := 1 x()");
    assert!(matches!(error, RuntimeError::NotCallable));
}

#[test]
fn test_undefined_globals() {
    let (error, _) = runtime_error("ouo x >>");
    assert!(matches!(error, RuntimeError::UndefinedVariable(ref name) if name == "x"));
    let (error, _) = runtime_error("y := 1");
    assert!(matches!(error, RuntimeError::UndefinedVariable(ref name) if name == "y"));
    let (error, _) = runtime_error("iwi -d z <<");
    assert!(matches!(error, RuntimeError::UndefinedVariable(ref name) if name == "z"));
    let (error, _) = runtime_error("uwu a := a");
    assert!(matches!(error, RuntimeError::UndefinedVariable(ref name) if name == "a"));
}

#[test]
fn test_redeclaration() {
    assert_eq!(
        kinds("[: uwu a := 1 uwu a := 2 :]"),
        vec![CompileErrorKind::VariableRedeclaration]
    );
    assert_eq!(output("uwu a := 1 uwu a := 2 ouo a >>"), "2");
    assert_eq!(
        output("[: uwu a := 1 [: uwu a := 2 ouo a >> :] ouo a >> :]"),
        "21"
    );
    assert_eq!(
        kinds("fwun f(a, a) [: :]"),
        vec![CompileErrorKind::VariableRedeclaration]
    );
}

#[test]
fn test_self_referencing_initializer() {
    assert_eq!(
        kinds("[: uwu a := a :]"),
        vec![CompileErrorKind::SelfReferencingInitializer]
    );
    assert_eq!(output("uwu a := 1 [: uwu b := a + 1 ouo b >> :]"), "2");
}

#[test]
fn test_errors_are_all_reported() {
    let src = "ouo >>\nouo 1 + >>\nuwu 1";
    let (out, result) = run(src);
    assert_eq!(out, "");
    assert_eq!(
        result.expect_err("compile error").to_string(),
        "[line 1] Error at '>>': Expect expression.\n\
         [line 2] Error at '>>': Expect expression.\n\
         [line 3] Error at '1': Expect variable name."
    );
}

#[test]
fn test_error_at_end() {
    let errors = compile_errors("ouo 1");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].location, Location::End);
    assert_eq!(
        errors[0].to_string(),
        "[line 1] Error at end: Expect '>>' after value."
    );
}

#[test]
fn test_scan_errors() {
    let errors = compile_errors("ouo \"abc >>");
    assert_eq!(
        errors[0].to_string(),
        "[line 1] Error: Unterminated string."
    );
    assert_eq!(
        kinds("uwu x := @")[0],
        CompileErrorKind::Scan(ScanError::UnexpectedCharacter('@'))
    );
    assert_eq!(
        kinds("uwu ?x := 1")[0],
        CompileErrorKind::Scan(ScanError::InvalidIdentifier)
    );
    assert_eq!(
        kinds("ouo `ab` >>")[0],
        CompileErrorKind::Scan(ScanError::InvalidChar)
    );
}

#[test]
fn test_invalid_assignment_target() {
    let errors = compile_errors("uwu a uwu b a + b := 3");
    assert_eq!(errors[0].kind, CompileErrorKind::InvalidAssignTarget);
    assert_eq!(errors[0].location, Location::Lexeme(":=".to_string()));
}

#[test]
fn test_out_at_top_level() {
    let errors = compile_errors("out 1 >>");
    assert_eq!(
        errors[0].to_string(),
        "[line 1] Error at 'out': Can't return from top-level code."
    );
}

#[test]
fn test_jump_too_large() {
    let src = format!("?w? twue [: uwu x := 1 {}:]", "x := x ".repeat(14000));
    assert_eq!(kinds(&src), vec![CompileErrorKind::JumpTooLarge]);
}

#[test]
fn test_loop_too_large() {
    let src = format!("uwu x := 0 untiw x [: {}:]", "x := x ".repeat(14000));
    assert_eq!(kinds(&src)[0], CompileErrorKind::LoopTooLarge);
}

#[test]
fn test_too_many_constants() {
    let sum = (0..257).map(|i| i.to_string()).collect::<Vec<_>>().join(" + ");
    let src = format!("ouo {} >>", sum);
    assert_eq!(kinds(&src), vec![CompileErrorKind::TooManyConstants]);

    // Names are stored once per function, so reusing a global does not use up the pool.
    let reads = "x + ".repeat(300);
    assert_eq!(output(&format!("uwu x := 1 ouo {}x >>", reads)), "301");
}

#[test]
fn test_too_many_locals() {
    let locals = (0..256).map(|i| format!("uwu v{} ", i)).collect::<String>();
    let src = format!("[: {}:]", locals);
    assert_eq!(kinds(&src), vec![CompileErrorKind::TooManyLocals]);

    let locals = (0..255).map(|i| format!("uwu v{} := {} ", i, i)).collect::<String>();
    let src = format!("[: {}ouo v254 >> :]", locals);
    assert_eq!(output(&src), "254");
}

#[test]
fn test_too_many_parameters() {
    let params = (0..256).map(|i| format!("p{}", i)).collect::<Vec<_>>().join(", ");
    let src = format!("fwun f({}) [: :]", params);
    assert_eq!(kinds(&src)[0], CompileErrorKind::TooManyParameters);
}

#[test]
fn test_too_many_arguments() {
    let args = vec!["a"; 256].join(", ");
    let src = format!("fwun f() [: :] [: uwu a := 1 f({}) :]", args);
    assert_eq!(kinds(&src), vec![CompileErrorKind::TooManyArguments]);
}

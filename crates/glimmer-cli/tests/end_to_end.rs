//! End-to-end scenarios driving the real `glimmer` binary: source in, stdout
//! and exit code out. Complements the inline unit tests, which only exercise
//! `run`/`run_file` in-process and can't observe what actually lands on
//! stdout through `println!`.

use std::io::Write as _;
use std::process::Command;
use std::sync::atomic::{AtomicUsize, Ordering};

static COUNTER: AtomicUsize = AtomicUsize::new(0);

fn run_script(source: &str) -> (String, String, i32) {
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let mut path = std::env::temp_dir();
    path.push(format!("glimmer-e2e-{}-{n}.glimmer", std::process::id()));

    let mut file = std::fs::File::create(&path).expect("create temp script");
    file.write_all(source.as_bytes()).expect("write temp script");
    drop(file);

    let output = Command::new(env!("CARGO_BIN_EXE_glimmer")).arg(&path).output().expect("run glimmer binary");
    let _ = std::fs::remove_file(&path);

    let stdout = String::from_utf8(output.stdout).expect("stdout is utf8");
    let stderr = String::from_utf8(output.stderr).expect("stderr is utf8");
    let code = output.status.code().expect("process exited with a code");
    (stdout, stderr, code)
}

#[test]
fn operator_precedence() {
    let (stdout, _, code) = run_script("print 1 + 2 * 3");
    assert_eq!(stdout, "7\n");
    assert_eq!(code, 0);
}

#[test]
fn while_loop_accumulates() {
    let (stdout, _, code) = run_script("let n = 10; let s = 0; let i = 1; while i <= n { s = s + i; i = i + 1 } print s");
    assert_eq!(stdout, "55\n");
    assert_eq!(code, 0);
}

#[test]
fn recursive_function() {
    let (stdout, _, code) = run_script("fn fact(n) { if n <= 1 { return 1 } return n * fact(n - 1) } print fact(6)");
    assert_eq!(stdout, "720\n");
    assert_eq!(code, 0);
}

#[test]
fn two_functions_combine() {
    let (stdout, _, code) = run_script("fn f() { return 1 } fn g() { return 2 } print f() + g() * 3");
    assert_eq!(stdout, "7\n");
    assert_eq!(code, 0);
}

#[test]
fn builtin_composition() {
    let (stdout, _, code) = run_script("print sqrt(pow(3,2) + pow(4,2))");
    assert_eq!(stdout, "5\n");
    assert_eq!(code, 0);
}

#[test]
fn block_scoping_shadows_then_restores() {
    let (stdout, _, code) = run_script("let x = 1; { let x = 2; print x } print x");
    assert_eq!(stdout, "2\n1\n");
    assert_eq!(code, 0);
}

#[test]
fn negating_a_non_number_is_a_runtime_error() {
    let (_, stderr, code) = run_script("print -true");
    assert!(stderr.contains("Operand must be a number"), "stderr was: {stderr}");
    assert_eq!(code, 70);
}

#[test]
fn assigning_an_undeclared_global_is_a_runtime_error() {
    let (_, stderr, code) = run_script("x = 1");
    assert!(stderr.contains("Undefined variable 'x'"), "stderr was: {stderr}");
    assert_eq!(code, 70);
}

#[test]
fn wrong_arity_is_a_runtime_error() {
    let (_, stderr, code) = run_script("fn f(a,b){} f(1)");
    assert!(stderr.contains("Expected 2 arguments but got 1"), "stderr was: {stderr}");
    assert_eq!(code, 70);
}

#[test]
fn duplicate_local_is_a_compile_error() {
    let (_, stderr, code) = run_script("{ let a; let a; }");
    assert_eq!(code, 65);
    assert!(!stderr.is_empty());
}

#[test]
fn self_initializing_local_is_a_compile_error() {
    let (_, stderr, code) = run_script("{ let x = x; }");
    assert_eq!(code, 65);
    assert!(!stderr.is_empty());
}

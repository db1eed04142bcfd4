//! Integration tests for the VM/compiler boundary that the REPL depends on:
//! globals persist across separate `interpret` calls, and a runtime error
//! leaves the VM able to run the next program successfully (§7: "A REPL
//! session survives errors... but retains globals").

use glimmer_vm::Vm;

fn compile(source: &str) -> glimmer_core::VFunction {
    glimmer_compiler::compile_str(source).expect("source should compile")
}

#[test]
fn globals_persist_across_interpret_calls() {
    let mut vm = Vm::new();
    vm.interpret(compile("let x = 41;")).expect("first line");
    vm.interpret(compile("x = x + 1;")).expect("second line");
    assert_eq!(vm.globals().len(), 1);
}

#[test]
fn vm_resets_and_continues_after_a_runtime_error() {
    let mut vm = Vm::new();
    let err = vm.interpret(compile("print -true;")).expect_err("negating a bool is a runtime error");
    assert!(err.message.contains("Operand must be a number"));

    // The VM must still be usable for the next program, matching REPL
    // behavior: one bad line doesn't poison the session.
    vm.interpret(compile("let ok = 1;")).expect("vm recovers for the next program");
}

#[test]
fn wrong_arity_reports_expected_and_got_counts() {
    let mut vm = Vm::new();
    let err = vm.interpret(compile("fn f(a, b) { return a + b; } f(1);")).expect_err("wrong arity is a runtime error");
    assert!(err.message.contains("Expected 2 arguments but got 1"), "{}", err.message);
}

#[test]
fn undefined_global_assignment_is_a_runtime_error() {
    let mut vm = Vm::new();
    let err = vm.interpret(compile("x = 1;")).expect_err("assigning an undeclared global is a runtime error");
    assert!(err.message.contains("Undefined variable 'x'"), "{}", err.message);
}

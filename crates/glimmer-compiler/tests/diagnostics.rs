//! Integration tests for the compile-error paths in §7/§8: each exercises
//! `compile_str` end to end (lex -> parse -> codegen) rather than a single
//! stage in isolation.

use glimmer_compiler::compile_str;

fn messages(source: &str) -> Vec<String> {
    match compile_str(source) {
        Ok(_) => panic!("expected a compile error for: {source}"),
        Err(err) => err.0.iter().map(|d| d.message.clone()).collect(),
    }
}

#[test]
fn duplicate_local_in_same_scope_is_rejected() {
    let msgs = messages("fn f() { let a; let a; }");
    assert!(msgs.iter().any(|m| m.contains("Already a variable with this name in this scope")), "{msgs:?}");
}

#[test]
fn duplicate_local_in_nested_scope_is_allowed() {
    assert!(compile_str("fn f() { let a; { let a; } }").is_ok());
}

#[test]
fn self_initializing_local_is_rejected() {
    let msgs = messages("fn f() { let x = x; }");
    assert!(msgs.iter().any(|m| m.contains("own initializer")), "{msgs:?}");
}

#[test]
fn return_at_top_level_is_rejected() {
    let msgs = messages("return 1;");
    assert!(msgs.iter().any(|m| m.contains("top-level")), "{msgs:?}");
}

#[test]
fn string_literal_in_expression_position_is_rejected() {
    let msgs = messages("print \"hi\";");
    assert!(msgs.iter().any(|m| m.contains("String literals")), "{msgs:?}");
}

#[test]
fn reserved_keyword_in_expression_position_is_rejected() {
    assert!(compile_str("for (1) {}").is_err());
    assert!(compile_str("break;").is_err());
    assert!(compile_str("continue;").is_err());
}

#[test]
fn invalid_assignment_target_is_rejected() {
    let msgs = messages("1 = 2;");
    assert!(msgs.iter().any(|m| m.contains("Invalid assignment target")), "{msgs:?}");
}

#[test]
fn panic_mode_suppresses_cascades_within_a_single_block() {
    // Two malformed statements in the same block: panic mode only clears in
    // `synchronize`, which is never called from inside `block`, so the
    // second error is a suppressed cascade of the first, not a second
    // reported diagnostic.
    let msgs = messages("fn f() { 1 = 2; 3 = 4; }");
    assert_eq!(msgs.iter().filter(|m| m.contains("Invalid assignment target")).count(), 1, "{msgs:?}");
}

#[test]
fn panic_mode_resynchronizes_between_top_level_declarations() {
    // Two malformed top-level statements, each its own declaration: the
    // top-level loop in `parse` calls `synchronize` after the first,
    // clearing panic mode before the second is parsed, so both report.
    let msgs = messages("1 = 2; 3 = 4;");
    assert_eq!(msgs.iter().filter(|m| m.contains("Invalid assignment target")).count(), 2, "{msgs:?}");
}

#[test]
fn well_formed_program_compiles() {
    assert!(compile_str("fn fact(n) { if n <= 1 { return 1 } return n * fact(n - 1) } print fact(6);").is_ok());
}

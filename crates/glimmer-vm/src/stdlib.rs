//! Host-provided builtins (abs/min/max/sqrt/pow/floor/ceil). Each validates
//! its own arity and argument types; a violation is reported to stderr and
//! the call still evaluates to `nil` rather than raising a VM-level error.

use glimmer_core::Value;
use tracing::warn;

fn arity_violation(name: &str, expected: &str, got: usize) {
    let message = format!("{name}() {expected}");
    eprintln!("{message}");
    warn!(native = name, got, "argument count rejected");
}

fn type_violation(name: &str, message: &str) {
    eprintln!("{name}() {message}");
    warn!(native = name, "argument type rejected");
}

fn one_number(name: &str, args: &[Value]) -> Option<f64> {
    if args.len() != 1 {
        arity_violation(name, "takes exactly 1 argument", args.len());
        return None;
    }
    match args[0].as_number() {
        Some(n) => Some(n),
        None => {
            type_violation(name, "argument must be a number");
            None
        }
    }
}

fn two_numbers(name: &str, args: &[Value]) -> Option<(f64, f64)> {
    if args.len() != 2 {
        arity_violation(name, "takes exactly 2 arguments", args.len());
        return None;
    }
    let (Some(a), Some(b)) = (args[0].as_number(), args[1].as_number()) else {
        type_violation(name, "arguments must be numbers");
        return None;
    };
    Some((a, b))
}

pub fn abs(args: &[Value]) -> Value {
    match one_number("abs", args) {
        Some(n) => Value::Number(n.abs()),
        None => Value::Nil,
    }
}

pub fn min(args: &[Value]) -> Value {
    match two_numbers("min", args) {
        Some((a, b)) => Value::Number(a.min(b)),
        None => Value::Nil,
    }
}

pub fn max(args: &[Value]) -> Value {
    match two_numbers("max", args) {
        Some((a, b)) => Value::Number(a.max(b)),
        None => Value::Nil,
    }
}

pub fn sqrt(args: &[Value]) -> Value {
    match one_number("sqrt", args) {
        Some(n) if n < 0.0 => {
            type_violation("sqrt", "argument must be non-negative");
            Value::Nil
        }
        Some(n) => Value::Number(n.sqrt()),
        None => Value::Nil,
    }
}

pub fn pow(args: &[Value]) -> Value {
    match two_numbers("pow", args) {
        Some((a, b)) => Value::Number(a.powf(b)),
        None => Value::Nil,
    }
}

pub fn floor(args: &[Value]) -> Value {
    match one_number("floor", args) {
        Some(n) => Value::Number(n.floor()),
        None => Value::Nil,
    }
}

pub fn ceil(args: &[Value]) -> Value {
    match one_number("ceil", args) {
        Some(n) => Value::Number(n.ceil()),
        None => Value::Nil,
    }
}

/// Registers all seven natives into `globals`.
pub fn install(globals: &mut glimmer_core::GlobalTable) {
    use std::rc::Rc;
    use glimmer_core::VString;

    let mut define = |name: &'static str, f: glimmer_core::NativeFn| {
        globals.set(Rc::new(VString::new(name)), Value::native(name, f));
    };
    define("abs", abs);
    define("min", min);
    define("max", max);
    define("sqrt", sqrt);
    define("pow", pow);
    define("floor", floor);
    define("ceil", ceil);
}

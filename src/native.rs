//! Math functions every virtual machine starts with.

use crate::{NativeFn, Value};

/// Name, arity and implementation of the functions defined as globals by default.
pub const NATIVES: [(&str, u8, NativeFn); 4] = [
    ("abs", 1, abs),
    ("pow", 2, pow),
    ("sqrt", 1, sqrt),
    ("floor", 1, floor),
];

fn abs(args: &[Value]) -> Value {
    match args {
        [Value::Number(x)] => Value::Number(x.abs()),
        _ => Value::Null,
    }
}

/// The exponent is truncated to an integer.
fn pow(args: &[Value]) -> Value {
    match args {
        [Value::Number(base), Value::Number(exp)] => Value::Number(base.powi(exp.trunc() as i32)),
        _ => Value::Null,
    }
}

fn sqrt(args: &[Value]) -> Value {
    match args {
        [Value::Number(x)] if *x >= 0.0 => Value::Number(x.sqrt()),
        _ => Value::Null,
    }
}

fn floor(args: &[Value]) -> Value {
    match args {
        [Value::Number(x)] => Value::Number(x.floor()),
        _ => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(v: Value) -> f64 {
        match v {
            Value::Number(n) => n,
            other => panic!("expected a number, got {:?}", other),
        }
    }

    #[test]
    fn math() {
        assert_eq!(num(abs(&[Value::Number(-2.5)])), 2.5);
        assert_eq!(num(pow(&[Value::Number(2.0), Value::Number(10.9)])), 1024.0);
        assert_eq!(num(pow(&[Value::Number(2.0), Value::Number(-1.0)])), 0.5);
        assert_eq!(num(sqrt(&[Value::Number(9.0)])), 3.0);
        assert_eq!(num(floor(&[Value::Number(-1.5)])), -2.0);
    }

    #[test]
    fn invalid_arguments_give_null() {
        assert_eq!(abs(&[Value::Bool(true)]), Value::Null);
        assert_eq!(pow(&[Value::Number(2.0), Value::Null]), Value::Null);
        assert_eq!(sqrt(&[Value::Number(-4.0)]), Value::Null);
        assert_eq!(floor(&[Value::Char(b'x')]), Value::Null);
    }
}

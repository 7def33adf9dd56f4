use std::fmt;

use crate::{Heap, Object};

/// This represents an uwu type and its data.
///
/// Values are small and copied freely. Objects are referenced, never owned, so cloning a
/// value holding an object only clones the handle.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A nothing value in uwu
    Null,
    /// A boolean value in uwu
    Bool(bool),
    /// A number value in uwu
    Number(f64),
    /// A single byte character
    Char(u8),
    /// A reference to an object owned by the heap
    Object(Object),
}

impl Value {
    /// Return true if the value is a string or a character, the operands `+` concatenates.
    pub fn is_textual(&self) -> bool {
        matches!(self, Self::Char(_) | Self::Object(Object::String(_)))
    }

    /// Return true if the value is `fawse` or the number `0`. Everything else, `null` included,
    /// is truthy.
    pub fn is_falsey(&self) -> bool {
        match self {
            Self::Bool(b) => !b,
            Self::Number(n) => *n == 0.0,
            _ => false,
        }
    }

    /// Get a printer that writes this value the way `ouo` shows it. A character outside
    /// ASCII is shown as the code point of its byte, since a `str` can't hold a lone byte.
    pub fn display<'a>(&'a self, heap: &'a Heap) -> ValueDisplay<'a> {
        ValueDisplay {
            value: self,
            heap,
            escape: false,
        }
    }

    /// Same as [`Value::display`] but writes newline and tab characters as `~n` and `~t`, so
    /// listings of constants stay on one line.
    pub fn escaped<'a>(&'a self, heap: &'a Heap) -> ValueDisplay<'a> {
        ValueDisplay {
            value: self,
            heap,
            escape: true,
        }
    }

    /// Compare two values the way `=` does. Scalars compare by value and objects by
    /// identity. `null` is not equal to anything, itself included.
    pub fn equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Null, _) | (_, Self::Null) => false,
            _ => self == other,
        }
    }

    /// Append the bytes of this value to a buffer. Only strings and characters have any.
    pub(crate) fn push_bytes(&self, heap: &Heap, buf: &mut Vec<u8>) {
        match self {
            Self::Char(c) => buf.push(*c),
            Self::Object(Object::String(id)) => buf.extend_from_slice(heap.str(*id).as_bytes()),
            _ => {}
        }
    }
}

/// Helper returned by [`Value::display`].
#[derive(Debug)]
pub struct ValueDisplay<'a> {
    value: &'a Value,
    heap: &'a Heap,
    escape: bool,
}

impl fmt::Display for ValueDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            Value::Null => Ok(()),
            Value::Bool(b) => f.write_str(if *b { "twue" } else { "fawse" }),
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::Char(b'\n') if self.escape => f.write_str("~n"),
            Value::Char(b'\t') if self.escape => f.write_str("~t"),
            Value::Char(c) => write!(f, "{}", char::from(*c)),
            Value::Object(Object::String(id)) => f.write_str(self.heap.str(*id)),
            Value::Object(Object::Function(fun)) => match fun.name {
                Some(name) => write!(f, "<fn {}>", self.heap.str(name)),
                None => f.write_str("<script>"),
            },
            Value::Object(Object::Native(_)) => f.write_str("<native fn>"),
        }
    }
}

/// Significant digits shown when printing numbers.
const PRECISION: i32 = 15;

/// Format a number with up to 15 significant digits, dropping trailing zeros. Very large and
/// very small magnitudes switch to scientific notation with a signed, two digit exponent.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return if n.is_sign_negative() { "-nan" } else { "nan" }.to_string();
    }
    if n.is_infinite() {
        return if n < 0.0 { "-inf" } else { "inf" }.to_string();
    }
    if n == 0.0 {
        return if n.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    // Rounding to the target precision can carry into the next power of ten, so the exponent
    // is read back from the rounded representation.
    let sci = format!("{:.*e}", (PRECISION - 1) as usize, n);
    let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exp: i32 = exp.parse().unwrap_or(0);

    if exp < -4 || exp >= PRECISION {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", trim_zeros(mantissa), sign, exp.abs())
    } else {
        let decimals = (PRECISION - 1 - exp) as usize;
        trim_zeros(&format!("{:.*}", decimals, n)).to_string()
    }
}

fn trim_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_print_like_printf_g() {
        assert_eq!(format_number(14.0), "14");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(-3.0), "-3");
        assert_eq!(format_number(0.1 + 0.2), "0.3");
        assert_eq!(format_number(1.0 / 3.0), "0.333333333333333");
        assert_eq!(format_number(0.0001), "0.0001");
        assert_eq!(format_number(0.00001), "1e-05");
        assert_eq!(format_number(123456789012345.0), "123456789012345");
        assert_eq!(format_number(1e15), "1e+15");
        assert_eq!(format_number(1.5e300), "1.5e+300");
        assert_eq!(format_number(f64::INFINITY), "inf");
        assert_eq!(format_number(-0.0), "-0");
    }

    #[test]
    fn truthiness() {
        assert!(Value::Bool(false).is_falsey());
        assert!(Value::Number(0.0).is_falsey());
        assert!(Value::Number(-0.0).is_falsey());
        assert!(!Value::Number(0.5).is_falsey());
        assert!(!Value::Bool(true).is_falsey());
        assert!(!Value::Null.is_falsey());
        assert!(!Value::Char(0).is_falsey());
    }

    #[test]
    fn equality() {
        let mut heap = Heap::default();
        let a = Value::Object(Object::String(heap.intern("uwu")));
        let b = Value::Object(Object::String(heap.intern("uwu")));
        let c = Value::Object(Object::String(heap.intern("owo")));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.equals(&b));
        assert!(!Value::Null.equals(&Value::Null));
        assert!(!Value::Null.equals(&Value::Bool(false)));
        assert!(Value::Char(b'a').equals(&Value::Char(b'a')));
        assert_eq!(Value::Char(b'a'), Value::Char(b'a'));
        assert_ne!(Value::Number(0.0), Value::Bool(false));
        assert_ne!(Value::Number(f64::NAN), Value::Number(f64::NAN));
    }

    #[test]
    fn display() {
        let mut heap = Heap::default();
        let s = Value::Object(Object::String(heap.intern("hi")));
        assert_eq!(s.display(&heap).to_string(), "hi");
        assert_eq!(Value::Bool(true).display(&heap).to_string(), "twue");
        assert_eq!(Value::Bool(false).display(&heap).to_string(), "fawse");
        assert_eq!(Value::Null.display(&heap).to_string(), "");
        assert_eq!(Value::Char(b'\n').display(&heap).to_string(), "\n");
        assert_eq!(Value::Char(b'\n').escaped(&heap).to_string(), "~n");
        assert_eq!(Value::Char(b'\t').escaped(&heap).to_string(), "~t");
    }
}

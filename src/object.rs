use std::fmt;

use crate::{Chunk, Gc, StrId, Value};

/// A reference to a heap object. Cloning it clones the handle, never the object, and two
/// objects are equal only if they are the same object. Strings are interned, so comparing
/// their ids is an identity comparison as well.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Object {
    /// An interned string
    String(StrId),
    /// A compiled function
    Function(Gc<Function>),
    /// A function provided by the host
    Native(Gc<NativeFun>),
}

/// A function object that holds the bytecode of the function along with other metadata
#[derive(Debug)]
pub struct Function {
    /// The name of the function, `None` for the top-level script
    pub name: Option<StrId>,
    /// Number of parameters the function has
    pub arity: u8,
    /// The bytecode chunk of this function
    pub chunk: Chunk,
}

impl Function {
    /// Create a new function of the given name, with its arity set to 0 and its chunk set to the
    /// default value
    pub fn new(name: Option<StrId>) -> Self {
        Self {
            name,
            arity: 0,
            chunk: Chunk::default(),
        }
    }
}

/// Signature of a host function. It receives exactly as many arguments as its declared arity
/// and answers [`Value::Null`] when it can not handle them.
pub type NativeFn = fn(&[Value]) -> Value;

/// A native function
pub struct NativeFun {
    /// Function's name
    pub name: StrId,
    /// Number of parameters
    pub arity: u8,
    /// Native function reference
    pub call: NativeFn,
}

impl fmt::Debug for NativeFun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native fn>")
    }
}

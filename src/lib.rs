//! Infrastructure for a bytecode virtual machine for the uwu programming language.

#![warn(missing_debug_implementations)]
#![deny(missing_docs)]

mod chunk;
mod compile;
mod config;
mod error;
mod gc;
mod heap;
mod native;
mod object;
mod opcode;
mod scan;
mod token;
mod value;
mod vm;

pub use chunk::*;
pub use compile::*;
pub use config::*;
pub use error::*;
pub use gc::*;
pub use heap::*;
pub use native::*;
pub use object::*;
pub use opcode::*;
pub use scan::*;
pub use token::*;
pub use value::*;
pub use vm::*;

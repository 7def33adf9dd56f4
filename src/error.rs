use std::{fmt, io};

use itertools::Itertools;

/// Error while scanning uwu source code
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScanError {
    /// A string literal is unterminated
    #[error("Unterminated string.")]
    UnterminatedString,
    /// A character literal is unterminated
    #[error("Unterminated character literal.")]
    UnterminatedChar,
    /// A character literal holds nothing
    #[error("Empty character literal.")]
    EmptyChar,
    /// A character literal holds more than one byte
    #[error("Character literal must hold exactly one character.")]
    InvalidChar,
    /// A run starting with '?' that is not a keyword
    #[error("Invalid identifier.")]
    InvalidIdentifier,
    /// Invalid character
    #[error("Unexpected character '{0}'.")]
    UnexpectedCharacter(char),
}

/// The reason a piece of source could not be compiled.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileErrorKind {
    /// The scanner could not produce a token
    #[error(transparent)]
    Scan(#[from] ScanError),
    /// Current token is not supposed to be there
    #[error("{0}")]
    UnexpectedToken(&'static str),
    /// A token that can not start an expression
    #[error("Expect expression.")]
    ExpectedExpression,
    /// A number literal that can not be represented
    #[error("Invalid number literal.")]
    InvalidNumber,
    /// Can not assign a value to the LHS
    #[error("Invalid assignment target.")]
    InvalidAssignTarget,
    /// Can not use variable name in its initializer
    #[error("Can't read local variable in its own initializer.")]
    SelfReferencingInitializer,
    /// A named can only be declared as variable once in local scope
    #[error("Already a variable with this name in this scope.")]
    VariableRedeclaration,
    /// The number of local variables can not exceed the size of a frame's window
    #[error("Too many local variables in function.")]
    TooManyLocals,
    /// A chunk's constant pool is addressed with a single byte
    #[error("Too many constants in one chunk.")]
    TooManyConstants,
    /// Function declarations are limited to 255 parameters
    #[error("Can't have more than 255 parameters.")]
    TooManyParameters,
    /// Calls are limited to 255 arguments
    #[error("Can't have more than 255 arguments.")]
    TooManyArguments,
    /// Range to jump over exceeds u16
    #[error("Too much code to jump over.")]
    JumpTooLarge,
    /// Loop body exceeds u16::MAX bytes
    #[error("Loop body too large.")]
    LoopTooLarge,
    /// An out statement in top-level code
    #[error("Can't return from top-level code.")]
    OutOutsideFunction,
}

/// Where in the source a compile error was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// At the given lexeme
    Lexeme(String),
    /// At the end of the source
    End,
    /// Nowhere in particular, used for scan errors that have no lexeme
    Unknown,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lexeme(lexeme) => write!(f, " at '{}'", lexeme),
            Self::End => write!(f, " at end"),
            Self::Unknown => Ok(()),
        }
    }
}

/// Error while compiling uwu tokens
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("[line {line}] Error{location}: {kind}")]
pub struct CompileError {
    /// Line of the offending token
    pub line: usize,
    /// The offending token
    pub location: Location,
    /// What went wrong
    pub kind: CompileErrorKind,
}

/// Virtual machine errors
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// Push on a full stack or call with every frame in use
    #[error("Stack overflow.")]
    StackOverflow,
    /// Wrong arguments given to binary add operators that only accept two numbers
    /// or two textual values
    #[error("Operands must be two numbers or two strings.")]
    InvalidAddOperands,
    /// Wrong arguments given to binary operators that only accept numbers
    #[error("Operands must be numbers.")]
    ExpectedTwoNumbers,
    /// Wrong arguments given to unary operators that only accept a numbers
    #[error("Operand must be a number.")]
    ExpectedOneNumber,
    /// Accessing an undefined variable
    #[error("Undefined variable '{0}'.")]
    UndefinedVariable(String),
    /// Calling something that is neither a function nor a native
    #[error("Can only call functions.")]
    NotCallable,
    /// Calling a function with the wrong number of arguments
    #[error("Expected {expected} arguments but got {got}.")]
    ArityMismatch {
        /// The callee's arity
        expected: u8,
        /// Number of arguments given
        got: u8,
    },
    /// A byte that does not encode any instruction
    #[error("Unknown opcode {0}.")]
    UnknownOpcode(u8),
    /// Reading from the program's input or writing to its output failed
    #[error("I/O failure: {0}")]
    Io(#[from] io::Error),
}

/// One line of a runtime error's traceback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceFrame {
    /// The line being executed in this frame
    pub line: usize,
    /// The function's name, `None` for the top-level script
    pub function: Option<String>,
}

impl fmt::Display for TraceFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.function {
            Some(name) => write!(f, "[line {}] in {}", self.line, name),
            None => write!(f, "[line {}] in script", self.line),
        }
    }
}

/// uwu virtual machine errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Compilation errors, in the order they were found
    #[error("{}", .0.iter().join("\n"))]
    Compile(Vec<CompileError>),
    /// A runtime error happened
    #[error("error: {error}\n{}", .trace.iter().join("\n"))]
    Runtime {
        /// What went wrong
        error: RuntimeError,
        /// Active frames at the time of the error, innermost first
        trace: Vec<TraceFrame>,
    },
}

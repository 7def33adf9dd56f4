/// OpCode is a number that specifies the type of the instruction. Operands follow the
/// opcode inline in the chunk's byte stream, [`OpCode::operand_width`] tells how many.
///
/// # Notes
///
/// Unlike the usual trick of compiling `a != b` to `!(a == b)`, every comparison has its own
/// opcode. `a <= b` is not equivalent to `!(a > b)` once `NaN` gets involved, since [IEEE 754]
/// comparisons with `NaN` are always `false`.
///
/// [IEEE 754]: https://en.wikipedia.org/wiki/IEEE_754
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    /// Load a constant, operand is the constant's index
    Constant,
    /// Load a `null` value
    Null,
    /// Load a `true` value
    True,
    /// Load a `false` value
    False,
    /// Pop the top of the stack
    Pop,
    /// Push the local in the given frame slot
    GetLocal,
    /// Store the top of the stack in the given frame slot
    SetLocal,
    /// Push the global whose name is the given constant
    GetGlobal,
    /// Store the top of the stack in an existing global
    SetGlobal,
    /// Pop the top of the stack and define a global initialized with that value
    DefineGlobal,
    /// Check for equality between 2 operands
    Equal,
    /// Check for inequality between 2 operands
    NotEqual,
    /// Compare if the first operand is greater than the second
    Greater,
    /// Compare if the first operand is greater than or equal to the second
    GreaterEqual,
    /// Compare if the first operand is less than the second
    Less,
    /// Compare if the first operand is less than or equal to the second
    LessEqual,
    /// Add two number operands or concatenate two textual operands
    Add,
    /// Subtract two number operands
    Subtract,
    /// Multiply two number operands
    Multiply,
    /// Divide two number operands
    Divide,
    /// Push whether a single operand is falsey
    Not,
    /// Negate a single number operand
    Negate,
    /// Pop and print a value in human readable format
    Print,
    /// Read a line from the input as a string
    ReadString,
    /// Read a line from the input as a number
    ReadNumber,
    /// Read a single character from the input
    ReadChar,
    /// Jump forward unconditionally
    Jump,
    /// Jump forward if the top of the stack is falsey, without popping it
    JumpIfFalse,
    /// Jump forward if the top of the stack is truthy, without popping it
    JumpIfTrue,
    /// Jump backward unconditionally
    Loop,
    /// Call the value below the given number of arguments
    Call,
    /// Return from the current function
    Out,
}

const OPCODES: [OpCode; 32] = [
    OpCode::Constant,
    OpCode::Null,
    OpCode::True,
    OpCode::False,
    OpCode::Pop,
    OpCode::GetLocal,
    OpCode::SetLocal,
    OpCode::GetGlobal,
    OpCode::SetGlobal,
    OpCode::DefineGlobal,
    OpCode::Equal,
    OpCode::NotEqual,
    OpCode::Greater,
    OpCode::GreaterEqual,
    OpCode::Less,
    OpCode::LessEqual,
    OpCode::Add,
    OpCode::Subtract,
    OpCode::Multiply,
    OpCode::Divide,
    OpCode::Not,
    OpCode::Negate,
    OpCode::Print,
    OpCode::ReadString,
    OpCode::ReadNumber,
    OpCode::ReadChar,
    OpCode::Jump,
    OpCode::JumpIfFalse,
    OpCode::JumpIfTrue,
    OpCode::Loop,
    OpCode::Call,
    OpCode::Out,
];

impl OpCode {
    /// Number of operand bytes following the opcode.
    pub fn operand_width(self) -> usize {
        match self {
            Self::Constant
            | Self::GetLocal
            | Self::SetLocal
            | Self::GetGlobal
            | Self::SetGlobal
            | Self::DefineGlobal
            | Self::Call => 1,
            Self::Jump | Self::JumpIfFalse | Self::JumpIfTrue | Self::Loop => 2,
            _ => 0,
        }
    }

    /// The mnemonic used when disassembling.
    pub fn name(self) -> &'static str {
        match self {
            Self::Constant => "OP_CONSTANT",
            Self::Null => "OP_NULL",
            Self::True => "OP_TRUE",
            Self::False => "OP_FALSE",
            Self::Pop => "OP_POP",
            Self::GetLocal => "OP_GET_LOCAL",
            Self::SetLocal => "OP_SET_LOCAL",
            Self::GetGlobal => "OP_GET_GLOBAL",
            Self::SetGlobal => "OP_SET_GLOBAL",
            Self::DefineGlobal => "OP_DEFINE_GLOBAL",
            Self::Equal => "OP_EQUAL",
            Self::NotEqual => "OP_NOT_EQUAL",
            Self::Greater => "OP_GREATER",
            Self::GreaterEqual => "OP_GREATER_EQUAL",
            Self::Less => "OP_LESS",
            Self::LessEqual => "OP_LESS_EQUAL",
            Self::Add => "OP_ADD",
            Self::Subtract => "OP_SUBTRACT",
            Self::Multiply => "OP_MULTIPLY",
            Self::Divide => "OP_DIVIDE",
            Self::Not => "OP_NOT",
            Self::Negate => "OP_NEGATE",
            Self::Print => "OP_PRINT",
            Self::ReadString => "OP_READ_STRING",
            Self::ReadNumber => "OP_READ_NUMBER",
            Self::ReadChar => "OP_READ_CHAR",
            Self::Jump => "OP_JUMP",
            Self::JumpIfFalse => "OP_JUMP_IF_FALSE",
            Self::JumpIfTrue => "OP_JUMP_IF_TRUE",
            Self::Loop => "OP_LOOP",
            Self::Call => "OP_CALL",
            Self::Out => "OP_OUT",
        }
    }
}

impl From<OpCode> for u8 {
    fn from(op: OpCode) -> Self {
        op as u8
    }
}

impl TryFrom<u8> for OpCode {
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        OPCODES.get(byte as usize).copied().ok_or(byte)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decoding_table_matches_discriminants() {
        for (byte, op) in OPCODES.iter().enumerate() {
            assert_eq!(u8::from(*op) as usize, byte);
            assert_eq!(OpCode::try_from(byte as u8), Ok(*op));
        }
        assert_eq!(OpCode::try_from(OPCODES.len() as u8), Err(OPCODES.len() as u8));
    }
}

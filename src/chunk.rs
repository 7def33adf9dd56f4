//! This module deals with chunks of bytecodes.

use std::io::{self, Write};

use crate::{Heap, OpCode, Value};

/// The smallest capacity the code buffer grows to.
const MIN_CAPACITY: usize = 8;

/// Number of entries a constant pool can hold, bounded by the single byte operand.
pub const MAX_CONSTANTS: usize = u8::MAX as usize + 1;

/// Chunk is a sequence of instructions and data that will be written to by the compiler
/// and later run by the virtual-machine.
///
/// # Examples
///
/// ```
/// use uwu::{Chunk, OpCode, Value};
///
/// let mut chunk = Chunk::default();
/// let const_id = chunk.add_const(Value::Number(1.0)).unwrap();
/// assert!(matches!(chunk.read_const(const_id), &Value::Number(n) if n == 1.0));
///
/// chunk.write_op(OpCode::Constant, 1);
/// chunk.write(const_id, 1);
/// chunk.write_op(OpCode::Out, 2);
/// assert_eq!(chunk.code(), &[OpCode::Constant as u8, const_id, OpCode::Out as u8]);
/// assert_eq!(chunk.line_at(1), 1);
/// assert_eq!(chunk.line_at(2), 2);
/// ```
#[derive(Default, Debug)]
pub struct Chunk {
    code: Vec<u8>,
    constants: Vec<Value>,
    lines: Vec<LineRun>,
}

/// A run of consecutive bytes compiled from the same source line. `end` is the number of
/// bytes written once the run finished, so the runs' ends are strictly increasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LineRun {
    line: usize,
    end: usize,
}

impl Chunk {
    /// Append a byte to the chunk, remembering the line it came from.
    pub fn write(&mut self, byte: u8, line: usize) {
        if self.code.len() == self.code.capacity() {
            let capacity = (self.code.capacity() * 2).max(MIN_CAPACITY);
            self.code.reserve_exact(capacity - self.code.len());
        }
        self.code.push(byte);

        let end = self.code.len();
        match self.lines.last_mut() {
            Some(run) if run.line == line => run.end = end,
            _ => self.lines.push(LineRun { line, end }),
        }
    }

    /// Append an opcode to the chunk.
    pub fn write_op(&mut self, op: OpCode, line: usize) {
        self.write(op.into(), line);
    }

    /// Overwrite a previously written 16-bit operand, big-endian.
    pub fn patch_u16(&mut self, offset: usize, value: u16) {
        let [hi, lo] = value.to_be_bytes();
        self.code[offset] = hi;
        self.code[offset + 1] = lo;
    }

    /// Read the 16-bit operand starting at the given offset.
    pub fn read_u16(&self, offset: usize) -> u16 {
        u16::from_be_bytes([self.code[offset], self.code[offset + 1]])
    }

    /// The bytes written so far.
    pub fn code(&self) -> &[u8] {
        &self.code
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.code.len()
    }

    /// Return true if no byte has been written.
    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Add a constant value to the chunk and return its position in the pool, or `None` if
    /// the pool can not be addressed with a byte anymore.
    pub fn add_const(&mut self, val: Value) -> Option<u8> {
        if self.constants.len() >= MAX_CONSTANTS {
            return None;
        }
        self.constants.push(val);
        u8::try_from(self.constants.len() - 1).ok()
    }

    /// Read the constant at the given index
    pub fn read_const(&self, idx: u8) -> &Value {
        &self.constants[idx as usize]
    }

    /// Get the source line of the byte at the given offset.
    pub fn line_at(&self, offset: usize) -> usize {
        let run = self.lines.partition_point(|run| run.end <= offset);
        self.lines
            .get(run)
            .or_else(|| self.lines.last())
            .map(|run| run.line)
            .unwrap_or(0)
    }

    /// Go through the instructions in the chunk and write them in human-readable format.
    pub fn disassemble<W: Write>(&self, name: &str, heap: &Heap, mut out: W) -> io::Result<()> {
        writeln!(out, "== {} ==", name)?;
        let mut offset = 0;
        while offset < self.code.len() {
            offset = self.disassemble_instruction(offset, heap, &mut out)?;
        }
        Ok(())
    }

    /// Write the instruction at the given offset in human readable format and return the
    /// offset of the next one.
    pub fn disassemble_instruction<W: Write>(
        &self,
        offset: usize,
        heap: &Heap,
        mut out: W,
    ) -> io::Result<usize> {
        write!(out, "{:04} ", offset)?;
        let line = self.line_at(offset);
        if offset > 0 && line == self.line_at(offset - 1) {
            write!(out, "   | ")?;
        } else {
            write!(out, "{:4} ", line)?;
        }

        let byte = self.code[offset];
        let op = match OpCode::try_from(byte) {
            Ok(op) => op,
            Err(byte) => {
                writeln!(out, "Unknown opcode {}", byte)?;
                return Ok(offset + 1);
            }
        };
        match op {
            OpCode::Constant | OpCode::GetGlobal | OpCode::SetGlobal | OpCode::DefineGlobal => {
                let idx = self.code[offset + 1];
                writeln!(
                    out,
                    "{:<16} {:4} '{}'",
                    op.name(),
                    idx,
                    self.read_const(idx).escaped(heap)
                )?;
            }
            OpCode::GetLocal | OpCode::SetLocal | OpCode::Call => {
                writeln!(out, "{:<16} {:4}", op.name(), self.code[offset + 1])?;
            }
            OpCode::Jump | OpCode::JumpIfFalse | OpCode::JumpIfTrue | OpCode::Loop => {
                let jump = self.read_u16(offset + 1) as usize;
                let next = offset + 3;
                let target = if op == OpCode::Loop {
                    next.saturating_sub(jump)
                } else {
                    next + jump
                };
                writeln!(out, "{:<16} {:4} -> {}", op.name(), offset, target)?;
            }
            _ => writeln!(out, "{}", op.name())?,
        }
        Ok(offset + 1 + op.operand_width())
    }
}

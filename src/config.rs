/// Default maximum number of call frames.
pub const MAX_FRAMES: usize = 64;

/// Number of stack slots each call frame can address, bounded by the single byte operand of
/// the local variable instructions.
pub const STACK_SLOTS_PER_FRAME: usize = u8::MAX as usize + 1;

/// Knobs for the compiler and the virtual machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Maximum depth of nested calls. The value stack holds `max_frames` times
    /// [`STACK_SLOTS_PER_FRAME`] values.
    pub max_frames: usize,
    /// Print the value stack and the instruction to stderr before executing each instruction.
    pub trace_execution: bool,
    /// Disassemble every function to stderr after the program compiled without error.
    pub print_code: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_frames: MAX_FRAMES,
            trace_execution: false,
            print_code: false,
        }
    }
}

impl Config {
    /// Capacity of the value stack.
    pub fn stack_size(&self) -> usize {
        self.max_frames * STACK_SLOTS_PER_FRAME
    }
}

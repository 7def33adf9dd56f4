use std::io::{self, BufRead, Write};

use itertools::Itertools;
use rustc_hash::FxHashMap;

use crate::{
    compile, Chunk, Config, Error, Function, Gc, Heap, NativeFn, NativeFun, Object, OpCode,
    RuntimeError, StrId, TraceFrame, Value, NATIVES,
};

#[derive(Debug)]
struct CallFrame {
    function: Gc<Function>,
    ip: usize,
    slot: usize,
}

/// A bytecode virtual machine for the uwu programming language.
///
/// The machine owns every object its programs create. Programs print to `W` and the read
/// statements take their lines from `R`.
#[derive(Debug)]
pub struct VM<R = io::StdinLock<'static>, W = io::Stdout> {
    config: Config,
    heap: Heap,
    stack: Vec<Value>,
    frames: Vec<CallFrame>,
    globals: FxHashMap<StrId, Value>,
    input: R,
    output: W,
}

impl Default for VM {
    fn default() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> VM<R, W> {
    /// Create a virtual machine with the default configuration.
    pub fn new(input: R, output: W) -> Self {
        Self::with_config(Config::default(), input, output)
    }

    /// Create a virtual machine with the given configuration. The math natives are defined
    /// as globals.
    pub fn with_config(config: Config, input: R, output: W) -> Self {
        let mut vm = Self {
            stack: Vec::with_capacity(config.stack_size()),
            frames: Vec::with_capacity(config.max_frames),
            config,
            heap: Heap::default(),
            globals: FxHashMap::default(),
            input,
            output,
        };
        for (name, arity, call) in NATIVES {
            vm.define_native(name, arity, call);
        }
        vm
    }

    /// Compile and run the given source code. Globals defined by earlier calls stay defined.
    pub fn interpret(&mut self, src: &str) -> Result<(), Error> {
        let function = compile(src, &mut self.heap, &self.config).map_err(Error::Compile)?;

        let result = self
            .push(Value::Object(Object::Function(function.clone())))
            .and_then(|()| self.call(function, 0))
            .and_then(|()| self.run())
            .and_then(|()| self.output.flush().map_err(RuntimeError::from));

        if let Err(error) = result {
            let trace = self.stack_trace();
            self.stack.clear();
            self.frames.clear();
            self.output.flush().ok();
            return Err(Error::Runtime { error, trace });
        }
        Ok(())
    }

    /// Define a global function implemented by the host.
    pub fn define_native(&mut self, name: &str, arity: u8, call: NativeFn) {
        let name = self.heap.intern(name);
        let native = self.heap.alloc_native(NativeFun { name, arity, call });
        self.globals
            .insert(name, Value::Object(Object::Native(native)));
    }

    /// Get the value of a global variable.
    pub fn global(&self, name: &str) -> Option<&Value> {
        let name = self.heap.lookup(name)?;
        self.globals.get(&name)
    }

    /// The heap owning every object created so far.
    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    /// Consume the machine and return the writer programs printed to.
    pub fn into_output(self) -> W {
        self.output
    }

    /// Run the virtual machine until the script's frame returns.
    fn run(&mut self) -> Result<(), RuntimeError> {
        loop {
            if self.config.trace_execution {
                self.trace();
            }

            let byte = self.read_byte();
            let opcode = OpCode::try_from(byte).map_err(RuntimeError::UnknownOpcode)?;
            match opcode {
                OpCode::Constant => {
                    let idx = self.read_byte();
                    let val = self.chunk().read_const(idx).clone();
                    self.push(val)?;
                }
                OpCode::Null => self.push(Value::Null)?,
                OpCode::True => self.push(Value::Bool(true))?,
                OpCode::False => self.push(Value::Bool(false))?,
                OpCode::Pop => {
                    self.pop();
                }
                OpCode::GetLocal => {
                    let slot = self.read_byte() as usize;
                    let local = self.stack[self.frame().slot + slot].clone();
                    self.push(local)?;
                }
                OpCode::SetLocal => {
                    let slot = self.read_byte() as usize;
                    let offset = self.frame().slot + slot;
                    self.stack[offset] = self.peek(0).clone();
                }
                OpCode::GetGlobal => {
                    let name = self.read_name();
                    let val = self
                        .globals
                        .get(&name)
                        .ok_or_else(|| {
                            RuntimeError::UndefinedVariable(self.heap.str(name).to_string())
                        })?
                        .clone();
                    self.push(val)?;
                }
                OpCode::SetGlobal => {
                    let name = self.read_name();
                    let val = self.peek(0).clone();
                    match self.globals.get_mut(&name) {
                        Some(global) => *global = val,
                        None => {
                            return Err(RuntimeError::UndefinedVariable(
                                self.heap.str(name).to_string(),
                            ))
                        }
                    }
                }
                OpCode::DefineGlobal => {
                    let name = self.read_name();
                    let val = self.pop();
                    self.globals.insert(name, val);
                }
                OpCode::Equal => {
                    let v2 = self.pop();
                    let v1 = self.peek_mut(0);
                    *v1 = Value::Bool(v1.equals(&v2));
                }
                OpCode::NotEqual => {
                    let v2 = self.pop();
                    let v1 = self.peek_mut(0);
                    *v1 = Value::Bool(!v1.equals(&v2));
                }
                OpCode::Greater => self.binary_number(|a, b| Value::Bool(a > b))?,
                OpCode::GreaterEqual => self.binary_number(|a, b| Value::Bool(a >= b))?,
                OpCode::Less => self.binary_number(|a, b| Value::Bool(a < b))?,
                OpCode::LessEqual => self.binary_number(|a, b| Value::Bool(a <= b))?,
                OpCode::Add => match (self.peek(1), self.peek(0)) {
                    (&Value::Number(n1), &Value::Number(n2)) => {
                        self.pop();
                        let v1 = self.peek_mut(0);
                        *v1 = Value::Number(n1 + n2);
                    }
                    (v1, v2) if v1.is_textual() && v2.is_textual() => {
                        let mut res = Vec::new();
                        v1.push_bytes(&self.heap, &mut res);
                        v2.push_bytes(&self.heap, &mut res);
                        let id = self.heap.intern(String::from_utf8_lossy(&res));
                        self.pop();
                        let v1 = self.peek_mut(0);
                        *v1 = Value::Object(Object::String(id));
                    }
                    _ => return Err(RuntimeError::InvalidAddOperands),
                },
                OpCode::Subtract => self.binary_number(|a, b| Value::Number(a - b))?,
                OpCode::Multiply => self.binary_number(|a, b| Value::Number(a * b))?,
                OpCode::Divide => self.binary_number(|a, b| Value::Number(a / b))?,
                OpCode::Not => {
                    let v = self.peek_mut(0);
                    *v = Value::Bool(v.is_falsey());
                }
                OpCode::Negate => match self.peek_mut(0) {
                    Value::Number(v) => *v = -*v,
                    _ => return Err(RuntimeError::ExpectedOneNumber),
                },
                OpCode::Print => {
                    match self.pop() {
                        // Characters are bytes, not code points.
                        Value::Char(c) => self.output.write_all(&[c])?,
                        v => write!(self.output, "{}", v.display(&self.heap))?,
                    }
                }
                OpCode::ReadString => {
                    let line = self.read_line()?;
                    let id = self.heap.intern(String::from_utf8_lossy(trim_line_end(&line)));
                    self.push(Value::Object(Object::String(id)))?;
                }
                OpCode::ReadNumber => {
                    let line = self.read_line()?;
                    let n = parse_number(trim_line_end(&line));
                    self.push(Value::Number(n))?;
                }
                OpCode::ReadChar => {
                    let line = self.read_line()?;
                    let c = line.first().copied().unwrap_or(0);
                    self.push(Value::Char(c))?;
                }
                OpCode::Jump => {
                    let offset = self.read_u16();
                    self.frame_mut().ip += offset as usize;
                }
                OpCode::JumpIfFalse => {
                    let offset = self.read_u16();
                    if self.peek(0).is_falsey() {
                        self.frame_mut().ip += offset as usize;
                    }
                }
                OpCode::JumpIfTrue => {
                    let offset = self.read_u16();
                    if !self.peek(0).is_falsey() {
                        self.frame_mut().ip += offset as usize;
                    }
                }
                OpCode::Loop => {
                    let offset = self.read_u16();
                    self.frame_mut().ip -= offset as usize;
                }
                OpCode::Call => {
                    let argc = self.read_byte();
                    self.call_value(self.peek(argc as usize).clone(), argc)?;
                }
                OpCode::Out => {
                    let val = self.pop();
                    let frame = self
                        .frames
                        .pop()
                        .expect("Should have exited when there's no frame left");
                    if self.frames.is_empty() {
                        self.pop();
                        return Ok(());
                    }
                    self.stack.truncate(frame.slot);
                    self.push(val)?;
                }
            }
        }
    }

    fn call_value(&mut self, callee: Value, argc: u8) -> Result<(), RuntimeError> {
        match callee {
            Value::Object(Object::Function(function)) => self.call(function, argc),
            Value::Object(Object::Native(native)) => {
                if argc != native.arity {
                    return Err(RuntimeError::ArityMismatch {
                        expected: native.arity,
                        got: argc,
                    });
                }
                let args = self.stack.len() - argc as usize;
                let res = (native.call)(&self.stack[args..]);
                self.stack.truncate(args - 1);
                self.push(res)
            }
            _ => Err(RuntimeError::NotCallable),
        }
    }

    fn call(&mut self, function: Gc<Function>, argc: u8) -> Result<(), RuntimeError> {
        if argc != function.arity {
            return Err(RuntimeError::ArityMismatch {
                expected: function.arity,
                got: argc,
            });
        }

        if self.frames.len() == self.config.max_frames {
            return Err(RuntimeError::StackOverflow);
        }

        let frame = CallFrame {
            function,
            ip: 0,
            slot: self.stack.len() - argc as usize - 1,
        };
        self.frames.push(frame);
        Ok(())
    }

    /// Apply an operation to the two numbers on top of the stack, replacing them with the
    /// result.
    fn binary_number(&mut self, op: fn(f64, f64) -> Value) -> Result<(), RuntimeError> {
        match (self.peek(1), self.peek(0)) {
            (&Value::Number(n1), &Value::Number(n2)) => {
                self.pop();
                let v1 = self.peek_mut(0);
                *v1 = op(n1, n2);
                Ok(())
            }
            _ => Err(RuntimeError::ExpectedTwoNumbers),
        }
    }

    /// Read the bytes of a whole line from the input, nothing once it is exhausted. Anything
    /// the program printed so far is flushed first so prompts show up before blocking.
    fn read_line(&mut self) -> Result<Vec<u8>, RuntimeError> {
        self.output.flush()?;
        let mut line = Vec::new();
        self.input.read_until(b'\n', &mut line)?;
        Ok(line)
    }

    /// Active frames at this point, innermost first.
    fn stack_trace(&self) -> Vec<TraceFrame> {
        self.frames
            .iter()
            .rev()
            .map(|frame| TraceFrame {
                line: frame.function.chunk.line_at(frame.ip.saturating_sub(1)),
                function: frame.function.name.map(|id| self.heap.str(id).to_string()),
            })
            .collect()
    }

    fn trace(&self) {
        let stack = self
            .stack
            .iter()
            .map(|v| format!("[ {} ]", v.escaped(&self.heap)))
            .join("");
        eprintln!("          {}", stack);

        let frame = self.frame();
        let mut stderr = io::stderr().lock();
        if let Err(err) = self
            .chunk()
            .disassemble_instruction(frame.ip, &self.heap, &mut stderr)
        {
            eprintln!("Could not trace instruction: {}", err);
        }
    }

    fn read_byte(&mut self) -> u8 {
        let frame = self.frame_mut();
        let byte = frame.function.chunk.code()[frame.ip];
        frame.ip += 1;
        byte
    }

    fn read_u16(&mut self) -> u16 {
        let frame = self.frame_mut();
        let value = frame.function.chunk.read_u16(frame.ip);
        frame.ip += 2;
        value
    }

    fn read_name(&mut self) -> StrId {
        let idx = self.read_byte();
        match self.chunk().read_const(idx) {
            Value::Object(Object::String(name)) => *name,
            _ => unreachable!("Constant for the variable name must have been added."),
        }
    }

    fn chunk(&self) -> &Chunk {
        &self.frame().function.chunk
    }

    fn frame(&self) -> &CallFrame {
        self.frames
            .last()
            .expect("There's always one callframe for the script.")
    }

    fn frame_mut(&mut self) -> &mut CallFrame {
        self.frames
            .last_mut()
            .expect("There's always one callframe for the script.")
    }

    fn peek(&self, steps: usize) -> &Value {
        self.stack
            .get(self.stack.len() - 1 - steps)
            .expect("Invalid bytecodes")
    }

    fn peek_mut(&mut self, steps: usize) -> &mut Value {
        let idx = self.stack.len() - 1 - steps;
        self.stack.get_mut(idx).expect("Invalid bytecodes")
    }

    fn push(&mut self, val: Value) -> Result<(), RuntimeError> {
        if self.stack.len() >= self.config.stack_size() {
            return Err(RuntimeError::StackOverflow);
        }
        self.stack.push(val);
        Ok(())
    }

    fn pop(&mut self) -> Value {
        self.stack.pop().expect("Invalid bytecodes")
    }
}

fn trim_line_end(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Parse a number typed at an `iwi -d` prompt. Only digits, `.` and `-` are accepted, any
/// other byte makes the whole input `0`. The longest prefix that forms a number is taken,
/// so `1.5.2` reads as `1.5`.
fn parse_number(line: &[u8]) -> f64 {
    if !line
        .iter()
        .all(|&b| b.is_ascii_digit() || b == b'.' || b == b'-')
    {
        return 0.0;
    }
    let text: String = line.iter().map(|&b| char::from(b)).collect();
    (1..=text.len())
        .rev()
        .find_map(|end| text[..end].parse().ok())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn vm(input: &str) -> VM<Cursor<Vec<u8>>, Vec<u8>> {
        VM::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    fn printed(vm: VM<Cursor<Vec<u8>>, Vec<u8>>) -> String {
        String::from_utf8(vm.into_output()).expect("utf-8 output")
    }

    #[test]
    fn globals_persist_between_runs() {
        let mut vm = vm("");
        vm.interpret("uwu x := 40").unwrap();
        vm.interpret("x := x + 2").unwrap();
        assert_eq!(vm.global("x"), Some(&Value::Number(42.0)));
        vm.interpret("ouo x >>").unwrap();
        assert_eq!(printed(vm), "42");
    }

    #[test]
    fn stack_is_reset_after_a_runtime_error() {
        let mut vm = vm("");
        let err = vm.interpret("ouo 1 + twue >>").unwrap_err();
        assert!(matches!(
            err,
            Error::Runtime {
                error: RuntimeError::InvalidAddOperands,
                ..
            }
        ));
        assert!(vm.stack.is_empty());
        assert!(vm.frames.is_empty());
        vm.interpret("ouo 1 >>").unwrap();
        assert_eq!(printed(vm), "1");
    }

    #[test]
    fn statements_leave_the_stack_balanced() {
        let mut vm = vm("7\n");
        vm.interpret(
            "uwu n iwi -d n << [: uwu a := n * 2 a := a + 1 ?w? a > 10 [: ouo a >> :] :]",
        )
        .unwrap();
        assert!(vm.stack.is_empty());
        assert_eq!(printed(vm), "15");
    }

    #[test]
    fn host_defined_natives() {
        fn twice(args: &[Value]) -> Value {
            match args {
                [Value::Number(n)] => Value::Number(n * 2.0),
                _ => Value::Null,
            }
        }
        let mut vm = vm("");
        vm.define_native("twice", 1, twice);
        vm.interpret("ouo twice(21), ~n, twice >>").unwrap();
        assert_eq!(printed(vm), "42\n<native fn>");
    }

    #[test]
    fn numbers_read_from_input() {
        assert_eq!(parse_number(b"42"), 42.0);
        assert_eq!(parse_number(b"-3.25"), -3.25);
        assert_eq!(parse_number(b".5"), 0.5);
        assert_eq!(parse_number(b"1.5.2"), 1.5);
        assert_eq!(parse_number(b"7-"), 7.0);
        assert_eq!(parse_number(b"-"), 0.0);
        assert_eq!(parse_number(b""), 0.0);
        assert_eq!(parse_number(b"inf"), 0.0);
        assert_eq!(parse_number(b"NaN"), 0.0);
        assert_eq!(parse_number(b"1e3"), 0.0);
        assert_eq!(parse_number(b"+5"), 0.0);
        assert_eq!(parse_number(b" 7"), 0.0);
        assert_eq!(parse_number(trim_line_end(b"12\r\n")), 12.0);
    }

    #[test]
    fn frame_limit_is_configurable() {
        let config = Config {
            max_frames: 4,
            ..Config::default()
        };
        let mut vm = VM::with_config(config, io::empty(), io::sink());
        vm.interpret("fwun f(n) [: ?w? n = 0 [: out 0 >> :] out f(n - 1) >> :] f(2)")
            .unwrap();
        let err = vm.interpret("f(3)").unwrap_err();
        assert!(matches!(
            err,
            Error::Runtime {
                error: RuntimeError::StackOverflow,
                ..
            }
        ));
    }
}

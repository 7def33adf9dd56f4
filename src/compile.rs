use std::{borrow::Cow, io};

use rustc_hash::FxHashMap;

use crate::{
    Chunk, CompileError, CompileErrorKind, Config, Function, Gc, Heap, Location, Object, OpCode,
    Scanner, StrId, Token, Type, Value, STACK_SLOTS_PER_FRAME,
};

/// Compile the given source code in to bytecodes that can be read by the virtual machine.
///
/// Parsing continues past the first error so that every error in the source gets reported.
/// The top-level code is returned as a function without a name.
pub fn compile(
    src: &str,
    heap: &mut Heap,
    config: &Config,
) -> Result<Gc<Function>, Vec<CompileError>> {
    let mut compiler = Compiler::new(src, heap, config.print_code);
    compiler.advance();
    while !compiler.matches(Type::Eof) {
        compiler.declaration();
    }
    let function = compiler.end_function();
    if compiler.errors.is_empty() {
        Ok(function)
    } else {
        Err(compiler.errors)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    None,
    Assignment,
    Or,
    And,
    Equality,
    Comparison,
    Term,
    Factor,
    Unary,
    Call,
    Primary,
}

impl Precedence {
    fn next(self) -> Self {
        match self {
            Self::None => Self::Assignment,
            Self::Assignment => Self::Or,
            Self::Or => Self::And,
            Self::And => Self::Equality,
            Self::Equality => Self::Comparison,
            Self::Comparison => Self::Term,
            Self::Term => Self::Factor,
            Self::Factor => Self::Unary,
            Self::Unary => Self::Call,
            Self::Call | Self::Primary => Self::Primary,
        }
    }
}

type ParseFn<'src, 'h> = fn(&mut Compiler<'src, 'h>, bool);

struct ParseRule<'src, 'h> {
    prefix: Option<ParseFn<'src, 'h>>,
    infix: Option<ParseFn<'src, 'h>>,
    precedence: Precedence,
}

impl<'src, 'h> ParseRule<'src, 'h> {
    fn new(
        prefix: Option<ParseFn<'src, 'h>>,
        infix: Option<ParseFn<'src, 'h>>,
        precedence: Precedence,
    ) -> Self {
        Self {
            prefix,
            infix,
            precedence,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FunctionKind {
    Script,
    Function,
}

/// A local variable known at compile time. Its index in the locals list is its slot in the
/// frame at runtime.
#[derive(Debug)]
struct Local<'src> {
    name: &'src str,
    /// `None` while the variable's initializer is being compiled
    depth: Option<usize>,
}

/// Everything tracked while compiling one function body.
#[derive(Debug)]
struct FunctionContext<'src> {
    function: Function,
    kind: FunctionKind,
    locals: Vec<Local<'src>>,
    scope_depth: usize,
    /// Constant index of every identifier name used by this function
    names: FxHashMap<StrId, u8>,
}

impl<'src> FunctionContext<'src> {
    fn new(kind: FunctionKind, name: Option<StrId>) -> Self {
        let mut locals = Vec::with_capacity(STACK_SLOTS_PER_FRAME);
        // Slot 0 holds the callee and can not be named.
        locals.push(Local {
            name: "",
            depth: Some(0),
        });
        Self {
            function: Function::new(name),
            kind,
            locals,
            scope_depth: 0,
            names: FxHashMap::default(),
        }
    }
}

/// A single-pass compiler that parses tokens with precedence climbing and emits bytecodes
/// directly into the chunk of the function being compiled.
struct Compiler<'src, 'h> {
    scanner: Scanner<'src>,
    heap: &'h mut Heap,
    current: Token<'src>,
    previous: Token<'src>,
    panic_mode: bool,
    errors: Vec<CompileError>,
    contexts: Vec<FunctionContext<'src>>,
    print_code: bool,
}

impl<'src, 'h> Compiler<'src, 'h> {
    fn new(src: &'src str, heap: &'h mut Heap, print_code: bool) -> Self {
        Self {
            scanner: Scanner::new(src),
            heap,
            current: Token::placeholder(),
            previous: Token::placeholder(),
            panic_mode: false,
            errors: Vec::new(),
            contexts: vec![FunctionContext::new(FunctionKind::Script, None)],
            print_code,
        }
    }

    fn rule(typ: Type) -> ParseRule<'src, 'h> {
        match typ {
            Type::LParen => {
                ParseRule::new(Some(Self::grouping), Some(Self::call), Precedence::Call)
            }
            Type::Minus => ParseRule::new(Some(Self::unary), Some(Self::binary), Precedence::Term),
            Type::Plus => ParseRule::new(None, Some(Self::binary), Precedence::Term),
            Type::Slash | Type::Star => {
                ParseRule::new(None, Some(Self::binary), Precedence::Factor)
            }
            Type::Bang => ParseRule::new(Some(Self::unary), None, Precedence::None),
            Type::Equal | Type::BangEqual => {
                ParseRule::new(None, Some(Self::binary), Precedence::Equality)
            }
            Type::Greater | Type::GreaterEqual | Type::Less | Type::LessEqual => {
                ParseRule::new(None, Some(Self::binary), Precedence::Comparison)
            }
            Type::Ident => ParseRule::new(Some(Self::variable), None, Precedence::None),
            Type::String => ParseRule::new(Some(Self::string), None, Precedence::None),
            Type::Number => ParseRule::new(Some(Self::number), None, Precedence::None),
            Type::Char => ParseRule::new(Some(Self::character), None, Precedence::None),
            Type::NewLine | Type::Tab => {
                ParseRule::new(Some(Self::escape), None, Precedence::None)
            }
            Type::True | Type::False => {
                ParseRule::new(Some(Self::literal), None, Precedence::None)
            }
            Type::And => ParseRule::new(None, Some(Self::and), Precedence::And),
            Type::Or => ParseRule::new(None, Some(Self::or), Precedence::Or),
            _ => ParseRule::new(None, None, Precedence::None),
        }
    }

    fn declaration(&mut self) {
        if self.matches(Type::Fun) {
            self.fun_declaration();
        } else if self.matches(Type::Var) {
            self.var_declaration();
        } else {
            self.statement();
        }
        if self.panic_mode {
            self.synchronize();
        }
    }

    fn fun_declaration(&mut self) {
        let global = self.parse_variable("Expect function name.");
        self.mark_initialized();
        self.function(FunctionKind::Function);
        self.define_variable(global);
    }

    fn var_declaration(&mut self) {
        let global = self.parse_variable("Expect variable name.");
        if self.matches(Type::Assign) {
            self.expression();
        } else {
            self.emit(OpCode::Null);
        }
        self.define_variable(global);
    }

    fn statement(&mut self) {
        if self.matches(Type::Print) {
            self.print_statement();
        } else if self.matches(Type::Read) {
            self.read_statement();
        } else if self.matches(Type::If) {
            self.if_statement();
        } else if self.matches(Type::Loop) {
            self.loop_statement();
        } else if self.matches(Type::Out) {
            self.out_statement();
        } else if self.matches(Type::LSqb) || self.matches(Type::BlockStart) {
            self.scoped_block();
        } else {
            self.expression_statement();
        }
    }

    fn print_statement(&mut self) {
        loop {
            self.expression();
            self.emit(OpCode::Print);
            if !self.matches(Type::Comma) {
                break;
            }
        }
        self.consume(Type::OutEnd, "Expect '>>' after value.");
    }

    fn read_statement(&mut self) {
        let op = match self.current.typ {
            Type::ReadString => Some(OpCode::ReadString),
            Type::ReadNumber => Some(OpCode::ReadNumber),
            Type::ReadChar => Some(OpCode::ReadChar),
            _ => {
                self.error_at_current(CompileErrorKind::UnexpectedToken(
                    "Expect input type after read statement.",
                ));
                None
            }
        };
        self.advance();
        if let Some(op) = op {
            self.emit(op);
        }

        self.consume(Type::Ident, "Expect variable name after input type.");
        let (_, set, arg) = self.resolve_variable(self.previous.lexeme);
        self.emit_with(set, arg);
        self.emit(OpCode::Pop);
        self.consume(Type::ReadEnd, "Expect '<<' after variable name.");
    }

    fn if_statement(&mut self) {
        self.expression();
        let then_jump = self.emit_jump(OpCode::JumpIfFalse);
        self.emit(OpCode::Pop);

        self.consume(Type::BlockStart, "Expect '[:' after condition.");
        self.scoped_block();

        let else_jump = self.emit_jump(OpCode::Jump);
        self.patch_jump(then_jump);
        self.emit(OpCode::Pop);

        if self.matches(Type::Else) {
            self.consume(Type::BlockStart, "Expect '[:' after 'ewe'.");
            self.scoped_block();
        }
        self.patch_jump(else_jump);
    }

    /// The body runs until the condition becomes truthy.
    fn loop_statement(&mut self) {
        let loop_start = self.chunk().len();
        self.expression();

        let exit_jump = self.emit_jump(OpCode::JumpIfTrue);
        self.emit(OpCode::Pop);

        self.consume(Type::BlockStart, "Expect '[:' after condition.");
        self.scoped_block();
        self.emit_loop(loop_start);

        self.patch_jump(exit_jump);
        self.emit(OpCode::Pop);
    }

    fn out_statement(&mut self) {
        if self.context().kind == FunctionKind::Script {
            self.error(CompileErrorKind::OutOutsideFunction);
        }
        if self.matches(Type::OutEnd) {
            self.emit_return();
        } else {
            self.expression();
            self.consume(Type::OutEnd, "Expect '>>' after return value.");
            self.emit(OpCode::Out);
        }
    }

    fn expression_statement(&mut self) {
        self.expression();
        self.emit(OpCode::Pop);
    }

    fn scoped_block(&mut self) {
        self.begin_scope();
        self.block();
        self.end_scope();
    }

    fn block(&mut self) {
        while !self.check(Type::BlockEnd) && !self.check(Type::Eof) {
            self.declaration();
        }
        self.consume(Type::BlockEnd, "Expect ':]' after block.");
    }

    fn function(&mut self, kind: FunctionKind) {
        let name = self.heap.intern(self.previous.lexeme);
        self.contexts.push(FunctionContext::new(kind, Some(name)));
        self.begin_scope();

        self.consume(Type::LParen, "Expect '(' after function name.");
        let mut arity = 0usize;
        if !self.check(Type::RParen) {
            loop {
                arity += 1;
                if arity > u8::MAX as usize {
                    self.error_at_current(CompileErrorKind::TooManyParameters);
                }
                let param = self.parse_variable("Expect parameter name.");
                self.define_variable(param);
                if !self.matches(Type::Comma) {
                    break;
                }
            }
        }
        self.context_mut().function.arity = u8::try_from(arity).unwrap_or(u8::MAX);
        self.consume(Type::RParen, "Expect ')' after parameters.");
        self.consume(Type::BlockStart, "Expect '[:' before function body.");
        self.block();

        // The scope opened above is dropped along with the context, its locals live in the
        // callee's frame which the return instruction discards.
        let function = self.end_function();
        let constant = self.make_constant(Value::Object(Object::Function(function)));
        self.emit_with(OpCode::Constant, constant);
    }

    fn expression(&mut self) {
        self.parse_precedence(Precedence::Assignment);
    }

    fn parse_precedence(&mut self, precedence: Precedence) {
        self.advance();
        let prefix = match Self::rule(self.previous.typ).prefix {
            Some(prefix) => prefix,
            None => {
                self.error(CompileErrorKind::ExpectedExpression);
                return;
            }
        };

        let can_assign = precedence <= Precedence::Assignment;
        prefix(self, can_assign);

        while precedence <= Self::rule(self.current.typ).precedence {
            self.advance();
            if let Some(infix) = Self::rule(self.previous.typ).infix {
                infix(self, can_assign);
            }
        }

        if can_assign && self.matches(Type::Assign) {
            self.error(CompileErrorKind::InvalidAssignTarget);
        }
    }

    fn grouping(&mut self, _can_assign: bool) {
        self.expression();
        self.consume(Type::RParen, "Expect ')' after expression.");
    }

    fn call(&mut self, _can_assign: bool) {
        let argc = self.argument_list();
        self.emit_with(OpCode::Call, argc);
    }

    fn argument_list(&mut self) -> u8 {
        let mut argc = 0usize;
        if !self.check(Type::RParen) {
            loop {
                self.expression();
                if argc == u8::MAX as usize {
                    self.error(CompileErrorKind::TooManyArguments);
                }
                argc += 1;
                if !self.matches(Type::Comma) {
                    break;
                }
            }
        }
        self.consume(Type::RParen, "Expect ')' after arguments.");
        u8::try_from(argc).unwrap_or(u8::MAX)
    }

    fn unary(&mut self, _can_assign: bool) {
        let operator = self.previous.typ;
        self.parse_precedence(Precedence::Unary);
        match operator {
            Type::Minus => self.emit(OpCode::Negate),
            Type::Bang => self.emit(OpCode::Not),
            _ => unreachable!("Unary rule is only registered for '-' and '!'."),
        }
    }

    fn binary(&mut self, _can_assign: bool) {
        let operator = self.previous.typ;
        let rule = Self::rule(operator);
        self.parse_precedence(rule.precedence.next());
        let op = match operator {
            Type::Plus => OpCode::Add,
            Type::Minus => OpCode::Subtract,
            Type::Star => OpCode::Multiply,
            Type::Slash => OpCode::Divide,
            Type::Equal => OpCode::Equal,
            Type::BangEqual => OpCode::NotEqual,
            Type::Greater => OpCode::Greater,
            Type::GreaterEqual => OpCode::GreaterEqual,
            Type::Less => OpCode::Less,
            Type::LessEqual => OpCode::LessEqual,
            _ => unreachable!("Binary rule is only registered for binary operators."),
        };
        self.emit(op);
    }

    fn and(&mut self, _can_assign: bool) {
        let end_jump = self.emit_jump(OpCode::JumpIfFalse);
        self.emit(OpCode::Pop);
        self.parse_precedence(Precedence::And);
        self.patch_jump(end_jump);
    }

    fn or(&mut self, _can_assign: bool) {
        let end_jump = self.emit_jump(OpCode::JumpIfTrue);
        self.emit(OpCode::Pop);
        self.parse_precedence(Precedence::Or);
        self.patch_jump(end_jump);
    }

    fn number(&mut self, _can_assign: bool) {
        match self.previous.lexeme.parse::<f64>() {
            Ok(n) => self.emit_constant(Value::Number(n)),
            Err(_) => self.error(CompileErrorKind::InvalidNumber),
        }
    }

    fn string(&mut self, _can_assign: bool) {
        let lexeme = self.previous.lexeme;
        let content = unescape(&lexeme[1..lexeme.len() - 1]);
        let id = self.heap.intern(content);
        self.emit_constant(Value::Object(Object::String(id)));
    }

    fn character(&mut self, _can_assign: bool) {
        let c = self.previous.lexeme.as_bytes()[1];
        self.emit_constant(Value::Char(c));
    }

    fn escape(&mut self, _can_assign: bool) {
        let c = match self.previous.typ {
            Type::NewLine => b'\n',
            _ => b'\t',
        };
        self.emit_constant(Value::Char(c));
    }

    fn literal(&mut self, _can_assign: bool) {
        match self.previous.typ {
            Type::True => self.emit(OpCode::True),
            Type::False => self.emit(OpCode::False),
            _ => unreachable!("Literal rule is only registered for booleans."),
        }
    }

    fn variable(&mut self, can_assign: bool) {
        let name = self.previous.lexeme;
        let (get, set, arg) = self.resolve_variable(name);
        if can_assign && self.matches(Type::Assign) {
            self.expression();
            self.emit_with(set, arg);
        } else {
            self.emit_with(get, arg);
        }
    }

    /// Find the get and set instructions for a name along with their operand, preferring the
    /// innermost local that has the name.
    fn resolve_variable(&mut self, name: &'src str) -> (OpCode, OpCode, u8) {
        match self.resolve_local(name) {
            Some(slot) => (OpCode::GetLocal, OpCode::SetLocal, slot),
            None => (
                OpCode::GetGlobal,
                OpCode::SetGlobal,
                self.identifier_constant(name),
            ),
        }
    }

    fn resolve_local(&mut self, name: &str) -> Option<u8> {
        let (slot, initialized) = self
            .context()
            .locals
            .iter()
            .enumerate()
            .rev()
            .find(|(_, local)| local.name == name)
            .map(|(slot, local)| (slot, local.depth.is_some()))?;
        if !initialized {
            self.error(CompileErrorKind::SelfReferencingInitializer);
        }
        u8::try_from(slot).ok()
    }

    fn parse_variable(&mut self, message: &'static str) -> u8 {
        self.consume(Type::Ident, message);
        self.declare_variable();
        if self.context().scope_depth > 0 {
            return 0;
        }
        self.identifier_constant(self.previous.lexeme)
    }

    fn declare_variable(&mut self) {
        let ctx = self.context();
        if ctx.scope_depth == 0 {
            return;
        }

        let name = self.previous.lexeme;
        let redeclared = ctx
            .locals
            .iter()
            .rev()
            .take_while(|local| local.depth.map_or(true, |d| d >= ctx.scope_depth))
            .any(|local| local.name == name);
        if redeclared {
            self.error(CompileErrorKind::VariableRedeclaration);
        }
        self.add_local(name);
    }

    fn add_local(&mut self, name: &'src str) {
        if self.context().locals.len() == STACK_SLOTS_PER_FRAME {
            self.error(CompileErrorKind::TooManyLocals);
            return;
        }
        self.context_mut().locals.push(Local { name, depth: None });
    }

    fn mark_initialized(&mut self) {
        let ctx = self.context_mut();
        if ctx.scope_depth == 0 {
            return;
        }
        let depth = ctx.scope_depth;
        if let Some(local) = ctx.locals.last_mut() {
            local.depth = Some(depth);
        }
    }

    fn define_variable(&mut self, global: u8) {
        if self.context().scope_depth > 0 {
            self.mark_initialized();
            return;
        }
        self.emit_with(OpCode::DefineGlobal, global);
    }

    fn identifier_constant(&mut self, name: &str) -> u8 {
        let id = self.heap.intern(name);
        if let Some(&idx) = self.context().names.get(&id) {
            return idx;
        }
        match self
            .chunk_mut()
            .add_const(Value::Object(Object::String(id)))
        {
            Some(idx) => {
                self.context_mut().names.insert(id, idx);
                idx
            }
            None => {
                self.error(CompileErrorKind::TooManyConstants);
                0
            }
        }
    }

    fn begin_scope(&mut self) {
        self.context_mut().scope_depth += 1;
    }

    fn end_scope(&mut self) {
        self.context_mut().scope_depth -= 1;
        loop {
            let ctx = self.context_mut();
            match ctx.locals.last() {
                Some(Local {
                    depth: Some(depth), ..
                }) if *depth > ctx.scope_depth => {
                    ctx.locals.pop();
                    self.emit(OpCode::Pop);
                }
                _ => break,
            }
        }
    }

    fn end_function(&mut self) -> Gc<Function> {
        self.emit_return();
        let context = self
            .contexts
            .pop()
            .expect("Compiler must have a context for the function being compiled.");
        let function = context.function;

        if self.print_code && self.errors.is_empty() {
            let name = function.name.map_or("<script>", |id| self.heap.str(id));
            if let Err(err) = function.chunk.disassemble(name, self.heap, io::stderr().lock()) {
                eprintln!("Could not disassemble '{}': {}", name, err);
            }
        }
        self.heap.alloc_function(function)
    }

    fn make_constant(&mut self, value: Value) -> u8 {
        match self.chunk_mut().add_const(value) {
            Some(idx) => idx,
            None => {
                self.error(CompileErrorKind::TooManyConstants);
                0
            }
        }
    }

    fn emit_constant(&mut self, value: Value) {
        let idx = self.make_constant(value);
        self.emit_with(OpCode::Constant, idx);
    }

    fn emit_return(&mut self) {
        self.emit(OpCode::Null);
        self.emit(OpCode::Out);
    }

    fn emit_jump(&mut self, op: OpCode) -> usize {
        self.emit(op);
        self.emit_byte(0xff);
        self.emit_byte(0xff);
        self.chunk().len() - 2
    }

    fn patch_jump(&mut self, offset: usize) {
        let jump = self.chunk().len() - offset - 2;
        match u16::try_from(jump) {
            Ok(jump) => self.chunk_mut().patch_u16(offset, jump),
            Err(_) => self.error(CompileErrorKind::JumpTooLarge),
        }
    }

    fn emit_loop(&mut self, loop_start: usize) {
        self.emit(OpCode::Loop);
        let offset = self.chunk().len() - loop_start + 2;
        let offset = match u16::try_from(offset) {
            Ok(offset) => offset,
            Err(_) => {
                self.error(CompileErrorKind::LoopTooLarge);
                u16::MAX
            }
        };
        let [hi, lo] = offset.to_be_bytes();
        self.emit_byte(hi);
        self.emit_byte(lo);
    }

    fn emit(&mut self, op: OpCode) {
        self.emit_byte(op.into());
    }

    fn emit_with(&mut self, op: OpCode, operand: u8) {
        self.emit(op);
        self.emit_byte(operand);
    }

    fn emit_byte(&mut self, byte: u8) {
        let line = self.previous.line;
        self.chunk_mut().write(byte, line);
    }

    fn context(&self) -> &FunctionContext<'src> {
        self.contexts
            .last()
            .expect("Compiler must have a context for the function being compiled.")
    }

    fn context_mut(&mut self) -> &mut FunctionContext<'src> {
        self.contexts
            .last_mut()
            .expect("Compiler must have a context for the function being compiled.")
    }

    fn chunk(&self) -> &Chunk {
        &self.context().function.chunk
    }

    fn chunk_mut(&mut self) -> &mut Chunk {
        &mut self.context_mut().function.chunk
    }

    /// Skip tokens until something that can start a statement, or the end of the enclosing
    /// block, so that one mistake is reported once.
    fn synchronize(&mut self) {
        self.panic_mode = false;
        while self.current.typ != Type::Eof {
            if matches!(
                self.current.typ,
                Type::Var
                    | Type::Fun
                    | Type::If
                    | Type::Loop
                    | Type::Print
                    | Type::Read
                    | Type::Out
                    | Type::BlockEnd
            ) {
                return;
            }
            self.advance();
        }
    }

    fn advance(&mut self) {
        self.previous = self.current;
        loop {
            match self.scanner.scan() {
                Ok(token) => {
                    self.current = token;
                    break;
                }
                Err(err) => {
                    let line = self.scanner.line();
                    self.report(line, Location::Unknown, err.into());
                }
            }
        }
    }

    fn consume(&mut self, typ: Type, message: &'static str) {
        if self.current.typ == typ {
            self.advance();
            return;
        }
        self.error_at_current(CompileErrorKind::UnexpectedToken(message));
    }

    fn check(&self, typ: Type) -> bool {
        self.current.typ == typ
    }

    fn matches(&mut self, typ: Type) -> bool {
        if !self.check(typ) {
            return false;
        }
        self.advance();
        true
    }

    fn error(&mut self, kind: CompileErrorKind) {
        self.error_at(self.previous, kind);
    }

    fn error_at_current(&mut self, kind: CompileErrorKind) {
        self.error_at(self.current, kind);
    }

    fn error_at(&mut self, token: Token<'src>, kind: CompileErrorKind) {
        let location = match token.typ {
            Type::Eof => Location::End,
            _ => Location::Lexeme(token.lexeme.to_string()),
        };
        self.report(token.line, location, kind);
    }

    /// Record an error unless one was already reported for the current statement.
    fn report(&mut self, line: usize, location: Location, kind: CompileErrorKind) {
        if self.panic_mode {
            return;
        }
        self.panic_mode = true;
        self.errors.push(CompileError {
            line,
            location,
            kind,
        });
    }
}

/// Resolve the escapes in a string literal's content. Only a quote or a backslash can be
/// escaped, any other backslash is kept as is.
fn unescape(raw: &str) -> Cow<'_, str> {
    if !raw.contains('\\') {
        return Cow::Borrowed(raw);
    }
    let mut s = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        match (c, chars.peek()) {
            ('\\', Some(&escaped @ ('"' | '\\'))) => {
                s.push(escaped);
                chars.next();
            }
            _ => s.push(c),
        }
    }
    Cow::Owned(s)
}

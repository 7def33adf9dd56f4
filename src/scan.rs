use crate::{
    token::{Token, Type},
    ScanError,
};

/// Scanner reads characters from the source code and groups them in to
/// a sequence of tokens, one at a time.
///
/// All tokens are ASCII, so the scanner works on raw bytes and only ever slices the source
/// at ASCII boundaries.
#[derive(Debug)]
pub struct Scanner<'src> {
    src: &'src str,
    start: usize,
    current: usize,
    line: usize,
}

impl<'src> Scanner<'src> {
    /// Create a new scanner
    pub fn new(src: &'src str) -> Self {
        Self {
            src,
            start: 0,
            current: 0,
            line: 1,
        }
    }

    /// The line the scanner is currently on.
    pub fn line(&self) -> usize {
        self.line
    }

    /// Consume and return the next token from source. Once the source is exhausted, every
    /// call returns an [`Type::Eof`] token.
    pub fn scan(&mut self) -> Result<Token<'src>, ScanError> {
        self.skip_whitespace();
        self.start = self.current;
        if self.is_source_end() {
            return Ok(self.token(Type::Eof));
        }
        Ok(match self.advance() {
            b'+' => self.token(Type::Plus),
            b'*' => self.token(Type::Star),
            b'/' => self.token(Type::Slash),
            b'=' => self.token(Type::Equal),
            b'(' => self.token(Type::LParen),
            b')' => self.token(Type::RParen),
            b',' => self.token(Type::Comma),
            b']' => self.token(Type::RSqb),
            b'-' => {
                if self.consume(b's') {
                    self.token(Type::ReadString)
                } else if self.consume(b'd') {
                    self.token(Type::ReadNumber)
                } else if self.consume(b'c') {
                    self.token(Type::ReadChar)
                } else {
                    self.token(Type::Minus)
                }
            }
            b'~' => {
                if self.consume(b'n') {
                    self.token(Type::NewLine)
                } else if self.consume(b't') {
                    self.token(Type::Tab)
                } else {
                    return Err(ScanError::UnexpectedCharacter('~'));
                }
            }
            b'!' => {
                if self.consume(b'=') {
                    self.token(Type::BangEqual)
                } else {
                    self.token(Type::Bang)
                }
            }
            b'<' => {
                if self.consume(b'=') {
                    self.token(Type::LessEqual)
                } else if self.consume(b'<') {
                    self.token(Type::ReadEnd)
                } else {
                    self.token(Type::Less)
                }
            }
            b'>' => {
                if self.consume(b'=') {
                    self.token(Type::GreaterEqual)
                } else if self.consume(b'>') {
                    self.token(Type::OutEnd)
                } else {
                    self.token(Type::Greater)
                }
            }
            b'[' => {
                if self.consume(b':') {
                    self.token(Type::BlockStart)
                } else {
                    self.token(Type::LSqb)
                }
            }
            b':' => {
                if self.consume(b'=') {
                    self.token(Type::Assign)
                } else if self.consume(b']') {
                    self.token(Type::BlockEnd)
                } else {
                    return Err(ScanError::UnexpectedCharacter(':'));
                }
            }
            b'"' => self.string()?,
            b'`' => self.character()?,
            c if c.is_ascii_digit() => self.number(),
            c if is_ident_start(c) => self.identifier()?,
            _ => {
                // Skip the rest of a multi-byte character so we report it once.
                while !self.is_source_end() && !self.src.is_char_boundary(self.current) {
                    self.current += 1;
                }
                let c = self.src[self.start..self.current]
                    .chars()
                    .next()
                    .unwrap_or(char::REPLACEMENT_CHARACTER);
                return Err(ScanError::UnexpectedCharacter(c));
            }
        })
    }

    fn identifier(&mut self) -> Result<Token<'src>, ScanError> {
        while is_ident_continue(self.peek()) {
            self.advance();
        }
        match self.identifier_type() {
            Some(typ) => Ok(self.token(typ)),
            None => Err(ScanError::InvalidIdentifier),
        }
    }

    /// Determine if an identifer is a keyword by examining its prefix tree. Returns `None`
    /// for a run that can be neither a keyword nor an identifier.
    fn identifier_type(&self) -> Option<Type> {
        let lexeme = &self.src.as_bytes()[self.start..self.current];
        let typ = match lexeme[0] {
            b'a' => self.check_keyword(1, "wnd", Type::And),
            b'i' => self.check_keyword(1, "wi", Type::Read),
            b'e' => self.check_keyword(1, "we", Type::Else),
            b't' => self.check_keyword(1, "wue", Type::True),
            b'f' if lexeme.len() > 1 => match lexeme[1] {
                b'a' => self.check_keyword(2, "wse", Type::False),
                b'w' => self.check_keyword(2, "un", Type::Fun),
                _ => Type::Ident,
            },
            b'u' if lexeme.len() > 1 => match lexeme[1] {
                b'w' => self.check_keyword(2, "u", Type::Var),
                b'n' => self.check_keyword(2, "tiw", Type::Loop),
                _ => Type::Ident,
            },
            b'o' if lexeme.len() > 1 => match lexeme[1] {
                b'w' => self.check_keyword(2, "", Type::Or),
                b'u' if lexeme.len() > 2 => match lexeme[2] {
                    b'o' => self.check_keyword(3, "", Type::Print),
                    b't' => self.check_keyword(3, "", Type::Out),
                    _ => Type::Ident,
                },
                _ => Type::Ident,
            },
            b'?' => match self.check_keyword(1, "w?", Type::If) {
                Type::If => Type::If,
                _ => return None,
            },
            _ => Type::Ident,
        };
        Some(typ)
    }

    fn check_keyword(&self, start: usize, rest: &str, typ: Type) -> Type {
        if self.current - self.start == start + rest.len()
            && &self.src[self.start + start..self.current] == rest
        {
            return typ;
        }
        Type::Ident
    }

    fn number(&mut self) -> Token<'src> {
        while self.peek().is_ascii_digit() {
            self.advance();
        }
        if self.peek() == b'.' && self.peek_next().is_ascii_digit() {
            self.advance();
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }
        self.token(Type::Number)
    }

    fn string(&mut self) -> Result<Token<'src>, ScanError> {
        while self.peek() != b'"' && !self.is_source_end() {
            if self.peek() == b'\\' {
                self.advance();
                if self.is_source_end() {
                    break;
                }
            }
            self.advance();
        }

        if self.is_source_end() {
            return Err(ScanError::UnterminatedString);
        }
        self.advance();
        Ok(self.token(Type::String))
    }

    fn character(&mut self) -> Result<Token<'src>, ScanError> {
        if self.is_source_end() {
            return Err(ScanError::UnterminatedChar);
        }
        if self.peek() == b'`' {
            self.advance();
            return Err(ScanError::EmptyChar);
        }
        while self.peek() != b'`' && !self.is_source_end() {
            self.advance();
        }
        if self.is_source_end() {
            return Err(ScanError::UnterminatedChar);
        }
        self.advance();
        if self.current - self.start != 3 {
            return Err(ScanError::InvalidChar);
        }
        Ok(self.token(Type::Char))
    }

    fn token(&self, typ: Type) -> Token<'src> {
        Token {
            typ,
            lexeme: &self.src[self.start..self.current],
            line: self.line,
        }
    }

    fn skip_whitespace(&mut self) {
        loop {
            match self.peek() {
                b' ' | b'\r' | b'\t' | b'\n' if !self.is_source_end() => {
                    self.advance();
                }
                b'{' if self.peek_next() == b':' => {
                    self.advance();
                    self.advance();
                    while !self.is_source_end()
                        && !(self.peek() == b':' && self.peek_next() == b'}')
                    {
                        self.advance();
                    }
                    if !self.is_source_end() {
                        self.advance();
                        self.advance();
                    }
                }
                _ => return,
            }
        }
    }

    fn peek(&self) -> u8 {
        if self.is_source_end() {
            b'\0'
        } else {
            self.src.as_bytes()[self.current]
        }
    }

    fn peek_next(&self) -> u8 {
        if self.current + 1 >= self.src.len() {
            b'\0'
        } else {
            self.src.as_bytes()[self.current + 1]
        }
    }

    fn advance(&mut self) -> u8 {
        let c = self.src.as_bytes()[self.current];
        if c == b'\n' {
            self.line += 1;
        }
        self.current += 1;
        c
    }

    fn consume(&mut self, expected: u8) -> bool {
        if self.is_source_end() {
            return false;
        }
        if self.src.as_bytes()[self.current] != expected {
            return false;
        }
        self.current += 1;
        true
    }

    fn is_source_end(&self) -> bool {
        self.current >= self.src.len()
    }
}

fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || matches!(c, b'.' | b'^' | b'?')
}

fn is_ident_continue(c: u8) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, b'.' | b'^' | b'?')
}

/// uwu token. The lexeme borrows from the source buffer, nothing gets copied until the
/// compiler decides a literal has to live on the heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'src> {
    /// uwu token type
    pub typ: Type,
    /// The string segment in source that represents this token.
    pub lexeme: &'src str,
    /// The line on which this token ends.
    pub line: usize,
}

impl<'src> Token<'src> {
    /// A token that stands in before the scanner has produced anything.
    pub fn placeholder() -> Self {
        Self {
            typ: Type::Eof,
            lexeme: "",
            line: 0,
        }
    }
}

/// uwu token types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    /// Single character '+'
    Plus,
    /// Single character '-'
    Minus,
    /// Single character '*'
    Star,
    /// Single character '/'
    Slash,
    /// Single character '!'
    Bang,
    /// Single character '('
    LParen,
    /// Single character ')'
    RParen,
    /// Single character ','
    Comma,
    /// Single character '['
    LSqb,
    /// Single character ']'
    RSqb,
    /// Double character '~n', a newline character literal
    NewLine,
    /// Double character '~t', a tab character literal
    Tab,
    /// Double character ':='
    Assign,
    /// Single character '='
    Equal,
    /// Double character '!='
    BangEqual,
    /// Single character '>'
    Greater,
    /// Double character '>='
    GreaterEqual,
    /// Single character '<'
    Less,
    /// Double character '<='
    LessEqual,
    /// Double character '[:'
    BlockStart,
    /// Double character ':]'
    BlockEnd,
    /// Double character '<<', closes a read statement
    ReadEnd,
    /// Double character '>>', closes a print or out statement
    OutEnd,
    /// Double character '-s'
    ReadString,
    /// Double character '-d'
    ReadNumber,
    /// Double character '-c'
    ReadChar,
    /// Named entity
    Ident,
    /// String literal
    String,
    /// Number literal
    Number,
    /// Character literal
    Char,
    /// Keyword 'awnd'
    And,
    /// Keyword 'ow'
    Or,
    /// Keyword 'uwu'
    Var,
    /// Keyword 'fwun'
    Fun,
    /// Keyword 'ouo'
    Print,
    /// Keyword 'iwi'
    Read,
    /// Keyword '?w?'
    If,
    /// Keyword 'ewe'
    Else,
    /// Keyword 'untiw'
    Loop,
    /// Boolean literal 'twue'
    True,
    /// Boolean literal 'fawse'
    False,
    /// Keyword 'out'
    Out,
    /// End of file
    Eof,
}

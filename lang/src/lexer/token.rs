#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: u32,
    pub column: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    Nil,
    True,
    False,
    Integer(i64),
    Float(f64),
    String(String),
    Char(char),
    Regex(String),

    // Names
    Symbol(String),
    Keyword(String),

    // Reader macros
    Quote,         // '
    SyntaxQuote,   // `
    Unquote,       // ~
    UnquoteSplice, // ~@
    Deref,         // @
    VarQuote,      // #'

    // Delimiters
    LeftParen,    // (
    RightParen,   // )
    LeftBracket,  // [
    RightBracket, // ]
    LeftBrace,    // {
    RightBrace,   // }

    // End of file
    Eof,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::Nil => write!(f, "nil"),
            TokenKind::True => write!(f, "true"),
            TokenKind::False => write!(f, "false"),
            TokenKind::Integer(n) => write!(f, "{n}"),
            TokenKind::Float(n) => write!(f, "{n}"),
            TokenKind::String(s) => write!(f, "\"{s}\""),
            TokenKind::Char(c) => write!(f, "\\{c}"),
            TokenKind::Regex(s) => write!(f, "#\"{s}\""),
            TokenKind::Symbol(s) => write!(f, "{s}"),
            TokenKind::Keyword(s) => write!(f, ":{s}"),
            TokenKind::Quote => write!(f, "'"),
            TokenKind::SyntaxQuote => write!(f, "`"),
            TokenKind::Unquote => write!(f, "~"),
            TokenKind::UnquoteSplice => write!(f, "~@"),
            TokenKind::Deref => write!(f, "@"),
            TokenKind::VarQuote => write!(f, "#'"),
            TokenKind::LeftParen => write!(f, "("),
            TokenKind::RightParen => write!(f, ")"),
            TokenKind::LeftBracket => write!(f, "["),
            TokenKind::RightBracket => write!(f, "]"),
            TokenKind::LeftBrace => write!(f, "{{"),
            TokenKind::RightBrace => write!(f, "}}"),
            TokenKind::Eof => write!(f, "EOF"),
        }
    }
}

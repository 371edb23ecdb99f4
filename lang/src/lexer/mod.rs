mod token;


pub use token::{Span, Token, TokenKind};

use std::str::Chars;

use crate::interpreter::describe::{NAMED_CHARS, STRING_ESCAPES};

pub struct Lexer<'a> {
    source: &'a str,
    chars: Chars<'a>,
    position: usize,
    line: u32,
    column: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    pub message: String,
    pub line: u32,
    pub column: u32,
    /// The input ended inside a literal; more text could complete it.
    pub incomplete: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.chars(),
            position: 0,
            line: 1,
            column: 1,
        }
    }

    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();

        loop {
            let token = self.next_token()?;
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }

        Ok(tokens)
    }

    fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_whitespace_and_comments();

        let start_position = self.position;
        let start_line = self.line;
        let start_column = self.column;

        let kind = match self.peek() {
            None => TokenKind::Eof,
            Some(c) => match c {
                '(' => {
                    self.advance();
                    TokenKind::LeftParen
                }
                ')' => {
                    self.advance();
                    TokenKind::RightParen
                }
                '[' => {
                    self.advance();
                    TokenKind::LeftBracket
                }
                ']' => {
                    self.advance();
                    TokenKind::RightBracket
                }
                '{' => {
                    self.advance();
                    TokenKind::LeftBrace
                }
                '}' => {
                    self.advance();
                    TokenKind::RightBrace
                }
                '\'' => {
                    self.advance();
                    TokenKind::Quote
                }
                '`' => {
                    self.advance();
                    TokenKind::SyntaxQuote
                }
                '~' if self.peek_next() == Some('@') => {
                    self.advance();
                    self.advance();
                    TokenKind::UnquoteSplice
                }
                '~' => {
                    self.advance();
                    TokenKind::Unquote
                }
                '@' => {
                    self.advance();
                    TokenKind::Deref
                }
                '#' if self.peek_next() == Some('\'') => {
                    self.advance();
                    self.advance();
                    TokenKind::VarQuote
                }
                '#' if self.peek_next() == Some('"') => {
                    self.advance();
                    self.regex()?
                }
                '"' => self.string()?,
                '\\' => self.character()?,
                ':' => {
                    self.advance();
                    let name = self.take_symbol_chars();
                    if name.is_empty() {
                        return Err(self.error("Invalid keyword: expected a name after ':'", start_line, start_column));
                    }
                    TokenKind::Keyword(name.to_string())
                }
                c if c.is_ascii_digit() => self.number()?,
                '+' | '-' if self.peek_next().is_some_and(|n| n.is_ascii_digit()) => self.number()?,
                c if is_symbol_char(c) => {
                    let text = self.take_symbol_chars();
                    match text {
                        "nil" => TokenKind::Nil,
                        "true" => TokenKind::True,
                        "false" => TokenKind::False,
                        _ => TokenKind::Symbol(text.to_string()),
                    }
                }
                c => {
                    return Err(self.error(
                        &format!("Unexpected character: '{c}'"),
                        start_line,
                        start_column,
                    ));
                }
            },
        };

        let span = Span {
            start: start_position,
            end: self.position,
            line: start_line,
            column: start_column,
        };

        Ok(Token { kind, span })
    }

    fn error(&self, message: &str, line: u32, column: u32) -> LexError {
        LexError {
            message: message.to_string(),
            line,
            column,
            incomplete: false,
        }
    }

    fn incomplete(&self, message: &str, line: u32, column: u32) -> LexError {
        LexError {
            incomplete: true,
            ..self.error(message, line, column)
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.clone().next()
    }

    fn peek_next(&self) -> Option<char> {
        let mut chars = self.chars.clone();
        chars.next();
        chars.next()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        self.position += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    /// Commas count as whitespace.
    fn skip_whitespace_and_comments(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() || c == ',' {
                self.advance();
            } else if c == ';' {
                while let Some(c) = self.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.advance();
                }
            } else {
                break;
            }
        }
    }

    fn take_symbol_chars(&mut self) -> &'a str {
        let start = self.position;
        while self.peek().is_some_and(is_symbol_char) {
            self.advance();
        }
        &self.source[start..self.position]
    }

    fn number(&mut self) -> Result<TokenKind, LexError> {
        let start_line = self.line;
        let start_column = self.column;

        let text = self.take_symbol_chars();
        if let Ok(value) = text.parse::<i64>() {
            return Ok(TokenKind::Integer(value));
        }
        let digits = text.trim_start_matches(['+', '-']);
        if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(self.error(
                &format!("Integer literal out of range: {text}"),
                start_line,
                start_column,
            ));
        }
        text.parse::<f64>()
            .ok()
            .filter(|_| !text.contains(|c: char| c.is_ascii_alphabetic() && c != 'e' && c != 'E'))
            .map(TokenKind::Float)
            .ok_or_else(|| {
                self.error(
                    &format!("Invalid number literal: {text}"),
                    start_line,
                    start_column,
                )
            })
    }

    fn string(&mut self) -> Result<TokenKind, LexError> {
        let start_line = self.line;
        let start_column = self.column;

        self.advance();

        let mut value = String::new();

        loop {
            match self.advance() {
                None => {
                    return Err(self.incomplete("Unterminated string literal", start_line, start_column));
                }
                Some('"') => break,
                Some('\\') => {
                    let Some(escape) = self.advance() else {
                        return Err(self.incomplete("Unterminated string literal", start_line, start_column));
                    };
                    match STRING_ESCAPES.iter().find(|(_, code)| *code == escape) {
                        Some((raw, _)) => value.push(*raw),
                        None => {
                            return Err(self.error(
                                &format!("Invalid escape sequence: \\{escape}"),
                                self.line,
                                self.column.saturating_sub(2),
                            ));
                        }
                    }
                }
                Some(c) => value.push(c),
            }
        }

        Ok(TokenKind::String(value))
    }

    /// `#"..."`: the body is kept verbatim except for `\"`.
    fn regex(&mut self) -> Result<TokenKind, LexError> {
        let start_line = self.line;
        let start_column = self.column.saturating_sub(1);

        self.advance();

        let mut pattern = String::new();
        loop {
            match self.advance() {
                None => {
                    return Err(self.incomplete("Unterminated regex literal", start_line, start_column));
                }
                Some('"') => break,
                Some('\\') if self.peek() == Some('"') => {
                    self.advance();
                    pattern.push('"');
                }
                Some('\\') => {
                    pattern.push('\\');
                    if let Some(next) = self.advance() {
                        pattern.push(next);
                    }
                }
                Some(c) => pattern.push(c),
            }
        }

        Ok(TokenKind::Regex(pattern))
    }

    /// `\a`, `\newline`, `A`.
    fn character(&mut self) -> Result<TokenKind, LexError> {
        let start_line = self.line;
        let start_column = self.column;

        self.advance();
        let Some(first) = self.advance() else {
            return Err(self.incomplete("Unterminated character literal", start_line, start_column));
        };

        let start = self.position - first.len_utf8();
        while self.peek().is_some_and(|c| c.is_ascii_alphanumeric()) && first.is_ascii_alphanumeric() {
            self.advance();
        }
        let text = &self.source[start..self.position];

        if text.chars().count() == 1 {
            return Ok(TokenKind::Char(first));
        }
        if let Some((c, _)) = NAMED_CHARS.iter().find(|(_, name)| *name == text) {
            return Ok(TokenKind::Char(*c));
        }
        if let Some(hex) = text.strip_prefix('u')
            && hex.len() == 4
            && let Some(c) = u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
        {
            return Ok(TokenKind::Char(c));
        }
        Err(self.error(
            &format!("Unsupported character: \\{text}"),
            start_line,
            start_column,
        ))
    }
}

fn is_symbol_char(c: char) -> bool {
    !c.is_whitespace()
        && !matches!(
            c,
            '(' | ')' | '[' | ']' | '{' | '}' | '"' | ';' | '\'' | '`' | '~' | '@' | ',' | '\\'
        )
}

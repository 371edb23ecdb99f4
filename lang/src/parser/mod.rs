//! Reader: turns tokens into forms and lowers reader macros into ordinary
//! list forms before anything reaches the evaluator.

#[cfg(test)]
mod tests;

use std::collections::HashMap as GensymTable;
use std::rc::Rc;

use im_rc::HashMap;

use crate::config::LogDomain;
use crate::error::LangError;
use crate::interpreter::builtins::BuiltinId;
use crate::interpreter::special_forms::SpecialForm;
use crate::interpreter::value::{ReaderMacro, RegexPattern};
use crate::interpreter::{Context, InternedId, Runtime, Seq, Symbol, Value};
use crate::lexer::{Lexer, Span, Token, TokenKind};

#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    pub span: Span,
    /// The input ran out inside an open form.
    pub incomplete: bool,
}

impl ParseError {
    fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
            incomplete: false,
        }
    }

    fn incomplete(message: impl Into<String>, span: Span) -> Self {
        Self {
            incomplete: true,
            ..Self::new(message, span)
        }
    }
}

/// Read every top-level form in `source`, with reader macros lowered.
pub fn read_forms(source: &str, runtime: &Rc<Runtime>) -> Result<Vec<Value>, LangError> {
    let tokens = Lexer::new(source).tokenize()?;
    let forms = Parser::new(tokens, runtime).parse_forms()?;

    if runtime.logging(LogDomain::Read) {
        let context = Context::root(runtime.clone());
        for form in &forms {
            tracing::debug!(
                target: "tamarind::read",
                form = %context.describe_lossy(form),
                "read form"
            );
        }
    }

    Ok(forms)
}

pub struct Parser<'a> {
    tokens: Vec<Token>,
    position: usize,
    runtime: &'a Runtime,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: Vec<Token>, runtime: &'a Runtime) -> Self {
        Self {
            tokens,
            position: 0,
            runtime,
        }
    }

    pub fn parse_forms(&mut self) -> Result<Vec<Value>, ParseError> {
        let mut forms = Vec::new();
        while !self.is_at_end() {
            let span = self.current_span();
            let raw = self.parse_form()?;
            forms.push(Lowering::new(self.runtime, span).lower(&raw)?);
        }
        Ok(forms)
    }

    /// Parse one form, leaving reader macros as `Value::ReaderMacro`.
    fn parse_form(&mut self) -> Result<Value, ParseError> {
        let span = self.current_span();
        let Some(token) = self.advance() else {
            return Err(ParseError::incomplete("Unexpected end of input", span));
        };

        match token.kind {
            TokenKind::Nil => Ok(Value::Nil),
            TokenKind::True => Ok(Value::Bool(true)),
            TokenKind::False => Ok(Value::Bool(false)),
            TokenKind::Integer(n) => Ok(Value::Int(n)),
            TokenKind::Float(f) => Ok(Value::float(f)),
            TokenKind::String(s) => Ok(Value::string(s)),
            TokenKind::Char(c) => Ok(Value::Char(c)),
            TokenKind::Regex(pattern) => RegexPattern::new(&pattern)
                .map(|pattern| Value::Auxiliary(Rc::new(pattern)))
                .map_err(|err| ParseError::new(format!("Invalid regex: {err}"), token.span)),
            TokenKind::Symbol(name) => Ok(self.symbol(&name)),
            TokenKind::Keyword(name) => Ok(Value::Keyword(self.split_name(&name))),
            TokenKind::Quote => self.reader_macro(ReaderMacro::Quote),
            TokenKind::SyntaxQuote => self.reader_macro(ReaderMacro::SyntaxQuote),
            TokenKind::Unquote => self.reader_macro(ReaderMacro::Unquote),
            TokenKind::UnquoteSplice => self.reader_macro(ReaderMacro::UnquoteSplice),
            TokenKind::Deref => self.reader_macro(ReaderMacro::Deref),
            TokenKind::VarQuote => self.reader_macro(ReaderMacro::VarQuote),
            TokenKind::LeftParen => {
                let items = self.parse_until(TokenKind::RightParen, token.span)?;
                Ok(Value::list(items))
            }
            TokenKind::LeftBracket => {
                let items = self.parse_until(TokenKind::RightBracket, token.span)?;
                Ok(Value::vector(items))
            }
            TokenKind::LeftBrace => {
                let items = self.parse_until(TokenKind::RightBrace, token.span)?;
                if items.len() % 2 != 0 {
                    return Err(ParseError::new(
                        "Map literal must contain an even number of forms",
                        token.span,
                    ));
                }
                let mut map = HashMap::new();
                let mut items = items.into_iter();
                while let (Some(key), Some(value)) = (items.next(), items.next()) {
                    map.insert(key, value);
                }
                Ok(Value::Map(map))
            }
            TokenKind::RightParen | TokenKind::RightBracket | TokenKind::RightBrace => Err(
                ParseError::new(format!("Unexpected '{}'", token.kind), token.span),
            ),
            TokenKind::Eof => Err(ParseError::incomplete("Unexpected end of input", token.span)),
        }
    }

    fn reader_macro(&mut self, wrap: fn(Value) -> ReaderMacro) -> Result<Value, ParseError> {
        let form = self.parse_form()?;
        Ok(Value::ReaderMacro(Rc::new(wrap(form))))
    }

    fn parse_until(&mut self, close: TokenKind, open: Span) -> Result<Vec<Value>, ParseError> {
        let mut items = Vec::new();
        loop {
            match self.peek().map(|t| &t.kind) {
                None | Some(TokenKind::Eof) => {
                    return Err(ParseError::incomplete(
                        format!("Expected '{close}' before end of input"),
                        open,
                    ));
                }
                Some(kind) if *kind == close => {
                    self.advance();
                    return Ok(items);
                }
                Some(
                    kind @ (TokenKind::RightParen | TokenKind::RightBracket | TokenKind::RightBrace),
                ) => {
                    return Err(ParseError::new(
                        format!("Unexpected '{kind}', expected '{close}'"),
                        self.current_span(),
                    ));
                }
                Some(_) => items.push(self.parse_form()?),
            }
        }
    }

    fn symbol(&self, text: &str) -> Value {
        if let Some(form) = SpecialForm::from_name(text) {
            return Value::Special(form);
        }
        Value::Symbol(self.split_name(text))
    }

    /// `ns/name` is qualified; a bare `/` or a dangling slash is not.
    fn split_name(&self, text: &str) -> Symbol {
        match text.split_once('/') {
            Some((ns, name)) if !ns.is_empty() && !name.is_empty() => {
                Symbol::qualified(self.runtime.intern(ns), self.runtime.intern(name))
            }
            _ => Symbol::unqualified(self.runtime.intern(text)),
        }
    }

    // Helper methods

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn advance(&mut self) -> Option<Token> {
        if self.is_at_end() {
            None
        } else {
            let token = self.tokens[self.position].clone();
            self.position += 1;
            Some(token)
        }
    }

    fn is_at_end(&self) -> bool {
        self.peek()
            .map(|t| t.kind == TokenKind::Eof)
            .unwrap_or(true)
    }

    fn current_span(&self) -> Span {
        self.peek()
            .or_else(|| self.tokens.last())
            .map(|t| t.span)
            .unwrap_or(Span {
                start: 0,
                end: 0,
                line: 1,
                column: 1,
            })
    }
}

// ============================================================================
// Reader macro lowering
// ============================================================================

struct Lowering<'a> {
    runtime: &'a Runtime,
    span: Span,
}

impl<'a> Lowering<'a> {
    fn new(runtime: &'a Runtime, span: Span) -> Self {
        Self { runtime, span }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(message, self.span)
    }

    fn items(&self, seq: &Seq) -> Result<Vec<Value>, ParseError> {
        seq.to_vec().map_err(|err| self.error(err.to_string()))
    }

    /// Replace every reader macro outside a syntax-quote.
    fn lower(&self, form: &Value) -> Result<Value, ParseError> {
        match form {
            Value::ReaderMacro(reader_macro) => match reader_macro.as_ref() {
                ReaderMacro::Quote(inner) => Ok(Value::list([
                    Value::Special(SpecialForm::Quote),
                    self.lower(inner)?,
                ])),
                ReaderMacro::VarQuote(inner) => Ok(Value::list([
                    Value::Special(SpecialForm::Var),
                    self.lower(inner)?,
                ])),
                ReaderMacro::Deref(inner) => Ok(Value::list([
                    Value::BuiltIn(BuiltinId::Deref),
                    self.lower(inner)?,
                ])),
                ReaderMacro::SyntaxQuote(inner) => {
                    let mut gensyms = GensymTable::new();
                    self.syntax_quote(inner, &mut gensyms)
                }
                ReaderMacro::Unquote(_) => Err(self.error("Unquote (~) outside of syntax-quote")),
                ReaderMacro::UnquoteSplice(_) => {
                    Err(self.error("Unquote-splice (~@) outside of syntax-quote"))
                }
            },
            Value::Seq(seq) => {
                let items = self
                    .items(seq)?
                    .iter()
                    .map(|item| self.lower(item))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::list(items))
            }
            Value::Vector(items) => Ok(Value::Vector(
                items
                    .iter()
                    .map(|item| self.lower(item))
                    .collect::<Result<_, _>>()?,
            )),
            Value::Map(entries) => {
                let mut map = HashMap::new();
                for (key, value) in entries {
                    map.insert(self.lower(key)?, self.lower(value)?);
                }
                Ok(Value::Map(map))
            }
            other => Ok(other.clone()),
        }
    }

    fn syntax_quote(
        &self,
        form: &Value,
        gensyms: &mut GensymTable<InternedId, Symbol>,
    ) -> Result<Value, ParseError> {
        match form {
            Value::Symbol(symbol) => {
                let symbol = self.auto_gensym(*symbol, gensyms);
                Ok(quoted(Value::Symbol(symbol)))
            }
            Value::Special(_) => Ok(quoted(form.clone())),
            Value::Seq(seq) => {
                let items = self.items(seq)?;
                if items.is_empty() {
                    return Ok(Value::list([Value::BuiltIn(BuiltinId::List)]));
                }
                Ok(Value::list([
                    Value::BuiltIn(BuiltinId::Seq),
                    self.concat(&items, gensyms)?,
                ]))
            }
            Value::Vector(items) => {
                let items: Vec<Value> = items.iter().cloned().collect();
                Ok(Value::list([
                    Value::BuiltIn(BuiltinId::Vec),
                    self.concat(&items, gensyms)?,
                ]))
            }
            Value::Map(entries) => {
                let items: Vec<Value> = entries
                    .iter()
                    .flat_map(|(key, value)| [key.clone(), value.clone()])
                    .collect();
                Ok(Value::list([
                    Value::Special(SpecialForm::Apply),
                    Value::BuiltIn(BuiltinId::HashMap),
                    self.concat(&items, gensyms)?,
                ]))
            }
            Value::ReaderMacro(reader_macro) => match reader_macro.as_ref() {
                ReaderMacro::Unquote(inner) => self.lower(inner),
                ReaderMacro::UnquoteSplice(_) => {
                    Err(self.error("Unquote-splice (~@) must appear inside a collection"))
                }
                ReaderMacro::Quote(inner) => self.syntax_quote(
                    &Value::list([Value::Special(SpecialForm::Quote), inner.clone()]),
                    gensyms,
                ),
                ReaderMacro::VarQuote(inner) => self.syntax_quote(
                    &Value::list([Value::Special(SpecialForm::Var), inner.clone()]),
                    gensyms,
                ),
                ReaderMacro::Deref(inner) => self.syntax_quote(
                    &Value::list([Value::BuiltIn(BuiltinId::Deref), inner.clone()]),
                    gensyms,
                ),
                ReaderMacro::SyntaxQuote(_) => {
                    let expanded = self.lower(form)?;
                    self.syntax_quote(&expanded, gensyms)
                }
            },
            other => Ok(other.clone()),
        }
    }

    /// `(concat part...)` where each part contributes zero or more items.
    fn concat(
        &self,
        items: &[Value],
        gensyms: &mut GensymTable<InternedId, Symbol>,
    ) -> Result<Value, ParseError> {
        let mut parts = vec![Value::BuiltIn(BuiltinId::Concat)];
        for item in items {
            let part = match item {
                Value::ReaderMacro(reader_macro) => match reader_macro.as_ref() {
                    ReaderMacro::Unquote(inner) => {
                        Value::list([Value::BuiltIn(BuiltinId::List), self.lower(inner)?])
                    }
                    ReaderMacro::UnquoteSplice(inner) => self.lower(inner)?,
                    _ => Value::list([
                        Value::BuiltIn(BuiltinId::List),
                        self.syntax_quote(item, gensyms)?,
                    ]),
                },
                _ => Value::list([
                    Value::BuiltIn(BuiltinId::List),
                    self.syntax_quote(item, gensyms)?,
                ]),
            };
            parts.push(part);
        }
        Ok(Value::list(parts))
    }

    /// `name#` maps to the same fresh symbol throughout one syntax-quote.
    fn auto_gensym(&self, symbol: Symbol, gensyms: &mut GensymTable<InternedId, Symbol>) -> Symbol {
        if symbol.is_qualified() {
            return symbol;
        }
        let name = self.runtime.name(symbol.name);
        let Some(base) = name.strip_suffix('#').filter(|base| !base.is_empty()) else {
            return symbol;
        };
        *gensyms
            .entry(symbol.name)
            .or_insert_with(|| self.runtime.gensym(base, Some("auto")))
    }
}

fn quoted(form: Value) -> Value {
    Value::list([Value::Special(SpecialForm::Quote), form])
}

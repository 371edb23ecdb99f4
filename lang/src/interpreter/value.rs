use im_rc::{HashMap, Vector};
use ordered_float::OrderedFloat;
use regex::Regex;
use std::any::Any;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use super::builtins::BuiltinId;
use super::error::EvalError;
use super::function::Closure;
use super::interner::InternedId;
use super::namespace::Var;
use super::seq::Seq;
use super::special_forms::SpecialForm;

/// An interned, optionally namespace-qualified name. Keywords share the
/// same shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Symbol {
    pub ns: Option<InternedId>,
    pub name: InternedId,
}

impl Symbol {
    pub fn unqualified(name: InternedId) -> Self {
        Self { ns: None, name }
    }

    pub fn qualified(ns: InternedId, name: InternedId) -> Self {
        Self { ns: Some(ns), name }
    }

    pub fn is_qualified(&self) -> bool {
        self.ns.is_some()
    }
}

/// Host values carried through the language untouched. They only need to
/// describe themselves and compare for equality.
pub trait Auxiliary: fmt::Debug {
    fn type_name(&self) -> &'static str;
    fn describe(&self, debug: bool) -> String;
    fn equals(&self, other: &dyn Auxiliary) -> bool;
    fn as_any(&self) -> &dyn Any;
}

/// Compiled regular expression, produced by `#"..."` literals and `re-pattern`.
#[derive(Debug, Clone)]
pub struct RegexPattern(Regex);

impl RegexPattern {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(pattern).map(RegexPattern)
    }

    pub fn regex(&self) -> &Regex {
        &self.0
    }
}

impl Auxiliary for RegexPattern {
    fn type_name(&self) -> &'static str {
        "regex"
    }

    fn describe(&self, debug: bool) -> String {
        if debug {
            format!("#\"{}\"", self.0.as_str())
        } else {
            self.0.as_str().to_string()
        }
    }

    fn equals(&self, other: &dyn Auxiliary) -> bool {
        other
            .as_any()
            .downcast_ref::<RegexPattern>()
            .is_some_and(|other| other.0.as_str() == self.0.as_str())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Unexpanded reader macro. The reader lowers every one of these before a
/// form reaches the evaluator.
#[derive(Debug, Clone, PartialEq)]
pub enum ReaderMacro {
    Quote(Value),
    SyntaxQuote(Value),
    Unquote(Value),
    UnquoteSplice(Value),
    Deref(Value),
    VarQuote(Value),
}

impl ReaderMacro {
    pub fn prefix(&self) -> &'static str {
        match self {
            ReaderMacro::Quote(_) => "'",
            ReaderMacro::SyntaxQuote(_) => "`",
            ReaderMacro::Unquote(_) => "~",
            ReaderMacro::UnquoteSplice(_) => "~@",
            ReaderMacro::Deref(_) => "@",
            ReaderMacro::VarQuote(_) => "#'",
        }
    }

    pub fn form(&self) -> &Value {
        match self {
            ReaderMacro::Quote(form)
            | ReaderMacro::SyntaxQuote(form)
            | ReaderMacro::Unquote(form)
            | ReaderMacro::UnquoteSplice(form)
            | ReaderMacro::Deref(form)
            | ReaderMacro::VarQuote(form) => form,
        }
    }
}

/// Runtime value. Every variant is immutable once built; `Var` cells are
/// the only shared mutable state.
#[derive(Clone, Debug)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Float(OrderedFloat<f64>),
    Char(char),
    String(Rc<String>),
    Symbol(Symbol),
    Keyword(Symbol),
    Vector(Vector<Value>),
    Map(HashMap<Value, Value>),
    Seq(Seq),
    Namespace(InternedId),
    Var(Rc<Var>),
    /// What an unqualified lookup yields for a var declared without a value.
    Unbound(Rc<Var>),
    Function(Rc<Closure>),
    Macro(Rc<Closure>),
    BuiltIn(BuiltinId),
    Special(SpecialForm),
    ReaderMacro(Rc<ReaderMacro>),
    Auxiliary(Rc<dyn Auxiliary>),
}

impl Value {
    pub fn string(s: impl Into<String>) -> Value {
        Value::String(Rc::new(s.into()))
    }

    pub fn float(f: f64) -> Value {
        Value::Float(OrderedFloat(f))
    }

    pub fn list(values: impl IntoIterator<Item = Value>) -> Value {
        Value::Seq(Seq::list(values))
    }

    pub fn vector(values: impl IntoIterator<Item = Value>) -> Value {
        Value::Vector(values.into_iter().collect())
    }

    pub fn empty_list() -> Value {
        Value::Seq(Seq::empty())
    }

    /// `nil` and `false` are falsy; everything else, including `0` and
    /// empty collections, is truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Char(_) => "char",
            Value::String(_) => "string",
            Value::Symbol(_) => "symbol",
            Value::Keyword(_) => "keyword",
            Value::Vector(_) => "vector",
            Value::Map(_) => "map",
            Value::Seq(_) => "seq",
            Value::Namespace(_) => "namespace",
            Value::Var(_) => "var",
            Value::Unbound(_) => "unbound",
            Value::Function(_) => "function",
            Value::Macro(_) => "macro",
            Value::BuiltIn(_) => "built-in function",
            Value::Special(_) => "special form",
            Value::ReaderMacro(_) => "reader macro",
            Value::Auxiliary(aux) => aux.type_name(),
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    /// Structural equality that reports failures from realizing lazy
    /// sequences instead of treating them as inequality.
    pub fn try_eq(&self, other: &Value) -> Result<bool, EvalError> {
        match (self, other) {
            (Value::Nil, Value::Nil) => Ok(true),
            (Value::Bool(a), Value::Bool(b)) => Ok(a == b),
            (Value::Int(a), Value::Int(b)) => Ok(a == b),
            (Value::Float(a), Value::Float(b)) => Ok(a == b),
            (Value::Char(a), Value::Char(b)) => Ok(a == b),
            (Value::String(a), Value::String(b)) => Ok(a == b),
            (Value::Symbol(a), Value::Symbol(b)) => Ok(a == b),
            (Value::Keyword(a), Value::Keyword(b)) => Ok(a == b),
            (Value::Vector(a), Value::Vector(b)) => {
                if a.len() != b.len() {
                    return Ok(false);
                }
                for (x, y) in a.iter().zip(b.iter()) {
                    if !x.try_eq(y)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            // Lists compare element-wise against lists and vectors alike.
            (Value::Seq(a), Value::Seq(b)) => sequential_eq(a, b),
            (Value::Seq(a), Value::Vector(b)) | (Value::Vector(b), Value::Seq(a)) => {
                sequential_eq(a, &Seq::vector_view(b.clone()))
            }
            (Value::Map(a), Value::Map(b)) => Ok(a == b),
            (Value::Namespace(a), Value::Namespace(b)) => Ok(a == b),
            (Value::Var(a), Value::Var(b)) => Ok(Rc::ptr_eq(a, b)),
            (Value::Unbound(a), Value::Unbound(b)) => Ok(Rc::ptr_eq(a, b)),
            // Closures compare by identity, never by structure.
            (Value::Function(a), Value::Function(b)) => Ok(Rc::ptr_eq(a, b)),
            (Value::Macro(a), Value::Macro(b)) => Ok(Rc::ptr_eq(a, b)),
            (Value::BuiltIn(a), Value::BuiltIn(b)) => Ok(a == b),
            (Value::Special(a), Value::Special(b)) => Ok(a == b),
            (Value::ReaderMacro(a), Value::ReaderMacro(b)) => Ok(a == b),
            (Value::Auxiliary(a), Value::Auxiliary(b)) => Ok(a.equals(b.as_ref())),
            _ => Ok(false),
        }
    }
}

fn sequential_eq(left: &Seq, right: &Seq) -> Result<bool, EvalError> {
    let mut left = left.iter();
    let mut right = right.iter();
    loop {
        match (left.next().transpose()?, right.next().transpose()?) {
            (None, None) => return Ok(true),
            (Some(a), Some(b)) => {
                if !a.try_eq(&b)? {
                    return Ok(false);
                }
            }
            _ => return Ok(false),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.try_eq(other).unwrap_or(false)
    }
}

impl Eq for Value {}

/// Shared by lists and vectors so that equal sequences hash equally.
const SEQUENTIAL_TAG: u8 = 0xA5;

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Value::Vector(items) => {
                SEQUENTIAL_TAG.hash(state);
                for item in items {
                    item.hash(state);
                }
            }
            Value::Seq(seq) => {
                SEQUENTIAL_TAG.hash(state);
                for item in seq.iter() {
                    match item {
                        Ok(item) => item.hash(state),
                        Err(_) => break,
                    }
                }
            }
            other => {
                std::mem::discriminant(other).hash(state);
                match other {
                    Value::Nil => {}
                    Value::Bool(b) => b.hash(state),
                    Value::Int(n) => n.hash(state),
                    Value::Float(f) => f.hash(state),
                    Value::Char(c) => c.hash(state),
                    Value::String(s) => s.hash(state),
                    Value::Symbol(sym) | Value::Keyword(sym) => sym.hash(state),
                    Value::Map(entries) => {
                        // Order independent: combine per-entry hashes.
                        let mut combined: u64 = 0;
                        for (key, value) in entries {
                            let mut hasher = DefaultHasher::new();
                            key.hash(&mut hasher);
                            value.hash(&mut hasher);
                            combined = combined.wrapping_add(hasher.finish());
                        }
                        combined.hash(state);
                    }
                    Value::Namespace(id) => id.hash(state),
                    Value::Var(var) | Value::Unbound(var) => std::ptr::hash(Rc::as_ptr(var), state),
                    Value::Function(f) | Value::Macro(f) => std::ptr::hash(Rc::as_ptr(f), state),
                    Value::BuiltIn(id) => id.hash(state),
                    Value::Special(form) => form.hash(state),
                    Value::ReaderMacro(rm) => {
                        rm.prefix().hash(state);
                        rm.form().hash(state);
                    }
                    Value::Auxiliary(aux) => {
                        aux.type_name().hash(state);
                        aux.describe(true).hash(state);
                    }
                    Value::Vector(_) | Value::Seq(_) => unreachable!("handled above"),
                }
            }
        }
    }
}

impl fmt::Display for Value {
    /// Context-free debug rendering: names appear as raw interned ids.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match super::describe::describe(self, None, true) {
            Ok(text) => f.write_str(&text),
            Err(err) => write!(f, "#<unprintable: {err}>"),
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<char> for Value {
    fn from(c: char) -> Self {
        Value::Char(c)
    }
}

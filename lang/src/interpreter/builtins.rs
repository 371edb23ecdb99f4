//! Built-in functions bound in the `core` namespace.

use im_rc::HashMap;
use std::cmp::Ordering;
use std::rc::Rc;

use super::context::Context;
use super::describe::describe;
use super::error::{Arity, EvalError};
use super::interner::{InternedId, Interner};
use super::namespace::ReferError;
use super::params::Params;
use super::seq::Seq;
use super::value::{RegexPattern, Symbol, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinId {
    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    Quot,
    Rem,
    Mod,
    Inc,
    Dec,
    Max,
    Min,

    // Comparison
    NumEquals,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Equals,

    // Predicates
    IsNil,
    IsBoolean,
    IsNumber,
    IsInt,
    IsFloat,
    IsString,
    IsChar,
    IsSymbol,
    IsKeyword,
    IsFn,
    IsMacro,
    IsSeq,
    IsVector,
    IsMap,
    IsVar,
    IsNamespace,

    // Collections
    List,
    Vector,
    Vec,
    HashMap,
    Cons,
    First,
    Rest,
    Next,
    Seq,
    Concat,
    Nth,
    Get,
    Count,
    Assoc,
    Dissoc,
    Conj,
    Keys,
    Vals,
    Contains,
    LazySeq,
    Reduce,

    // Text and output
    Str,
    Subs,
    Print,
    Println,
    Pr,
    Prn,

    // Symbols and conversion
    Symbol,
    Keyword,
    Name,
    Gensym,
    Int,
    Double,

    // Meta
    ReadString,
    Eval,
    Deref,

    // Namespaces
    NsSet,
    NsRefer,
    NsRemove,
    NsUnmap,
    NsName,

    // Regular expressions
    RePattern,
    ReFind,
    ReMatches,
}

impl BuiltinId {
    pub const ALL: [BuiltinId; 77] = [
        BuiltinId::Add,
        BuiltinId::Subtract,
        BuiltinId::Multiply,
        BuiltinId::Divide,
        BuiltinId::Quot,
        BuiltinId::Rem,
        BuiltinId::Mod,
        BuiltinId::Inc,
        BuiltinId::Dec,
        BuiltinId::Max,
        BuiltinId::Min,
        BuiltinId::NumEquals,
        BuiltinId::Less,
        BuiltinId::LessEqual,
        BuiltinId::Greater,
        BuiltinId::GreaterEqual,
        BuiltinId::Equals,
        BuiltinId::IsNil,
        BuiltinId::IsBoolean,
        BuiltinId::IsNumber,
        BuiltinId::IsInt,
        BuiltinId::IsFloat,
        BuiltinId::IsString,
        BuiltinId::IsChar,
        BuiltinId::IsSymbol,
        BuiltinId::IsKeyword,
        BuiltinId::IsFn,
        BuiltinId::IsMacro,
        BuiltinId::IsSeq,
        BuiltinId::IsVector,
        BuiltinId::IsMap,
        BuiltinId::IsVar,
        BuiltinId::IsNamespace,
        BuiltinId::List,
        BuiltinId::Vector,
        BuiltinId::Vec,
        BuiltinId::HashMap,
        BuiltinId::Cons,
        BuiltinId::First,
        BuiltinId::Rest,
        BuiltinId::Next,
        BuiltinId::Seq,
        BuiltinId::Concat,
        BuiltinId::Nth,
        BuiltinId::Get,
        BuiltinId::Count,
        BuiltinId::Assoc,
        BuiltinId::Dissoc,
        BuiltinId::Conj,
        BuiltinId::Keys,
        BuiltinId::Vals,
        BuiltinId::Contains,
        BuiltinId::LazySeq,
        BuiltinId::Reduce,
        BuiltinId::Str,
        BuiltinId::Subs,
        BuiltinId::Print,
        BuiltinId::Println,
        BuiltinId::Pr,
        BuiltinId::Prn,
        BuiltinId::Symbol,
        BuiltinId::Keyword,
        BuiltinId::Name,
        BuiltinId::Gensym,
        BuiltinId::Int,
        BuiltinId::Double,
        BuiltinId::ReadString,
        BuiltinId::Eval,
        BuiltinId::Deref,
        BuiltinId::NsSet,
        BuiltinId::NsRefer,
        BuiltinId::NsRemove,
        BuiltinId::NsUnmap,
        BuiltinId::NsName,
        BuiltinId::RePattern,
        BuiltinId::ReFind,
        BuiltinId::ReMatches,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BuiltinId::Add => "+",
            BuiltinId::Subtract => "-",
            BuiltinId::Multiply => "*",
            BuiltinId::Divide => "/",
            BuiltinId::Quot => "quot",
            BuiltinId::Rem => "rem",
            BuiltinId::Mod => "mod",
            BuiltinId::Inc => "inc",
            BuiltinId::Dec => "dec",
            BuiltinId::Max => "max",
            BuiltinId::Min => "min",
            BuiltinId::NumEquals => "==",
            BuiltinId::Less => "<",
            BuiltinId::LessEqual => "<=",
            BuiltinId::Greater => ">",
            BuiltinId::GreaterEqual => ">=",
            BuiltinId::Equals => "=",
            BuiltinId::IsNil => "nil?",
            BuiltinId::IsBoolean => "boolean?",
            BuiltinId::IsNumber => "number?",
            BuiltinId::IsInt => "int?",
            BuiltinId::IsFloat => "float?",
            BuiltinId::IsString => "string?",
            BuiltinId::IsChar => "char?",
            BuiltinId::IsSymbol => "symbol?",
            BuiltinId::IsKeyword => "keyword?",
            BuiltinId::IsFn => "fn?",
            BuiltinId::IsMacro => "macro?",
            BuiltinId::IsSeq => "seq?",
            BuiltinId::IsVector => "vector?",
            BuiltinId::IsMap => "map?",
            BuiltinId::IsVar => "var?",
            BuiltinId::IsNamespace => "namespace?",
            BuiltinId::List => "list",
            BuiltinId::Vector => "vector",
            BuiltinId::Vec => "vec",
            BuiltinId::HashMap => "hash-map",
            BuiltinId::Cons => "cons",
            BuiltinId::First => "first",
            BuiltinId::Rest => "rest",
            BuiltinId::Next => "next",
            BuiltinId::Seq => "seq",
            BuiltinId::Concat => "concat",
            BuiltinId::Nth => "nth",
            BuiltinId::Get => "get",
            BuiltinId::Count => "count",
            BuiltinId::Assoc => "assoc",
            BuiltinId::Dissoc => "dissoc",
            BuiltinId::Conj => "conj",
            BuiltinId::Keys => "keys",
            BuiltinId::Vals => "vals",
            BuiltinId::Contains => "contains?",
            BuiltinId::LazySeq => "lazy-seq*",
            BuiltinId::Reduce => "reduce",
            BuiltinId::Str => "str",
            BuiltinId::Subs => "subs",
            BuiltinId::Print => "print",
            BuiltinId::Println => "println",
            BuiltinId::Pr => "pr",
            BuiltinId::Prn => "prn",
            BuiltinId::Symbol => "symbol",
            BuiltinId::Keyword => "keyword",
            BuiltinId::Name => "name",
            BuiltinId::Gensym => "gensym",
            BuiltinId::Int => "int",
            BuiltinId::Double => "double",
            BuiltinId::ReadString => "read-string",
            BuiltinId::Eval => "eval",
            BuiltinId::Deref => "deref",
            BuiltinId::NsSet => "ns-set",
            BuiltinId::NsRefer => "ns-refer",
            BuiltinId::NsRemove => "ns-remove",
            BuiltinId::NsUnmap => "ns-unmap",
            BuiltinId::NsName => "ns-name",
            BuiltinId::RePattern => "re-pattern",
            BuiltinId::ReFind => "re-find",
            BuiltinId::ReMatches => "re-matches",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|id| id.name() == name)
    }

    pub fn arity(self) -> Arity {
        match self {
            BuiltinId::Add
            | BuiltinId::Multiply
            | BuiltinId::List
            | BuiltinId::Vector
            | BuiltinId::HashMap
            | BuiltinId::Concat
            | BuiltinId::Str
            | BuiltinId::Print
            | BuiltinId::Println
            | BuiltinId::Pr
            | BuiltinId::Prn => Arity::AtLeast(0),

            BuiltinId::Subtract
            | BuiltinId::Divide
            | BuiltinId::Max
            | BuiltinId::Min
            | BuiltinId::NumEquals
            | BuiltinId::Less
            | BuiltinId::LessEqual
            | BuiltinId::Greater
            | BuiltinId::GreaterEqual
            | BuiltinId::Equals
            | BuiltinId::Dissoc
            | BuiltinId::Conj => Arity::AtLeast(1),

            BuiltinId::Inc
            | BuiltinId::Dec
            | BuiltinId::IsNil
            | BuiltinId::IsBoolean
            | BuiltinId::IsNumber
            | BuiltinId::IsInt
            | BuiltinId::IsFloat
            | BuiltinId::IsString
            | BuiltinId::IsChar
            | BuiltinId::IsSymbol
            | BuiltinId::IsKeyword
            | BuiltinId::IsFn
            | BuiltinId::IsMacro
            | BuiltinId::IsSeq
            | BuiltinId::IsVector
            | BuiltinId::IsMap
            | BuiltinId::IsVar
            | BuiltinId::IsNamespace
            | BuiltinId::Vec
            | BuiltinId::First
            | BuiltinId::Rest
            | BuiltinId::Next
            | BuiltinId::Seq
            | BuiltinId::Count
            | BuiltinId::Keys
            | BuiltinId::Vals
            | BuiltinId::LazySeq
            | BuiltinId::Name
            | BuiltinId::Int
            | BuiltinId::Double
            | BuiltinId::ReadString
            | BuiltinId::Eval
            | BuiltinId::Deref
            | BuiltinId::NsSet
            | BuiltinId::NsRefer
            | BuiltinId::NsRemove
            | BuiltinId::NsName
            | BuiltinId::RePattern => Arity::Exact(1),

            BuiltinId::Quot
            | BuiltinId::Rem
            | BuiltinId::Mod
            | BuiltinId::Cons
            | BuiltinId::Contains
            | BuiltinId::NsUnmap
            | BuiltinId::ReFind
            | BuiltinId::ReMatches => Arity::Exact(2),

            BuiltinId::Nth
            | BuiltinId::Get
            | BuiltinId::Reduce
            | BuiltinId::Subs => Arity::Range(2, 3),

            BuiltinId::Symbol | BuiltinId::Keyword => Arity::Range(1, 2),
            BuiltinId::Gensym => Arity::Range(0, 1),
            BuiltinId::Assoc => Arity::AtLeast(3),
        }
    }
}

/// Bind every built-in as a var in the current namespace.
pub fn install(context: &Context) -> Result<(), EvalError> {
    for id in BuiltinId::ALL {
        let name = context.intern(id.name());
        context.set_var(name, Value::BuiltIn(id))?;
    }
    Ok(())
}

/// Execute a built-in function after checking its arity.
pub fn call_builtin(id: BuiltinId, args: Params, context: &Context) -> Result<Value, EvalError> {
    let arity = id.arity();
    if !arity.accepts(args.len()) {
        return Err(EvalError::arity(id.name(), arity, args.len()));
    }

    match id {
        BuiltinId::Add => fold_numbers("+", &args, Number::Int(0), add),
        BuiltinId::Multiply => fold_numbers("*", &args, Number::Int(1), multiply),
        BuiltinId::Subtract => {
            if args.len() == 1 {
                subtract(Number::Int(0), Number::from_value("-", &args[0])?).map(Number::into_value)
            } else {
                let first = Number::from_value("-", &args[0])?;
                fold_numbers("-", &args[1..], first, subtract)
            }
        }
        BuiltinId::Divide => {
            if args.len() == 1 {
                divide(Number::Int(1), Number::from_value("/", &args[0])?).map(Number::into_value)
            } else {
                let first = Number::from_value("/", &args[0])?;
                fold_numbers("/", &args[1..], first, divide)
            }
        }
        BuiltinId::Quot => binary_numbers("quot", &args, quot),
        BuiltinId::Rem => binary_numbers("rem", &args, rem),
        BuiltinId::Mod => binary_numbers("mod", &args, modulo),
        BuiltinId::Inc => add(Number::from_value("inc", &args[0])?, Number::Int(1)).map(Number::into_value),
        BuiltinId::Dec => subtract(Number::from_value("dec", &args[0])?, Number::Int(1)).map(Number::into_value),
        BuiltinId::Max => extremum("max", &args, Ordering::Greater),
        BuiltinId::Min => extremum("min", &args, Ordering::Less),

        BuiltinId::NumEquals => compare_chain("==", &args, |o| o == Ordering::Equal),
        BuiltinId::Less => compare_chain("<", &args, |o| o == Ordering::Less),
        BuiltinId::LessEqual => compare_chain("<=", &args, |o| o != Ordering::Greater),
        BuiltinId::Greater => compare_chain(">", &args, |o| o == Ordering::Greater),
        BuiltinId::GreaterEqual => compare_chain(">=", &args, |o| o != Ordering::Less),
        BuiltinId::Equals => {
            for pair in args.windows(2) {
                if !pair[0].try_eq(&pair[1])? {
                    return Ok(Value::Bool(false));
                }
            }
            Ok(Value::Bool(true))
        }

        BuiltinId::IsNil => Ok(Value::Bool(matches!(args[0], Value::Nil))),
        BuiltinId::IsBoolean => Ok(Value::Bool(matches!(args[0], Value::Bool(_)))),
        BuiltinId::IsNumber => Ok(Value::Bool(args[0].is_number())),
        BuiltinId::IsInt => Ok(Value::Bool(matches!(args[0], Value::Int(_)))),
        BuiltinId::IsFloat => Ok(Value::Bool(matches!(args[0], Value::Float(_)))),
        BuiltinId::IsString => Ok(Value::Bool(matches!(args[0], Value::String(_)))),
        BuiltinId::IsChar => Ok(Value::Bool(matches!(args[0], Value::Char(_)))),
        BuiltinId::IsSymbol => Ok(Value::Bool(matches!(args[0], Value::Symbol(_)))),
        BuiltinId::IsKeyword => Ok(Value::Bool(matches!(args[0], Value::Keyword(_)))),
        BuiltinId::IsFn => Ok(Value::Bool(matches!(
            args[0],
            Value::Function(_) | Value::BuiltIn(_)
        ))),
        BuiltinId::IsMacro => Ok(Value::Bool(matches!(args[0], Value::Macro(_)))),
        BuiltinId::IsSeq => Ok(Value::Bool(matches!(args[0], Value::Seq(_)))),
        BuiltinId::IsVector => Ok(Value::Bool(matches!(args[0], Value::Vector(_)))),
        BuiltinId::IsMap => Ok(Value::Bool(matches!(args[0], Value::Map(_)))),
        BuiltinId::IsVar => Ok(Value::Bool(matches!(args[0], Value::Var(_)))),
        BuiltinId::IsNamespace => Ok(Value::Bool(matches!(args[0], Value::Namespace(_)))),

        BuiltinId::List => Ok(args.into_list()),
        BuiltinId::Vector => Ok(Value::vector(args)),
        BuiltinId::Vec => Ok(Value::Vector(
            seq_of("vec", &args[0])?.iter().collect::<Result<_, _>>()?,
        )),
        BuiltinId::HashMap => builtin_hash_map(&args),
        BuiltinId::Cons => Ok(Value::Seq(Seq::cons(args[0].clone(), seq_of("cons", &args[1])?))),
        BuiltinId::First => Ok(seq_of("first", &args[0])?.first()?.unwrap_or(Value::Nil)),
        BuiltinId::Rest => Ok(Value::Seq(seq_of("rest", &args[0])?.rest()?)),
        BuiltinId::Next => {
            let rest = seq_of("next", &args[0])?.rest()?;
            Ok(if rest.is_empty()? { Value::Nil } else { Value::Seq(rest) })
        }
        BuiltinId::Seq => {
            let seq = seq_of("seq", &args[0])?;
            Ok(if seq.is_empty()? { Value::Nil } else { Value::Seq(seq) })
        }
        BuiltinId::Concat => {
            let parts = args
                .iter()
                .map(|part| seq_of("concat", part))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::Seq(Seq::concat(parts)))
        }
        BuiltinId::Nth => builtin_nth(&args),
        BuiltinId::Get => builtin_get(&args),
        BuiltinId::Count => builtin_count(&args[0]),
        BuiltinId::Assoc => builtin_assoc(&args),
        BuiltinId::Dissoc => builtin_dissoc(&args),
        BuiltinId::Conj => builtin_conj(&args),
        BuiltinId::Keys => map_part("keys", &args[0], |(key, _)| key.clone()),
        BuiltinId::Vals => map_part("vals", &args[0], |(_, value)| value.clone()),
        BuiltinId::Contains => builtin_contains(&args[0], &args[1]),
        BuiltinId::LazySeq => Ok(Value::Seq(Seq::lazy(args[0].clone(), context.weak_runtime()))),
        BuiltinId::Reduce => builtin_reduce(&args, context),

        BuiltinId::Str => {
            let mut out = String::new();
            for arg in &args {
                if !matches!(arg, Value::Nil) {
                    out.push_str(&describe(arg, Some(context), false)?);
                }
            }
            Ok(Value::string(out))
        }
        BuiltinId::Subs => builtin_subs(&args),
        BuiltinId::Print => print(&args, context, false, false),
        BuiltinId::Println => print(&args, context, false, true),
        BuiltinId::Pr => print(&args, context, true, false),
        BuiltinId::Prn => print(&args, context, true, true),

        BuiltinId::Symbol => symbol_from_args("symbol", &args, context).map(Value::Symbol),
        BuiltinId::Keyword => match &args[..] {
            [Value::Keyword(keyword)] => Ok(Value::Keyword(*keyword)),
            _ => symbol_from_args("keyword", &args, context).map(Value::Keyword),
        },
        BuiltinId::Name => match &args[0] {
            Value::Symbol(symbol) | Value::Keyword(symbol) => {
                Ok(Value::string(context.name(symbol.name).to_string()))
            }
            Value::String(_) => Ok(args[0].clone()),
            other => Err(EvalError::invalid_argument(
                "name",
                format!("expected a symbol, keyword or string, got {}", other.type_name()),
            )),
        },
        BuiltinId::Gensym => {
            let prefix = match args.first() {
                None => "G".to_string(),
                Some(Value::String(prefix)) => prefix.to_string(),
                Some(Value::Symbol(symbol)) => context.name(symbol.name).to_string(),
                Some(other) => {
                    return Err(EvalError::invalid_argument(
                        "gensym",
                        format!("prefix must be a string, got {}", other.type_name()),
                    ));
                }
            };
            Ok(Value::Symbol(context.runtime().gensym(&prefix, None)))
        }
        BuiltinId::Int => match &args[0] {
            Value::Int(n) => Ok(Value::Int(*n)),
            Value::Float(f) => {
                let truncated = f.0.trunc();
                if truncated.is_finite() && truncated >= i64::MIN as f64 && truncated <= i64::MAX as f64 {
                    Ok(Value::Int(truncated as i64))
                } else {
                    Err(EvalError::IntegerOverflow { operation: "int" })
                }
            }
            Value::Char(c) => Ok(Value::Int(*c as i64)),
            other => Err(EvalError::NonNumericArgument {
                function: "int".to_string(),
                found: other.type_name(),
            }),
        },
        BuiltinId::Double => Ok(Value::float(Number::from_value("double", &args[0])?.as_f64())),

        BuiltinId::ReadString => {
            let Value::String(source) = &args[0] else {
                return Err(EvalError::invalid_argument(
                    "read-string",
                    format!("expected a string, got {}", args[0].type_name()),
                ));
            };
            let forms = crate::parser::read_forms(source.as_str(), context.runtime())
                .map_err(|err| EvalError::Read { message: err.to_string() })?;
            forms.into_iter().next().ok_or_else(|| EvalError::Read {
                message: "EOF while reading".to_string(),
            })
        }
        BuiltinId::Eval => Context::root(context.runtime().clone()).evaluate_value(&args[0]),
        BuiltinId::Deref => match &args[0] {
            Value::Var(var) | Value::Unbound(var) => var.get().ok_or_else(|| {
                EvalError::invalid_argument(
                    "deref",
                    format!("var #'{} is unbound", context.symbol_name(var.name())),
                )
            }),
            other => Err(EvalError::invalid_argument(
                "deref",
                format!("cannot dereference {}", other.type_name()),
            )),
        },

        BuiltinId::NsSet => ns_set(&args[0], context),
        BuiltinId::NsRefer => ns_refer(&args[0], context),
        BuiltinId::NsRemove => ns_remove(&args[0], context),
        BuiltinId::NsUnmap => ns_unmap(&args[0], &args[1], context),
        BuiltinId::NsName => {
            let ns = namespace_arg("ns-name", &args[0])?;
            Ok(Value::Symbol(Symbol::unqualified(ns)))
        }

        BuiltinId::RePattern => match &args[0] {
            Value::Auxiliary(aux) if aux.as_any().is::<RegexPattern>() => Ok(args[0].clone()),
            _ => compile_pattern("re-pattern", &args[0]).map(|re| Value::Auxiliary(Rc::new(re))),
        },
        BuiltinId::ReFind => re_find(&args[0], &args[1]),
        BuiltinId::ReMatches => re_matches(&args[0], &args[1]),
    }
}

// ============================================================================
// Numbers
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn from_value(function: &str, value: &Value) -> Result<Self, EvalError> {
        match value {
            Value::Int(n) => Ok(Number::Int(*n)),
            Value::Float(f) => Ok(Number::Float(f.0)),
            other => Err(EvalError::NonNumericArgument {
                function: function.to_string(),
                found: other.type_name(),
            }),
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Number::Int(n) => n as f64,
            Number::Float(f) => f,
        }
    }

    fn is_zero(self) -> bool {
        match self {
            Number::Int(n) => n == 0,
            Number::Float(f) => f == 0.0,
        }
    }

    fn into_value(self) -> Value {
        match self {
            Number::Int(n) => Value::Int(n),
            Number::Float(f) => Value::float(f),
        }
    }

    fn compare(self, other: Number) -> Option<Ordering> {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => Some(a.cmp(&b)),
            (a, b) => a.as_f64().partial_cmp(&b.as_f64()),
        }
    }
}

fn add(a: Number, b: Number) -> Result<Number, EvalError> {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => x
            .checked_add(y)
            .map(Number::Int)
            .ok_or(EvalError::IntegerOverflow { operation: "+" }),
        _ => Ok(Number::Float(a.as_f64() + b.as_f64())),
    }
}

fn subtract(a: Number, b: Number) -> Result<Number, EvalError> {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => x
            .checked_sub(y)
            .map(Number::Int)
            .ok_or(EvalError::IntegerOverflow { operation: "-" }),
        _ => Ok(Number::Float(a.as_f64() - b.as_f64())),
    }
}

fn multiply(a: Number, b: Number) -> Result<Number, EvalError> {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => x
            .checked_mul(y)
            .map(Number::Int)
            .ok_or(EvalError::IntegerOverflow { operation: "*" }),
        _ => Ok(Number::Float(a.as_f64() * b.as_f64())),
    }
}

/// Exact integer quotients stay integers; anything else is a float.
fn divide(a: Number, b: Number) -> Result<Number, EvalError> {
    if b.is_zero() {
        return Err(EvalError::DivideByZero);
    }
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => match x.checked_rem(y) {
            None => Err(EvalError::IntegerOverflow { operation: "/" }),
            Some(0) => Ok(Number::Int(x / y)),
            Some(_) => Ok(Number::Float(x as f64 / y as f64)),
        },
        _ => Ok(Number::Float(a.as_f64() / b.as_f64())),
    }
}

fn quot(a: Number, b: Number) -> Result<Number, EvalError> {
    if b.is_zero() {
        return Err(EvalError::DivideByZero);
    }
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => x
            .checked_div(y)
            .map(Number::Int)
            .ok_or(EvalError::IntegerOverflow { operation: "quot" }),
        _ => Ok(Number::Float((a.as_f64() / b.as_f64()).trunc())),
    }
}

fn rem(a: Number, b: Number) -> Result<Number, EvalError> {
    if b.is_zero() {
        return Err(EvalError::DivideByZero);
    }
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => x
            .checked_rem(y)
            .map(Number::Int)
            .ok_or(EvalError::IntegerOverflow { operation: "rem" }),
        _ => Ok(Number::Float(a.as_f64() % b.as_f64())),
    }
}

/// Remainder taking the sign of the divisor.
fn modulo(a: Number, b: Number) -> Result<Number, EvalError> {
    let r = rem(a, b)?;
    let adjust = match (r, b) {
        (Number::Int(r), Number::Int(d)) => r != 0 && (r < 0) != (d < 0),
        (r, d) => r.as_f64() != 0.0 && (r.as_f64() < 0.0) != (d.as_f64() < 0.0),
    };
    if adjust { add(r, b) } else { Ok(r) }
}

fn fold_numbers(
    function: &str,
    args: &[Value],
    init: Number,
    op: fn(Number, Number) -> Result<Number, EvalError>,
) -> Result<Value, EvalError> {
    let mut acc = init;
    for arg in args {
        acc = op(acc, Number::from_value(function, arg)?)?;
    }
    Ok(acc.into_value())
}

fn binary_numbers(
    function: &str,
    args: &[Value],
    op: fn(Number, Number) -> Result<Number, EvalError>,
) -> Result<Value, EvalError> {
    let a = Number::from_value(function, &args[0])?;
    let b = Number::from_value(function, &args[1])?;
    op(a, b).map(Number::into_value)
}

fn numbers(function: &str, args: &[Value]) -> Result<Vec<Number>, EvalError> {
    args.iter().map(|arg| Number::from_value(function, arg)).collect()
}

fn compare_chain(
    function: &str,
    args: &[Value],
    accept: fn(Ordering) -> bool,
) -> Result<Value, EvalError> {
    let numbers = numbers(function, args)?;
    let holds = numbers
        .windows(2)
        .all(|pair| pair[0].compare(pair[1]).is_some_and(accept));
    Ok(Value::Bool(holds))
}

fn extremum(function: &str, args: &[Value], wanted: Ordering) -> Result<Value, EvalError> {
    let numbers = numbers(function, args)?;
    let mut best = numbers[0];
    for candidate in &numbers[1..] {
        if candidate.compare(best) == Some(wanted) {
            best = *candidate;
        }
    }
    Ok(best.into_value())
}

// ============================================================================
// Collections
// ============================================================================

fn seq_of(function: &str, value: &Value) -> Result<Seq, EvalError> {
    Seq::from_value(value).ok_or_else(|| {
        EvalError::invalid_argument(
            function,
            format!("expected a collection, got {}", value.type_name()),
        )
    })
}

fn index_arg(function: &str, value: &Value) -> Result<i64, EvalError> {
    match value {
        Value::Int(n) => Ok(*n),
        other => Err(EvalError::invalid_argument(
            function,
            format!("index must be an integer, got {}", other.type_name()),
        )),
    }
}

fn builtin_hash_map(args: &[Value]) -> Result<Value, EvalError> {
    if args.len() % 2 != 0 {
        return Err(EvalError::invalid_argument(
            "hash-map",
            "expects an even number of arguments",
        ));
    }
    let mut map = HashMap::new();
    for pair in args.chunks(2) {
        map.insert(pair[0].clone(), pair[1].clone());
    }
    Ok(Value::Map(map))
}

/// (nth coll index) / (nth coll index fallback)
fn builtin_nth(args: &[Value]) -> Result<Value, EvalError> {
    let index = index_arg("nth", &args[1])?;
    let fallback = args.get(2).cloned();
    let (found, length) = match &args[0] {
        Value::Nil => return Ok(fallback.unwrap_or(Value::Nil)),
        Value::Vector(items) => (
            usize::try_from(index).ok().and_then(|i| items.get(i).cloned()),
            items.len(),
        ),
        Value::String(s) => (
            usize::try_from(index)
                .ok()
                .and_then(|i| s.chars().nth(i))
                .map(Value::Char),
            s.chars().count(),
        ),
        other => nth_of_seq(other, index)?,
    };
    match (found, fallback) {
        (Some(value), _) => Ok(value),
        (None, Some(fallback)) => Ok(fallback),
        (None, None) => Err(EvalError::OutOfBounds { index, length }),
    }
}

/// Walks at most `index + 1` elements, so an infinite seq never hangs.
/// The reported length counts only the elements realised; a negative
/// index realises none.
fn nth_of_seq(value: &Value, index: i64) -> Result<(Option<Value>, usize), EvalError> {
    let seq = seq_of("nth", value)?;
    let Ok(wanted) = usize::try_from(index) else {
        return Ok((None, 0));
    };
    let mut visited = 0;
    for item in seq.iter() {
        let item = item?;
        if visited == wanted {
            return Ok((Some(item), visited + 1));
        }
        visited += 1;
    }
    Ok((None, visited))
}

fn collection_len(value: &Value) -> Result<usize, EvalError> {
    match value {
        Value::Nil => Ok(0),
        Value::Vector(items) => Ok(items.len()),
        Value::Map(entries) => Ok(entries.len()),
        Value::String(s) => Ok(s.chars().count()),
        other => {
            let mut count = 0;
            for item in seq_of("count", other)?.iter() {
                item?;
                count += 1;
            }
            Ok(count)
        }
    }
}

fn builtin_count(value: &Value) -> Result<Value, EvalError> {
    let len = collection_len(value)?;
    i64::try_from(len)
        .map(Value::Int)
        .map_err(|_| EvalError::IntegerOverflow { operation: "count" })
}

/// (get coll key) / (get coll key fallback)
fn builtin_get(args: &[Value]) -> Result<Value, EvalError> {
    let fallback = args.get(2).cloned().unwrap_or(Value::Nil);
    let found = match (&args[0], &args[1]) {
        (Value::Map(entries), key) => entries.get(key).cloned(),
        (Value::Vector(items), Value::Int(i)) => {
            usize::try_from(*i).ok().and_then(|i| items.get(i).cloned())
        }
        (Value::String(s), Value::Int(i)) => usize::try_from(*i)
            .ok()
            .and_then(|i| s.chars().nth(i))
            .map(Value::Char),
        _ => None,
    };
    Ok(found.unwrap_or(fallback))
}

fn builtin_assoc(args: &[Value]) -> Result<Value, EvalError> {
    if (args.len() - 1) % 2 != 0 {
        return Err(EvalError::invalid_argument(
            "assoc",
            "expects key/value pairs after the collection",
        ));
    }
    match &args[0] {
        Value::Nil | Value::Map(_) => {
            let mut map = match &args[0] {
                Value::Map(entries) => entries.clone(),
                _ => HashMap::new(),
            };
            for pair in args[1..].chunks(2) {
                map.insert(pair[0].clone(), pair[1].clone());
            }
            Ok(Value::Map(map))
        }
        Value::Vector(items) => {
            let mut items = items.clone();
            for pair in args[1..].chunks(2) {
                let index = index_arg("assoc", &pair[0])?;
                match usize::try_from(index) {
                    Ok(i) if i < items.len() => {
                        items.set(i, pair[1].clone());
                    }
                    Ok(i) if i == items.len() => items.push_back(pair[1].clone()),
                    _ => {
                        return Err(EvalError::OutOfBounds {
                            index,
                            length: items.len(),
                        });
                    }
                }
            }
            Ok(Value::Vector(items))
        }
        other => Err(EvalError::invalid_argument(
            "assoc",
            format!("expected a map or vector, got {}", other.type_name()),
        )),
    }
}

fn builtin_dissoc(args: &[Value]) -> Result<Value, EvalError> {
    match &args[0] {
        Value::Nil => Ok(Value::Nil),
        Value::Map(entries) => {
            let mut map = entries.clone();
            for key in &args[1..] {
                map.remove(key);
            }
            Ok(Value::Map(map))
        }
        other => Err(EvalError::invalid_argument(
            "dissoc",
            format!("expected a map, got {}", other.type_name()),
        )),
    }
}

/// Vectors grow at the end, lists at the front, maps take `[k v]` entries.
fn builtin_conj(args: &[Value]) -> Result<Value, EvalError> {
    let items = &args[1..];
    match &args[0] {
        Value::Nil => Ok(Value::Seq(
            items
                .iter()
                .fold(Seq::empty(), |seq, item| Seq::cons(item.clone(), seq)),
        )),
        Value::Seq(seq) => Ok(Value::Seq(
            items
                .iter()
                .fold(seq.clone(), |seq, item| Seq::cons(item.clone(), seq)),
        )),
        Value::Vector(vector) => {
            let mut vector = vector.clone();
            vector.extend(items.iter().cloned());
            Ok(Value::Vector(vector))
        }
        Value::Map(entries) => {
            let mut map = entries.clone();
            for item in items {
                match item {
                    Value::Vector(pair) if pair.len() == 2 => {
                        map.insert(pair[0].clone(), pair[1].clone());
                    }
                    Value::Map(other) => map.extend(other.clone()),
                    other => {
                        return Err(EvalError::invalid_argument(
                            "conj",
                            format!("map entries must be [key value] vectors, got {}", other.type_name()),
                        ));
                    }
                }
            }
            Ok(Value::Map(map))
        }
        other => Err(EvalError::invalid_argument(
            "conj",
            format!("cannot add to {}", other.type_name()),
        )),
    }
}

fn map_part(
    function: &str,
    value: &Value,
    part: fn((&Value, &Value)) -> Value,
) -> Result<Value, EvalError> {
    match value {
        Value::Nil => Ok(Value::Nil),
        Value::Map(entries) if entries.is_empty() => Ok(Value::Nil),
        Value::Map(entries) => Ok(Value::list(entries.iter().map(part))),
        other => Err(EvalError::invalid_argument(
            function,
            format!("expected a map, got {}", other.type_name()),
        )),
    }
}

fn builtin_contains(collection: &Value, key: &Value) -> Result<Value, EvalError> {
    let found = match (collection, key) {
        (Value::Nil, _) => false,
        (Value::Map(entries), key) => entries.contains_key(key),
        (Value::Vector(items), Value::Int(i)) => usize::try_from(*i).is_ok_and(|i| i < items.len()),
        (Value::String(s), Value::Int(i)) => {
            usize::try_from(*i).is_ok_and(|i| i < s.chars().count())
        }
        (Value::Vector(_) | Value::String(_), _) => false,
        (other, _) => {
            return Err(EvalError::invalid_argument(
                "contains?",
                format!("not supported on {}", other.type_name()),
            ));
        }
    };
    Ok(Value::Bool(found))
}

/// (reduce f coll) / (reduce f init coll), applying `f` through the shared
/// application entry point.
fn builtin_reduce(args: &[Value], context: &Context) -> Result<Value, EvalError> {
    let function = &args[0];
    let (init, collection) = match args {
        [_, init, collection] => (Some(init.clone()), collection),
        [_, collection] => (None, collection),
        _ => unreachable!("arity checked by call_builtin"),
    };
    let mut items = seq_of("reduce", collection)?.iter();
    let mut acc = match init {
        Some(init) => init,
        None => match items.next().transpose()? {
            Some(first) => first,
            None => return context.apply(function, Params::new())?.into_value(),
        },
    };
    for item in items {
        acc = context
            .apply(function, Params::from([acc, item?]))?
            .into_value()?;
    }
    Ok(acc)
}

// ============================================================================
// Text and output
// ============================================================================

/// (subs s start) / (subs s start end), indexed by character.
fn builtin_subs(args: &[Value]) -> Result<Value, EvalError> {
    let Value::String(s) = &args[0] else {
        return Err(EvalError::invalid_argument(
            "subs",
            format!("expected a string, got {}", args[0].type_name()),
        ));
    };
    let length = s.chars().count();
    let start = index_arg("subs", &args[1])?;
    let end = match args.get(2) {
        Some(end) => index_arg("subs", end)?,
        None => length as i64,
    };
    let in_range = |i: i64| usize::try_from(i).ok().filter(|i| *i <= length);
    let (Some(from), Some(to)) = (in_range(start), in_range(end)) else {
        return Err(EvalError::OutOfBounds {
            index: if in_range(start).is_none() { start } else { end },
            length,
        });
    };
    if from > to {
        return Err(EvalError::OutOfBounds { index: start, length: to });
    }
    Ok(Value::string(s.chars().skip(from).take(to - from).collect::<String>()))
}

fn print(args: &[Value], context: &Context, debug: bool, newline: bool) -> Result<Value, EvalError> {
    let mut out = String::new();
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&describe(arg, Some(context), debug)?);
    }
    if newline {
        out.push('\n');
    }
    context.runtime().write_output(&out)?;
    Ok(Value::Nil)
}

// ============================================================================
// Symbols
// ============================================================================

fn name_arg(function: &str, value: &Value, context: &Context) -> Result<String, EvalError> {
    match value {
        Value::String(s) => Ok(s.to_string()),
        Value::Symbol(symbol) | Value::Keyword(symbol) => Ok(context.symbol_name(*symbol)),
        other => Err(EvalError::invalid_argument(
            function,
            format!("expected a string or symbol, got {}", other.type_name()),
        )),
    }
}

/// `(symbol "name")`, `(symbol "ns/name")` or `(symbol "ns" "name")`.
fn symbol_from_args(function: &str, args: &[Value], context: &Context) -> Result<Symbol, EvalError> {
    match args {
        [name] => {
            let name = name_arg(function, name, context)?;
            match name.split_once('/') {
                Some((ns, local)) if !ns.is_empty() && !local.is_empty() => Ok(Symbol::qualified(
                    context.intern(ns),
                    context.intern(local),
                )),
                _ => Ok(Symbol::unqualified(context.intern(&name))),
            }
        }
        [ns, name] => {
            let local = name_arg(function, name, context)?;
            match ns {
                Value::Nil => Ok(Symbol::unqualified(context.intern(&local))),
                ns => {
                    let ns = name_arg(function, ns, context)?;
                    Ok(Symbol::qualified(context.intern(&ns), context.intern(&local)))
                }
            }
        }
        _ => unreachable!("arity checked by call_builtin"),
    }
}

// ============================================================================
// Namespaces
// ============================================================================

fn namespace_arg(function: &str, value: &Value) -> Result<InternedId, EvalError> {
    match value {
        Value::Namespace(ns) => Ok(*ns),
        Value::Symbol(symbol) if !symbol.is_qualified() => Ok(symbol.name),
        other => Err(EvalError::invalid_argument(
            function,
            format!("expected a namespace or symbol, got {}", other.type_name()),
        )),
    }
}

fn refer_error(err: ReferError, target: InternedId, context: &Context) -> EvalError {
    match err {
        ReferError::MissingNamespace(ns) => EvalError::InvalidNamespace {
            namespace: context.name(ns).to_string(),
        },
        ReferError::Conflict(name) => EvalError::VarRebinding {
            symbol: context.name(name).to_string(),
            namespace: context.name(target).to_string(),
        },
    }
}

/// Switch to a namespace, creating it (with `core` referred) when missing.
fn ns_set(value: &Value, context: &Context) -> Result<Value, EvalError> {
    let ns = namespace_arg("ns-set", value)?;
    let runtime = context.runtime();
    let created = runtime.with_namespaces(|namespaces| namespaces.get_or_create(ns).1);
    if created && ns != Interner::CORE {
        runtime
            .with_namespaces(|namespaces| namespaces.refer(ns, Interner::CORE))
            .map_err(|err| refer_error(err, ns, context))?;
    }
    runtime.set_current_namespace(ns);
    Ok(Value::Namespace(ns))
}

fn ns_refer(value: &Value, context: &Context) -> Result<Value, EvalError> {
    let source = namespace_arg("ns-refer", value)?;
    let target = context.runtime().current_namespace();
    context
        .runtime()
        .with_namespaces(|namespaces| namespaces.refer(target, source))
        .map_err(|err| refer_error(err, target, context))?;
    Ok(Value::Nil)
}

fn ns_remove(value: &Value, context: &Context) -> Result<Value, EvalError> {
    let ns = namespace_arg("ns-remove", value)?;
    if ns == Interner::CORE || ns == context.runtime().current_namespace() {
        return Err(EvalError::invalid_argument(
            "ns-remove",
            format!("cannot remove namespace {}", context.name(ns)),
        ));
    }
    match context.runtime().with_namespaces(|namespaces| namespaces.remove(ns)) {
        Some(_) => Ok(Value::Nil),
        None => Err(EvalError::InvalidNamespace {
            namespace: context.name(ns).to_string(),
        }),
    }
}

fn ns_unmap(ns: &Value, symbol: &Value, context: &Context) -> Result<Value, EvalError> {
    let ns = namespace_arg("ns-unmap", ns)?;
    let Value::Symbol(symbol) = symbol else {
        return Err(EvalError::invalid_argument(
            "ns-unmap",
            format!("expected a symbol, got {}", symbol.type_name()),
        ));
    };
    let found = context.runtime().with_namespaces(|namespaces| {
        namespaces
            .get_mut(ns)
            .map(|namespace| namespace.unmap(symbol.name))
    });
    match found {
        Some(_) => Ok(Value::Nil),
        None => Err(EvalError::InvalidNamespace {
            namespace: context.name(ns).to_string(),
        }),
    }
}

// ============================================================================
// Regular expressions
// ============================================================================

fn compile_pattern(function: &str, value: &Value) -> Result<RegexPattern, EvalError> {
    match value {
        Value::String(source) => RegexPattern::new(source)
            .map_err(|err| EvalError::invalid_argument(function, err.to_string())),
        other => Err(EvalError::invalid_argument(
            function,
            format!("expected a pattern or string, got {}", other.type_name()),
        )),
    }
}

fn with_pattern<T>(
    function: &str,
    pattern: &Value,
    f: impl FnOnce(&RegexPattern) -> T,
) -> Result<T, EvalError> {
    if let Value::Auxiliary(aux) = pattern
        && let Some(pattern) = aux.as_any().downcast_ref::<RegexPattern>()
    {
        return Ok(f(pattern));
    }
    let compiled = compile_pattern(function, pattern)?;
    Ok(f(&compiled))
}

fn text_arg<'a>(function: &str, value: &'a Value) -> Result<&'a str, EvalError> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(EvalError::invalid_argument(
            function,
            format!("expected a string, got {}", other.type_name()),
        )),
    }
}

/// The whole match alone, or `[whole group...]` when the pattern has groups.
fn match_value(captures: &regex::Captures<'_>) -> Value {
    if captures.len() == 1 {
        return Value::string(&captures[0]);
    }
    Value::vector(
        captures
            .iter()
            .map(|group| group.map_or(Value::Nil, |m| Value::string(m.as_str()))),
    )
}

fn re_find(pattern: &Value, text: &Value) -> Result<Value, EvalError> {
    let text = text_arg("re-find", text)?;
    with_pattern("re-find", pattern, |pattern| {
        pattern
            .regex()
            .captures(text)
            .map_or(Value::Nil, |captures| match_value(&captures))
    })
}

/// Like `re-find`, but the match must span the whole string.
fn re_matches(pattern: &Value, text: &Value) -> Result<Value, EvalError> {
    let text = text_arg("re-matches", text)?;
    with_pattern("re-matches", pattern, |pattern| {
        let anchored = RegexPattern::new(&format!("^(?:{})$", pattern.regex().as_str()));
        match anchored {
            Ok(anchored) => anchored
                .regex()
                .captures(text)
                .map_or(Value::Nil, |captures| match_value(&captures)),
            Err(_) => Value::Nil,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for id in BuiltinId::ALL {
            assert_eq!(BuiltinId::from_name(id.name()), Some(id));
        }
    }

    #[test]
    fn integer_division_is_exact_when_possible() {
        assert!(matches!(
            divide(Number::Int(6), Number::Int(3)),
            Ok(Number::Int(2))
        ));
        assert!(matches!(
            divide(Number::Int(7), Number::Int(2)),
            Ok(Number::Float(f)) if f == 3.5
        ));
        assert_eq!(
            divide(Number::Int(1), Number::Int(0)).unwrap_err(),
            EvalError::DivideByZero
        );
    }

    #[test]
    fn overflow_is_reported() {
        assert_eq!(
            add(Number::Int(i64::MAX), Number::Int(1)).unwrap_err(),
            EvalError::IntegerOverflow { operation: "+" }
        );
        assert_eq!(
            divide(Number::Int(i64::MIN), Number::Int(-1)).unwrap_err(),
            EvalError::IntegerOverflow { operation: "/" }
        );
    }

    #[test]
    fn modulo_follows_divisor_sign() {
        assert!(matches!(modulo(Number::Int(-7), Number::Int(3)), Ok(Number::Int(2))));
        assert!(matches!(modulo(Number::Int(7), Number::Int(-3)), Ok(Number::Int(-2))));
        assert!(matches!(rem(Number::Int(-7), Number::Int(3)), Ok(Number::Int(-1))));
    }
}

//! Primitive forms whose arguments are handed over unevaluated.

use std::rc::Rc;

use super::context::Context;
use super::error::{Arity, EvalError};
use super::function::{Closure, SingleArity};
use super::interner::Interner;
use super::params::Params;
use super::seq::Seq;
use super::value::{Symbol, Value};
use super::{EvalResult, Outcome};
use crate::config::LogDomain;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecialForm {
    Quote,
    If,
    Do,
    Def,
    Let,
    Var,
    Fn,
    Defmacro,
    Loop,
    Recur,
    Apply,
    Attempt,
}

impl SpecialForm {
    pub const ALL: [SpecialForm; 12] = [
        SpecialForm::Quote,
        SpecialForm::If,
        SpecialForm::Do,
        SpecialForm::Def,
        SpecialForm::Let,
        SpecialForm::Var,
        SpecialForm::Fn,
        SpecialForm::Defmacro,
        SpecialForm::Loop,
        SpecialForm::Recur,
        SpecialForm::Apply,
        SpecialForm::Attempt,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SpecialForm::Quote => "quote",
            SpecialForm::If => "if",
            SpecialForm::Do => "do",
            SpecialForm::Def => "def",
            SpecialForm::Let => "let",
            SpecialForm::Var => "var",
            SpecialForm::Fn => "fn",
            SpecialForm::Defmacro => "defmacro",
            SpecialForm::Loop => "loop",
            SpecialForm::Recur => "recur",
            SpecialForm::Apply => "apply",
            SpecialForm::Attempt => "attempt",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|form| form.name() == name)
    }

    pub fn evaluate(self, args: &Params, context: &Context) -> EvalResult {
        match self {
            SpecialForm::Quote => quote(args),
            SpecialForm::If => if_form(args, context),
            SpecialForm::Do => context.evaluate_body(args),
            SpecialForm::Def => def(args, context),
            SpecialForm::Let => let_form(args, context),
            SpecialForm::Var => var(args, context),
            SpecialForm::Fn => fn_form(args, context),
            SpecialForm::Defmacro => defmacro(args, context),
            SpecialForm::Loop => loop_form(args, context),
            SpecialForm::Recur => recur(args, context),
            SpecialForm::Apply => apply(args, context),
            SpecialForm::Attempt => attempt(args, context),
        }
    }
}

fn quote(args: &Params) -> EvalResult {
    match args.len() {
        0 => Ok(Outcome::Value(Value::Nil)),
        1 => Ok(Outcome::Value(args[0].clone())),
        got => Err(EvalError::arity("quote", Arity::Range(0, 1), got)),
    }
}

fn if_form(args: &Params, context: &Context) -> EvalResult {
    if !(2..=3).contains(&args.len()) {
        return Err(EvalError::arity("if", Arity::Range(2, 3), args.len()));
    }
    if context.evaluate_value(&args[0])?.is_truthy() {
        context.evaluate(&args[1])
    } else if let Some(otherwise) = args.get(2) {
        context.evaluate(otherwise)
    } else {
        Ok(Outcome::Value(Value::Nil))
    }
}

/// The unqualified name a definition targets. A qualified name is accepted
/// only when it names the current namespace.
fn definition_target(form: &Value, label: &str, context: &Context) -> Result<Symbol, EvalError> {
    let Value::Symbol(symbol) = form else {
        return Err(EvalError::invalid_argument(
            label,
            format!("first argument must be a symbol, got {}", form.type_name()),
        ));
    };
    let current = context.runtime().current_namespace();
    match symbol.ns {
        Some(ns) if ns != current => Err(EvalError::QualifiedSymbolMisuse {
            symbol: context.symbol_name(*symbol),
            namespace: context.name(current).to_string(),
        }),
        _ => Ok(Symbol::unqualified(symbol.name)),
    }
}

fn def(args: &Params, context: &Context) -> EvalResult {
    if !(1..=2).contains(&args.len()) {
        return Err(EvalError::arity("def", Arity::Range(1, 2), args.len()));
    }
    let target = definition_target(&args[0], "def", context)?;
    let var = match args.get(1) {
        Some(init) => {
            let value = context.evaluate_value(init)?;
            context.set_var(target.name, value)?
        }
        None => context.set_unbound_var(target.name)?,
    };
    if context.logging(LogDomain::Eval) {
        tracing::debug!(
            target: "tamarind::eval",
            var = %context.symbol_name(var.name()),
            bound = var.is_bound(),
            "def"
        );
    }
    Ok(Outcome::Value(Value::Var(var)))
}

/// Split a binding vector into `(symbol, init)` pairs.
fn binding_pairs(
    form: Option<&Value>,
    label: &'static str,
) -> Result<Vec<(Symbol, Value)>, EvalError> {
    let Some(Value::Vector(bindings)) = form else {
        return Err(EvalError::invalid_argument(
            label,
            "first argument must be a binding vector",
        ));
    };
    if bindings.len() % 2 != 0 {
        return Err(EvalError::BindingMismatch { form: label });
    }
    let mut pairs = Vec::with_capacity(bindings.len() / 2);
    let mut items = bindings.iter();
    while let (Some(target), Some(init)) = (items.next(), items.next()) {
        match target {
            Value::Symbol(symbol) if !symbol.is_qualified() => pairs.push((*symbol, init.clone())),
            other => {
                return Err(EvalError::invalid_argument(
                    label,
                    format!(
                        "binding target must be an unqualified symbol, got {}",
                        other.type_name()
                    ),
                ));
            }
        }
    }
    Ok(pairs)
}

/// Evaluate binding pairs left to right into a fresh frame.
fn bind_sequentially(pairs: Vec<(Symbol, Value)>, context: &Context) -> Result<Context, EvalError> {
    let mut scope = context.child();
    for (symbol, init) in pairs {
        let value = scope.evaluate_value(&init)?;
        scope.push(value, symbol);
    }
    Ok(scope)
}

fn let_form(args: &Params, context: &Context) -> EvalResult {
    let pairs = binding_pairs(args.first(), "let")?;
    let scope = bind_sequentially(pairs, context)?;
    scope.evaluate_body(&args[1..])
}

fn var(args: &Params, context: &Context) -> EvalResult {
    if args.len() != 1 {
        return Err(EvalError::arity("var", Arity::Exact(1), args.len()));
    }
    let Value::Symbol(symbol) = &args[0] else {
        return Err(EvalError::invalid_argument(
            "var",
            format!("expected a symbol, got {}", args[0].type_name()),
        ));
    };
    context
        .resolve_var(*symbol)
        .map(|var| Outcome::Value(Value::Var(var)))
        .ok_or_else(|| EvalError::InvalidSymbol {
            symbol: context.symbol_name(*symbol),
        })
}

fn parse_params(form: &Value, label: &str) -> Result<(Vec<Symbol>, Option<Symbol>), EvalError> {
    let Value::Vector(items) = form else {
        return Err(EvalError::invalid_argument(
            label,
            format!("parameter list must be a vector, got {}", form.type_name()),
        ));
    };
    let mut params = Vec::with_capacity(items.len());
    let mut items = items.iter();
    while let Some(item) = items.next() {
        match item {
            Value::Symbol(symbol) if symbol.ns.is_none() && symbol.name == Interner::AMPERSAND => {
                let rest = match (items.next(), items.next()) {
                    (Some(Value::Symbol(rest)), None) if !rest.is_qualified() => *rest,
                    _ => {
                        return Err(EvalError::invalid_argument(
                            label,
                            "& must be followed by exactly one symbol",
                        ));
                    }
                };
                return Ok((params, Some(rest)));
            }
            Value::Symbol(symbol) if !symbol.is_qualified() => params.push(*symbol),
            other => {
                return Err(EvalError::invalid_argument(
                    label,
                    format!("parameters must be unqualified symbols, got {}", other.type_name()),
                ));
            }
        }
    }
    Ok((params, None))
}

fn parse_clause(params: &Value, body: &[Value], label: &str) -> Result<SingleArity, EvalError> {
    let (params, variadic) = parse_params(params, label)?;
    Ok(SingleArity {
        params,
        variadic,
        body: body.to_vec(),
    })
}

/// Parse `[params] body...` or `([params] body...)+`.
fn parse_arities(forms: &[Value], label: &str) -> Result<Vec<SingleArity>, EvalError> {
    match forms.first() {
        None => Err(EvalError::invalid_argument(label, "missing parameter vector")),
        Some(Value::Vector(_)) => Ok(vec![parse_clause(&forms[0], &forms[1..], label)?]),
        Some(_) => forms
            .iter()
            .map(|form| {
                let clause = match form {
                    Value::Seq(seq) => seq.to_vec()?,
                    other => {
                        return Err(EvalError::invalid_argument(
                            label,
                            format!("expected an arity clause, got {}", other.type_name()),
                        ));
                    }
                };
                match clause.split_first() {
                    Some((params, body)) => parse_clause(params, body, label),
                    None => Err(EvalError::invalid_argument(label, "empty arity clause")),
                }
            })
            .collect(),
    }
}

fn fn_form(args: &Params, context: &Context) -> EvalResult {
    let (name, clauses) = match args.first() {
        Some(Value::Symbol(name)) if !name.is_qualified() => (Some(*name), &args[1..]),
        _ => (None, &args[..]),
    };
    let label = name.map_or_else(|| "fn".to_string(), |name| context.symbol_name(name));
    let arities = parse_arities(clauses, &label)?;
    let closure = Closure::new(name, arities, context.scope().clone(), &label)?;
    Ok(Outcome::Value(Value::Function(Rc::new(closure))))
}

fn defmacro(args: &Params, context: &Context) -> EvalResult {
    let Some(target) = args.first() else {
        return Err(EvalError::arity("defmacro", Arity::AtLeast(2), 0));
    };
    let name = definition_target(target, "defmacro", context)?;
    let mut clauses = &args[1..];
    // Optional docstring.
    if let Some(Value::String(_)) = clauses.first()
        && clauses.len() > 1
    {
        clauses = &clauses[1..];
    }
    let label = context.symbol_name(name);
    let arities = parse_arities(clauses, &label)?;
    let closure = Closure::new(Some(name), arities, context.scope().clone(), &label)?;
    let var = context.set_var(name.name, Value::Macro(Rc::new(closure)))?;
    Ok(Outcome::Value(Value::Var(var)))
}

fn loop_form(args: &Params, context: &Context) -> EvalResult {
    let pairs = binding_pairs(args.first(), "loop")?;
    let scope = bind_sequentially(pairs, context)?;
    let body = &args[1..];
    loop {
        match scope.evaluate_body(body)? {
            Outcome::Value(value) => return Ok(Outcome::Value(value)),
            Outcome::Recur(values) => {
                let expected = scope.frame_len();
                if values.len() != expected {
                    return Err(EvalError::arity("recur", Arity::Exact(expected), values.len()));
                }
                scope.rebind_positional(values);
            }
        }
    }
}

fn recur(args: &Params, context: &Context) -> EvalResult {
    let mut values = Params::with_capacity(args.len());
    for form in args {
        values.push(context.evaluate_value(form)?);
    }
    Ok(Outcome::Recur(values))
}

fn apply(args: &Params, context: &Context) -> EvalResult {
    if args.len() < 2 {
        return Err(EvalError::arity("apply", Arity::AtLeast(2), args.len()));
    }
    let function = context.evaluate_value(&args[0])?;
    let last = &args[args.len() - 1];
    let leading = &args[1..args.len() - 1];

    let mut call_args = Params::with_capacity(args.len());
    for form in leading {
        call_args.push(context.evaluate_value(form)?);
    }
    let spread = context.evaluate_value(last)?;
    let Some(seq) = Seq::from_value(&spread) else {
        return Err(EvalError::invalid_argument(
            "apply",
            format!("last argument must be a collection or nil, got {}", spread.type_name()),
        ));
    };
    for item in seq.iter() {
        call_args.push(item?);
    }
    context.apply(&function, call_args)
}

fn attempt(args: &Params, context: &Context) -> EvalResult {
    let mut last_failure = EvalError::arity("attempt", Arity::AtLeast(1), 0);
    for form in args {
        match context.evaluate(form) {
            Ok(Outcome::Value(value)) => return Ok(Outcome::Value(value)),
            Ok(Outcome::Recur(_)) => last_failure = EvalError::RecurMisuse,
            Err(err) => last_failure = err,
        }
    }
    Err(last_failure)
}

//! The `evaluate`/`apply` dispatch core.

use std::rc::Rc;

use super::builtins::call_builtin;
use super::context::Context;
use super::error::{Arity, EvalError};
use super::function::Closure;
use super::params::Params;
use super::seq::Seq;
use super::value::{Symbol, Value};
use super::{EvalResult, Outcome};
use crate::config::LogDomain;

impl Context {
    pub fn evaluate(&self, form: &Value) -> EvalResult {
        self.evaluate_form(form, false)
    }

    /// Evaluate where only a plain value is acceptable.
    pub fn evaluate_value(&self, form: &Value) -> Result<Value, EvalError> {
        self.evaluate(form)?.into_value()
    }

    /// `first_in_seq` is set for the head of a list form, the only place a
    /// macro may be looked up.
    pub fn evaluate_form(&self, form: &Value, first_in_seq: bool) -> EvalResult {
        match form {
            Value::Nil
            | Value::Bool(_)
            | Value::Int(_)
            | Value::Float(_)
            | Value::Char(_)
            | Value::String(_)
            | Value::Keyword(_)
            | Value::Namespace(_)
            | Value::Var(_)
            | Value::Unbound(_)
            | Value::Auxiliary(_)
            | Value::Function(_)
            | Value::BuiltIn(_) => Ok(Outcome::Value(form.clone())),
            Value::Macro(closure) => {
                if first_in_seq {
                    Ok(Outcome::Value(form.clone()))
                } else {
                    Err(self.macro_as_value(closure))
                }
            }
            Value::Symbol(symbol) => self.evaluate_symbol(*symbol, first_in_seq),
            Value::Special(special) => Err(EvalError::EvaluatingSpecialForm {
                form: special.name(),
            }),
            Value::ReaderMacro(reader_macro) => Err(EvalError::invalid_argument(
                "eval",
                format!("unexpanded reader macro {}", reader_macro.prefix()),
            )),
            Value::Vector(items) => {
                let mut evaluated = im_rc::Vector::new();
                for item in items {
                    evaluated.push_back(self.evaluate_value(item)?);
                }
                Ok(Outcome::Value(Value::Vector(evaluated)))
            }
            Value::Map(entries) => {
                let mut evaluated = im_rc::HashMap::new();
                for (key, value) in entries {
                    let key = self.evaluate_value(key)?;
                    let value = self.evaluate_value(value)?;
                    evaluated.insert(key, value);
                }
                Ok(Outcome::Value(Value::Map(evaluated)))
            }
            Value::Seq(list) => self.evaluate_list(list),
        }
    }

    fn evaluate_symbol(&self, symbol: Symbol, first_in_seq: bool) -> EvalResult {
        match self.resolve_binding(symbol) {
            Some(Value::Macro(closure)) if !first_in_seq => Err(self.macro_as_value(&closure)),
            Some(value) => Ok(Outcome::Value(value)),
            None => Err(EvalError::InvalidSymbol {
                symbol: self.symbol_name(symbol),
            }),
        }
    }

    fn macro_as_value(&self, closure: &Closure) -> EvalError {
        EvalError::EvaluatingMacro {
            name: closure
                .name()
                .map_or_else(|| "macro".to_string(), |name| self.symbol_name(name)),
        }
    }

    fn evaluate_list(&self, list: &Seq) -> EvalResult {
        let Some(head) = list.first()? else {
            return Ok(Outcome::Value(Value::Seq(list.clone())));
        };
        let tail = list.rest()?;

        if self.logging(LogDomain::Eval) {
            let form = Value::Seq(list.clone());
            tracing::debug!(
                target: "tamarind::eval",
                form = %self.describe_lossy(&form),
                "evaluating list form"
            );
        }

        if let Value::Special(special) = head {
            let args: Params = tail.iter().collect::<Result<_, _>>()?;
            return special.evaluate(&args, self);
        }

        let callee = self.evaluate_form(&head, true)?.into_value()?;
        if let Value::Macro(closure) = &callee {
            let forms: Params = tail.iter().collect::<Result<_, _>>()?;
            let expansion = self.expand_macro(closure, forms)?;
            return self.evaluate(&expansion);
        }

        let mut args = Params::new();
        for form in tail.iter() {
            args.push(self.evaluate_value(&form?)?);
        }
        self.apply(&callee, args)
    }

    /// Run a macro over unevaluated forms and return the replacement form.
    pub fn expand_macro(&self, closure: &Rc<Closure>, forms: Params) -> Result<Value, EvalError> {
        let expansion = closure.invoke(self.runtime(), forms, true)?;
        if self.logging(LogDomain::Expand) {
            tracing::debug!(
                target: "tamarind::expand",
                expansion = %self.describe_lossy(&expansion),
                "expanded macro"
            );
        }
        Ok(expansion)
    }

    /// The single application entry point. List evaluation, the `apply`
    /// special form and every higher-order built-in go through here.
    pub fn apply(&self, function: &Value, args: Params) -> EvalResult {
        match function {
            Value::BuiltIn(id) => call_builtin(*id, args, self).map(Outcome::Value),
            Value::Function(closure) => closure
                .invoke(self.runtime(), args, false)
                .map(Outcome::Value),
            Value::Macro(closure) => {
                let expansion = self.expand_macro(closure, args)?;
                self.evaluate(&expansion)
            }
            Value::Vector(items) => {
                if args.len() != 1 {
                    return Err(EvalError::arity("vector", Arity::Exact(1), args.len()));
                }
                let Value::Int(index) = args[0] else {
                    return Err(EvalError::invalid_argument(
                        "vector",
                        format!("index must be an integer, got {}", args[0].type_name()),
                    ));
                };
                usize::try_from(index)
                    .ok()
                    .and_then(|i| items.get(i).cloned())
                    .map(Outcome::Value)
                    .ok_or(EvalError::OutOfBounds {
                        index,
                        length: items.len(),
                    })
            }
            Value::Map(entries) => {
                let fallback = lookup_fallback("map", &args)?;
                Ok(Outcome::Value(
                    entries.get(&args[0]).cloned().unwrap_or(fallback),
                ))
            }
            Value::Keyword(_) | Value::Symbol(_) => {
                let label = function.type_name();
                let fallback = lookup_fallback(label, &args)?;
                let found = match &args[0] {
                    Value::Map(entries) => entries.get(function).cloned(),
                    _ => None,
                };
                Ok(Outcome::Value(found.unwrap_or(fallback)))
            }
            Value::Nil
            | Value::Bool(_)
            | Value::Int(_)
            | Value::Float(_)
            | Value::Char(_)
            | Value::String(_)
            | Value::Seq(_)
            | Value::Namespace(_)
            | Value::Var(_)
            | Value::Unbound(_)
            | Value::Special(_)
            | Value::ReaderMacro(_)
            | Value::Auxiliary(_) => Err(EvalError::NotEvaluable {
                found: self.describe_lossy(function),
            }),
        }
    }

    /// Implicit `do`: a recur signal is legal only from the last form.
    pub fn evaluate_body(&self, forms: &[Value]) -> EvalResult {
        let Some((last, init)) = forms.split_last() else {
            return Ok(Outcome::Value(Value::Nil));
        };
        for form in init {
            self.evaluate_value(form)?;
        }
        self.evaluate(last)
    }

    /// Debug rendering for diagnostics; falls back to the type name.
    pub fn describe_lossy(&self, value: &Value) -> String {
        super::describe::describe(value, Some(self), true)
            .unwrap_or_else(|_| format!("#<{}>", value.type_name()))
    }
}

/// Validate a 1 or 2 argument lookup and return its fallback value.
fn lookup_fallback(label: &str, args: &Params) -> Result<Value, EvalError> {
    match args.len() {
        1 => Ok(Value::Nil),
        2 => Ok(args[1].clone()),
        got => Err(EvalError::arity(label, Arity::Range(1, 2), got)),
    }
}

//! Tree-walking evaluation engine.

pub mod builtins;
pub mod context;
pub mod describe;
pub mod error;
pub mod evaluator;
pub mod function;
pub mod interner;
pub mod namespace;
pub mod params;
pub mod seq;
pub mod special_forms;
pub mod value;

#[cfg(test)]
mod tests;

use std::io::Write;
use std::rc::Rc;

pub use context::{Context, Runtime};
pub use error::{Arity, EvalError};
pub use interner::{InternedId, Interner};
pub use params::Params;
pub use seq::Seq;
pub use value::{Symbol, Value};

use crate::config::{InterpreterConfig, LogDomain};
use crate::error::LangError;

/// What evaluating a form produced: a value, or a request to re-enter the
/// enclosing `loop` or function body with new bindings.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Value(Value),
    Recur(Params),
}

impl Outcome {
    /// A recur signal where a value is required is a misuse.
    pub fn into_value(self) -> Result<Value, EvalError> {
        match self {
            Outcome::Value(value) => Ok(value),
            Outcome::Recur(_) => Err(EvalError::RecurMisuse),
        }
    }
}

pub type EvalResult = Result<Outcome, EvalError>;

/// An interpreter instance: a runtime with `core` populated and `user`
/// as the current namespace.
pub struct Interpreter {
    runtime: Rc<Runtime>,
}

impl Interpreter {
    /// Build an interpreter that prints to stdout.
    pub fn new(config: InterpreterConfig) -> Result<Self, LangError> {
        Self::with_output(config, Box::new(std::io::stdout()))
    }

    pub fn with_output(config: InterpreterConfig, output: Box<dyn Write>) -> Result<Self, LangError> {
        let runtime = Runtime::new(config.log, output);
        let core = Context::root(runtime.clone());

        builtins::install(&core)?;
        for result_var in [Interner::RESULT_1, Interner::RESULT_2, Interner::RESULT_3] {
            core.set_unbound_var(result_var)?;
        }
        if config.load_stdlib {
            crate::runner::load_stdlib(&core)?;
        }

        runtime.with_namespaces(|namespaces| {
            namespaces.get_or_create(Interner::USER);
            namespaces.refer(Interner::USER, Interner::CORE)
        })
        .map_err(|err| {
            EvalError::invalid_argument("bootstrap", format!("cannot refer core: {err:?}"))
        })?;
        runtime.set_current_namespace(Interner::USER);

        Ok(Self { runtime })
    }

    pub fn runtime(&self) -> &Rc<Runtime> {
        &self.runtime
    }

    /// A root context for the current namespace.
    pub fn context(&self) -> Context {
        Context::root(self.runtime.clone())
    }

    pub fn read(&self, source: &str) -> Result<Vec<Value>, LangError> {
        crate::parser::read_forms(source, &self.runtime)
    }

    pub fn evaluate(&self, form: &Value) -> Result<Value, EvalError> {
        self.context().evaluate_value(form)
    }

    /// Read and evaluate every form in `source`, returning the last value.
    pub fn eval_str(&self, source: &str) -> Result<Value, LangError> {
        let mut last = Value::Nil;
        for form in self.read(source)? {
            last = self.evaluate(&form)?;
        }
        Ok(last)
    }

    pub fn apply(&self, function: &Value, args: Params) -> Result<Value, EvalError> {
        self.context().apply(function, args)?.into_value()
    }

    pub fn describe(&self, value: &Value, debug: bool) -> Result<String, EvalError> {
        describe::describe(value, Some(&self.context()), debug)
    }

    /// Shift `*1`, `*2` and `*3` after a REPL evaluation.
    pub fn record_result(&self, value: Value) {
        let vars = self.runtime.with_namespaces(|namespaces| {
            let core = namespaces.get(Interner::CORE)?;
            Some([
                core.own(Interner::RESULT_1)?,
                core.own(Interner::RESULT_2)?,
                core.own(Interner::RESULT_3)?,
            ])
        });
        let Some([first, second, third]) = vars else {
            return;
        };
        if let Some(previous) = second.get() {
            third.set(previous);
        }
        if let Some(previous) = first.get() {
            second.set(previous);
        }
        first.set(value);
    }

    pub fn current_namespace(&self) -> Rc<str> {
        self.runtime.name(self.runtime.current_namespace())
    }

    pub fn set_log(&self, domain: LogDomain, enabled: bool) {
        self.runtime.set_log(domain, enabled);
    }
}

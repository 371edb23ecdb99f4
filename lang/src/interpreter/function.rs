use std::fmt;
use std::rc::Rc;

use super::context::{Context, Runtime, Scope};
use super::error::{Arity, EvalError};
use super::params::Params;
use super::value::{Symbol, Value};
use super::Outcome;

/// One `([params] body...)` clause.
#[derive(Debug, Clone)]
pub struct SingleArity {
    pub params: Vec<Symbol>,
    pub variadic: Option<Symbol>,
    pub body: Vec<Value>,
}

impl SingleArity {
    /// Fixed parameters plus the rest parameter, if any.
    fn binding_count(&self) -> usize {
        self.params.len() + usize::from(self.variadic.is_some())
    }

    fn bind(&self, context: &mut Context, args: Params) {
        let mut args = args.into_iter();
        for param in &self.params {
            if let Some(value) = args.next() {
                context.push(value, *param);
            }
        }
        if let Some(rest_param) = self.variadic {
            let rest: Vec<Value> = args.collect();
            let rest = if rest.is_empty() {
                Value::Nil
            } else {
                Value::list(rest)
            };
            context.push(rest, rest_param);
        }
    }
}

/// A multi-arity closure, shared by functions and macros.
pub struct Closure {
    name: Option<Symbol>,
    fixed: Vec<SingleArity>,
    variadic: Option<SingleArity>,
    scope: Scope,
}

impl Closure {
    /// Validate and assemble the arity clauses. `label` names the form being
    /// built in error messages.
    pub fn new(
        name: Option<Symbol>,
        arities: Vec<SingleArity>,
        scope: Scope,
        label: &str,
    ) -> Result<Self, EvalError> {
        let mut fixed: Vec<SingleArity> = Vec::with_capacity(arities.len());
        let mut variadic: Option<SingleArity> = None;

        for arity in arities {
            if arity.variadic.is_some() {
                if variadic.is_some() {
                    return Err(EvalError::DuplicateVariadicArity {
                        function: label.to_string(),
                    });
                }
                variadic = Some(arity);
            } else {
                if fixed.iter().any(|f| f.params.len() == arity.params.len()) {
                    return Err(EvalError::DuplicateArity {
                        function: label.to_string(),
                        arity: arity.params.len(),
                    });
                }
                fixed.push(arity);
            }
        }

        if let Some(variadic) = &variadic
            && let Some(widest) = fixed.iter().map(|f| f.params.len()).max()
            && widest >= variadic.params.len()
        {
            return Err(EvalError::FixedArityExceedsVariadic {
                function: label.to_string(),
                fixed: widest,
                variadic: variadic.params.len(),
            });
        }

        Ok(Self {
            name,
            fixed,
            variadic,
            scope,
        })
    }

    pub fn name(&self) -> Option<Symbol> {
        self.name
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Exact fixed match first, then the variadic clause.
    fn select(&self, count: usize) -> Option<&SingleArity> {
        self.fixed
            .iter()
            .find(|arity| arity.params.len() == count)
            .or_else(|| {
                self.variadic
                    .as_ref()
                    .filter(|arity| count >= arity.params.len())
            })
    }

    pub fn arity(&self) -> Arity {
        let min_fixed = self.fixed.iter().map(|a| a.params.len()).min();
        let max_fixed = self.fixed.iter().map(|a| a.params.len()).max();
        match (&self.variadic, min_fixed, max_fixed) {
            (Some(variadic), Some(min), _) => Arity::AtLeast(min.min(variadic.params.len())),
            (Some(variadic), None, _) => Arity::AtLeast(variadic.params.len()),
            (None, Some(min), Some(max)) if min == max => Arity::Exact(min),
            (None, Some(min), Some(max)) => Arity::Range(min, max),
            (None, _, _) => Arity::Exact(0),
        }
    }

    fn display_name(&self, runtime: &Runtime) -> String {
        match self.name {
            Some(name) => runtime.symbol_name(name),
            None => "fn".to_string(),
        }
    }

    /// Run the matching clause in a scope rooted at the captured definition
    /// scope. Macros receive unevaluated forms as `args` and return the
    /// expansion.
    pub fn invoke(
        self: &Rc<Self>,
        runtime: &Rc<Runtime>,
        args: Params,
        as_macro: bool,
    ) -> Result<Value, EvalError> {
        let Some(arity) = self.select(args.len()) else {
            return Err(EvalError::arity(
                self.display_name(runtime),
                self.arity(),
                args.len(),
            ));
        };

        // The captured scope is shared with the definition site and must not
        // grow; the self name gets its own frame below the parameter frame.
        let mut context = Context::with_scope(runtime.clone(), self.scope.clone());
        if let Some(name) = self.name {
            let this = if as_macro {
                Value::Macro(self.clone())
            } else {
                Value::Function(self.clone())
            };
            context = context.child();
            context.push(this, Symbol::unqualified(name.name));
        }
        let mut context = context.child();
        arity.bind(&mut context, args);

        loop {
            match context.evaluate_body(&arity.body)? {
                Outcome::Value(value) => return Ok(value),
                Outcome::Recur(values) => {
                    let expected = arity.binding_count();
                    if values.len() != expected {
                        return Err(EvalError::arity("recur", Arity::Exact(expected), values.len()));
                    }
                    context.rebind_positional(values);
                }
            }
        }
    }
}

impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Closure")
            .field("name", &self.name)
            .field("arity", &self.arity())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::interner::Interner;

    fn clause(interner: &mut Interner, params: &[&str], variadic: Option<&str>) -> SingleArity {
        SingleArity {
            params: params
                .iter()
                .map(|p| Symbol::unqualified(interner.intern(p)))
                .collect(),
            variadic: variadic.map(|v| Symbol::unqualified(interner.intern(v))),
            body: vec![Value::Nil],
        }
    }

    #[test]
    fn rejects_duplicate_fixed_arity() {
        let mut interner = Interner::new();
        let arities = vec![
            clause(&mut interner, &["a"], None),
            clause(&mut interner, &["b"], None),
        ];
        let err = Closure::new(None, arities, Scope::default(), "fn").unwrap_err();
        assert_eq!(
            err,
            EvalError::DuplicateArity {
                function: "fn".to_string(),
                arity: 1
            }
        );
    }

    #[test]
    fn rejects_second_variadic_arity() {
        let mut interner = Interner::new();
        let arities = vec![
            clause(&mut interner, &[], Some("xs")),
            clause(&mut interner, &["a"], Some("xs")),
        ];
        let err = Closure::new(None, arities, Scope::default(), "fn").unwrap_err();
        assert!(matches!(err, EvalError::DuplicateVariadicArity { .. }));
    }

    #[test]
    fn variadic_minimum_must_exceed_fixed_arities() {
        let mut interner = Interner::new();
        let arities = vec![
            clause(&mut interner, &["a", "b"], None),
            clause(&mut interner, &["a", "b"], Some("more")),
        ];
        let err = Closure::new(None, arities, Scope::default(), "fn").unwrap_err();
        assert!(matches!(
            err,
            EvalError::FixedArityExceedsVariadic {
                fixed: 2,
                variadic: 2,
                ..
            }
        ));
    }

    #[test]
    fn selects_exact_match_before_variadic() {
        let mut interner = Interner::new();
        let arities = vec![
            clause(&mut interner, &["a"], None),
            clause(&mut interner, &["a", "b"], Some("more")),
        ];
        let closure = Closure::new(None, arities, Scope::default(), "fn").unwrap();
        assert_eq!(closure.select(1).map(|a| a.params.len()), Some(1));
        assert_eq!(closure.select(4).map(|a| a.params.len()), Some(2));
        assert!(closure.select(0).is_none());
        assert_eq!(closure.arity(), Arity::AtLeast(1));
    }
}

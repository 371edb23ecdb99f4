use std::fmt;

/// Number of arguments a callable accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
    Range(usize, usize),
}

impl Arity {
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Exact(n) => count == n,
            Arity::AtLeast(n) => count >= n,
            Arity::Range(min, max) => (min..=max).contains(&count),
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(n) => write!(f, "{n}"),
            Arity::AtLeast(n) => write!(f, "at least {n}"),
            Arity::Range(min, max) => write!(f, "{min} to {max}"),
        }
    }
}

/// Evaluation failure. Read failures live in the lexer and parser.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    Arity {
        function: String,
        expected: Arity,
        got: usize,
    },
    InvalidArgument {
        function: String,
        message: String,
    },
    InvalidSymbol {
        symbol: String,
    },
    QualifiedSymbolMisuse {
        symbol: String,
        namespace: String,
    },
    BindingMismatch {
        form: &'static str,
    },
    DuplicateArity {
        function: String,
        arity: usize,
    },
    DuplicateVariadicArity {
        function: String,
    },
    FixedArityExceedsVariadic {
        function: String,
        fixed: usize,
        variadic: usize,
    },
    RecurMisuse,
    NotEvaluable {
        found: String,
    },
    EvaluatingMacro {
        name: String,
    },
    EvaluatingSpecialForm {
        form: &'static str,
    },
    DivideByZero,
    IntegerOverflow {
        operation: &'static str,
    },
    OutOfBounds {
        index: i64,
        length: usize,
    },
    NonNumericArgument {
        function: String,
        found: &'static str,
    },
    VarRebinding {
        symbol: String,
        namespace: String,
    },
    InvalidNamespace {
        namespace: String,
    },
    /// `read-string` or `eval` was handed text that does not read.
    Read {
        message: String,
    },
    /// A lazy sequence was forced after its interpreter was dropped.
    DetachedLazySeq,
}

impl EvalError {
    pub fn arity(function: impl Into<String>, expected: Arity, got: usize) -> Self {
        EvalError::Arity {
            function: function.into(),
            expected,
            got,
        }
    }

    pub fn invalid_argument(function: impl Into<String>, message: impl Into<String>) -> Self {
        EvalError::InvalidArgument {
            function: function.into(),
            message: message.into(),
        }
    }

    /// Short tag naming the failure kind, used by the JSON output mode.
    pub fn kind(&self) -> &'static str {
        match self {
            EvalError::Arity { .. } => "arity",
            EvalError::InvalidArgument { .. } => "invalid-argument",
            EvalError::InvalidSymbol { .. } => "invalid-symbol",
            EvalError::QualifiedSymbolMisuse { .. } => "qualified-symbol-misuse",
            EvalError::BindingMismatch { .. } => "binding-mismatch",
            EvalError::DuplicateArity { .. } => "duplicate-arity",
            EvalError::DuplicateVariadicArity { .. } => "duplicate-variadic-arity",
            EvalError::FixedArityExceedsVariadic { .. } => "fixed-arity-exceeds-variadic",
            EvalError::RecurMisuse => "recur-misuse",
            EvalError::NotEvaluable { .. } => "not-evaluable",
            EvalError::EvaluatingMacro { .. } => "evaluating-macro",
            EvalError::EvaluatingSpecialForm { .. } => "evaluating-special-form",
            EvalError::DivideByZero => "divide-by-zero",
            EvalError::IntegerOverflow { .. } => "integer-overflow",
            EvalError::OutOfBounds { .. } => "out-of-bounds",
            EvalError::NonNumericArgument { .. } => "non-numeric-argument",
            EvalError::VarRebinding { .. } => "var-rebinding",
            EvalError::InvalidNamespace { .. } => "invalid-namespace",
            EvalError::Read { .. } => "read",
            EvalError::DetachedLazySeq => "detached-lazy-seq",
        }
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::Arity {
                function,
                expected,
                got,
            } => write!(f, "{function} expects {expected} argument(s), got {got}"),
            EvalError::InvalidArgument { function, message } => write!(f, "{function}: {message}"),
            EvalError::InvalidSymbol { symbol } => write!(f, "Unable to resolve symbol: {symbol}"),
            EvalError::QualifiedSymbolMisuse { symbol, namespace } => write!(
                f,
                "Cannot define qualified symbol {symbol} outside namespace {namespace}"
            ),
            EvalError::BindingMismatch { form } => {
                write!(f, "{form} requires an even number of forms in its binding vector")
            }
            EvalError::DuplicateArity { function, arity } => {
                write!(f, "{function} defines arity {arity} more than once")
            }
            EvalError::DuplicateVariadicArity { function } => {
                write!(f, "{function} can only have one variadic arity")
            }
            EvalError::FixedArityExceedsVariadic {
                function,
                fixed,
                variadic,
            } => write!(
                f,
                "{function} has a fixed arity of {fixed}, which is not below its variadic arity of {variadic}"
            ),
            EvalError::RecurMisuse => write!(f, "recur can only be used in tail position"),
            EvalError::NotEvaluable { found } => write!(f, "{found} cannot be called as a function"),
            EvalError::EvaluatingMacro { name } => write!(f, "Cannot take the value of a macro: {name}"),
            EvalError::EvaluatingSpecialForm { form } => {
                write!(f, "Cannot take the value of a special form: {form}")
            }
            EvalError::DivideByZero => write!(f, "Divide by zero"),
            EvalError::IntegerOverflow { operation } => write!(f, "Integer overflow in {operation}"),
            EvalError::OutOfBounds { index, length } => {
                write!(f, "Index {index} out of bounds for length {length}")
            }
            EvalError::NonNumericArgument { function, found } => {
                write!(f, "{function} expects numeric arguments, got {found}")
            }
            EvalError::VarRebinding { symbol, namespace } => write!(
                f,
                "{symbol} already refers to a different var in namespace {namespace}"
            ),
            EvalError::InvalidNamespace { namespace } => write!(f, "No namespace: {namespace}"),
            EvalError::Read { message } => write!(f, "Read error: {message}"),
            EvalError::DetachedLazySeq => {
                write!(f, "Lazy sequence was realized after its interpreter was dropped")
            }
        }
    }
}

impl std::error::Error for EvalError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arity_acceptance() {
        assert!(Arity::Exact(2).accepts(2));
        assert!(!Arity::Exact(2).accepts(3));
        assert!(Arity::AtLeast(1).accepts(5));
        assert!(!Arity::AtLeast(1).accepts(0));
        assert!(Arity::Range(1, 2).accepts(2));
        assert!(!Arity::Range(1, 2).accepts(3));
    }

    #[test]
    fn arity_error_display() {
        let err = EvalError::arity("nth", Arity::Range(2, 3), 1);
        assert_eq!(err.to_string(), "nth expects 2 to 3 argument(s), got 1");
        assert_eq!(err.kind(), "arity");
    }
}

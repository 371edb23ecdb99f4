//! A small Clojure-like language: reader, tree-walking evaluator,
//! namespaces and an embedded stdlib.

pub mod config;
pub mod error;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod runner;

pub use config::{InterpreterConfig, LogDomain, LogDomains};
pub use error::LangError;
pub use interpreter::{EvalError, Interpreter, Params, Value};
pub use runner::Runner;

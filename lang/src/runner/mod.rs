//! Stdlib bootstrap, script running and REPL benchmarking.

use std::time::{Duration, Instant};

use crate::error::LangError;
use crate::interpreter::{Context, Interpreter, Value};
use crate::parser::read_forms;

#[cfg(test)]
mod tests;

/// Embedded stdlib sources, loaded in order into `core`.
pub const STDLIB: [(&str, &str); 2] = [
    ("stdlib/core.clj", include_str!("../../stdlib/core.clj")),
    ("stdlib/seq.clj", include_str!("../../stdlib/seq.clj")),
];

/// Read and evaluate every stdlib file in the namespace `context` runs in.
/// The first failure aborts the bootstrap.
pub fn load_stdlib(context: &Context) -> Result<(), LangError> {
    for (file, source) in STDLIB {
        let forms = load_file(context, source).map_err(|error| {
            tracing::error!(target: "tamarind::bootstrap", file, %error, "stdlib failed to load");
            LangError::Bootstrap {
                file,
                error: Box::new(error),
            }
        })?;
        tracing::info!(target: "tamarind::bootstrap", file, forms, "loaded");
    }
    Ok(())
}

fn load_file(context: &Context, source: &str) -> Result<usize, LangError> {
    let forms = read_forms(source, context.runtime())?;
    for form in &forms {
        context.evaluate_value(form)?;
    }
    Ok(forms.len())
}

#[derive(Debug, Clone)]
pub struct ScriptResult {
    pub value: Value,
    pub forms: usize,
    pub duration: Duration,
}

#[derive(Debug, Clone, Copy)]
pub struct BenchResult {
    pub iterations: u32,
    pub total: Duration,
}

impl BenchResult {
    pub fn mean(&self) -> Duration {
        if self.iterations == 0 {
            Duration::ZERO
        } else {
            self.total / self.iterations
        }
    }
}

/// Runs whole source texts against one interpreter.
pub struct Runner<'a> {
    interpreter: &'a Interpreter,
}

impl<'a> Runner<'a> {
    pub fn new(interpreter: &'a Interpreter) -> Self {
        Self { interpreter }
    }

    /// Evaluate every top-level form in order and return the last value,
    /// or nil for a source with no forms.
    pub fn run_script(&self, source: &str) -> Result<ScriptResult, LangError> {
        let start = Instant::now();
        let forms = self.interpreter.read(source)?;
        let mut value = Value::Nil;
        for form in &forms {
            value = self.interpreter.evaluate(form)?;
        }
        Ok(ScriptResult {
            value,
            forms: forms.len(),
            duration: start.elapsed(),
        })
    }

    /// Read `source` once and evaluate its forms `iterations` times.
    pub fn bench(&self, source: &str, iterations: u32) -> Result<BenchResult, LangError> {
        let forms = self.interpreter.read(source)?;
        let start = Instant::now();
        for _ in 0..iterations {
            for form in &forms {
                self.interpreter.evaluate(form)?;
            }
        }
        Ok(BenchResult {
            iterations,
            total: start.elapsed(),
        })
    }
}

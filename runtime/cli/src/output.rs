//! CLI output formatting for text and JSON modes.

use serde::Serialize;
use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;
use tamarind::LangError;

/// Output mode for CLI execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable output (default)
    Text,
    /// Single JSON object after execution completes
    Json,
}

impl OutputMode {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "text" => Some(OutputMode::Text),
            "json" => Some(OutputMode::Json),
            _ => None,
        }
    }
}

/// Collects what `print` and friends write while a JSON run is in progress,
/// so stdout only ever carries the final JSON object.
#[derive(Debug, Clone, Default)]
pub struct ConsoleCapture(Rc<RefCell<Vec<u8>>>);

impl ConsoleCapture {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for ConsoleCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Error location with 1-indexed line and column.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorLocation {
    pub line: u32,
    pub column: u32,
}

/// JSON output for script execution.
#[derive(Debug, Clone, Serialize)]
pub struct JsonScriptOutput {
    #[serde(rename = "type")]
    pub output_type: &'static str,
    pub status: &'static str,
    pub value: String,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub console: String,
}

/// JSON output for errors.
#[derive(Debug, Clone, Serialize)]
pub struct JsonErrorOutput {
    #[serde(rename = "type")]
    pub output_type: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<ErrorLocation>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub console: String,
}

/// Format a LangError as JSON error output.
pub fn format_error_json(error: &LangError, console: String) -> String {
    let (message, kind, location) = error_parts(error);
    let output = JsonErrorOutput {
        output_type: "error",
        message,
        kind,
        location,
        console,
    };
    to_json(&output)
}

fn error_parts(error: &LangError) -> (String, Option<&'static str>, Option<ErrorLocation>) {
    match error {
        LangError::Lex(err) => (
            err.message.clone(),
            None,
            Some(ErrorLocation {
                line: err.line,
                column: err.column,
            }),
        ),
        LangError::Parse(err) => (
            err.message.clone(),
            None,
            Some(ErrorLocation {
                line: err.span.line,
                column: err.span.column,
            }),
        ),
        LangError::Eval(err) => (err.to_string(), Some(err.kind()), None),
        LangError::Bootstrap { .. } => (error.to_string(), None, None),
    }
}

/// Format script result as JSON.
pub fn format_script_json(value: String, duration_ms: u64, console: String) -> String {
    let output = JsonScriptOutput {
        output_type: "script",
        status: "ok",
        value,
        duration_ms,
        console,
    };
    to_json(&output)
}

fn to_json<T: Serialize>(output: &T) -> String {
    serde_json::to_string(output)
        .unwrap_or_else(|err| format!(r#"{{"type":"error","message":"{err}"}}"#))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tamarind::EvalError;

    #[test]
    fn output_mode_names() {
        assert_eq!(OutputMode::parse("text"), Some(OutputMode::Text));
        assert_eq!(OutputMode::parse("json"), Some(OutputMode::Json));
        assert_eq!(OutputMode::parse("jsonl"), None);
    }

    #[test]
    fn script_json_omits_empty_console() {
        let json = format_script_json("3".to_string(), 1, String::new());
        assert_eq!(
            json,
            r#"{"type":"script","status":"ok","value":"3","duration_ms":1}"#
        );
    }

    #[test]
    fn script_json_includes_console_output() {
        let json = format_script_json("nil".to_string(), 0, "hi\n".to_string());
        assert!(json.contains(r#""console":"hi\n""#));
    }

    #[test]
    fn eval_error_json_carries_its_kind() {
        let json = format_error_json(&LangError::Eval(EvalError::DivideByZero), String::new());
        assert_eq!(
            json,
            r#"{"type":"error","message":"Divide by zero","kind":"divide-by-zero"}"#
        );
    }

    #[test]
    fn console_capture_collects_writes() {
        let capture = ConsoleCapture::default();
        let mut writer = capture.clone();
        write!(writer, "a").unwrap();
        write!(writer, "b").unwrap();
        assert_eq!(capture.contents(), "ab");
    }
}

use crate::interpreter::EvalError;
use crate::lexer::LexError;
use crate::parser::ParseError;
use std::fmt;

/// Unified error type for reading, evaluating and bootstrapping.
#[derive(Debug, Clone, PartialEq)]
pub enum LangError {
    Lex(LexError),
    Parse(ParseError),
    Eval(EvalError),
    /// A stdlib file failed to load while building an interpreter.
    Bootstrap {
        file: &'static str,
        error: Box<LangError>,
    },
}

impl From<LexError> for LangError {
    fn from(err: LexError) -> Self {
        LangError::Lex(err)
    }
}

impl From<ParseError> for LangError {
    fn from(err: ParseError) -> Self {
        LangError::Parse(err)
    }
}

impl From<EvalError> for LangError {
    fn from(err: EvalError) -> Self {
        LangError::Eval(err)
    }
}

impl fmt::Display for LangError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LangError::Lex(err) => write!(
                f,
                "Lexical error at line {}, column {}: {}",
                err.line, err.column, err.message
            ),
            LangError::Parse(err) => write!(
                f,
                "Parse error at line {}, column {}: {}",
                err.span.line, err.span.column, err.message
            ),
            LangError::Eval(err) => write!(f, "Evaluation error: {err}"),
            LangError::Bootstrap { file, error } => write!(f, "Failed to load {file}: {error}"),
        }
    }
}

impl std::error::Error for LangError {}

impl LangError {
    /// True when the input ended inside a form, so more text may complete it.
    pub fn is_incomplete(&self) -> bool {
        match self {
            LangError::Lex(err) => err.incomplete,
            LangError::Parse(err) => err.incomplete,
            LangError::Eval(_) | LangError::Bootstrap { .. } => false,
        }
    }

    fn location(&self) -> Option<(u32, u32, &str, &'static str)> {
        match self {
            LangError::Lex(err) => Some((err.line, err.column, &err.message, "Lexical error")),
            LangError::Parse(err) => Some((
                err.span.line,
                err.span.column,
                &err.message,
                "Parse error",
            )),
            LangError::Eval(_) | LangError::Bootstrap { .. } => None,
        }
    }

    /// Format error with source context
    pub fn format_with_source(&self, source: &str) -> String {
        let Some((line, column, message, kind)) = self.location() else {
            return format!("\n{self}\n");
        };

        let mut output = String::new();

        output.push_str(&format!("\n{kind} at line {line}"));
        if column > 0 {
            output.push_str(&format!(", column {column}"));
        }
        output.push_str(&format!(": {message}\n\n"));

        // Source context (5 lines around error)
        let lines: Vec<&str> = source.lines().collect();
        let error_line_idx = (line as usize).saturating_sub(1);

        let start = error_line_idx.saturating_sub(2);
        let end = (error_line_idx + 3).min(lines.len());

        for (idx, line_content) in lines.iter().enumerate().take(end).skip(start) {
            let line_num = idx + 1;

            if idx == error_line_idx {
                output.push_str(&format!(" → {line_num:4} | {line_content}\n"));

                if column > 0 {
                    output.push_str("        | ");
                    output.push_str(&" ".repeat(column as usize - 1));
                    output.push_str("^\n");
                }
            } else {
                output.push_str(&format!("   {line_num:4} | {line_content}\n"));
            }
        }

        output
    }

    /// Format error with source context and colored output
    #[cfg(feature = "colored")]
    pub fn format_colored(&self, source: &str) -> String {
        use colored::Colorize;

        let Some((line, column, message, kind)) = self.location() else {
            return format!("\n{}\n", self.to_string().red().bold());
        };

        let mut output = String::new();

        output.push('\n');
        output.push_str(&format!("{kind} at line {line}").red().bold().to_string());
        if column > 0 {
            output.push_str(&format!(", column {column}").red().bold().to_string());
        }
        output.push_str(&format!(": {}\n\n", message.red()));

        let lines: Vec<&str> = source.lines().collect();
        let error_line_idx = (line as usize).saturating_sub(1);

        let start = error_line_idx.saturating_sub(2);
        let end = (error_line_idx + 3).min(lines.len());

        for (idx, line_content) in lines.iter().enumerate().take(end).skip(start) {
            let line_num = idx + 1;

            if idx == error_line_idx {
                output.push_str(
                    &format!(" → {line_num:4} | {line_content}\n")
                        .red()
                        .to_string(),
                );
                if column > 0 {
                    output.push_str(&"        | ".red().to_string());
                    output.push_str(&" ".repeat(column as usize - 1));
                    output.push_str(&"^".red().bold().to_string());
                    output.push('\n');
                }
            } else {
                output.push_str(
                    &format!("   {line_num:4} | {line_content}\n")
                        .dimmed()
                        .to_string(),
                );
            }
        }

        output
    }
}

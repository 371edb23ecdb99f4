//! Human and debug renderings of values.
//!
//! Without a context, interned names cannot be looked up and are rendered
//! as raw identifiers (`#12`).

use super::context::Context;
use super::error::EvalError;
use super::interner::InternedId;
use super::seq::Seq;
use super::value::{Symbol, Value};

/// Characters printed by name in debug mode. Shared with the reader.
pub const NAMED_CHARS: [(char, &str); 6] = [
    ('\n', "newline"),
    (' ', "space"),
    ('\t', "tab"),
    ('\r', "return"),
    ('\u{8}', "backspace"),
    ('\u{c}', "formfeed"),
];

/// Two-character string escapes. Shared with the reader.
pub const STRING_ESCAPES: [(char, char); 5] = [
    ('\\', '\\'),
    ('"', '"'),
    ('\t', 't'),
    ('\r', 'r'),
    ('\n', 'n'),
];

pub fn describe(value: &Value, context: Option<&Context>, debug: bool) -> Result<String, EvalError> {
    let mut out = String::new();
    Describer { context, debug }.write(value, &mut out)?;
    Ok(out)
}

struct Describer<'a> {
    context: Option<&'a Context>,
    debug: bool,
}

impl Describer<'_> {
    fn name(&self, id: InternedId) -> String {
        match self.context {
            Some(context) => context.name(id).to_string(),
            None => id.to_string(),
        }
    }

    fn symbol(&self, symbol: Symbol) -> String {
        match symbol.ns {
            Some(ns) => format!("{}/{}", self.name(ns), self.name(symbol.name)),
            None => self.name(symbol.name),
        }
    }

    fn write(&self, value: &Value, out: &mut String) -> Result<(), EvalError> {
        match value {
            Value::Nil => out.push_str("nil"),
            Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            Value::Int(n) => out.push_str(&n.to_string()),
            Value::Float(f) => out.push_str(&format_float(f.0)),
            Value::Char(c) => {
                if self.debug {
                    out.push_str(&char_literal(*c));
                } else {
                    out.push(*c);
                }
            }
            Value::String(s) => {
                if self.debug {
                    out.push_str(&string_literal(s));
                } else {
                    out.push_str(s);
                }
            }
            Value::Symbol(symbol) => out.push_str(&self.symbol(*symbol)),
            Value::Keyword(symbol) => {
                out.push(':');
                out.push_str(&self.symbol(*symbol));
            }
            Value::Vector(items) => {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(' ');
                    }
                    self.write(item, out)?;
                }
                out.push(']');
            }
            Value::Map(entries) => {
                out.push('{');
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    self.write(key, out)?;
                    out.push(' ');
                    self.write(value, out)?;
                }
                out.push('}');
            }
            Value::Seq(seq) => self.write_seq(seq, out)?,
            Value::Namespace(id) => {
                out.push_str("#<namespace ");
                out.push_str(&self.name(*id));
                out.push('>');
            }
            Value::Var(var) => {
                out.push_str("#'");
                out.push_str(&self.symbol(var.name()));
            }
            Value::Unbound(var) => {
                out.push_str("#<unbound #'");
                out.push_str(&self.symbol(var.name()));
                out.push('>');
            }
            Value::Function(closure) | Value::Macro(closure) => {
                let kind = if matches!(value, Value::Macro(_)) {
                    "macro"
                } else {
                    "fn"
                };
                out.push_str("#<");
                out.push_str(kind);
                if let Some(name) = closure.name() {
                    out.push(' ');
                    out.push_str(&self.symbol(name));
                }
                out.push('>');
            }
            Value::BuiltIn(id) => {
                out.push_str("#<builtin ");
                out.push_str(id.name());
                out.push('>');
            }
            Value::Special(form) => out.push_str(form.name()),
            Value::ReaderMacro(reader_macro) => {
                out.push_str(reader_macro.prefix());
                self.write(reader_macro.form(), out)?;
            }
            Value::Auxiliary(aux) => out.push_str(&aux.describe(self.debug)),
        }
        Ok(())
    }

    fn write_seq(&self, seq: &Seq, out: &mut String) -> Result<(), EvalError> {
        out.push('(');
        for (i, item) in seq.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            self.write(&item?, out)?;
        }
        out.push(')');
        Ok(())
    }
}

fn format_float(f: f64) -> String {
    if f.is_nan() {
        "NaN".to_string()
    } else if f.is_infinite() {
        if f > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if f.fract() == 0.0 && f.abs() < 1e16 {
        format!("{f:.1}")
    } else {
        f.to_string()
    }
}

pub fn char_literal(c: char) -> String {
    match NAMED_CHARS.iter().find(|(named, _)| *named == c) {
        Some((_, name)) => format!("\\{name}"),
        None => format!("\\{c}"),
    }
}

pub fn string_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match STRING_ESCAPES.iter().find(|(raw, _)| *raw == c) {
            Some((_, escape)) => {
                out.push('\\');
                out.push(*escape);
            }
            None => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::interner::Interner;

    #[test]
    fn strings_escape_in_debug_mode_only() {
        let value = Value::string("a\"b\n");
        assert_eq!(describe(&value, None, true).unwrap(), r#""a\"b\n""#);
        assert_eq!(describe(&value, None, false).unwrap(), "a\"b\n");
    }

    #[test]
    fn named_characters() {
        assert_eq!(describe(&Value::Char('\n'), None, true).unwrap(), "\\newline");
        assert_eq!(describe(&Value::Char('\u{c}'), None, true).unwrap(), "\\formfeed");
        assert_eq!(describe(&Value::Char('x'), None, true).unwrap(), "\\x");
        assert_eq!(describe(&Value::Char(' '), None, false).unwrap(), " ");
    }

    #[test]
    fn floats_keep_a_fraction() {
        assert_eq!(describe(&Value::float(2.0), None, true).unwrap(), "2.0");
        assert_eq!(describe(&Value::float(0.25), None, true).unwrap(), "0.25");
    }

    #[test]
    fn context_free_names_are_raw_ids() {
        let value = Value::Keyword(Symbol::qualified(Interner::USER, Interner::AMPERSAND));
        assert_eq!(describe(&value, None, true).unwrap(), ":#1/#2");
    }

    #[test]
    fn nested_collections() {
        let value = Value::vector([
            Value::Int(1),
            Value::list([Value::Nil, Value::Bool(true)]),
            Value::vector([]),
        ]);
        assert_eq!(describe(&value, None, true).unwrap(), "[1 (nil true) []]");
    }
}

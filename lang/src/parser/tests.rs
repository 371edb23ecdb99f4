use super::*;
use crate::config::LogDomains;
use crate::interpreter::describe::describe;
use expect_test::{Expect, expect};

fn check(input: &str, expect: Expect) {
    let runtime = Runtime::new(LogDomains::none(), Box::new(std::io::sink()));
    let context = Context::root(runtime.clone());
    let output = match read_forms(input, &runtime) {
        Ok(forms) => forms
            .iter()
            .map(|form| describe(form, Some(&context), true).unwrap())
            .collect::<Vec<_>>()
            .join("\n"),
        Err(LangError::Parse(e)) => format!(
            "Error: {} at {}:{}{}",
            e.message,
            e.span.line,
            e.span.column,
            if e.incomplete { " (incomplete)" } else { "" }
        ),
        Err(e) => format!("Error: {e}"),
    };
    expect.assert_eq(&output);
}

#[test]
fn parse_atoms_and_collections() {
    check(
        r#"(def x 1) [1 "a" \b] :k/v {:a nil}"#,
        expect![[r#"
            (def x 1)
            [1 "a" \b]
            :k/v
            {:a nil}"#]],
    );
}

#[test]
fn parse_symbol_qualification() {
    check(
        "ns/x / foo/",
        expect![[r#"
            ns/x
            /
            foo/"#]],
    );
}

#[test]
fn parse_regex_literal() {
    check(r#"#"a+b""#, expect![[r#"#"a+b""#]]);
}

#[test]
fn parse_simple_reader_macros() {
    check(
        "'a #'b @c",
        expect![[r#"
            (quote a)
            (var b)
            (#<builtin deref> c)"#]],
    );
}

#[test]
fn parse_nested_quote() {
    check("'(a 'b)", expect!["(quote (a (quote b)))"]);
}

#[test]
fn parse_syntax_quote_list_with_unquotes() {
    check(
        "`(a ~b ~@c)",
        expect!["(#<builtin seq> (#<builtin concat> (#<builtin list> (quote a)) (#<builtin list> b) c))"],
    );
}

#[test]
fn parse_syntax_quote_vector() {
    check(
        "`[x 1]",
        expect!["(#<builtin vec> (#<builtin concat> (#<builtin list> (quote x)) (#<builtin list> 1)))"],
    );
}

#[test]
fn parse_syntax_quote_map() {
    check(
        "`{:a ~x}",
        expect!["(apply #<builtin hash-map> (#<builtin concat> (#<builtin list> :a) (#<builtin list> x)))"],
    );
}

#[test]
fn parse_syntax_quote_empty_list() {
    check("`()", expect!["(#<builtin list>)"]);
}

#[test]
fn parse_syntax_quote_of_quote() {
    check(
        "`'a",
        expect!["(#<builtin seq> (#<builtin concat> (#<builtin list> (quote quote)) (#<builtin list> (quote a))))"],
    );
}

#[test]
fn parse_auto_gensym_is_shared_within_one_syntax_quote() {
    check(
        "`(let [v# 1] v#)",
        expect!["(#<builtin seq> (#<builtin concat> (#<builtin list> (quote let)) (#<builtin list> (#<builtin vec> (#<builtin concat> (#<builtin list> (quote v__1__auto)) (#<builtin list> 1)))) (#<builtin list> (quote v__1__auto))))"],
    );
}

#[test]
fn parse_error_unclosed_list_is_incomplete() {
    check(
        "(1 2",
        expect!["Error: Expected ')' before end of input at 1:1 (incomplete)"],
    );
}

#[test]
fn parse_error_dangling_reader_macro_is_incomplete() {
    check("'", expect!["Error: Unexpected end of input at 1:2 (incomplete)"]);
}

#[test]
fn parse_error_unexpected_closer() {
    check(")", expect!["Error: Unexpected ')' at 1:1"]);
}

#[test]
fn parse_error_mismatched_closer() {
    check("(1]", expect!["Error: Unexpected ']', expected ')' at 1:3"]);
}

#[test]
fn parse_error_odd_map() {
    check(
        "{:a}",
        expect!["Error: Map literal must contain an even number of forms at 1:1"],
    );
}

#[test]
fn parse_error_unquote_outside_syntax_quote() {
    check("~x", expect!["Error: Unquote (~) outside of syntax-quote at 1:1"]);
}

#[test]
fn parse_error_splice_at_syntax_quote_top() {
    check(
        "`~@xs",
        expect!["Error: Unquote-splice (~@) must appear inside a collection at 1:1"],
    );
}

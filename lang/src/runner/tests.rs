use super::*;
use crate::config::InterpreterConfig;
use crate::interpreter::EvalError;

fn interpreter() -> Interpreter {
    Interpreter::with_output(InterpreterConfig::default(), Box::new(std::io::sink())).unwrap()
}

#[test]
fn runner_script_mode_returns_last_value() {
    let interpreter = interpreter();
    let runner = Runner::new(&interpreter);

    let result = runner
        .run_script(
            r#"
            (defn square [x] (* x x))
            (def total (reduce + (map square [1 2 3 4])))
            total
            "#,
        )
        .unwrap();

    assert_eq!(result.value, Value::Int(30));
    assert_eq!(result.forms, 3);
}

#[test]
fn runner_empty_script_is_nil() {
    let interpreter = interpreter();
    let result = Runner::new(&interpreter).run_script("; nothing here\n").unwrap();
    assert_eq!(result.value, Value::Nil);
    assert_eq!(result.forms, 0);
}

#[test]
fn runner_stops_at_first_failure() {
    let interpreter = interpreter();
    let runner = Runner::new(&interpreter);

    let err = runner
        .run_script("(def a 1) (/ a 0) (def b 2)")
        .unwrap_err();
    assert_eq!(err, LangError::Eval(EvalError::DivideByZero));
    assert!(interpreter.eval_str("b").is_err());
    assert_eq!(interpreter.eval_str("a").unwrap(), Value::Int(1));
}

#[test]
fn runner_reports_read_errors_before_evaluating() {
    let interpreter = interpreter();
    let runner = Runner::new(&interpreter);

    let err = runner.run_script("(def a 1) (def b").unwrap_err();
    assert!(err.is_incomplete());
    assert!(interpreter.eval_str("a").is_err());
}

#[test]
fn bench_evaluates_every_iteration() {
    let interpreter = interpreter();
    interpreter.eval_str("(def counter 0)").unwrap();
    let runner = Runner::new(&interpreter);

    let result = runner.bench("(def counter (inc counter))", 5).unwrap();

    assert_eq!(result.iterations, 5);
    assert_eq!(interpreter.eval_str("counter").unwrap(), Value::Int(5));
}

#[test]
fn bench_with_zero_iterations_has_zero_mean() {
    let interpreter = interpreter();
    let result = Runner::new(&interpreter).bench("(+ 1 2)", 0).unwrap();
    assert_eq!(result.mean(), Duration::ZERO);
}

#[test]
fn stdlib_files_are_all_loaded() {
    let interpreter = interpreter();
    for name in ["defn", "when", "cond", "->>", "map", "range", "last", "partial"] {
        assert!(
            interpreter.eval_str(&format!("(var {name})")).is_ok(),
            "{name} should be defined by the stdlib"
        );
    }
}

#[test]
fn interpreter_without_stdlib_has_only_builtins() {
    let interpreter = Interpreter::with_output(
        InterpreterConfig::default().with_stdlib(false),
        Box::new(std::io::sink()),
    )
    .unwrap();
    assert_eq!(interpreter.eval_str("(+ 1 2)").unwrap(), Value::Int(3));
    assert!(interpreter.eval_str("(map inc [1])").is_err());
}

use super::*;
use crate::config::{InterpreterConfig, LogDomains};
use std::cell::RefCell;

/// Output sink the test can read back after the interpreter wrote to it.
#[derive(Clone, Default)]
struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    fn contents(&self) -> String {
        String::from_utf8(self.0.borrow().clone()).unwrap()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn interpreter() -> (Interpreter, SharedBuffer) {
    let buffer = SharedBuffer::default();
    let interpreter =
        Interpreter::with_output(InterpreterConfig::default(), Box::new(buffer.clone())).unwrap();
    (interpreter, buffer)
}

fn eval(source: &str) -> String {
    let (interpreter, _) = interpreter();
    let value = interpreter.eval_str(source).unwrap();
    interpreter.describe(&value, true).unwrap()
}

fn eval_err(source: &str) -> EvalError {
    let (interpreter, _) = interpreter();
    match interpreter.eval_str(source) {
        Err(LangError::Eval(err)) => err,
        other => panic!("expected an evaluation error, got {other:?}"),
    }
}

// ============================================================================
// Literals and arithmetic
// ============================================================================

#[test]
fn literals_evaluate_to_themselves() {
    assert_eq!(eval("42"), "42");
    assert_eq!(eval("\"hi\""), "\"hi\"");
    assert_eq!(eval(":k"), ":k");
    assert_eq!(eval("nil"), "nil");
    assert_eq!(eval("[1 (+ 1 1)]"), "[1 2]");
    assert_eq!(eval("()"), "()");
}

#[test]
fn arithmetic_mixes_ints_and_floats() {
    assert_eq!(eval("(+ 1 2 3)"), "6");
    assert_eq!(eval("(+)"), "0");
    assert_eq!(eval("(+ 1 2.5)"), "3.5");
    assert_eq!(eval("(/ 6 3)"), "2");
    assert_eq!(eval("(/ 7 2)"), "3.5");
    assert_eq!(eval("(- 5)"), "-5");
}

#[test]
fn arithmetic_failures() {
    assert_eq!(eval_err("(/ 1 0)"), EvalError::DivideByZero);
    assert!(matches!(
        eval_err("(+ 9223372036854775807 1)"),
        EvalError::IntegerOverflow { .. }
    ));
    assert!(matches!(
        eval_err("(+ 1 \"2\")"),
        EvalError::NonNumericArgument { .. }
    ));
}

#[test]
fn equality_compares_sequential_collections_elementwise() {
    assert_eq!(eval("(= [1 2] '(1 2))"), "true");
    assert_eq!(eval("(= [1 2] [1 3])"), "false");
    assert_eq!(eval("(= {:a 1} {:a 1})"), "true");
}

// ============================================================================
// Special forms
// ============================================================================

#[test]
fn def_returns_the_var() {
    assert_eq!(eval("(def y 3)"), "#'user/y");
    assert_eq!(eval("(def y 3) y"), "3");
}

#[test]
fn qualified_def_outside_current_namespace_fails() {
    assert!(matches!(
        eval_err("(def foo/b 1)"),
        EvalError::QualifiedSymbolMisuse { .. }
    ));
}

#[test]
fn let_shadows_and_binds_sequentially() {
    assert_eq!(eval("(def x 1) (let [x 2] x)"), "2");
    assert_eq!(eval("(let [x 2 y (* x 10)] y)"), "20");
    assert_eq!(eval("(def x 1) (let [x 2] x) x"), "1");
}

#[test]
fn let_requires_pairs() {
    assert_eq!(
        eval_err("(let [a] a)"),
        EvalError::BindingMismatch { form: "let" }
    );
}

#[test]
fn loop_recur_sums_a_range() {
    assert_eq!(
        eval("(loop [i 1 acc 0] (if (> i 10) acc (recur (inc i) (+ acc i))))"),
        "55"
    );
}

#[test]
fn recur_in_an_untaken_branch_is_never_evaluated() {
    assert_eq!(eval("(if true 1 (recur))"), "1");
}

#[test]
fn recur_outside_tail_position_fails() {
    assert_eq!(eval_err("(if false 1 (recur))"), EvalError::RecurMisuse);
    assert_eq!(
        eval_err("(loop [i 0] (+ 1 (recur i)))"),
        EvalError::RecurMisuse
    );
}

#[test]
fn recur_with_wrong_count_is_an_arity_error() {
    assert!(matches!(
        eval_err("(loop [i 0 j 0] (if (< i 3) (recur (inc i)) i))"),
        EvalError::Arity { got: 1, .. }
    ));
}

#[test]
fn deep_recursion_through_recur_does_not_grow_the_stack() {
    assert_eq!(
        eval("((fn [n acc] (if (== n 0) acc (recur (dec n) (+ acc 1)))) 100000 0)"),
        "100000"
    );
}

#[test]
fn quote_and_var() {
    assert_eq!(eval("'(a b)"), "(a b)");
    assert_eq!(eval("(quote)"), "nil");
    assert_eq!(eval("(def z 5) #'z"), "#'user/z");
    assert_eq!(eval("(def z 5) @#'z"), "5");
}

#[test]
fn apply_spreads_its_last_argument() {
    assert_eq!(eval("(apply + 1 2 [3 4])"), "10");
    assert_eq!(eval("(apply + nil)"), "0");
    assert!(matches!(
        eval_err("(apply + 1)"),
        EvalError::InvalidArgument { .. }
    ));
}

#[test]
fn attempt_returns_first_success_or_last_error() {
    assert_eq!(eval("(attempt (/ 1 0) 42)"), "42");
    assert_eq!(eval("(attempt 1 (/ 1 0))"), "1");
    assert!(matches!(
        eval_err("(attempt (/ 1 0) missing)"),
        EvalError::InvalidSymbol { .. }
    ));
}

#[test]
fn special_forms_are_not_values() {
    assert_eq!(
        eval_err("(def x if)"),
        EvalError::EvaluatingSpecialForm { form: "if" }
    );
}

#[test]
fn unresolved_symbols_fail() {
    assert_eq!(
        eval_err("nope"),
        EvalError::InvalidSymbol {
            symbol: "nope".to_string()
        }
    );
}

// ============================================================================
// Functions and macros
// ============================================================================

#[test]
fn closures_capture_their_definition_scope() {
    assert_eq!(
        eval("(def make-adder (fn [n] (fn [x] (+ x n)))) ((make-adder 5) 10)"),
        "15"
    );
}

#[test]
fn named_fn_can_call_itself() {
    assert_eq!(
        eval("((fn fact [n] (if (<= n 1) 1 (* n (fact (dec n))))) 5)"),
        "120"
    );
}

#[test]
fn named_fn_self_binding_stays_inside_the_call() {
    assert_eq!(
        eval_err("(let [x 1] (def f (fn g [] x)) (f) g)"),
        EvalError::InvalidSymbol {
            symbol: "g".to_string()
        }
    );
    assert_eq!(
        eval("(let [x 1] (def f (fn g [n] (if (== n 0) x (g (dec n))))) [(f 3) (f 3) x])"),
        "[1 1 1]"
    );
}

#[test]
fn calling_a_named_fn_inside_a_loop_keeps_recur_working() {
    assert_eq!(
        eval("(loop [i 0] (if (< i 3) (do ((fn g [] 1)) (recur (inc i))) i))"),
        "3"
    );
    assert_eq!(
        eval("(loop [i 0 acc 0] (if (< i 4) (recur (inc i) (+ acc ((fn sq [n] (* n n)) i))) acc))"),
        "14"
    );
}

#[test]
fn multi_arity_dispatch() {
    assert_eq!(
        eval("(defn f ([] 0) ([a] a) ([a b & more] more)) [(f) (f 1) (f 1 2) (f 1 2 3)]"),
        "[0 1 nil (3)]"
    );
}

#[test]
fn wrong_argument_count_is_an_arity_error() {
    assert!(matches!(
        eval_err("((fn [a b] a) 1)"),
        EvalError::Arity { got: 1, .. }
    ));
}

#[test]
fn duplicate_arities_are_rejected() {
    assert!(matches!(
        eval_err("(fn ([a] 1) ([b] 2))"),
        EvalError::DuplicateArity { .. }
    ));
    assert!(matches!(
        eval_err("(fn ([a b] 1) ([a & more] 2))"),
        EvalError::FixedArityExceedsVariadic { .. }
    ));
}

#[test]
fn macros_receive_unevaluated_forms() {
    assert_eq!(
        eval("(defmacro unless [c & body] `(if ~c nil (do ~@body))) (unless false 1 2)"),
        "2"
    );
    assert_eq!(
        eval("(defmacro unless [c & body] `(if ~c nil (do ~@body))) (unless true (/ 1 0))"),
        "nil"
    );
}

#[test]
fn macros_are_not_values() {
    assert!(matches!(
        eval_err("(defmacro m [] 1) (def x m)"),
        EvalError::EvaluatingMacro { .. }
    ));
}

#[test]
fn auto_gensyms_do_not_capture_user_bindings() {
    assert_eq!(
        eval("(defmacro twice [e] `(let [v# ~e] (+ v# v#))) (let [v 1] (twice (+ v 4)))"),
        "10"
    );
}

// ============================================================================
// Application of collections
// ============================================================================

#[test]
fn vectors_apply_by_index() {
    assert_eq!(eval("([10 20 30] 1)"), "20");
    assert_eq!(
        eval_err("([1] 5)"),
        EvalError::OutOfBounds {
            index: 5,
            length: 1
        }
    );
}

#[test]
fn nth_reports_out_of_bounds_without_walking_infinite_seqs() {
    assert_eq!(eval("(nth (range) 3)"), "3");
    assert_eq!(eval("(nth (range) -1 :none)"), ":none");
    assert_eq!(
        eval_err("(nth (range) -1)"),
        EvalError::OutOfBounds {
            index: -1,
            length: 0
        }
    );
    assert_eq!(
        eval_err("(nth '(1 2) 5)"),
        EvalError::OutOfBounds {
            index: 5,
            length: 2
        }
    );
}

#[test]
fn maps_and_keywords_apply_as_lookups() {
    assert_eq!(eval("(:a {:a 1})"), "1");
    assert_eq!(eval("({:a 1} :b 2)"), "2");
    assert_eq!(eval("(:b {:a 1})"), "nil");
}

#[test]
fn numbers_are_not_callable() {
    assert!(matches!(
        eval_err("(1 2)"),
        EvalError::NotEvaluable { .. }
    ));
}

// ============================================================================
// Laziness and the stdlib
// ============================================================================

#[test]
fn lazy_seq_body_runs_once() {
    assert_eq!(
        eval(
            "(def calls 0)
             (def s (lazy-seq (def calls (inc calls)) (cons 1 nil)))
             (first s)
             (count s)
             calls"
        ),
        "1"
    );
}

#[test]
fn infinite_sequences_are_consumed_lazily() {
    assert_eq!(eval("(into [] (take 3 (map inc (range))))"), "[1 2 3]");
    assert_eq!(eval("(->> (range 5) (filter even?) (reduce +))"), "6");
}

#[test]
fn stdlib_control_flow() {
    assert_eq!(eval("(cond false 1 nil 2 :else 3)"), "3");
    assert_eq!(eval("(cond false 1)"), "nil");
    assert_eq!(eval("(and 1 2)"), "2");
    assert_eq!(eval("(and 1 nil 2)"), "nil");
    assert_eq!(eval("(or nil false)"), "false");
    assert_eq!(eval("(or nil 3)"), "3");
    assert_eq!(eval("(when-not false :yes)"), ":yes");
    assert_eq!(eval("(-> 1 inc (- 10))"), "-8");
}

#[test]
fn stdlib_sequence_functions() {
    assert_eq!(eval("(last [1 2 3])"), "3");
    assert_eq!(eval("(reverse [1 2 3])"), "(3 2 1)");
    assert_eq!(eval("(drop 2 [1 2 3])"), "(3)");
    assert_eq!(eval("(take 2 (repeat :x))"), "(:x :x)");
    assert_eq!(eval("(range 3 0 -1)"), "(3 2 1)");
    assert_eq!(eval("(empty? [])"), "true");
}

#[test]
fn stdlib_function_combinators() {
    assert_eq!(eval("((comp inc inc) 1)"), "3");
    assert_eq!(eval("((comp str inc) 1)"), "\"2\"");
    assert_eq!(eval("((partial + 1) 2)"), "3");
    assert_eq!(eval("(not= 1 2)"), "true");
}

// ============================================================================
// Output, namespaces and meta
// ============================================================================

#[test]
fn output_is_written_in_evaluation_order() {
    let (interpreter, buffer) = interpreter();
    interpreter
        .eval_str("(print \"a\") (print \"b\") (println \"c\") (prn \"d\" \\e)")
        .unwrap();
    assert_eq!(buffer.contents(), "abc\n\"d\" \\e\n");
}

#[test]
fn arguments_are_evaluated_left_to_right_before_arity_is_checked() {
    let (interpreter, buffer) = interpreter();
    let result = interpreter.eval_str("((fn [a] a) (print \"a\") (print \"b\") (print \"c\"))");
    assert!(matches!(
        result,
        Err(LangError::Eval(EvalError::Arity { got: 3, .. }))
    ));
    assert_eq!(buffer.contents(), "abc");
}

#[test]
fn tracing_every_domain_does_not_change_results() {
    let config = InterpreterConfig::default().with_log(LogDomains::all());
    let interpreter = Interpreter::with_output(config, Box::new(SharedBuffer::default())).unwrap();
    let value = interpreter
        .eval_str("(defmacro twice [x] `(+ ~x ~x)) (twice (+ 1 2))")
        .unwrap();
    assert_eq!(value, Value::Int(6));
}

#[test]
fn namespaces_isolate_definitions() {
    assert_eq!(eval("(ns-set 'foo) (def a 1) (ns-set 'user) foo/a"), "1");
    assert_eq!(eval("*ns*"), "#<namespace user>");
    assert!(matches!(
        eval_err("(ns-set 'foo) (def a 1) (ns-set 'user) a"),
        EvalError::InvalidSymbol { .. }
    ));
}

#[test]
fn refer_brings_in_another_namespace() {
    assert_eq!(
        eval("(ns-set 'lib) (def helper 7) (ns-set 'user) (ns-refer 'lib) helper"),
        "7"
    );
}

#[test]
fn read_string_and_eval() {
    assert_eq!(eval("(eval (read-string \"(+ 1 2)\"))"), "3");
    assert!(matches!(
        eval_err("(read-string \"(+ 1\")"),
        EvalError::Read { .. }
    ));
}

#[test]
fn regex_builtins() {
    assert_eq!(eval(r#"(re-find #"\d+" "ab123cd")"#), "\"123\"");
    assert_eq!(
        eval(r#"(re-matches #"(\w)(\d)" "a1")"#),
        "[\"a1\" \"a\" \"1\"]"
    );
    assert_eq!(eval(r#"(re-matches #"\d" "a1")"#), "nil");
}

#[test]
fn record_result_shifts_history() {
    let (interpreter, _) = interpreter();
    interpreter.record_result(Value::Int(1));
    interpreter.record_result(Value::Int(2));
    assert_eq!(interpreter.eval_str("*1").unwrap(), Value::Int(2));
    assert_eq!(interpreter.eval_str("*2").unwrap(), Value::Int(1));
    let third = interpreter.eval_str("*3").unwrap();
    assert_eq!(
        interpreter.describe(&third, true).unwrap(),
        "#<unbound #'core/*3>"
    );
}

#[test]
fn current_namespace_tracks_ns_set() {
    let (interpreter, _) = interpreter();
    assert_eq!(&*interpreter.current_namespace(), "user");
    interpreter.eval_str("(ns-set 'scratch)").unwrap();
    assert_eq!(&*interpreter.current_namespace(), "scratch");
}

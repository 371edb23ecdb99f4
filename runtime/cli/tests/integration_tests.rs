use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

fn tamarind_cli() -> Command {
    cargo_bin_cmd!("tamarind-cli")
}

#[test]
fn cli_help() {
    tamarind_cli()
        .arg("-h")
        .assert()
        .success()
        .stdout(predicate::str::contains("Tamarind"))
        .stdout(predicate::str::contains("USAGE:"));
}

#[test]
fn cli_eval_prints_the_last_value() {
    tamarind_cli()
        .args(["-e", "(def x 20) (+ x 22)"])
        .assert()
        .success()
        .stdout("42\n");
}

#[test]
fn cli_results_use_the_readable_rendering() {
    tamarind_cli()
        .args(["-e", r#"(str "a" "b")"#])
        .assert()
        .success()
        .stdout("\"ab\"\n");
}

#[test]
fn cli_nil_result_prints_nothing() {
    tamarind_cli()
        .args(["-e", r#"(println "hello")"#])
        .assert()
        .success()
        .stdout("hello\n");
}

#[test]
fn cli_run_script_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
        (defn square [x] (* x x))
        (println "squares")
        (->> (range 1 4) (map square) (reduce +))
        "#
    )
    .unwrap();

    tamarind_cli()
        .arg(file.path())
        .assert()
        .success()
        .stdout("squares\n14\n");
}

#[test]
fn cli_reads_script_from_stdin() {
    tamarind_cli()
        .write_stdin("(* 6 7)")
        .assert()
        .success()
        .stdout("42\n");
}

#[test]
fn cli_error_file_not_found() {
    tamarind_cli()
        .arg("/nonexistent/file.clj")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Error reading file"));
}

#[test]
fn cli_error_unknown_option() {
    tamarind_cli()
        .arg("--bogus")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unknown option"));
}

#[test]
fn cli_error_read_error() {
    tamarind_cli()
        .args(["-e", "(+ 1"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Parse error"));
}

#[test]
fn cli_error_evaluation_error() {
    tamarind_cli()
        .args(["-e", "(/ 1 0)"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Divide by zero"));
}

#[test]
fn cli_without_stdlib() {
    tamarind_cli()
        .args(["--no-stdlib", "-e", "(map inc [1])"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Unable to resolve symbol: map"));
}

#[test]
fn cli_json_script_output() {
    tamarind_cli()
        .args(["-o", "json", "-e", r#"(print "x") (+ 1 2)"#])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""type":"script""#))
        .stdout(predicate::str::contains(r#""value":"3""#))
        .stdout(predicate::str::contains(r#""console":"x""#));
}

#[test]
fn cli_json_error_output() {
    tamarind_cli()
        .args(["-o", "json", "-e", "(nth [1] 3)"])
        .assert()
        .code(2)
        .stdout(predicate::str::contains(r#""type":"error""#))
        .stdout(predicate::str::contains(r#""kind":"out-of-bounds""#));
}

#[test]
fn cli_rejects_unknown_log_domain() {
    tamarind_cli()
        .args(["--log", "gc", "-e", "1"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unknown log domain"));
}

#[test]
fn cli_eval_tracing_goes_to_stderr() {
    tamarind_cli()
        .args(["--log", "eval", "-e", "(+ 1 2)"])
        .env("TAMARIND_LOG", "tamarind=debug")
        .assert()
        .success()
        .stdout("3\n")
        .stderr(predicate::str::contains("tamarind::eval"));
}

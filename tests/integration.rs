use std::fs;

use rpal_lang::{rpal, RunMode};

fn run_fixture(name: &str) -> (Option<rpal_lang::value::Value>, String) {
    let source = fs::read_to_string(format!("tests/fixtures/{name}.rpal")).unwrap();
    let mut out = Vec::new();
    let mut interpreter = rpal::new();
    let value = interpreter.run(&source, RunMode::Run, &mut out);
    (value, String::from_utf8(out).unwrap())
}

#[test]
fn recursive_factorial_prints_120() {
    let (value, out) = run_fixture("factorial");
    assert!(value.is_some());
    assert_eq!(out, "120\n");
}

#[test]
fn nested_let_sums_two_bindings() {
    let (_, out) = run_fixture("nested_let");
    assert_eq!(out, "15\n");
}

#[test]
fn order_counts_tuple_elements() {
    let (_, out) = run_fixture("order_builtin");
    assert_eq!(out, "3\n");
}

#[test]
fn nested_where_resolves_outer_to_inner() {
    let (_, out) = run_fixture("nested_where");
    assert_eq!(out, "25\n");
}

#[test]
fn tuple_selection_is_one_indexed() {
    let (_, out) = run_fixture("tuple_selection");
    assert_eq!(out, "2\n");
}

#[test]
fn string_builtins_roundtrip() {
    let (_, out) = run_fixture("string_builtins");
    assert_eq!(out, "hello\n");
}

#[test]
fn simultaneous_definitions_are_visible_to_each_other_s_scope() {
    let (_, out) = run_fixture("simultaneous_defs");
    assert_eq!(out, "25\n");
}

#[test]
fn curried_function_application() {
    let (_, out) = run_fixture("curried_lambda");
    assert_eq!(out, "7\n");
}

#[test]
fn simultaneous_definitions_print_as_a_tuple() {
    let (_, out) = run_fixture("tuple_print");
    assert_eq!(out, "(1, 2, 3)\n");
}

#[test]
fn literal_tuple_prints_in_source_order() {
    let (_, out) = run_fixture("literal_tuple_order");
    assert_eq!(out, "(1, 2, 3)\n");
}

#[test]
fn division_by_zero_produces_no_value() {
    let (value, _) = run_fixture("division_by_zero");
    assert!(value.is_none());
    rpal_lang::error::reset_error();
}

#[test]
fn unbound_identifier_produces_no_value() {
    let (value, _) = run_fixture("unbound_identifier");
    assert!(value.is_none());
    rpal_lang::error::reset_error();
}

#[test]
fn syntax_error_produces_no_value() {
    let (value, _) = run_fixture("syntax_error");
    assert!(value.is_none());
    rpal_lang::error::reset_error();
}

#[cfg(test)]
mod cli {
    use assert_cmd::Command;

    #[test]
    fn runs_a_program_and_exits_zero() {
        Command::cargo_bin("rpal")
            .unwrap()
            .arg("tests/fixtures/factorial.rpal")
            .assert()
            .success()
            .stdout("120\n");
    }

    #[test]
    fn division_by_zero_exits_seventy() {
        Command::cargo_bin("rpal")
            .unwrap()
            .arg("tests/fixtures/division_by_zero.rpal")
            .assert()
            .code(70);
    }

    #[test]
    fn syntax_error_exits_sixty_five() {
        Command::cargo_bin("rpal")
            .unwrap()
            .arg("tests/fixtures/syntax_error.rpal")
            .assert()
            .code(65);
    }

    #[test]
    fn ast_flag_prints_tree_and_does_not_run() {
        let output = Command::cargo_bin("rpal")
            .unwrap()
            .args(["-ast", "tests/fixtures/tuple_selection.rpal"])
            .output()
            .unwrap();

        assert!(output.status.success());
        let stdout = String::from_utf8(output.stdout).unwrap();
        assert!(stdout.contains("gamma"));
    }
}

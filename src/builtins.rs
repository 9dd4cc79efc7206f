use std::io::Write;

use crate::error::{RuntimeError, RuntimeErrorKind};
use crate::value::Value;

/// Name and arity of every built-in bound into the root environment, plus the
/// `Y*` fixed-point combinator handled specially by the CSE machine.
pub const BUILTIN_NAMES: &[(&str, usize)] = &[
    ("Print", 1),
    ("Isinteger", 1),
    ("Istruthvalue", 1),
    ("Isstring", 1),
    ("Istuple", 1),
    ("Isfunction", 1),
    ("Isdummy", 1),
    ("Stem", 1),
    ("Stern", 1),
    ("Conc", 2),
    ("Order", 1),
    ("Null", 1),
    ("ItoS", 1),
];

/// Invokes a fully-saturated built-in. `Y*` is not handled here — the CSE
/// machine intercepts it before the call ever reaches a full argument count.
pub fn call(name: &str, args: &[Value], out: &mut dyn Write) -> Result<Value, RuntimeError> {
    match name {
        "Print" => {
            writeln!(out, "{}", args[0]).map_err(|e| {
                RuntimeError::new(RuntimeErrorKind::BuiltinError, format!("Print failed: {e}"))
            })?;
            Ok(Value::Dummy)
        }

        "Isinteger" => Ok(Value::Bool(matches!(args[0], Value::Int(_)))),
        "Istruthvalue" => Ok(Value::Bool(matches!(args[0], Value::Bool(_)))),
        "Isstring" => Ok(Value::Bool(matches!(args[0], Value::Str(_)))),
        "Istuple" => Ok(Value::Bool(matches!(args[0], Value::Tuple(_)))),
        "Isfunction" => Ok(Value::Bool(args[0].is_function())),
        "Isdummy" => Ok(Value::Bool(matches!(args[0], Value::Dummy))),

        "Stem" => {
            let s = expect_string(name, &args[0])?;
            Ok(Value::Str(s.chars().next().map(String::from).unwrap_or_default()))
        }

        "Stern" => {
            let s = expect_string(name, &args[0])?;
            Ok(Value::Str(s.chars().skip(1).collect()))
        }

        "Conc" => {
            let a = expect_string(name, &args[0])?;
            let b = expect_string(name, &args[1])?;
            Ok(Value::Str(format!("{a}{b}")))
        }

        "Order" => match &args[0] {
            Value::Tuple(items) => Ok(Value::Int(items.len() as i64)),
            Value::Nil => Ok(Value::Int(0)),
            other => Err(type_error(name, other)),
        },

        "Null" => match &args[0] {
            Value::Tuple(items) => Ok(Value::Bool(items.is_empty())),
            Value::Nil => Ok(Value::Bool(true)),
            other => Err(type_error(name, other)),
        },

        "ItoS" => match &args[0] {
            Value::Int(n) => Ok(Value::Str(n.to_string())),
            other => Err(type_error(name, other)),
        },

        _ => Err(RuntimeError::new(
            RuntimeErrorKind::BuiltinError,
            format!("unknown built-in '{name}'"),
        )),
    }
}

fn expect_string<'a>(name: &str, value: &'a Value) -> Result<&'a str, RuntimeError> {
    match value {
        Value::Str(s) => Ok(s),
        other => Err(type_error(name, other)),
    }
}

fn type_error(name: &str, found: &Value) -> RuntimeError {
    RuntimeError::new(
        RuntimeErrorKind::TypeError,
        format!("{name} expects a string, found {}", found.type_name()),
    )
}

#[cfg(test)]
mod test {
    use super::*;

    fn sink() -> Vec<u8> {
        Vec::new()
    }

    #[test]
    fn print_renders_display_and_returns_dummy() {
        let mut out = sink();
        let result = call("Print", &[Value::Int(7)], &mut out).unwrap();
        assert!(matches!(result, Value::Dummy));
        assert_eq!(out, b"7\n");
    }

    #[test]
    fn type_predicates_report_correctly() {
        let mut out = sink();
        assert!(matches!(call("Isinteger", &[Value::Int(1)], &mut out), Ok(Value::Bool(true))));
        assert!(matches!(call("Isstring", &[Value::Int(1)], &mut out), Ok(Value::Bool(false))));
    }

    #[test]
    fn stem_and_stern_split_first_character() {
        let mut out = sink();
        let s = Value::Str("abc".to_string());
        assert!(matches!(call("Stem", &[s.clone()], &mut out), Ok(Value::Str(ref x)) if x == "a"));
        assert!(matches!(call("Stern", &[s], &mut out), Ok(Value::Str(ref x)) if x == "bc"));
    }

    #[test]
    fn conc_joins_two_strings() {
        let mut out = sink();
        let result = call("Conc", &[Value::Str("a".into()), Value::Str("b".into())], &mut out).unwrap();
        assert!(matches!(result, Value::Str(ref x) if x == "ab"));
    }

    #[test]
    fn order_counts_tuple_elements() {
        let mut out = sink();
        let result = call("Order", &[Value::Tuple(vec![Value::Int(1), Value::Int(2)])], &mut out).unwrap();
        assert!(matches!(result, Value::Int(2)));
    }

    #[test]
    fn order_of_nil_is_zero() {
        let mut out = sink();
        let result = call("Order", &[Value::Nil], &mut out).unwrap();
        assert!(matches!(result, Value::Int(0)));
    }

    #[test]
    fn null_true_for_empty_tuple() {
        let mut out = sink();
        let result = call("Null", &[Value::Tuple(vec![])], &mut out).unwrap();
        assert!(matches!(result, Value::Bool(true)));
    }

    #[test]
    fn itos_converts_integer_to_string() {
        let mut out = sink();
        let result = call("ItoS", &[Value::Int(42)], &mut out).unwrap();
        assert!(matches!(result, Value::Str(ref x) if x == "42"));
    }

    #[test]
    fn stem_on_non_string_is_type_error() {
        let mut out = sink();
        let err = call("Stem", &[Value::Int(1)], &mut out).unwrap_err();
        assert_eq!(err.kind, RuntimeErrorKind::TypeError);
    }
}

//! Standard function library
//!
//! The fallback [`MethodResolver`] used when an LG built-in does not claim a
//! call. Names are case-sensitive.

use serde_json::Value;

use super::eval::binary;
use super::parser::BinaryOp;
use super::{ExpressionError, MethodResolver};
use crate::value::{compare, is_truthy, to_text, values_equal};

/// Names handled by [`StandardFunctions`]
pub const STANDARD_FUNCTIONS: &[&str] = &[
    "add", "sub", "mul", "div", "mod", "equals", "not", "and", "or", "concat", "length",
    "toUpper", "toLower", "exists", "if", "min", "max", "first", "last",
];

#[derive(Debug, Clone, Copy, Default)]
pub struct StandardFunctions;

impl MethodResolver for StandardFunctions {
    fn invoke(&mut self, name: &str, args: Vec<Value>) -> Option<Result<Value, ExpressionError>> {
        let result = match name {
            "add" => fold_numbers(name, BinaryOp::Add, args),
            "sub" => binary_args(name, args).and_then(|(a, b)| binary(BinaryOp::Sub, &a, &b)),
            "mul" => fold_numbers(name, BinaryOp::Mul, args),
            "div" => binary_args(name, args).and_then(|(a, b)| binary(BinaryOp::Div, &a, &b)),
            "mod" => binary_args(name, args).and_then(|(a, b)| binary(BinaryOp::Mod, &a, &b)),
            "equals" => binary_args(name, args).map(|(a, b)| Value::Bool(values_equal(&a, &b))),
            "not" => unary_arg(name, args).map(|v| Value::Bool(!is_truthy(&v))),
            "and" => Ok(Value::Bool(args.iter().all(is_truthy))),
            "or" => Ok(Value::Bool(args.iter().any(is_truthy))),
            "concat" => Ok(Value::String(args.iter().map(to_text).collect())),
            "length" => unary_arg(name, args).and_then(|v| length(name, &v)),
            "toUpper" => unary_arg(name, args).map(|v| Value::String(to_text(&v).to_uppercase())),
            "toLower" => unary_arg(name, args).map(|v| Value::String(to_text(&v).to_lowercase())),
            "exists" => unary_arg(name, args).map(|v| Value::Bool(!v.is_null())),
            "if" => conditional(name, args),
            "min" => extremum(name, args, std::cmp::Ordering::Less),
            "max" => extremum(name, args, std::cmp::Ordering::Greater),
            "first" => unary_arg(name, args).and_then(|v| end(name, v, false)),
            "last" => unary_arg(name, args).and_then(|v| end(name, v, true)),
            _ => return None,
        };
        Some(result)
    }
}

fn arity(name: &str, expected: &str, found: usize) -> ExpressionError {
    ExpressionError::function(name, format!("expects {} argument(s), got {}", expected, found))
}

fn unary_arg(name: &str, args: Vec<Value>) -> Result<Value, ExpressionError> {
    let found = args.len();
    let mut args = args.into_iter();
    match (args.next(), args.next()) {
        (Some(v), None) => Ok(v),
        _ => Err(arity(name, "1", found)),
    }
}

fn binary_args(name: &str, args: Vec<Value>) -> Result<(Value, Value), ExpressionError> {
    let found = args.len();
    let mut args = args.into_iter();
    match (args.next(), args.next(), args.next()) {
        (Some(a), Some(b), None) => Ok((a, b)),
        _ => Err(arity(name, "2", found)),
    }
}

fn fold_numbers(name: &str, op: BinaryOp, args: Vec<Value>) -> Result<Value, ExpressionError> {
    if args.len() < 2 {
        return Err(arity(name, "at least 2", args.len()));
    }
    let mut args = args.into_iter();
    let first = args.next().unwrap_or(Value::Null);
    args.try_fold(first, |acc, next| binary(op, &acc, &next))
}

fn length(name: &str, value: &Value) -> Result<Value, ExpressionError> {
    match value {
        Value::String(s) => Ok(Value::from(s.chars().count())),
        Value::Array(items) => Ok(Value::from(items.len())),
        other => Err(ExpressionError::type_mismatch(name, "string or list", other)),
    }
}

fn conditional(name: &str, args: Vec<Value>) -> Result<Value, ExpressionError> {
    let found = args.len();
    let mut args = args.into_iter();
    match (args.next(), args.next(), args.next(), args.next()) {
        (Some(cond), Some(then), Some(otherwise), None) => Ok(if is_truthy(&cond) {
            then
        } else {
            otherwise
        }),
        _ => Err(arity(name, "3", found)),
    }
}

fn extremum(
    name: &str,
    args: Vec<Value>,
    keep: std::cmp::Ordering,
) -> Result<Value, ExpressionError> {
    let items = match <[Value; 1]>::try_from(args) {
        Ok([Value::Array(items)]) => items,
        Ok([single]) => vec![single],
        Err(args) => args,
    };
    let mut items = items.into_iter();
    let Some(mut best) = items.next() else {
        return Err(arity(name, "at least 1", 0));
    };
    for item in items {
        match compare(&item, &best) {
            Some(ordering) if ordering == keep => best = item,
            Some(_) => {}
            None => return Err(ExpressionError::type_mismatch(name, "comparable values", &item)),
        }
    }
    Ok(best)
}

fn end(name: &str, value: Value, last: bool) -> Result<Value, ExpressionError> {
    match value {
        Value::Array(mut items) => Ok(if last {
            items.pop().unwrap_or(Value::Null)
        } else {
            items.into_iter().next().unwrap_or(Value::Null)
        }),
        Value::String(s) => {
            let c = if last { s.chars().next_back() } else { s.chars().next() };
            Ok(c.map(|c| Value::String(c.to_string())).unwrap_or(Value::Null))
        }
        other => Err(ExpressionError::type_mismatch(name, "string or list", &other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn call(name: &str, args: Vec<Value>) -> Result<Value, ExpressionError> {
        StandardFunctions.invoke(name, args).expect("function is known")
    }

    #[test]
    fn test_every_listed_function_is_known() {
        for name in STANDARD_FUNCTIONS {
            assert!(StandardFunctions.invoke(name, vec![]).is_some(), "{}", name);
        }
    }

    #[test]
    fn test_unknown_name_is_not_handled() {
        assert!(StandardFunctions.invoke("count", vec![json!([])]).is_none());
    }

    #[test]
    fn test_arithmetic_functions() {
        assert_eq!(call("add", vec![json!(1), json!(2), json!(3)]).unwrap(), json!(6));
        assert_eq!(call("sub", vec![json!(5), json!(2)]).unwrap(), json!(3));
        assert_eq!(call("mul", vec![json!(2), json!(2.5)]).unwrap(), json!(5));
        assert_eq!(call("div", vec![json!(9), json!(3)]).unwrap(), json!(3));
        assert_eq!(call("mod", vec![json!(9), json!(4)]).unwrap(), json!(1));
        assert!(matches!(
            call("div", vec![json!(1), json!(0)]),
            Err(ExpressionError::DivisionByZero)
        ));
    }

    #[test]
    fn test_string_functions() {
        assert_eq!(
            call("concat", vec![json!("a"), json!(1), json!(true)]).unwrap(),
            json!("a1true")
        );
        assert_eq!(call("toUpper", vec![json!("abc")]).unwrap(), json!("ABC"));
        assert_eq!(call("toLower", vec![json!("ÀB")]).unwrap(), json!("àb"));
        assert_eq!(call("length", vec![json!("héllo")]).unwrap(), json!(5));
        assert_eq!(call("length", vec![json!([1, 2])]).unwrap(), json!(2));
    }

    #[test]
    fn test_logic_functions() {
        assert_eq!(call("not", vec![json!(0)]).unwrap(), json!(true));
        assert_eq!(call("and", vec![json!(1), json!("x")]).unwrap(), json!(true));
        assert_eq!(call("or", vec![json!(false), json!(0)]).unwrap(), json!(false));
        assert_eq!(call("equals", vec![json!(2), json!(2.0)]).unwrap(), json!(true));
        assert_eq!(call("exists", vec![Value::Null]).unwrap(), json!(false));
        assert_eq!(
            call("if", vec![json!(false), json!("y"), json!("n")]).unwrap(),
            json!("n")
        );
    }

    #[test]
    fn test_collection_functions() {
        assert_eq!(call("min", vec![json!([3, 1, 2])]).unwrap(), json!(1));
        assert_eq!(call("max", vec![json!(3), json!(7), json!(2)]).unwrap(), json!(7));
        assert_eq!(call("first", vec![json!(["a", "b"])]).unwrap(), json!("a"));
        assert_eq!(call("last", vec![json!(["a", "b"])]).unwrap(), json!("b"));
        assert_eq!(call("last", vec![json!([])]).unwrap(), Value::Null);
    }

    #[test]
    fn test_arity_errors() {
        assert!(matches!(
            call("sub", vec![json!(1)]),
            Err(ExpressionError::Function { .. })
        ));
        assert!(matches!(
            call("length", vec![json!(1)]),
            Err(ExpressionError::TypeMismatch { .. })
        ));
    }
}

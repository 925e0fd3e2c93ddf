//! Tree-walking interpreter for parsed expressions

use serde_json::Value;
use std::cmp::Ordering;

use super::parser::{parse_expression, BinaryOp, Expr, UnaryOp};
use super::{ExpressionEngine, ExpressionError, MethodResolver, PropertyResolver};
use crate::value::{self, from_f64, is_truthy, to_text, values_equal};

/// Default [`ExpressionEngine`]: parses the text with nom, then walks the tree.
///
/// Bare identifiers resolve against the scope through the property resolver;
/// unknown names and out-of-range indexes evaluate to `null`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardExpressionEngine;

impl StandardExpressionEngine {
    pub fn new() -> Self {
        Self
    }
}

impl ExpressionEngine for StandardExpressionEngine {
    fn evaluate(
        &self,
        text: &str,
        scope: &Value,
        properties: &dyn PropertyResolver,
        methods: &mut dyn MethodResolver,
    ) -> Result<Value, ExpressionError> {
        let expr = parse_expression(text)?;
        Interpreter {
            scope,
            properties,
            methods,
        }
        .eval(&expr)
    }
}

struct Interpreter<'s, 'm> {
    scope: &'s Value,
    properties: &'s dyn PropertyResolver,
    methods: &'m mut dyn MethodResolver,
}

impl Interpreter<'_, '_> {
    fn eval(&mut self, expr: &Expr) -> Result<Value, ExpressionError> {
        match expr {
            Expr::Literal(v) => Ok(v.clone()),
            Expr::List(items) => items
                .iter()
                .map(|item| self.eval(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Expr::Identifier(name) => Ok(self
                .properties
                .property(self.scope, name)
                .unwrap_or(Value::Null)),
            Expr::Member(target, name) => {
                let target = self.eval(target)?;
                Ok(self.properties.property(&target, name).unwrap_or(Value::Null))
            }
            Expr::Index(target, index) => {
                let target = self.eval(target)?;
                let index = self.eval(index)?;
                Ok(index_value(&target, &index))
            }
            Expr::Call(name, args) => {
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                self.methods
                    .invoke(name, args)
                    .unwrap_or_else(|| Err(ExpressionError::UnknownFunction(name.clone())))
            }
            Expr::Unary(op, operand) => {
                let operand = self.eval(operand)?;
                unary(*op, &operand)
            }
            Expr::Binary(BinaryOp::And, lhs, rhs) => {
                if !is_truthy(&self.eval(lhs)?) {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(is_truthy(&self.eval(rhs)?)))
            }
            Expr::Binary(BinaryOp::Or, lhs, rhs) => {
                if is_truthy(&self.eval(lhs)?) {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(is_truthy(&self.eval(rhs)?)))
            }
            Expr::Binary(op, lhs, rhs) => {
                let lhs = self.eval(lhs)?;
                let rhs = self.eval(rhs)?;
                binary(*op, &lhs, &rhs)
            }
        }
    }
}

fn index_value(target: &Value, index: &Value) -> Value {
    match (target, index) {
        (Value::Array(items), Value::Number(n)) => n
            .as_u64()
            .and_then(|i| items.get(i as usize))
            .cloned()
            .unwrap_or(Value::Null),
        (Value::Object(map), Value::String(key)) => map.get(key).cloned().unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

fn unary(op: UnaryOp, operand: &Value) -> Result<Value, ExpressionError> {
    match op {
        UnaryOp::Not => Ok(Value::Bool(!is_truthy(operand))),
        UnaryOp::Negate => match operand {
            Value::Number(n) => match n.as_i64().and_then(i64::checked_neg) {
                Some(i) => Ok(Value::from(i)),
                None => Ok(from_f64(-n.as_f64().unwrap_or_default())),
            },
            other => Err(ExpressionError::type_mismatch("-", "number", other)),
        },
    }
}

pub(crate) fn binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, ExpressionError> {
    match op {
        BinaryOp::Add if lhs.is_string() || rhs.is_string() => {
            Ok(Value::String(format!("{}{}", to_text(lhs), to_text(rhs))))
        }
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
            arithmetic(op, lhs, rhs)
        }
        BinaryOp::Eq => Ok(Value::Bool(values_equal(lhs, rhs))),
        BinaryOp::Ne => Ok(Value::Bool(!values_equal(lhs, rhs))),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = value::compare(lhs, rhs).ok_or_else(|| {
                let offender = if value::compare(lhs, lhs).is_none() { lhs } else { rhs };
                ExpressionError::type_mismatch(op.symbol(), "comparable values", offender)
            })?;
            Ok(Value::Bool(match op {
                BinaryOp::Lt => ordering == Ordering::Less,
                BinaryOp::Le => ordering != Ordering::Greater,
                BinaryOp::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            }))
        }
        BinaryOp::And => Ok(Value::Bool(is_truthy(lhs) && is_truthy(rhs))),
        BinaryOp::Or => Ok(Value::Bool(is_truthy(lhs) || is_truthy(rhs))),
    }
}

fn arithmetic(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, ExpressionError> {
    let (a, b) = match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => (a, b),
        (Value::Number(_), other) | (other, _) => {
            return Err(ExpressionError::type_mismatch(op.symbol(), "number", other))
        }
    };

    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        let exact = match op {
            BinaryOp::Add => x.checked_add(y),
            BinaryOp::Sub => x.checked_sub(y),
            BinaryOp::Mul => x.checked_mul(y),
            BinaryOp::Mod if y == 0 => return Err(ExpressionError::DivisionByZero),
            BinaryOp::Mod => x.checked_rem(y),
            _ => None,
        };
        if let Some(result) = exact {
            return Ok(Value::from(result));
        }
    }

    let x = a.as_f64().unwrap_or_default();
    let y = b.as_f64().unwrap_or_default();
    let result = match op {
        BinaryOp::Add => x + y,
        BinaryOp::Sub => x - y,
        BinaryOp::Mul => x * y,
        BinaryOp::Div | BinaryOp::Mod if y == 0.0 => return Err(ExpressionError::DivisionByZero),
        BinaryOp::Div => x / y,
        _ => x % y,
    };
    Ok(from_f64(result))
}

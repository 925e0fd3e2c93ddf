//! Expression engine boundary
//!
//! Template evaluation never interprets `{…}` text itself. It hands the text
//! to an [`ExpressionEngine`] together with the current scope, a
//! [`PropertyResolver`] for name lookup and a [`MethodResolver`] for calls.
//! The LG built-ins are one such method resolver; anything they do not
//! handle falls through to a fallback resolver such as [`StandardFunctions`].
//!
//! [`StandardExpressionEngine`] is the engine shipped with the crate:
//!
//! ```text
//! expr    := or
//! or      := and ("||" and)*
//! and     := eq ("&&" eq)*
//! eq      := cmp (("==" | "!=") cmp)*
//! cmp     := add (("<=" | ">=" | "<" | ">") add)*
//! add     := mul (("+" | "-") mul)*
//! mul     := unary (("*" | "/" | "%") unary)*
//! unary   := ("!" | "-") unary | postfix
//! postfix := primary ("." ident | "[" expr "]")*
//! primary := literal | "[" list "]" | "(" expr ")" | ident "(" args ")" | ident
//! ```

mod eval;
mod functions;
mod parser;

pub use eval::StandardExpressionEngine;
pub use functions::{StandardFunctions, STANDARD_FUNCTIONS};
pub use parser::{parse_expression, BinaryOp, Expr, UnaryOp};

use serde_json::Value;
use thiserror::Error;

use crate::error::EvaluationError;
use crate::value;

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, Error)]
pub enum ExpressionError {
    #[error("Syntax error in expression '{expression}': {message}")]
    Syntax { expression: String, message: String },

    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error("Type mismatch in {operation}: expected {expected}, found {found}")]
    TypeMismatch {
        operation: String,
        expected: String,
        found: String,
    },

    #[error("Division by zero")]
    DivisionByZero,

    #[error("{function}: {message}")]
    Function { function: String, message: String },

    /// Template evaluation failure raised from inside a built-in
    #[error(transparent)]
    Template(Box<EvaluationError>),
}

impl ExpressionError {
    pub fn type_mismatch(operation: &str, expected: &str, found: &Value) -> Self {
        ExpressionError::TypeMismatch {
            operation: operation.to_string(),
            expected: expected.to_string(),
            found: value::type_name(found).to_string(),
        }
    }

    pub fn function(function: &str, message: impl Into<String>) -> Self {
        ExpressionError::Function {
            function: function.to_string(),
            message: message.into(),
        }
    }
}

impl From<EvaluationError> for ExpressionError {
    fn from(err: EvaluationError) -> Self {
        ExpressionError::Template(Box::new(err))
    }
}

// =============================================================================
// RESOLVER TRAITS
// =============================================================================

/// Evaluates expression text against a scope
pub trait ExpressionEngine: Send + Sync {
    fn evaluate(
        &self,
        text: &str,
        scope: &Value,
        properties: &dyn PropertyResolver,
        methods: &mut dyn MethodResolver,
    ) -> Result<Value, ExpressionError>;
}

/// Looks up `name` on a value (the scope for bare identifiers)
pub trait PropertyResolver {
    fn property(&self, target: &Value, name: &str) -> Option<Value>;
}

/// Invokes a named function.
///
/// Returns `None` when the resolver does not know `name`.
pub trait MethodResolver {
    fn invoke(&mut self, name: &str, args: Vec<Value>) -> Option<Result<Value, ExpressionError>>;
}

/// Mapping-key lookup on scope values
#[derive(Debug, Clone, Copy, Default)]
pub struct ScopeProperties;

impl PropertyResolver for ScopeProperties {
    fn property(&self, target: &Value, name: &str) -> Option<Value> {
        value::property(target, name).cloned()
    }
}

/// Resolver that knows no functions
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMethods;

impl MethodResolver for NoMethods {
    fn invoke(&mut self, _name: &str, _args: Vec<Value>) -> Option<Result<Value, ExpressionError>> {
        None
    }
}

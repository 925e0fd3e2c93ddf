//! Error types for loading and evaluating LG templates.

use lg_core::{ParseError, SourceLocation, TemplateRefError};
use thiserror::Error;

use crate::expression::ExpressionError;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to parse LG source: {0}")]
    Parse(#[from] ParseError),

    #[error("Template '{name}' is defined twice: first at {first}, again at {second}")]
    DuplicateTemplate {
        name: String,
        first: SourceLocation,
        second: SourceLocation,
    },
}

#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("Unknown template: '{0}'")]
    UnknownTemplate(String),

    #[error("Loop detected: {}", .path.join(" => "))]
    CycleDetected { path: Vec<String> },

    #[error("Template '{template}' expects {expected} argument(s), but {found} were supplied")]
    ArgumentCountMismatch {
        template: String,
        expected: usize,
        found: usize,
    },

    #[error(transparent)]
    InvalidTemplateRef(#[from] TemplateRefError),

    #[error("Error evaluating '{expression}' in template '{template}': {source}")]
    Expression {
        template: String,
        expression: String,
        source: ExpressionError,
    },

    #[error("Type error in {function}: expected {expected}, found {found}")]
    TypeMismatch {
        function: String,
        expected: String,
        found: String,
    },

    #[error("Bad arguments to {function}: {message}")]
    ArgumentShapeMismatch { function: String, message: String },
}

impl EvaluationError {
    pub fn shape(function: &str, message: impl Into<String>) -> Self {
        EvaluationError::ArgumentShapeMismatch {
            function: function.to_string(),
            message: message.into(),
        }
    }

    /// Names on the cycle, in call order, when this is a cycle error
    pub fn cycle_path(&self) -> Option<&[String]> {
        match self {
            EvaluationError::CycleDetected { path } => Some(path),
            _ => None,
        }
    }
}

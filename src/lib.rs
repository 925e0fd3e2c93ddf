//! lg-engine: LG template loading and evaluation
//!
//! Builds on `lg-core` (grammar, syntax tree, static checks) and adds:
//! - [`TemplateRegistry`]: immutable, shareable name → template map
//! - [`Evaluator`]: per-request renderer with cycle detection and argument binding
//! - LG built-ins (`count`, `join`, `foreach`, `foreachThenJoin`/`humanize`)
//! - The expression boundary ([`ExpressionEngine`]) and a default nom-based engine
//! - Pluggable alternative choice ([`IndexPicker`])
//! - [`EngineConfig`] / [`TemplateLoader`] for file-based setups
//! - [`TemplateEngine`]: the façade most callers want

pub mod builtins;
pub mod config;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod expression;
pub mod loader;
pub mod random;
pub mod registry;
pub mod value;

pub use config::EngineConfig;
pub use engine::TemplateEngine;
pub use error::{EvaluationError, LoadError};
pub use evaluator::{EvaluationTarget, Evaluator};
pub use expression::{
    ExpressionEngine, ExpressionError, MethodResolver, PropertyResolver, ScopeProperties,
    StandardExpressionEngine, StandardFunctions,
};
pub use loader::TemplateLoader;
pub use random::{FixedPicker, IndexPicker, RandomPicker, SequencePicker};
pub use registry::{DuplicatePolicy, TemplateRegistry};

// Re-export the language layer
pub use lg_core::{parse_lg, parse_lg_named, LgFile, ParseError, TemplateDefinition, TemplateName};

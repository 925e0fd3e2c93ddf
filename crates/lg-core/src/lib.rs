//! lg-core: LG grammar, syntax tree and static checks
//!
//! This crate contains the pure language logic with NO evaluation:
//! - Mode-switching tokenizer (file / template-name line / template body)
//! - Predictive parser producing [`LgFile`] / [`TemplateDefinition`] values
//! - Syntax tree with template-ref and multi-line island helpers
//! - Diagnostic types for error reporting
//! - Static validator (duplicates, unknown refs, argument counts)
//!
//! Evaluation lives in the `lg-engine` crate.

pub mod ast;
pub mod diagnostics;
pub mod lexer;
pub mod parser;
pub mod token;
pub mod validator;

// Re-export commonly used types
pub use ast::{
    islands, split_top_level, CaseClause, ConditionalBody, Island, LgFile, NormalBody, Segment,
    TemplateBody, TemplateDefinition, TemplateRefCall, TemplateRefError, TemplateString,
};
pub use diagnostics::{Diagnostic, DiagnosticCode, Severity, SourceSpan};
pub use lexer::tokenize;
pub use lg_types::{ParseError, SourceLocation, TemplateName};
pub use parser::{parse_lg, parse_lg_named};
pub use token::{Token, TokenKind};
pub use validator::{validate_files, ValidationResult, ValidationStats};

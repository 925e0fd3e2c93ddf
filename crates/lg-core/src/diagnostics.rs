//! Unified Diagnostics Module
//!
//! Single diagnostic type used for parse failures and static validation of
//! LG files. Shaped for editor/LSP style reporting.

use lg_types::{ParseError, SourceLocation};
use serde::{Deserialize, Serialize};

/// Diagnostic severity level
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
    Hint,
}

/// Diagnostic codes for categorizing issues
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticCode {
    // =========================================================================
    // Parse errors
    // =========================================================================
    SyntaxError,

    // =========================================================================
    // Validation errors
    // =========================================================================
    DuplicateTemplate,
    UnknownTemplate,
    ArgumentCountMismatch,
    InvalidTemplateRef,

    // =========================================================================
    // Validation hints
    // =========================================================================
    UnusedParameter,
}

/// Source location span
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpan {
    pub source_name: Option<String>,
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
}

impl SourceSpan {
    pub fn new(start_line: u32, start_col: u32, end_line: u32, end_col: u32) -> Self {
        Self {
            source_name: None,
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }

    /// Single-line span covering `location.length` bytes
    pub fn from_location(location: &SourceLocation) -> Self {
        let line = location.line as u32;
        let col = location.column as u32;
        Self {
            source_name: location.source_name.clone(),
            start_line: line,
            start_col: col,
            end_line: line,
            end_col: col + location.length as u32,
        }
    }
}

impl std::fmt::Display for SourceSpan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.source_name {
            Some(name) => write!(f, "{}:{}:{}", name, self.start_line, self.start_col),
            None => write!(f, "{}:{}", self.start_line, self.start_col),
        }
    }
}

/// Related information for multi-location diagnostics
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RelatedInfo {
    pub message: String,
    pub span: SourceSpan,
}

/// A diagnostic message with location and severity
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: DiagnosticCode,
    pub message: String,
    pub span: Option<SourceSpan>,
    pub related: Vec<RelatedInfo>,
}

impl Diagnostic {
    /// Create an error diagnostic
    pub fn error(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::with_severity(Severity::Error, code, message)
    }

    /// Create a warning diagnostic
    pub fn warning(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::with_severity(Severity::Warning, code, message)
    }

    /// Create a hint diagnostic
    pub fn hint(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::with_severity(Severity::Hint, code, message)
    }

    fn with_severity(severity: Severity, code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            span: None,
            related: vec![],
        }
    }

    /// Add source span
    pub fn with_span(mut self, span: SourceSpan) -> Self {
        self.span = Some(span);
        self
    }

    /// Add source span from a location
    pub fn at(self, location: &SourceLocation) -> Self {
        self.with_span(SourceSpan::from_location(location))
    }

    /// Add related information
    pub fn with_related(mut self, related: RelatedInfo) -> Self {
        self.related.push(related);
        self
    }

    pub fn is_error(&self) -> bool {
        matches!(self.severity, Severity::Error)
    }

    pub fn is_warning(&self) -> bool {
        matches!(self.severity, Severity::Warning)
    }
}

impl From<&ParseError> for Diagnostic {
    fn from(err: &ParseError) -> Self {
        let mut message = err.message.clone();
        if !err.expected.is_empty() {
            message.push_str(&format!(", expected {}", err.expected.join(" or ")));
        }
        Diagnostic::error(DiagnosticCode::SyntaxError, message).at(&err.location)
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let level = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Hint => "hint",
        };
        match &self.span {
            Some(span) => write!(f, "{}: {} [{}]", level, self.message, span),
            None => write!(f, "{}: {}", level, self.message),
        }
    }
}

// =============================================================================
// Convenience Builders
// =============================================================================

/// Create an error for a template defined more than once
pub fn duplicate_template_error(
    name: &str,
    location: &SourceLocation,
    first: &SourceLocation,
) -> Diagnostic {
    Diagnostic::error(
        DiagnosticCode::DuplicateTemplate,
        format!("template '{}' is already defined", name),
    )
    .at(location)
    .with_related(RelatedInfo {
        message: "first definition".to_string(),
        span: SourceSpan::from_location(first),
    })
}

/// Create a warning for a reference to an undefined template
pub fn unknown_template_warning(name: &str, location: &SourceLocation) -> Diagnostic {
    Diagnostic::warning(
        DiagnosticCode::UnknownTemplate,
        format!("reference to undefined template '{}'", name),
    )
    .at(location)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let diag = Diagnostic::error(DiagnosticCode::SyntaxError, "unexpected token");
        assert!(diag.is_error());
        assert!(!diag.is_warning());
        assert_eq!(diag.message, "unexpected token");
    }

    #[test]
    fn test_display_per_severity() {
        let code = DiagnosticCode::SyntaxError;
        assert_eq!(Diagnostic::error(code.clone(), "e").to_string(), "error: e");
        assert_eq!(Diagnostic::warning(code.clone(), "w").to_string(), "warning: w");
        assert_eq!(Diagnostic::hint(code, "h").to_string(), "hint: h");
    }

    #[test]
    fn test_span_from_location() {
        let loc = SourceLocation::new(3, 5, 40, 4).with_source_name("a.lg");
        let span = SourceSpan::from_location(&loc);
        assert_eq!(span.start_line, 3);
        assert_eq!(span.end_col, 9);
        assert_eq!(span.to_string(), "a.lg:3:5");
    }

    #[test]
    fn test_from_parse_error() {
        let err = ParseError::new("unexpected text", SourceLocation::new(2, 3, 9, 1))
            .expecting(["newline"]);
        let diag = Diagnostic::from(&err);
        assert!(diag.is_error());
        assert_eq!(diag.code, DiagnosticCode::SyntaxError);
        assert_eq!(diag.message, "unexpected text, expected newline");
        assert_eq!(diag.to_string(), "error: unexpected text, expected newline [2:3]");
    }

    #[test]
    fn test_duplicate_has_related() {
        let a = SourceLocation::new(1, 1, 0, 1);
        let b = SourceLocation::new(9, 1, 80, 1);
        let diag = duplicate_template_error("Greeting", &b, &a);
        assert_eq!(diag.related.len(), 1);
        assert_eq!(diag.related[0].span.start_line, 1);
    }
}

//! LG Types - Level 1 Foundation Types
//!
//! Pure data structures shared by the LG parser (`lg-core`) and the
//! evaluator (`lg-engine`).
//!
//! ## Architecture Level: LEVEL 1 (Foundation)
//!
//! This is the bottom layer of the dependency hierarchy. Every other crate in
//! the workspace depends on it; it depends on no workspace crate.
//!
//! ## Contents
//!
//! - Source location tracking
//! - Template names (dotted identifiers)
//! - The structured parse failure shared by the lexer and parser
//!
//! ## Rules
//!
//! 1. **NO EVALUATION LOGIC** - only data structures, constructors and accessors
//! 2. **NO WORKSPACE DEPENDENCIES**
//! 3. **SERIALIZABLE** - all types support serde
//! 4. **THREAD SAFE** - all types are Send + Sync

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

// ============================================================================
// SOURCE LOCATION AND POSITIONING
// ============================================================================

/// Source location in LG content for error reporting and debugging
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    /// Line number (1-based)
    pub line: usize,
    /// Column number (1-based, counted in characters)
    pub column: usize,
    /// Byte offset from start of input
    pub offset: usize,
    /// Length of the problematic span in bytes
    pub length: usize,
    /// Optional filename or identifier for the source
    pub source_name: Option<String>,
}

impl SourceLocation {
    /// Create a new source location
    pub fn new(line: usize, column: usize, offset: usize, length: usize) -> Self {
        Self {
            line,
            column,
            offset,
            length,
            source_name: None,
        }
    }

    /// Attach a source name (usually the file path)
    pub fn with_source_name(mut self, source_name: impl Into<String>) -> Self {
        self.source_name = Some(source_name.into());
        self
    }

    /// Get a human-readable description of the location
    pub fn description(&self) -> String {
        match &self.source_name {
            Some(name) => format!("{}:{}:{}", name, self.line, self.column),
            None => format!("{}:{}", self.line, self.column),
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

// ============================================================================
// TEMPLATE NAMES
// ============================================================================

/// A dotted template name: `segment("." segment)*`
///
/// Equality is exact, case-sensitive string comparison.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateName(String);

impl TemplateName {
    /// Build a name without validating its shape.
    ///
    /// The parser only produces well-formed names; this is for lookups with
    /// caller-supplied strings.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Build a name if every dot-separated segment is a valid identifier
    pub fn parse(name: &str) -> Option<Self> {
        if name.split('.').all(is_identifier) {
            Some(Self(name.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Dot-separated segments of the name
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.')
    }
}

impl fmt::Display for TemplateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for TemplateName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for TemplateName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TemplateName {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for TemplateName {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Identifier rule shared by template names and parameters:
/// `[A-Za-z0-9_][A-Za-z0-9_-]*`
pub fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphanumeric() || c == '_' => {}
        _ => return false,
    }
    chars.all(is_identifier_continue)
}

/// Characters allowed after the first character of an identifier
pub fn is_identifier_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

// ============================================================================
// PARSE ERRORS
// ============================================================================

/// Malformed LG syntax. Fails the whole file load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("Parse error at {location}: {message}{}", expected_suffix(.expected))]
pub struct ParseError {
    pub message: String,
    pub location: SourceLocation,
    /// Token kinds the parser would have accepted at this position
    pub expected: Vec<String>,
    /// Text of the offending token, if any
    pub found: Option<String>,
}

impl ParseError {
    pub fn new(message: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            message: message.into(),
            location,
            expected: Vec::new(),
            found: None,
        }
    }

    pub fn expecting(mut self, expected: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.expected = expected.into_iter().map(Into::into).collect();
        self
    }

    pub fn found(mut self, found: impl Into<String>) -> Self {
        self.found = Some(found.into());
        self
    }

    /// Attach a source name to the error location
    pub fn in_source(mut self, source_name: impl Into<String>) -> Self {
        self.location.source_name = Some(source_name.into());
        self
    }

    pub fn line(&self) -> usize {
        self.location.line
    }

    pub fn column(&self) -> usize {
        self.location.column
    }
}

fn expected_suffix(expected: &[String]) -> String {
    if expected.is_empty() {
        String::new()
    } else {
        format!(" (expected {})", expected.join(" or "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_location_description() {
        let loc = SourceLocation::new(3, 7, 20, 1);
        assert_eq!(loc.description(), "3:7");
        let loc = loc.with_source_name("greetings.lg");
        assert_eq!(loc.to_string(), "greetings.lg:3:7");
    }

    #[test]
    fn test_template_name_parse() {
        assert!(TemplateName::parse("Greeting").is_some());
        assert!(TemplateName::parse("welcome.morning").is_some());
        assert!(TemplateName::parse("a_b-c.d1").is_some());
        assert!(TemplateName::parse("").is_none());
        assert!(TemplateName::parse("bad..name").is_none());
        assert!(TemplateName::parse("-lead").is_none());
        assert!(TemplateName::parse("has space").is_none());
    }

    #[test]
    fn test_template_name_segments() {
        let name = TemplateName::new("a.b.c");
        assert_eq!(name.segments().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_template_name_is_case_sensitive() {
        assert_ne!(TemplateName::new("Greeting"), TemplateName::new("greeting"));
    }

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::new("unexpected token", SourceLocation::new(2, 1, 10, 1))
            .expecting(["'-'", "newline"])
            .found("#");
        assert_eq!(
            err.to_string(),
            "Parse error at 2:1: unexpected token (expected '-' or newline)"
        );
        assert_eq!(err.line(), 2);
        assert_eq!(err.found.as_deref(), Some("#"));
    }
}

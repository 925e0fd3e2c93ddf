//! LG syntax tree
//!
//! A parsed file is a list of [`TemplateDefinition`]s. Each body is either a
//! [`NormalBody`] (interchangeable alternatives) or a [`ConditionalBody`]
//! (ordered `CASE:` clauses plus a mandatory `DEFAULT:` clause).
//!
//! Segments keep their raw text, delimiters included. The lexer guarantees
//! the delimiters, so [`Segment::inner`] strips them by length rather than by
//! pattern. Case conditions are stored already stripped.

use lg_types::{SourceLocation, TemplateName};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use thiserror::Error;

use crate::lexer::FENCE;

// =============================================================================
// FILE AND TEMPLATES
// =============================================================================

/// A parsed LG source file
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LgFile {
    pub templates: Vec<TemplateDefinition>,
    pub source_name: Option<String>,
}

impl LgFile {
    pub fn template(&self, name: &str) -> Option<&TemplateDefinition> {
        self.templates.iter().find(|t| t.name.as_str() == name)
    }

    pub fn template_names(&self) -> impl Iterator<Item = &TemplateName> {
        self.templates.iter().map(|t| &t.name)
    }
}

/// `# name(params)` followed by its body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateDefinition {
    pub name: TemplateName,
    pub parameters: Vec<String>,
    pub body: TemplateBody,
    /// Location of the `#` that opens the definition
    pub location: SourceLocation,
}

impl TemplateDefinition {
    pub fn declares_parameters(&self) -> bool {
        !self.parameters.is_empty()
    }

    /// Every template string reachable from this definition, case bodies included
    pub fn template_strings(&self) -> Vec<&TemplateString> {
        match &self.body {
            TemplateBody::Normal(body) => body.alternatives.iter().collect(),
            TemplateBody::Conditional(body) => body
                .cases
                .iter()
                .chain(std::iter::once(&body.default))
                .flat_map(|clause| clause.body.alternatives.iter())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TemplateBody {
    Normal(NormalBody),
    Conditional(ConditionalBody),
}

/// Non-empty ordered list of alternatives; one is picked per evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalBody {
    pub alternatives: Vec<TemplateString>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionalBody {
    pub cases: Vec<CaseClause>,
    pub default: CaseClause,
}

/// `- CASE: {cond}` or `- DEFAULT:` with the lines below it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseClause {
    /// Condition with `{` `}` already removed; `None` for the default clause
    pub condition: Option<String>,
    pub body: NormalBody,
    pub location: SourceLocation,
}

impl CaseClause {
    pub fn is_default(&self) -> bool {
        self.condition.is_none()
    }
}

// =============================================================================
// TEMPLATE STRINGS
// =============================================================================

/// One `- …` line: ordered segments whose rendered texts concatenate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateString {
    pub segments: Vec<Segment>,
    pub location: SourceLocation,
}

impl TemplateString {
    /// Raw source text of the line (after the dash)
    pub fn to_source(&self) -> String {
        self.segments.iter().map(Segment::raw).collect()
    }

    /// All template references, including those inside multi-line islands
    pub fn template_refs(&self) -> Vec<&str> {
        let mut refs = Vec::new();
        for segment in &self.segments {
            match segment {
                Segment::TemplateRef(_) => refs.push(segment.inner()),
                Segment::MultiLineText(_) => {
                    for (_, island) in islands(segment.inner()) {
                        if let Island::TemplateRef(inner) = island {
                            refs.push(inner);
                        }
                    }
                }
                Segment::PlainText(_) | Segment::Expression(_) => {}
            }
        }
        refs
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Segment {
    PlainText(String),
    /// `{…}` including braces
    Expression(String),
    /// `[…]` including brackets
    TemplateRef(String),
    /// `` ```…``` `` including fences
    MultiLineText(String),
}

impl Segment {
    pub fn raw(&self) -> &str {
        match self {
            Segment::PlainText(s)
            | Segment::Expression(s)
            | Segment::TemplateRef(s)
            | Segment::MultiLineText(s) => s,
        }
    }

    /// Text between the delimiters
    pub fn inner(&self) -> &str {
        match self {
            Segment::PlainText(s) => s,
            Segment::Expression(s) | Segment::TemplateRef(s) => strip_delimiters(s, 1),
            Segment::MultiLineText(s) => strip_delimiters(s, FENCE.len()),
        }
    }
}

fn strip_delimiters(raw: &str, width: usize) -> &str {
    if raw.len() >= width * 2 {
        raw.get(width..raw.len() - width).unwrap_or(raw)
    } else {
        raw
    }
}

// =============================================================================
// TEMPLATE REFERENCES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateRefError {
    #[error("Not a valid template ref: {0}")]
    Malformed(String),

    #[error("Not a valid template name in ref: {0}")]
    InvalidName(String),
}

/// Inner text of a `[…]` reference split into name and argument expressions
///
/// `Name` forwards the caller's scope; `Name(a, b)` carries argument
/// expressions split on top-level commas. `Name()` carries an empty list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateRefCall<'a> {
    pub name: &'a str,
    pub arguments: Option<Vec<&'a str>>,
}

impl<'a> TemplateRefCall<'a> {
    pub fn parse(inner: &'a str) -> Result<Self, TemplateRefError> {
        let inner = inner.trim();
        let Some(open) = inner.find('(') else {
            return Self::named(inner, None);
        };
        if open == 0 {
            return Err(TemplateRefError::Malformed(inner.to_string()));
        }
        let close = inner
            .rfind(')')
            .filter(|close| *close > open && inner[close + 1..].trim().is_empty())
            .ok_or_else(|| TemplateRefError::Malformed(inner.to_string()))?;

        let args_text = &inner[open + 1..close];
        let arguments = if args_text.trim().is_empty() {
            Vec::new()
        } else {
            split_top_level(args_text, ',')
                .into_iter()
                .map(str::trim)
                .collect()
        };
        Self::named(inner[..open].trim(), Some(arguments))
    }

    fn named(name: &'a str, arguments: Option<Vec<&'a str>>) -> Result<Self, TemplateRefError> {
        if TemplateName::parse(name).is_none() {
            return Err(TemplateRefError::InvalidName(name.to_string()));
        }
        Ok(Self { name, arguments })
    }
}

/// Split on `separator` where it is not nested in brackets or quotes
pub fn split_top_level(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;

    for (idx, c) in text.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            c if c == separator && depth == 0 => {
                parts.push(&text[start..idx]);
                start = idx + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

// =============================================================================
// MULTI-LINE ISLANDS
// =============================================================================

/// An `@{…}` island inside a multi-line block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Island<'a> {
    /// `@{expr}`: the expression text without braces
    Expression(&'a str),
    /// `@{[Ref]}`: the reference text without brackets
    TemplateRef(&'a str),
}

/// Find `@{…}` islands (no nested braces) in multi-line block text.
///
/// Returns the byte range of each island (the `@` included) in order.
pub fn islands(text: &str) -> Vec<(Range<usize>, Island<'_>)> {
    let mut found = Vec::new();
    let mut cursor = 0;

    while let Some(rel) = text[cursor..].find("@{") {
        let start = cursor + rel;
        let body_start = start + 2;
        let rest = &text[body_start..];
        let close = rest.find(['{', '}']);

        match close {
            Some(len) if len > 0 && rest[len..].starts_with('}') => {
                let end = body_start + len + 1;
                let braced = &text[start + 1..end];
                let island = match braced
                    .strip_prefix("{[")
                    .and_then(|s| s.strip_suffix("]}"))
                {
                    Some(reference) => Island::TemplateRef(reference),
                    None => Island::Expression(&braced[1..braced.len() - 1]),
                };
                found.push((start..end, island));
                cursor = end;
            }
            _ => cursor = start + 1,
        }
    }
    found
}

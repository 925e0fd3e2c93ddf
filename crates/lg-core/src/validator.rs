//! Static validation of parsed LG files
//!
//! Catches problems that would otherwise only surface at evaluation time:
//!
//! - the same template name defined twice (error)
//! - `[Ref]` to a template that does not exist (warning)
//! - `[Ref(a, b)]` whose argument count cannot bind the target's parameters (warning)
//! - malformed reference text (warning)
//! - declared parameters never mentioned in the body (hint)
//!
//! # Usage
//!
//! ```
//! use lg_core::{parse_lg, validate_files};
//!
//! let file = parse_lg("# A\n- [B]\n").unwrap();
//! let result = validate_files(&[file]);
//! assert!(result.is_valid());
//! assert_eq!(result.warnings().count(), 1);
//! ```

use std::collections::HashMap;

use lg_types::SourceLocation;

use crate::ast::{LgFile, Segment, TemplateDefinition, TemplateRefCall};
use crate::diagnostics::{
    duplicate_template_error, unknown_template_warning, Diagnostic, DiagnosticCode,
};

// =============================================================================
// VALIDATION RESULT
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub stats: ValidationStats,
}

impl ValidationResult {
    /// No error-level diagnostics
    pub fn is_valid(&self) -> bool {
        !self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_warning())
    }
}

/// Statistics gathered during validation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationStats {
    pub template_count: usize,
    pub conditional_count: usize,
    pub template_ref_count: usize,
    pub expression_count: usize,
}

// =============================================================================
// VALIDATOR
// =============================================================================

/// Validate a set of files that will be loaded together
pub fn validate_files(files: &[LgFile]) -> ValidationResult {
    let mut result = ValidationResult::default();
    let mut defined: HashMap<&str, &TemplateDefinition> = HashMap::new();

    for template in files.iter().flat_map(|f| f.templates.iter()) {
        result.stats.template_count += 1;
        match defined.get(template.name.as_str()) {
            Some(first) => result.diagnostics.push(duplicate_template_error(
                template.name.as_str(),
                &template.location,
                &first.location,
            )),
            None => {
                defined.insert(template.name.as_str(), template);
            }
        }
    }

    for template in files.iter().flat_map(|f| f.templates.iter()) {
        check_template(template, &defined, &mut result);
    }

    result
}

fn check_template(
    template: &TemplateDefinition,
    defined: &HashMap<&str, &TemplateDefinition>,
    result: &mut ValidationResult,
) {
    if matches!(template.body, crate::ast::TemplateBody::Conditional(_)) {
        result.stats.conditional_count += 1;
    }

    let mut mentioned_text = String::new();
    if let crate::ast::TemplateBody::Conditional(body) = &template.body {
        for case in &body.cases {
            if let Some(condition) = &case.condition {
                mentioned_text.push_str(condition);
                mentioned_text.push(' ');
            }
        }
    }

    for string in template.template_strings() {
        for segment in &string.segments {
            match segment {
                Segment::Expression(_) => result.stats.expression_count += 1,
                Segment::PlainText(_) => continue,
                Segment::TemplateRef(_) | Segment::MultiLineText(_) => {}
            }
            mentioned_text.push_str(segment.inner());
            mentioned_text.push(' ');
        }

        for reference in string.template_refs() {
            result.stats.template_ref_count += 1;
            check_reference(reference, &string.location, defined, result);
        }
    }

    for param in &template.parameters {
        if !mentions_identifier(&mentioned_text, param) {
            result.diagnostics.push(
                Diagnostic::hint(
                    DiagnosticCode::UnusedParameter,
                    format!(
                        "parameter '{}' of template '{}' is never used",
                        param, template.name
                    ),
                )
                .at(&template.location),
            );
        }
    }
}

fn check_reference(
    reference: &str,
    location: &SourceLocation,
    defined: &HashMap<&str, &TemplateDefinition>,
    result: &mut ValidationResult,
) {
    let call = match TemplateRefCall::parse(reference) {
        Ok(call) => call,
        Err(e) => {
            result.diagnostics.push(
                Diagnostic::warning(DiagnosticCode::InvalidTemplateRef, e.to_string()).at(location),
            );
            return;
        }
    };

    let Some(target) = defined.get(call.name) else {
        result
            .diagnostics
            .push(unknown_template_warning(call.name, location));
        return;
    };

    if let Some(args) = &call.arguments {
        let expected = target.parameters.len();
        let shortcut = expected == 0 && args.len() == 1;
        if !shortcut && args.len() != expected {
            result.diagnostics.push(
                Diagnostic::warning(
                    DiagnosticCode::ArgumentCountMismatch,
                    format!(
                        "template '{}' expects {} argument(s), reference passes {}",
                        call.name,
                        expected,
                        args.len()
                    ),
                )
                .at(location),
            );
        }
    }
}

/// `name` appears in `text` as a whole identifier
fn mentions_identifier(text: &str, name: &str) -> bool {
    text.match_indices(name).any(|(idx, _)| {
        let before = text[..idx].chars().next_back();
        let after = text[idx + name.len()..].chars().next();
        let boundary = |c: Option<char>| !c.is_some_and(|c| c.is_alphanumeric() || c == '_');
        boundary(before) && boundary(after)
    })
}

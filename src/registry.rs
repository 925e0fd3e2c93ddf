//! Template registry
//!
//! Immutable name → definition map built from one or more parsed files. It is
//! the evaluation context every [`Evaluator`](crate::Evaluator) reads from and
//! is safe to share across threads behind an `Arc`.

use std::collections::HashMap;

use lg_core::{parse_lg, validate_files, DiagnosticCode, LgFile, Severity, TemplateDefinition, TemplateName};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::LoadError;

/// What to do when two loaded templates share a name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Fail the load with [`LoadError::DuplicateTemplate`]
    #[default]
    Reject,
    /// Keep the later definition
    LastWins,
}

#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    templates: HashMap<String, TemplateDefinition>,
    /// Declaration order, for listing
    order: Vec<TemplateName>,
}

impl TemplateRegistry {
    /// Parse and register a single source text
    pub fn from_source(source: &str) -> Result<Self, LoadError> {
        Self::from_files([parse_lg(source)?], DuplicatePolicy::Reject)
    }

    /// Merge parsed files in order
    pub fn from_files(
        files: impl IntoIterator<Item = LgFile>,
        policy: DuplicatePolicy,
    ) -> Result<Self, LoadError> {
        let files: Vec<LgFile> = files.into_iter().collect();
        log_static_checks(&files);

        let mut registry = Self::default();
        for template in files.into_iter().flat_map(|f| f.templates) {
            registry.insert(template, policy)?;
        }

        info!(templates = registry.len(), "template registry built");
        Ok(registry)
    }

    fn insert(
        &mut self,
        template: TemplateDefinition,
        policy: DuplicatePolicy,
    ) -> Result<(), LoadError> {
        let name = template.name.as_str().to_string();
        match (self.templates.get(&name), policy) {
            (Some(first), DuplicatePolicy::Reject) => {
                return Err(LoadError::DuplicateTemplate {
                    name,
                    first: first.location.clone(),
                    second: template.location.clone(),
                });
            }
            (Some(first), DuplicatePolicy::LastWins) => {
                warn!(
                    template = %name,
                    first = %first.location,
                    replacement = %template.location,
                    "duplicate template definition replaces earlier one"
                );
            }
            (None, _) => self.order.push(template.name.clone()),
        }
        self.templates.insert(name, template);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&TemplateDefinition> {
        self.templates.get(name)
    }

    /// Declared parameters of `name`
    pub fn parameters(&self, name: &str) -> Option<&[String]> {
        self.templates.get(name).map(|t| t.parameters.as_slice())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// Template names in declaration order
    pub fn names(&self) -> impl Iterator<Item = &TemplateName> {
        self.order.iter()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

fn log_static_checks(files: &[LgFile]) {
    let result = validate_files(files);
    debug!(
        templates = result.stats.template_count,
        conditionals = result.stats.conditional_count,
        refs = result.stats.template_ref_count,
        expressions = result.stats.expression_count,
        "static checks complete"
    );
    for diagnostic in &result.diagnostics {
        // Duplicates are handled by the load policy
        if diagnostic.code == DiagnosticCode::DuplicateTemplate {
            continue;
        }
        match diagnostic.severity {
            Severity::Error | Severity::Warning => warn!("{}", diagnostic),
            Severity::Hint => debug!("{}", diagnostic),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lg_core::parse_lg_named;

    #[test]
    fn test_registry_from_source() {
        let registry = TemplateRegistry::from_source("# A(x, y)\n- {x}\n\n# B\n- b\n").unwrap();
        assert_eq!(registry.len(), 2);
        assert!(registry.contains("A"));
        assert_eq!(
            registry.parameters("A"),
            Some(&["x".to_string(), "y".to_string()][..])
        );
        let names: Vec<_> = registry.names().map(TemplateName::as_str).collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn test_duplicate_rejected_by_default() {
        let a = parse_lg_named("# T\n- one\n", "a.lg").unwrap();
        let b = parse_lg_named("# T\n- two\n", "b.lg").unwrap();
        let err = TemplateRegistry::from_files([a, b], DuplicatePolicy::Reject).unwrap_err();
        match err {
            LoadError::DuplicateTemplate { name, first, second } => {
                assert_eq!(name, "T");
                assert_eq!(first.source_name.as_deref(), Some("a.lg"));
                assert_eq!(second.source_name.as_deref(), Some("b.lg"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_duplicate_last_wins() {
        let a = parse_lg("# T\n- one\n").unwrap();
        let b = parse_lg("# T\n- two\n\n# U\n- u\n").unwrap();
        let registry = TemplateRegistry::from_files([a, b], DuplicatePolicy::LastWins).unwrap();
        assert_eq!(registry.len(), 2);
        let body = registry.get("T").unwrap().template_strings()[0].to_source();
        assert_eq!(body, "two");
        assert_eq!(registry.names().count(), 2);
    }

    #[test]
    fn test_parse_error_fails_load() {
        assert!(matches!(
            TemplateRegistry::from_source("# A\n"),
            Err(LoadError::Parse(_))
        ));
    }

    #[test]
    fn test_registry_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TemplateRegistry>();
    }
}

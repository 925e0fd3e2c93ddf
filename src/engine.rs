//! Template engine façade
//!
//! Owns a shared registry and expression engine. Each call to
//! [`TemplateEngine::evaluate`] runs on a fresh [`Evaluator`], so a single
//! engine (or its clones) can serve concurrent requests.
//!
//! ```
//! use lg_engine::TemplateEngine;
//! use serde_json::json;
//!
//! let engine = TemplateEngine::from_source("# Greet(name)\n- Hello {name}!\n").unwrap();
//! let text = engine.evaluate("Greet", json!({"name": "Ada"})).unwrap();
//! assert_eq!(text, "Hello Ada!");
//! ```

use std::sync::Arc;

use lg_core::parse_lg;
use serde_json::Value;

use crate::config::EngineConfig;
use crate::error::{EvaluationError, LoadError};
use crate::evaluator::Evaluator;
use crate::expression::{ExpressionEngine, StandardExpressionEngine};
use crate::loader::TemplateLoader;
use crate::random::RandomPicker;
use crate::registry::{DuplicatePolicy, TemplateRegistry};

#[derive(Clone)]
pub struct TemplateEngine {
    registry: Arc<TemplateRegistry>,
    expressions: Arc<dyn ExpressionEngine>,
    random_seed: Option<u64>,
}

impl std::fmt::Debug for TemplateEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateEngine")
            .field("templates", &self.registry.len())
            .field("random_seed", &self.random_seed)
            .finish()
    }
}

impl TemplateEngine {
    pub fn new(registry: impl Into<Arc<TemplateRegistry>>) -> Self {
        Self {
            registry: registry.into(),
            expressions: Arc::new(StandardExpressionEngine),
            random_seed: None,
        }
    }

    pub fn from_source(source: &str) -> Result<Self, LoadError> {
        Self::from_sources([source])
    }

    /// Several sources merged into one registry; duplicate names are rejected
    pub fn from_sources<I, S>(sources: I) -> Result<Self, LoadError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let files = sources
            .into_iter()
            .map(|source| parse_lg(source.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(TemplateRegistry::from_files(
            files,
            DuplicatePolicy::Reject,
        )?))
    }

    pub fn from_config(config: &EngineConfig) -> anyhow::Result<Self> {
        let files = TemplateLoader::new(&config.template_paths).load()?;
        let registry = TemplateRegistry::from_files(files, config.duplicate_policy)?;
        Ok(Self::new(registry).with_seed(config.random_seed))
    }

    pub fn with_expression_engine(mut self, engine: impl ExpressionEngine + 'static) -> Self {
        self.expressions = Arc::new(engine);
        self
    }

    /// Seed alternative choice; every evaluation then starts from the same state
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.random_seed = seed;
        self
    }

    pub fn registry(&self) -> &Arc<TemplateRegistry> {
        &self.registry
    }

    /// Fresh evaluator for one request; swap its picker or fallback resolver as needed
    pub fn evaluator(&self) -> Evaluator<'_> {
        Evaluator::new(&self.registry, self.expressions.as_ref())
            .with_picker(RandomPicker::with_seed(self.random_seed))
    }

    pub fn evaluate(&self, name: &str, scope: Value) -> Result<String, EvaluationError> {
        self.evaluator().evaluate_template(name, scope)
    }

    /// Template names in declaration order
    pub fn template_names(&self) -> Vec<&str> {
        self.registry.names().map(|name| name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::{ExpressionError, MethodResolver, PropertyResolver};
    use crate::random::FixedPicker;
    use serde_json::json;

    #[test]
    fn test_from_sources_merges() {
        let engine = TemplateEngine::from_sources(["# A\n- [B]\n", "# B\n- b\n"]).unwrap();
        assert_eq!(engine.template_names(), vec!["A", "B"]);
        assert_eq!(engine.evaluate("A", json!({})).unwrap(), "b");
    }

    #[test]
    fn test_from_sources_rejects_duplicates() {
        let err = TemplateEngine::from_sources(["# A\n- a\n", "# A\n- b\n"]).unwrap_err();
        assert!(matches!(err, LoadError::DuplicateTemplate { .. }));
    }

    #[test]
    fn test_seeded_engine_is_repeatable() {
        let source = "# A\n- 1\n- 2\n- 3\n- 4\n- 5\n- 6\n- 7\n- 8\n";
        let engine = TemplateEngine::from_source(source).unwrap().with_seed(Some(3));
        let first = engine.evaluate("A", json!({})).unwrap();
        for _ in 0..10 {
            assert_eq!(engine.evaluate("A", json!({})).unwrap(), first);
        }
    }

    #[test]
    fn test_evaluator_with_custom_fallback() {
        struct Shout;
        impl MethodResolver for Shout {
            fn invoke(
                &mut self,
                name: &str,
                args: Vec<Value>,
            ) -> Option<Result<Value, ExpressionError>> {
                (name == "shout").then(|| {
                    Ok(Value::String(format!(
                        "{}!",
                        args.first().and_then(Value::as_str).unwrap_or_default()
                    )))
                })
            }
        }

        let engine = TemplateEngine::from_source("# A\n- {shout(word)}\n- other\n").unwrap();
        let text = engine
            .evaluator()
            .with_picker(FixedPicker(0))
            .with_fallback(Shout)
            .evaluate_template("A", json!({"word": "hey"}))
            .unwrap();
        assert_eq!(text, "hey!");
    }

    #[test]
    fn test_custom_expression_engine() {
        struct Echo;
        impl ExpressionEngine for Echo {
            fn evaluate(
                &self,
                text: &str,
                _scope: &Value,
                _properties: &dyn PropertyResolver,
                _methods: &mut dyn crate::expression::MethodResolver,
            ) -> Result<Value, ExpressionError> {
                Ok(Value::String(text.to_uppercase()))
            }
        }

        let engine = TemplateEngine::from_source("# A\n- {abc}\n")
            .unwrap()
            .with_expression_engine(Echo);
        assert_eq!(engine.evaluate("A", json!({})).unwrap(), "ABC");
    }
}

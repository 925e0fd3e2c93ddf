//! Template evaluator
//!
//! One [`Evaluator`] serves one top-level request. It owns the call stack of
//! [`EvaluationTarget`]s and a set of in-flight names, so a template that
//! reaches itself again is caught before recursing. The registry is only
//! read, so any number of evaluators can run against it in parallel.
//!
//! Rendering rules per segment:
//!
//! | Segment | Output |
//! |---|---|
//! | plain text | verbatim |
//! | `{expr}` | expression value as text; failures are fatal |
//! | `[Name]` | `Name` rendered with the caller's scope |
//! | `[Name(a, b)]` | `Name` rendered with a scope built from the arguments |
//! | `` ```…``` `` | block text with `@{expr}` and `@{[Ref]}` islands substituted |

use std::collections::HashSet;
use std::sync::Arc;

use lg_core::{
    islands, ConditionalBody, Island, NormalBody, Segment, TemplateBody, TemplateRefCall,
    TemplateString,
};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::EvaluationError;
use crate::expression::{
    ExpressionEngine, ExpressionError, MethodResolver, ScopeProperties, StandardFunctions,
};
use crate::random::{IndexPicker, RandomPicker};
use crate::registry::TemplateRegistry;
use crate::value::{is_truthy, to_text};

/// A template on the call stack with the scope it was entered with
#[derive(Debug, Clone)]
pub struct EvaluationTarget {
    pub name: String,
    pub scope: Arc<Value>,
}

pub struct Evaluator<'a> {
    pub(crate) registry: &'a TemplateRegistry,
    engine: &'a dyn ExpressionEngine,
    stack: Vec<EvaluationTarget>,
    in_flight: HashSet<String>,
    picker: Box<dyn IndexPicker + 'a>,
    pub(crate) fallback: Box<dyn MethodResolver + 'a>,
}

impl<'a> Evaluator<'a> {
    /// Random alternative choice and [`StandardFunctions`] as the fallback resolver
    pub fn new(registry: &'a TemplateRegistry, engine: &'a dyn ExpressionEngine) -> Self {
        Self {
            registry,
            engine,
            stack: Vec::new(),
            in_flight: HashSet::new(),
            picker: Box::new(RandomPicker::from_entropy()),
            fallback: Box::new(StandardFunctions),
        }
    }

    pub fn with_picker(mut self, picker: impl IndexPicker + 'a) -> Self {
        self.picker = Box::new(picker);
        self
    }

    /// Resolver for calls the LG built-ins do not handle
    pub fn with_fallback(mut self, fallback: impl MethodResolver + 'a) -> Self {
        self.fallback = Box::new(fallback);
        self
    }

    /// Render `name` with `scope` bound as its scope
    pub fn evaluate_template(&mut self, name: &str, scope: Value) -> Result<String, EvaluationError> {
        self.evaluate_with_scope(name, Arc::new(scope))
    }

    /// Templates currently being evaluated, outermost first
    pub fn call_stack(&self) -> &[EvaluationTarget] {
        &self.stack
    }

    pub(crate) fn evaluate_with_scope(
        &mut self,
        name: &str,
        scope: Arc<Value>,
    ) -> Result<String, EvaluationError> {
        let registry = self.registry;
        let template = registry
            .get(name)
            .ok_or_else(|| EvaluationError::UnknownTemplate(name.to_string()))?;

        if self.in_flight.contains(name) {
            return Err(EvaluationError::CycleDetected {
                path: self.cycle_path(name),
            });
        }

        self.stack.push(EvaluationTarget {
            name: name.to_string(),
            scope,
        });
        self.in_flight.insert(name.to_string());
        debug!(template = name, depth = self.stack.len(), "evaluating template");

        let result = match &template.body {
            TemplateBody::Normal(body) => self.visit_normal(body),
            TemplateBody::Conditional(body) => self.visit_conditional(body),
        };

        self.stack.pop();
        self.in_flight.remove(name);
        result
    }

    /// Stack names from the first occurrence of `name`, closed with `name`
    fn cycle_path(&self, name: &str) -> Vec<String> {
        let start = self
            .stack
            .iter()
            .position(|target| target.name == name)
            .unwrap_or(0);
        self.stack[start..]
            .iter()
            .map(|target| target.name.clone())
            .chain(std::iter::once(name.to_string()))
            .collect()
    }

    fn current_scope(&self) -> Arc<Value> {
        self.stack
            .last()
            .map(|target| Arc::clone(&target.scope))
            .unwrap_or_else(|| Arc::new(Value::Null))
    }

    fn current_template(&self) -> &str {
        self.stack.last().map_or("", |target| target.name.as_str())
    }

    // =========================================================================
    // Bodies
    // =========================================================================

    fn visit_normal(&mut self, body: &NormalBody) -> Result<String, EvaluationError> {
        let count = body.alternatives.len();
        if count == 0 {
            return Ok(String::new());
        }
        let index = self.picker.pick(count).min(count - 1);
        debug!(alternative = index, of = count, "picked alternative");
        self.render(&body.alternatives[index])
    }

    fn visit_conditional(&mut self, body: &ConditionalBody) -> Result<String, EvaluationError> {
        for case in &body.cases {
            let condition = case.condition.as_deref().unwrap_or_default();
            if self.condition_holds(condition) {
                return self.visit_normal(&case.body);
            }
        }
        self.visit_normal(&body.default.body)
    }

    /// Condition failures count as false
    fn condition_holds(&mut self, condition: &str) -> bool {
        match self.evaluate_expression(condition) {
            Ok(value) => is_truthy(&value),
            Err(err) => {
                warn!(
                    template = self.current_template(),
                    condition,
                    error = %err,
                    "condition evaluation failed, treating as false"
                );
                false
            }
        }
    }

    // =========================================================================
    // Template strings
    // =========================================================================

    fn render(&mut self, string: &TemplateString) -> Result<String, EvaluationError> {
        let mut out = String::new();
        for segment in &string.segments {
            match segment {
                Segment::PlainText(text) => out.push_str(text),
                Segment::Expression(_) => {
                    let value = self.evaluate_segment_expression(segment.inner())?;
                    out.push_str(&to_text(&value));
                }
                Segment::TemplateRef(_) => out.push_str(&self.evaluate_reference(segment.inner())?),
                Segment::MultiLineText(_) => {
                    out.push_str(&self.render_multiline(segment.inner())?)
                }
            }
        }
        Ok(out)
    }

    fn render_multiline(&mut self, text: &str) -> Result<String, EvaluationError> {
        let mut out = String::with_capacity(text.len());
        let mut cursor = 0;
        for (range, island) in islands(text) {
            out.push_str(&text[cursor..range.start]);
            match island {
                Island::Expression(expression) => {
                    let value = self.evaluate_segment_expression(expression)?;
                    out.push_str(&to_text(&value));
                }
                Island::TemplateRef(reference) => {
                    out.push_str(&self.evaluate_reference(reference)?)
                }
            }
            cursor = range.end;
        }
        out.push_str(&text[cursor..]);
        Ok(out)
    }

    /// `[Name]` or `[Name(args…)]` without the brackets
    fn evaluate_reference(&mut self, reference: &str) -> Result<String, EvaluationError> {
        let call = TemplateRefCall::parse(reference)?;
        let scope = match call.arguments {
            None => self.current_scope(),
            Some(arguments) => {
                let mut values = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    values.push(self.evaluate_segment_expression(argument)?);
                }
                Arc::new(self.construct_scope(call.name, values)?)
            }
        };
        self.evaluate_with_scope(call.name, scope)
    }

    /// Bind arguments to `name`'s parameters.
    ///
    /// A template without parameters called with exactly one argument takes
    /// that argument as its whole scope.
    pub(crate) fn construct_scope(
        &self,
        name: &str,
        args: Vec<Value>,
    ) -> Result<Value, EvaluationError> {
        let parameters = self
            .registry
            .parameters(name)
            .ok_or_else(|| EvaluationError::UnknownTemplate(name.to_string()))?;

        if parameters.is_empty() && args.len() == 1 {
            return Ok(args.into_iter().next().unwrap_or(Value::Null));
        }
        if parameters.len() != args.len() {
            return Err(EvaluationError::ArgumentCountMismatch {
                template: name.to_string(),
                expected: parameters.len(),
                found: args.len(),
            });
        }
        Ok(Value::Object(parameters.iter().cloned().zip(args).collect()))
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    fn evaluate_expression(&mut self, text: &str) -> Result<Value, ExpressionError> {
        let scope = self.current_scope();
        let engine = self.engine;
        engine.evaluate(text, &scope, &ScopeProperties, self)
    }

    /// Expression whose failure aborts the render
    fn evaluate_segment_expression(&mut self, text: &str) -> Result<Value, EvaluationError> {
        self.evaluate_expression(text).map_err(|err| match err {
            ExpressionError::Template(inner) => *inner,
            source => EvaluationError::Expression {
                template: self.current_template().to_string(),
                expression: text.to_string(),
                source,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::StandardExpressionEngine;
    use crate::random::{FixedPicker, SequencePicker};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn render(source: &str, name: &str, scope: Value) -> Result<String, EvaluationError> {
        let registry = TemplateRegistry::from_source(source).unwrap();
        let rendered = Evaluator::new(&registry, &StandardExpressionEngine)
            .with_picker(FixedPicker(0))
            .evaluate_template(name, scope);
        rendered
    }

    #[test]
    fn test_plain_text() {
        assert_eq!(render("# A\n- Hello world\n", "A", json!({})).unwrap(), "Hello world");
    }

    #[test]
    fn test_expression_segment() {
        assert_eq!(
            render("# A\n- Hi {user.name}!\n", "A", json!({"user": {"name": "Ada"}})).unwrap(),
            "Hi Ada!"
        );
    }

    #[test]
    fn test_alternative_choice_uses_picker() {
        let registry = TemplateRegistry::from_source("# A\n- one\n- two\n- three\n").unwrap();
        let mut evaluator = Evaluator::new(&registry, &StandardExpressionEngine)
            .with_picker(SequencePicker::new([2, 0, 1]));
        let picks: Vec<_> = (0..3)
            .map(|_| evaluator.evaluate_template("A", json!({})).unwrap())
            .collect();
        assert_eq!(picks, vec!["three", "one", "two"]);
    }

    #[test]
    fn test_reference_forwards_scope() {
        let source = "# A\n- <[B]>\n\n# B\n- {name}\n";
        assert_eq!(render(source, "A", json!({"name": "Bo"})).unwrap(), "<Bo>");
    }

    #[test]
    fn test_reference_binds_named_parameters() {
        let source = "# A\n- [Pair(1, 'x')]\n\n# Pair(a, b)\n- {a}-{b}\n";
        assert_eq!(render(source, "A", json!({})).unwrap(), "1-x");
    }

    #[test]
    fn test_single_argument_shortcut() {
        let source = "# A\n- [Show(user)]\n\n# Show\n- {name}\n";
        assert_eq!(
            render(source, "A", json!({"user": {"name": "Cy"}})).unwrap(),
            "Cy"
        );
    }

    #[test]
    fn test_empty_argument_list_gives_empty_scope() {
        let source = "# A\n- [B()]\n\n# B\n- <{name}>\n";
        assert_eq!(render(source, "A", json!({"name": "x"})).unwrap(), "<>");
    }

    #[test]
    fn test_argument_count_mismatch() {
        let source = "# A\n- [Pair(1)]\n\n# Pair(a, b)\n- {a}{b}\n";
        assert!(matches!(
            render(source, "A", json!({})),
            Err(EvaluationError::ArgumentCountMismatch {
                expected: 2,
                found: 1,
                ..
            })
        ));
    }

    #[test]
    fn test_unknown_template() {
        assert!(matches!(
            render("# A\n- [Nope]\n", "A", json!({})),
            Err(EvaluationError::UnknownTemplate(name)) if name == "Nope"
        ));
        assert!(matches!(
            render("# A\n- a\n", "Missing", json!({})),
            Err(EvaluationError::UnknownTemplate(_))
        ));
    }

    #[test]
    fn test_cycle_reports_path() {
        let source = "# A\n- [B]\n\n# B\n- [C]\n\n# C\n- [B]\n";
        let err = render(source, "A", json!({})).unwrap_err();
        assert_eq!(
            err.cycle_path().unwrap(),
            &["B".to_string(), "C".to_string(), "B".to_string()]
        );
    }

    #[test]
    fn test_stack_is_empty_after_error() {
        let registry = TemplateRegistry::from_source("# A\n- [A]\n\n# B\n- ok\n").unwrap();
        let mut evaluator = Evaluator::new(&registry, &StandardExpressionEngine);
        assert!(evaluator.evaluate_template("A", json!({})).is_err());
        assert!(evaluator.call_stack().is_empty());
        assert_eq!(evaluator.evaluate_template("B", json!({})).unwrap(), "ok");
    }

    #[test]
    fn test_same_template_twice_in_sequence_is_not_a_cycle() {
        let source = "# A\n- [B][B]\n\n# B\n- b\n";
        assert_eq!(render(source, "A", json!({})).unwrap(), "bb");
    }

    #[test]
    fn test_conditional_picks_first_true_case() {
        let source = "# A\n- CASE: {n > 10}\n  - big\n- CASE: {n > 5}\n  - medium\n- DEFAULT:\n  - small\n";
        assert_eq!(render(source, "A", json!({"n": 20})).unwrap(), "big");
        assert_eq!(render(source, "A", json!({"n": 7})).unwrap(), "medium");
        assert_eq!(render(source, "A", json!({"n": 1})).unwrap(), "small");
    }

    #[test]
    fn test_failing_condition_counts_as_false() {
        let source = "# A\n- CASE: {1 / 0}\n  - never\n- DEFAULT:\n  - fallback\n";
        assert_eq!(render(source, "A", json!({})).unwrap(), "fallback");
    }

    #[test]
    fn test_expression_failure_is_fatal() {
        let err = render("# A\n- x {1 / 0}\n", "A", json!({})).unwrap_err();
        match err {
            EvaluationError::Expression {
                template,
                expression,
                source,
            } => {
                assert_eq!(template, "A");
                assert_eq!(expression, "1 / 0");
                assert!(matches!(source, ExpressionError::DivisionByZero));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_multiline_islands() {
        let source = "# A\n- ```Dear @{name},\n@{[Sign]}```\n\n# Sign\n- bye\n";
        assert_eq!(
            render(source, "A", json!({"name": "Ann"})).unwrap(),
            "Dear Ann,\nbye"
        );
    }

    #[test]
    fn test_null_renders_empty() {
        assert_eq!(render("# A\n- \\[{missing}\\]\n", "A", json!({})).unwrap(), "[]");
    }
}

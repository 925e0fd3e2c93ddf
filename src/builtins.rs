//! LG built-in functions
//!
//! Resolved ahead of the evaluator's fallback resolver:
//!
//! - `count(list)`
//! - `join(list, sep)` and `join(list, sep, lastSep)`
//! - `foreach(list, templateName)`
//! - `foreachThenJoin(list, templateName, sep [, lastSep])`, aliases `humanize`
//!   and `newParameter`
//!
//! With a single separator `foreachThenJoin` uses `and` before the last item,
//! so `humanize(["a", "b"], "Echo", ",")` reads "a and b".

use std::sync::Arc;

use serde_json::Value;

use crate::error::EvaluationError;
use crate::evaluator::Evaluator;
use crate::expression::{ExpressionError, MethodResolver};
use crate::value::{to_text, type_name};

/// Names handled here before the fallback resolver is consulted
pub const BUILTIN_FUNCTIONS: &[&str] = &[
    "count",
    "join",
    "foreach",
    "foreachThenJoin",
    "humanize",
    "newParameter",
];

const DEFAULT_LAST_SEPARATOR: &str = "and";

impl MethodResolver for Evaluator<'_> {
    fn invoke(&mut self, name: &str, args: Vec<Value>) -> Option<Result<Value, ExpressionError>> {
        let result = match name {
            "count" => count(args),
            "join" => join(name, args),
            "foreach" => self.foreach(name, args),
            "foreachThenJoin" | "humanize" | "newParameter" => self.foreach_then_join(name, args),
            _ => return self.fallback.invoke(name, args),
        };
        Some(result.map_err(ExpressionError::from))
    }
}

impl Evaluator<'_> {
    fn foreach(&mut self, function: &str, args: Vec<Value>) -> Result<Value, EvaluationError> {
        let [list, template] = exact::<2>(function, args)?;
        self.render_each(function, list, template).map(Value::Array)
    }

    fn foreach_then_join(
        &mut self,
        function: &str,
        args: Vec<Value>,
    ) -> Result<Value, EvaluationError> {
        if !(3..=4).contains(&args.len()) {
            return Err(EvaluationError::shape(
                function,
                format!("expects 3 or 4 arguments, got {}", args.len()),
            ));
        }
        let mut args = args.into_iter();
        let list = args.next().unwrap_or(Value::Null);
        let template = args.next().unwrap_or(Value::Null);
        let separator = args.next().unwrap_or(Value::Null);
        let last = args
            .next()
            .unwrap_or_else(|| Value::String(DEFAULT_LAST_SEPARATOR.to_string()));

        let rendered = self.render_each(function, list, template)?;
        let items: Vec<String> = rendered.iter().map(to_text).collect();
        let separator = separator_text(function, &separator)?;
        let last = separator_text(function, &last)?;
        Ok(Value::String(join_with_last(&items, separator, last)))
    }

    /// Render `template` once per element, each element bound as a single argument
    fn render_each(
        &mut self,
        function: &str,
        list: Value,
        template: Value,
    ) -> Result<Vec<Value>, EvaluationError> {
        let items = list_items(function, list)?;
        let template = match template {
            Value::String(template) => template,
            other => {
                return Err(EvaluationError::shape(
                    function,
                    format!(
                        "second argument must be a template name, found {}",
                        type_name(&other)
                    ),
                ))
            }
        };
        if !self.registry.contains(&template) {
            return Err(EvaluationError::UnknownTemplate(template));
        }

        let mut rendered = Vec::with_capacity(items.len());
        for item in items {
            let scope = self.construct_scope(&template, vec![item])?;
            let text = self.evaluate_with_scope(&template, Arc::new(scope))?;
            rendered.push(Value::String(text));
        }
        Ok(rendered)
    }
}

fn count(args: Vec<Value>) -> Result<Value, EvaluationError> {
    match exact::<1>("count", args)? {
        [Value::Array(items)] => Ok(Value::from(items.len())),
        [other] => Err(EvaluationError::TypeMismatch {
            function: "count".to_string(),
            expected: "list".to_string(),
            found: type_name(&other).to_string(),
        }),
    }
}

fn join(function: &str, args: Vec<Value>) -> Result<Value, EvaluationError> {
    let (list, separator, last) = match <[Value; 2]>::try_from(args) {
        Ok([list, separator]) => (list, separator, None),
        Err(args) => match <[Value; 3]>::try_from(args) {
            Ok([list, separator, last]) => (list, separator, Some(last)),
            Err(args) => {
                return Err(EvaluationError::shape(
                    function,
                    format!("expects 2 or 3 arguments, got {}", args.len()),
                ))
            }
        },
    };

    let items: Vec<String> = list_items(function, list)?.iter().map(to_text).collect();
    let separator = separator_text(function, &separator)?;

    let joined = match &last {
        None => items.join(&format!("{} ", separator)),
        Some(last) => join_with_last(&items, separator, separator_text(function, last)?),
    };
    Ok(Value::String(joined))
}

/// `a, b and c`; fewer than three items are all joined with ` last `
fn join_with_last(items: &[String], separator: &str, last: &str) -> String {
    match items {
        [init @ .., tail] if items.len() >= 3 => {
            format!("{} {} {}", init.join(&format!("{} ", separator)), last, tail)
        }
        _ => items.join(&format!(" {} ", last)),
    }
}

fn list_items(function: &str, list: Value) -> Result<Vec<Value>, EvaluationError> {
    match list {
        Value::Array(items) => Ok(items),
        other => Err(EvaluationError::shape(
            function,
            format!("first argument must be a list, found {}", type_name(&other)),
        )),
    }
}

fn separator_text<'v>(function: &str, value: &'v Value) -> Result<&'v str, EvaluationError> {
    value.as_str().ok_or_else(|| {
        EvaluationError::shape(
            function,
            format!("separator must be a string, found {}", type_name(value)),
        )
    })
}

fn exact<const N: usize>(function: &str, args: Vec<Value>) -> Result<[Value; N], EvaluationError> {
    <[Value; N]>::try_from(args).map_err(|args| {
        EvaluationError::shape(
            function,
            format!("expects {} argument(s), got {}", N, args.len()),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::StandardExpressionEngine;
    use crate::random::FixedPicker;
    use crate::registry::TemplateRegistry;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn render(source: &str, name: &str, scope: Value) -> Result<String, EvaluationError> {
        let registry = TemplateRegistry::from_source(source).unwrap();
        let rendered = Evaluator::new(&registry, &StandardExpressionEngine)
            .with_picker(FixedPicker(0))
            .evaluate_template(name, scope);
        rendered
    }

    #[test]
    fn test_join_two_arguments() {
        assert_eq!(
            join("join", vec![json!([1, 2, 3]), json!(",")]).unwrap(),
            json!("1, 2, 3")
        );
    }

    #[test]
    fn test_join_three_arguments() {
        assert_eq!(
            join("join", vec![json!([1, 2, 3]), json!(","), json!("and")]).unwrap(),
            json!("1, 2 and 3")
        );
        assert_eq!(
            join("join", vec![json!([1, 2]), json!(","), json!("and")]).unwrap(),
            json!("1 and 2")
        );
        assert_eq!(
            join("join", vec![json!(["x"]), json!(","), json!("or")]).unwrap(),
            json!("x")
        );
        assert_eq!(
            join("join", vec![json!([]), json!(","), json!("or")]).unwrap(),
            json!("")
        );
    }

    #[test]
    fn test_join_with_last() {
        assert_eq!(join_with_last(&strings(&["a", "b", "c", "d"]), ";", "or"), "a; b; c or d");
    }

    #[test]
    fn test_join_shape_errors() {
        assert!(matches!(
            join("join", vec![json!("abc"), json!(",")]),
            Err(EvaluationError::ArgumentShapeMismatch { .. })
        ));
        assert!(matches!(
            join("join", vec![json!([1])]),
            Err(EvaluationError::ArgumentShapeMismatch { .. })
        ));
        assert!(matches!(
            join("join", vec![json!([1]), json!(3)]),
            Err(EvaluationError::ArgumentShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_count() {
        assert_eq!(count(vec![json!([1, 2, 3])]).unwrap(), json!(3));
        assert!(matches!(
            count(vec![json!("abc")]),
            Err(EvaluationError::TypeMismatch { .. })
        ));
        assert!(matches!(
            count(vec![]),
            Err(EvaluationError::ArgumentShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_count_in_template() {
        assert_eq!(
            render("# A\n- {count(items)} items\n", "A", json!({"items": [1, 2]})).unwrap(),
            "2 items"
        );
    }

    #[test]
    fn test_foreach_binds_single_parameter() {
        let source = "# A\n- {join(foreach(names, 'Echo'), ',')}\n\n# Echo(x)\n- <{x}>\n";
        assert_eq!(
            render(source, "A", json!({"names": ["a", "b"]})).unwrap(),
            "<a>, <b>"
        );
    }

    #[test]
    fn test_foreach_shortcut_scope() {
        let source = "# A\n- {join(foreach(users, 'Name'), ',', 'and')}\n\n# Name\n- {name}\n";
        let scope = json!({"users": [{"name": "Al"}, {"name": "Bo"}, {"name": "Cy"}]});
        assert_eq!(render(source, "A", scope).unwrap(), "Al, Bo and Cy");
    }

    #[test]
    fn test_humanize_defaults_to_and() {
        let source = "# A\n- {humanize(names, 'Echo', ',')}\n\n# Echo(x)\n- {x}\n";
        assert_eq!(
            render(source, "A", json!({"names": ["a", "b"]})).unwrap(),
            "a and b"
        );
    }

    #[test]
    fn test_foreach_then_join_explicit_last() {
        let source = "# A\n- {foreachThenJoin(names, 'Echo', ',', 'or')}\n\n# Echo(x)\n- {x}\n";
        assert_eq!(
            render(source, "A", json!({"names": ["a", "b", "c"]})).unwrap(),
            "a, b or c"
        );
    }

    #[test]
    fn test_foreach_unknown_template() {
        let source = "# A\n- {foreach(names, 'Nope')}\n";
        assert!(matches!(
            render(source, "A", json!({"names": ["a"]})),
            Err(EvaluationError::UnknownTemplate(name)) if name == "Nope"
        ));
    }

    #[test]
    fn test_cycle_inside_foreach_surfaces() {
        let source = "# A\n- {foreach(items, 'A')}\n";
        assert!(matches!(
            render(source, "A", json!({"items": [1]})),
            Err(EvaluationError::CycleDetected { .. })
        ));
    }

    #[test]
    fn test_shape_error_surfaces_unwrapped() {
        let source = "# A\n- {foreach(name, 'A')}\n";
        assert!(matches!(
            render(source, "A", json!({"name": "x"})),
            Err(EvaluationError::ArgumentShapeMismatch { function, .. }) if function == "foreach"
        ));
    }

    #[test]
    fn test_new_parameter_alias() {
        let source = "# A\n- {newParameter(names, 'Echo', ',', 'or')}\n\n# Echo(x)\n- <{x}>\n";
        assert_eq!(
            render(source, "A", json!({"names": ["a", "b"]})).unwrap(),
            "<a> or <b>"
        );
    }

    #[test]
    fn test_builtins_are_resolved_before_fallback() {
        struct Claim;
        impl MethodResolver for Claim {
            fn invoke(
                &mut self,
                _name: &str,
                _args: Vec<Value>,
            ) -> Option<Result<Value, ExpressionError>> {
                Some(Ok(json!("fallback")))
            }
        }

        let registry = TemplateRegistry::from_source("# A\n- a\n").unwrap();
        let mut evaluator =
            Evaluator::new(&registry, &StandardExpressionEngine).with_fallback(Claim);
        for name in BUILTIN_FUNCTIONS {
            // Empty argument lists never match a built-in's shape
            assert!(
                matches!(evaluator.invoke(name, vec![]), Some(Err(_))),
                "{} reached the fallback",
                name
            );
        }
        assert_eq!(
            evaluator.invoke("other", vec![]).unwrap().unwrap(),
            json!("fallback")
        );
    }

    #[test]
    fn test_unknown_names_reach_fallback() {
        assert_eq!(
            render("# A\n- {toUpper(name)}\n", "A", json!({"name": "loud"})).unwrap(),
            "LOUD"
        );
    }
}

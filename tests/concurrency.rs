//! One registry, many evaluators
//!
//! Evaluation state lives on each `Evaluator`; the registry and engine are
//! shared read-only across threads.

use std::sync::Arc;
use std::thread;

use lg_engine::{Evaluator, FixedPicker, StandardExpressionEngine, TemplateEngine, TemplateRegistry};
use pretty_assertions::assert_eq;
use serde_json::json;

const SOURCE: &str = r#"
# Report(user)
- [Header(user.name)] has [Items(user.items)]

# Header(name)
- CASE: {name == ''}
  - Someone
- DEFAULT:
  - {name}

# Items(items)
- {count(items)} item(s): {join(items, ',', 'and')}

# Loop
- [Pool]

# Pool
- [Loop]
"#;

fn expected(id: usize) -> String {
    format!("user{} has 3 item(s): a{}, b{} and c{}", id, id, id, id)
}

fn scope(id: usize) -> serde_json::Value {
    json!({
        "user": {
            "name": format!("user{}", id),
            "items": [format!("a{}", id), format!("b{}", id), format!("c{}", id)],
        }
    })
}

#[test]
fn test_cloned_engines_across_threads() {
    let engine = TemplateEngine::from_source(SOURCE).unwrap();

    let handles: Vec<_> = (0..8)
        .map(|id| {
            let engine = engine.clone();
            thread::spawn(move || {
                (0..50)
                    .map(|_| engine.evaluate("Report", scope(id)).unwrap())
                    .all(|text| text == expected(id))
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap());
    }
}

#[test]
fn test_shared_registry_with_scoped_threads() {
    let registry = Arc::new(TemplateRegistry::from_source(SOURCE).unwrap());
    let engine = StandardExpressionEngine;

    let results: Vec<String> = thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|id| {
                let registry = &registry;
                let engine = &engine;
                s.spawn(move || {
                    Evaluator::new(registry, engine)
                        .with_picker(FixedPicker(0))
                        .evaluate_template("Report", scope(id))
                        .unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let expected: Vec<String> = (0..4).map(expected).collect();
    assert_eq!(results, expected);
}

#[test]
fn test_cycle_in_one_thread_does_not_leak() {
    let engine = TemplateEngine::from_source(SOURCE).unwrap();

    let failing = {
        let engine = engine.clone();
        thread::spawn(move || engine.evaluate("Loop", json!({})).is_err())
    };
    let working = {
        let engine = engine.clone();
        thread::spawn(move || engine.evaluate("Report", scope(1)).unwrap())
    };

    assert!(failing.join().unwrap());
    assert_eq!(working.join().unwrap(), expected(1));
    // The same engine still evaluates after a failed request
    assert_eq!(engine.evaluate("Report", scope(2)).unwrap(), expected(2));
}

#[test]
fn test_evaluator_reusable_after_error() {
    let registry = TemplateRegistry::from_source(SOURCE).unwrap();
    let mut evaluator = Evaluator::new(&registry, &StandardExpressionEngine);

    assert!(evaluator.evaluate_template("Loop", json!({})).is_err());
    assert!(evaluator.call_stack().is_empty());
    assert_eq!(
        evaluator.evaluate_template("Report", scope(3)).unwrap(),
        expected(3)
    );
}

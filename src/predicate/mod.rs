/*!
 * Predicates
 * Data-driven conditions evaluated by the engine itself
 *
 * Pattern matching is delegated to the external graph engine; everything
 * that can be decided locally (bound-variable checks, value comparisons,
 * tag membership) is expressed here so evaluation never leaves the worker.
 */

use crate::core::types::{EventPayload, RuntimeEvent, ValueSnapshot};
use crate::graph::{Bindings, StructuralContext};
use serde::{Deserialize, Serialize};

/// Condition over pattern bindings and the triggering event.
/// Used as the optional guard on structural breakpoints and as the
/// ordered intermediate conditions of data-flow breakpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Condition {
    /// A bound variable exists and equals the given value
    BindingEquals { var: String, value: ValueSnapshot },
    /// A bound variable exists, whatever its value
    BindingExists { var: String },
    /// The structural context carries the given semantic-role tag
    TagPresent { tag: String },
    /// The event maps to this exact graph node
    NodeIs { node_id: u64 },
    /// The event observes a call to the named function
    FunctionIs { name: String },
    /// Negation
    Not { inner: Box<Condition> },
    /// At least one sub-condition holds
    AnyOf { inner: Vec<Condition> },
    /// Every sub-condition holds (empty = true)
    AllOf { inner: Vec<Condition> },
}

impl Condition {
    /// Evaluate against one (event, context, bindings) triple.
    /// Total: never errors, never blocks.
    pub fn eval(
        &self,
        bindings: &Bindings,
        event: &RuntimeEvent,
        context: &StructuralContext,
    ) -> bool {
        match self {
            Condition::BindingEquals { var, value } => bindings.get(var) == Some(value),
            Condition::BindingExists { var } => bindings.contains_key(var),
            Condition::TagPresent { tag } => {
                context.tags.contains(tag) || event.payload.taint_tags().contains(tag)
            }
            Condition::NodeIs { node_id } => event.ast_node_id == *node_id,
            Condition::FunctionIs { name } => match &event.payload {
                EventPayload::CallEntry { function, .. }
                | EventPayload::CallExit { function, .. } => function == name,
                EventPayload::VariableSnapshot { .. } => false,
            },
            Condition::Not { inner } => !inner.eval(bindings, event, context),
            Condition::AnyOf { inner } => inner.iter().any(|c| c.eval(bindings, event, context)),
            Condition::AllOf { inner } => inner.iter().all(|c| c.eval(bindings, event, context)),
        }
    }
}

/// Predicate over a watchpoint observation: (old value, new value, context).
/// All predicates of a watchpoint must hold for a notification to fire;
/// the new value is recorded in history either way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ValuePredicate {
    /// The value differs from the previous observation (true when there
    /// is no previous observation)
    Changed,
    /// The new value equals the given value
    Equals { value: ValueSnapshot },
    /// The new value differs from the given value
    NotEquals { value: ValueSnapshot },
    /// Numeric comparison; non-numeric values never satisfy it
    GreaterThan { threshold: f64 },
    /// Numeric comparison; non-numeric values never satisfy it
    LessThan { threshold: f64 },
    /// The observation context carries the given tag
    TagPresent { tag: String },
    /// Unconditional (notify on every observation)
    Always,
}

impl ValuePredicate {
    pub fn eval(
        &self,
        old_value: Option<&ValueSnapshot>,
        new_value: &ValueSnapshot,
        context: &StructuralContext,
    ) -> bool {
        match self {
            ValuePredicate::Changed => old_value != Some(new_value),
            ValuePredicate::Equals { value } => new_value == value,
            ValuePredicate::NotEquals { value } => new_value != value,
            ValuePredicate::GreaterThan { threshold } => {
                new_value.as_f64().is_some_and(|v| v > *threshold)
            }
            ValuePredicate::LessThan { threshold } => {
                new_value.as_f64().is_some_and(|v| v < *threshold)
            }
            ValuePredicate::TagPresent { tag } => context.tags.contains(tag),
            ValuePredicate::Always => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::EventKind;
    use serde_json::json;

    fn call_event(function: &str, tags: &[&str]) -> RuntimeEvent {
        RuntimeEvent::new(
            EventKind::CallEntry,
            11,
            0,
            EventPayload::CallEntry {
                function: function.to_string(),
                args: vec![],
                value_id: None,
                taint_tags: tags.iter().map(|t| t.to_string()).collect(),
            },
        )
    }

    fn tagged_context(tags: &[&str]) -> StructuralContext {
        StructuralContext::new(11, vec![], tags.iter().map(|t| t.to_string()).collect())
    }

    #[test]
    fn test_binding_conditions() {
        let mut bindings = Bindings::new();
        bindings.insert("callee".to_string(), json!("read"));

        let event = call_event("read", &[]);
        let context = StructuralContext::unresolved();

        let eq = Condition::BindingEquals {
            var: "callee".to_string(),
            value: json!("read"),
        };
        assert!(eq.eval(&bindings, &event, &context));

        let missing = Condition::BindingExists {
            var: "caller".to_string(),
        };
        assert!(!missing.eval(&bindings, &event, &context));
    }

    #[test]
    fn test_tag_present_checks_both_sources() {
        let bindings = Bindings::new();
        let cond = Condition::TagPresent {
            tag: "user-input".to_string(),
        };

        // Tag on the event itself
        let event = call_event("f", &["user-input"]);
        assert!(cond.eval(&bindings, &event, &StructuralContext::unresolved()));

        // Tag on the resolved context
        let event = call_event("f", &[]);
        assert!(cond.eval(&bindings, &event, &tagged_context(&["user-input"])));

        // Tag nowhere
        assert!(!cond.eval(&bindings, &event, &StructuralContext::unresolved()));
    }

    #[test]
    fn test_composite_conditions() {
        let bindings = Bindings::new();
        let event = call_event("write", &[]);
        let context = StructuralContext::unresolved();

        let cond = Condition::AllOf {
            inner: vec![
                Condition::FunctionIs {
                    name: "write".to_string(),
                },
                Condition::Not {
                    inner: Box::new(Condition::NodeIs { node_id: 99 }),
                },
            ],
        };
        assert!(cond.eval(&bindings, &event, &context));

        let cond = Condition::AnyOf { inner: vec![] };
        assert!(!cond.eval(&bindings, &event, &context));
    }

    #[test]
    fn test_value_predicates() {
        let context = StructuralContext::unresolved();

        assert!(ValuePredicate::Changed.eval(None, &json!(1), &context));
        assert!(ValuePredicate::Changed.eval(Some(&json!(1)), &json!(2), &context));
        assert!(!ValuePredicate::Changed.eval(Some(&json!(2)), &json!(2), &context));

        assert!(ValuePredicate::GreaterThan { threshold: 10.0 }.eval(None, &json!(11), &context));
        assert!(!ValuePredicate::GreaterThan { threshold: 10.0 }.eval(None, &json!("x"), &context));

        assert!(ValuePredicate::TagPresent {
            tag: "loop-body".to_string()
        }
        .eval(None, &json!(0), &tagged_context(&["loop-body"])));
    }

    #[test]
    fn test_condition_serialization() {
        let cond = Condition::FunctionIs {
            name: "read".to_string(),
        };
        let json = serde_json::to_string(&cond).unwrap();
        assert!(json.contains("function_is"));

        let back: Condition = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cond);
    }
}

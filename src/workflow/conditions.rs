//! Step condition evaluation
//!
//! Conditions are opaque strings to the engine. Whether a step runs is
//! decided by a pluggable [`ConditionEvaluator`]:
//! - [`AlwaysTrue`] - every condition passes (the default)
//! - [`DataFlag`] - the condition names a workflow data key, optionally negated with `!`
//! - [`FnCondition`] - any closure

use super::context::WorkflowContext;

/// Decides whether a conditional step runs or is skipped.
///
/// Implementations must be free of side effects.
pub trait ConditionEvaluator: Send + Sync {
    fn evaluate(&self, condition: &str, ctx: &WorkflowContext<'_>) -> bool;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysTrue;

impl ConditionEvaluator for AlwaysTrue {
    fn evaluate(&self, _condition: &str, _ctx: &WorkflowContext<'_>) -> bool {
        true
    }
}

/// Treats the condition as the name of a workflow data flag.
///
/// `publish_enabled` passes when `data.publish_enabled` is truthy,
/// `!publish_enabled` when it is not. Missing keys are falsy.
#[derive(Debug, Clone, Copy, Default)]
pub struct DataFlag;

impl ConditionEvaluator for DataFlag {
    fn evaluate(&self, condition: &str, ctx: &WorkflowContext<'_>) -> bool {
        let condition = condition.trim();
        let (negate, key) = match condition.strip_prefix('!') {
            Some(rest) => (true, rest.trim()),
            None => (false, condition),
        };

        let value = ctx.get(key).map(is_truthy).unwrap_or(false);
        value != negate
    }
}

/// Truthiness of a data value
pub fn is_truthy(value: &serde_json::Value) -> bool {
    use serde_json::Value;

    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty() && s != "false" && s != "0",
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Adapts a closure into a condition evaluator
pub struct FnCondition<F>(pub F);

impl<F> ConditionEvaluator for FnCondition<F>
where
    F: Fn(&str, &WorkflowContext<'_>) -> bool + Send + Sync,
{
    fn evaluate(&self, condition: &str, ctx: &WorkflowContext<'_>) -> bool {
        (self.0)(condition, ctx)
    }
}

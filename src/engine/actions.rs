//! Step action dispatch
//!
//! The engine runs every step through a single [`StepActionExecutor`]. The
//! stock executor is an [`ActionRegistry`] that routes each [`ActionType`] to
//! its own [`ActionHandler`]:
//! - `APPROVE`, `REVIEW`, `PUBLISH`, `DISTRIBUTE`, `NOTIFY`, `VALIDATE` - [`Acknowledge`]
//! - `EXECUTE_SCRIPT`, `CALL_API`, `SEND_EMAIL` - [`Simulated`]

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use tracing::debug;

use crate::engine::error::ActionError;
use crate::engine::result::ActionResult;
use crate::workflow::{ActionType, Step, WorkflowId};

/// Everything a handler gets to know about the step it runs
#[derive(Debug, Clone)]
pub struct StepInvocation {
    pub workflow_id: WorkflowId,
    pub step_id: String,
    pub step_name: String,
    pub action: ActionType,
    pub parameters: HashMap<String, serde_json::Value>,
    /// 1 for the first attempt, 2 for the first retry, ...
    pub attempt: u32,
}

impl StepInvocation {
    pub fn from_step(workflow_id: WorkflowId, step: &Step) -> Self {
        Self {
            workflow_id,
            step_id: step.id.clone(),
            step_name: step.name.clone(),
            action: step.action,
            parameters: step.parameters.clone(),
            attempt: step.retry_attempts + 1,
        }
    }

    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).and_then(|v| v.as_str())
    }

    pub fn param_bool(&self, key: &str) -> Result<bool, ActionError> {
        match self.parameters.get(key) {
            None | Some(serde_json::Value::Null) => Ok(false),
            Some(serde_json::Value::Bool(b)) => Ok(*b),
            Some(other) => Err(ActionError::InvalidParameter(format!(
                "{} must be a boolean, got {}",
                key, other
            ))),
        }
    }
}

/// Runs the action of a step
#[async_trait]
pub trait StepActionExecutor: Send + Sync {
    async fn execute(&self, step: &StepInvocation) -> Result<ActionResult, ActionError>;
}

/// Handler for a single action kind
#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn handle(&self, step: &StepInvocation) -> Result<ActionResult, ActionError>;
}

/// Maps action kinds to their handlers
#[derive(Clone, Default)]
pub struct ActionRegistry {
    handlers: HashMap<ActionType, Arc<dyn ActionHandler>>,
}

impl ActionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the stock handler for every action kind
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        let acknowledge: Arc<dyn ActionHandler> = Arc::new(Acknowledge);
        let simulated: Arc<dyn ActionHandler> = Arc::new(Simulated);

        for action in ActionType::ALL {
            let handler = if action.is_acknowledged() {
                acknowledge.clone()
            } else {
                simulated.clone()
            };
            registry.handlers.insert(action, handler);
        }
        registry
    }

    /// Register (or replace) the handler for `action`
    pub fn register(&mut self, action: ActionType, handler: impl ActionHandler + 'static) {
        self.handlers.insert(action, Arc::new(handler));
    }

    pub fn with_handler(
        mut self,
        action: ActionType,
        handler: impl ActionHandler + 'static,
    ) -> Self {
        self.register(action, handler);
        self
    }

    pub fn has_handler(&self, action: ActionType) -> bool {
        self.handlers.contains_key(&action)
    }
}

#[async_trait]
impl StepActionExecutor for ActionRegistry {
    async fn execute(&self, step: &StepInvocation) -> Result<ActionResult, ActionError> {
        let handler = self
            .handlers
            .get(&step.action)
            .ok_or(ActionError::NoHandler(step.action))?;
        handler.handle(step).await
    }
}

/// Succeeds without doing anything
#[derive(Debug, Clone, Copy, Default)]
pub struct Acknowledge;

#[async_trait]
impl ActionHandler for Acknowledge {
    async fn handle(&self, step: &StepInvocation) -> Result<ActionResult, ActionError> {
        debug!("Acknowledged {} step '{}'", step.action, step.step_name);
        Ok(ActionResult::succeeded().with_output("action", step.action.as_str()))
    }
}

/// Stand-in for an external integration.
///
/// Fails when the step parameter `simulate_failure` is `true`, using
/// `failure_message` as the error if present.
#[derive(Debug, Clone, Copy, Default)]
pub struct Simulated;

#[async_trait]
impl ActionHandler for Simulated {
    async fn handle(&self, step: &StepInvocation) -> Result<ActionResult, ActionError> {
        if step.param_bool("simulate_failure")? {
            let message = step
                .param_str("failure_message")
                .map(str::to_string)
                .unwrap_or_else(|| format!("{} failed (simulated)", step.action));
            return Ok(ActionResult::failed(message));
        }

        debug!("Simulated {} step '{}'", step.action, step.step_name);
        Ok(ActionResult::succeeded()
            .with_output("action", step.action.as_str())
            .with_output("attempt", step.attempt.to_string()))
    }
}

/// Adapts a closure into an action handler
pub struct FnHandler<F>(pub F);

#[async_trait]
impl<F> ActionHandler for FnHandler<F>
where
    F: Fn(&StepInvocation) -> Result<ActionResult, ActionError> + Send + Sync,
{
    async fn handle(&self, step: &StepInvocation) -> Result<ActionResult, ActionError> {
        (self.0)(step)
    }
}

/// Run one attempt, folding every kind of failure into `Err(message)`.
///
/// Handler errors, unsuccessful results, and panics all become a step
/// failure so a faulty handler cannot leave the workflow half-updated.
pub(crate) async fn invoke(
    executor: &dyn StepActionExecutor,
    invocation: &StepInvocation,
) -> Result<HashMap<String, String>, String> {
    let outcome = AssertUnwindSafe(executor.execute(invocation))
        .catch_unwind()
        .await;

    match outcome {
        Ok(Ok(result)) if result.success => Ok(result.outputs),
        Ok(Ok(result)) => Err(result
            .error
            .unwrap_or_else(|| format!("{} action reported failure", invocation.action))),
        Ok(Err(e)) => Err(e.to_string()),
        Err(panic) => Err(format!(
            "{} action panicked: {}",
            invocation.action,
            panic_message(panic.as_ref())
        )),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

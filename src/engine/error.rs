//! Engine error types

use crate::workflow::{LoadError, WorkflowId, WorkflowStatus};

/// Errors surfaced to callers of the engine.
///
/// Step failures are not errors: they are absorbed by the retry and
/// continue-on-error policy and show up in the workflow status and log.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Workflow not found: {0}")]
    NotFound(WorkflowId),

    #[error("Cannot {operation} workflow {id} in status {status}")]
    InvalidState {
        id: WorkflowId,
        status: WorkflowStatus,
        operation: &'static str,
    },

    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl EngineError {
    pub fn invalid_state(id: WorkflowId, status: WorkflowStatus, operation: &'static str) -> Self {
        Self::InvalidState {
            id,
            status,
            operation,
        }
    }
}

/// Failure reported by an action handler
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    #[error("No handler registered for {0}")]
    NoHandler(crate::workflow::ActionType),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("{0}")]
    Failed(String),
}

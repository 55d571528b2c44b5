//! Workflow types and definitions
//!
//! This module contains all types for defining and describing workflows:
//! - `action` - ActionType for the `action` field of steps
//! - `model` - Workflow, Step, Approval runtime state and statuses
//! - `definition` - WorkflowDefinition and StepDefinition (input to `create`)
//! - `context` - WorkflowContext handed to condition evaluators
//! - `conditions` - Pluggable condition evaluators
//! - `loader` - Load definitions from files and directories
//! - `config` - Engine configuration

pub mod action;
pub mod conditions;
pub mod config;
pub mod context;
pub mod definition;
pub mod loader;
pub mod model;

// Re-export all public types for convenience
pub use action::ActionType;
pub use conditions::{AlwaysTrue, ConditionEvaluator, DataFlag, FnCondition};
pub use config::{ApprovalConfig, ApprovalPolicyKind, EngineConfig, EscalationConfig};
pub use context::WorkflowContext;
pub use definition::{StepDefinition, WorkflowDefinition};
pub use loader::{LoadError, WorkflowLoader};
pub use model::{
    Approval, Step, StepStatus, Workflow, WorkflowId, WorkflowPolicy, WorkflowStatus,
};

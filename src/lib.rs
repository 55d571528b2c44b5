//! # Report Workflows
//!
//! A workflow engine for report approval and publication. A workflow is an
//! ordered list of typed steps (validate, review, approve, publish, notify,
//! ...) that the engine drives through conditional execution, retries,
//! approval gates, and escalation, keeping a bounded execution log of
//! everything that happened.
//!
//! ## Features
//!
//! - **Declarative definitions** - Describe workflows in YAML or build them in code
//! - **Retry and continue-on-error** - Per-workflow failure policy
//! - **Approval gates** - Steps that wait until an approval policy is satisfied
//! - **Escalation and deadlines** - Find workflows that are overdue or stuck
//! - **Pluggable actions and conditions** - Swap in your own handlers and evaluators
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use report_workflows::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let engine = WorkflowEngine::new();
//!
//!     let definition = WorkflowDefinition::new("term-grades", "GRADE_REPORT", "rpt-2024-t1")
//!         .with_step(StepDefinition::new("Validate grades", ActionType::Validate))
//!         .with_step(
//!             StepDefinition::new("Head approval", ActionType::Approve).requiring_approval(),
//!         )
//!         .with_step(StepDefinition::new("Publish", ActionType::Publish));
//!
//!     let workflow = engine.create(definition).await?;
//!     let workflow = engine.start(workflow.id).await?;
//!     assert_eq!(workflow.status, WorkflowStatus::AwaitingApproval);
//!
//!     let workflow = engine.add_approval(workflow.id, "head-of-year", true, None).await?;
//!     println!("Workflow finished: {}", workflow.status);
//!     Ok(())
//! }
//! ```

pub mod engine;
pub mod workflow;

// Re-export main types
pub use engine::{
    ActionError, ActionHandler, ActionRegistry, ActionResult, ApprovalPolicy, Clock, EngineError,
    EscalationPolicy, ExecutionLogEntry, LogAction, MockClock, Severity, StepActionExecutor,
    StepInvocation, SystemClock, WorkflowEngine, WorkflowEvent, WorkflowStatistics,
    WorkflowStore,
};
pub use workflow::{
    ActionType, Approval, ConditionEvaluator, EngineConfig, LoadError, Step, StepDefinition,
    StepStatus, Workflow, WorkflowDefinition, WorkflowId, WorkflowLoader, WorkflowPolicy,
    WorkflowStatus,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::engine::{
        ActionError, ActionHandler, ActionRegistry, ActionResult, EngineError, FnHandler,
        LogAction, MinimumApprovals, Severity, StepActionExecutor, StepInvocation, Unanimous,
        WorkflowEngine,
    };
    pub use crate::workflow::{
        ActionType, AlwaysTrue, ConditionEvaluator, DataFlag, EngineConfig, FnCondition,
        StepDefinition, StepStatus, Workflow, WorkflowDefinition, WorkflowId, WorkflowLoader,
        WorkflowPolicy, WorkflowStatus,
    };
}

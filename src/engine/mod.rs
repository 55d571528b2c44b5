//! Workflow execution engine module
//!
//! This module contains:
//! - `workflow_engine` - The engine: lifecycle, step loop, approvals, queries
//! - `store` - In-memory workflow store with per-workflow locking
//! - `execution_log` - Bounded per-workflow audit trail
//! - `actions` - Step action executor and the stock action handlers
//! - `policy` - Approval and escalation policies
//! - `statistics` - Aggregate statistics over the store
//! - `clock` - System and mock clocks
//! - `error` - Engine error types
//! - `result` - Action result type

pub mod actions;
pub mod clock;
pub mod error;
pub mod execution_log;
pub mod policy;
pub mod result;
pub mod statistics;
pub mod store;
pub mod workflow_engine;

pub use actions::{
    Acknowledge, ActionHandler, ActionRegistry, FnHandler, Simulated, StepActionExecutor,
    StepInvocation,
};
pub use clock::{Clock, ClockError, MockClock, SystemClock};
pub use error::{ActionError, EngineError};
pub use execution_log::{ExecutionLog, ExecutionLogEntry, LogAction, Severity};
pub use policy::{ApprovalPolicy, EscalationPolicy, MinimumApprovals, TimeInState, Unanimous};
pub use result::ActionResult;
pub use statistics::WorkflowStatistics;
pub use store::{WorkflowRecord, WorkflowStore};
pub use workflow_engine::{WorkflowEngine, WorkflowEvent};

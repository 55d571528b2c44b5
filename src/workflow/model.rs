//! Workflow, Step, and Approval runtime state
//!
//! These are the records the engine owns and mutates. Callers only ever see
//! cloned snapshots of them.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::action::ActionType;

// ============================================================================
// Identity
// ============================================================================

/// Opaque workflow identity, allocated monotonically and never reused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkflowId(pub u64);

impl fmt::Display for WorkflowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "wf-{}", self.0)
    }
}

// ============================================================================
// Status
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowStatus {
    Draft,
    Active,
    /// Halted at an approval-gated step whose requirement is not yet met
    AwaitingApproval,
    Paused,
    Completed,
    Failed,
    Cancelled,
}

impl WorkflowStatus {
    /// Terminal states are final: no step executes from them
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkflowStatus::Completed | WorkflowStatus::Failed | WorkflowStatus::Cancelled
        )
    }

    /// Started and neither paused nor finished
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            WorkflowStatus::Active | WorkflowStatus::AwaitingApproval
        )
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkflowStatus::Draft => "DRAFT",
            WorkflowStatus::Active => "ACTIVE",
            WorkflowStatus::AwaitingApproval => "AWAITING_APPROVAL",
            WorkflowStatus::Paused => "PAUSED",
            WorkflowStatus::Completed => "COMPLETED",
            WorkflowStatus::Failed => "FAILED",
            WorkflowStatus::Cancelled => "CANCELLED",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Skipped,
}

// ============================================================================
// Step
// ============================================================================

/// A single unit of work, exclusively owned by its workflow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    /// Identifier unique within the workflow (defaults to `step-<n>`)
    pub id: String,

    pub name: String,

    pub action: ActionType,

    /// Gating condition handed to the condition evaluator
    pub condition: Option<String>,

    /// Step cannot run until the approval policy is satisfied
    pub requires_approval: bool,

    /// Action parameters
    pub parameters: HashMap<String, serde_json::Value>,

    pub status: StepStatus,

    /// Retries performed so far (the first attempt is not a retry)
    pub retry_attempts: u32,

    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
    pub error_message: Option<String>,

    /// Outputs reported by the last successful attempt
    pub outputs: HashMap<String, String>,
}

impl Step {
    pub fn new(id: impl Into<String>, name: impl Into<String>, action: ActionType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            action,
            condition: None,
            requires_approval: false,
            parameters: HashMap::new(),
            status: StepStatus::Pending,
            retry_attempts: 0,
            started_at: None,
            completed_at: None,
            duration_ms: None,
            error_message: None,
            outputs: HashMap::new(),
        }
    }
}

// ============================================================================
// Approval
// ============================================================================

/// One approver's decision on a workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Approval {
    pub approver_id: String,
    pub approved: bool,
    pub comment: Option<String>,
    pub timestamp: DateTime<Utc>,
}

// ============================================================================
// Policy
// ============================================================================

/// Per-workflow execution policy supplied at creation time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowPolicy {
    /// Must be true for `start` to succeed
    pub enabled: bool,
    /// Start immediately after creation
    pub auto_start: bool,
    /// Retry a failed step in place
    pub allow_retry: bool,
    /// Retries allowed per step when `allow_retry` is set
    pub max_retry_attempts: u32,
    /// Move on to the next step when a step fails for good
    pub continue_on_error: bool,
}

impl Default for WorkflowPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            auto_start: false,
            allow_retry: false,
            max_retry_attempts: 3,
            continue_on_error: false,
        }
    }
}

// ============================================================================
// Workflow
// ============================================================================

/// One orchestration instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub id: WorkflowId,
    pub name: String,
    pub workflow_type: String,
    pub report_id: String,
    pub description: Option<String>,

    pub status: WorkflowStatus,

    /// Execution order equals insertion order
    pub steps: Vec<Step>,
    pub current_step_index: usize,

    pub total_steps: usize,
    pub completed_steps: usize,
    /// Steps currently in FAILED status
    pub failed_steps: usize,
    pub skipped_steps: usize,
    /// Every failed action attempt, retries included
    pub failed_attempts: u64,

    /// Action invocations
    pub execution_count: u64,
    pub success_count: u64,
    pub failure_count: u64,
    /// Calls to `start`
    pub trigger_count: u64,

    pub policy: WorkflowPolicy,

    /// Read-only input for condition evaluation
    pub data: HashMap<String, serde_json::Value>,

    pub approvals: Vec<Approval>,

    pub escalated_to: Option<String>,
    pub escalated_at: Option<DateTime<Utc>>,

    /// Message of the failure that ended the workflow
    pub error_message: Option<String>,

    pub due_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub last_triggered_at: Option<DateTime<Utc>>,
    pub status_changed_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Workflow {
    /// Fraction of steps completed, in `0.0..=1.0`
    pub fn progress(&self) -> f64 {
        if self.total_steps == 0 {
            return if self.status == WorkflowStatus::Completed {
                1.0
            } else {
                0.0
            };
        }
        self.completed_steps as f64 / self.total_steps as f64
    }

    /// `success_count / execution_count`, or None if no action ever ran
    pub fn success_rate(&self) -> Option<f64> {
        if self.execution_count == 0 {
            None
        } else {
            Some(self.success_count as f64 / self.execution_count as f64)
        }
    }

    /// Past its deadline without reaching a terminal state
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.status.is_terminal() && self.due_at.is_some_and(|due| due < now)
    }

    pub fn is_escalated(&self) -> bool {
        self.escalated_to.is_some()
    }

    /// `completed + failed + skipped <= total`
    pub fn step_counts_consistent(&self) -> bool {
        self.completed_steps + self.failed_steps + self.skipped_steps <= self.total_steps
    }

    pub(crate) fn set_status(&mut self, status: WorkflowStatus, now: DateTime<Utc>) {
        if self.status != status {
            self.status = status;
            self.status_changed_at = now;
        }
    }
}

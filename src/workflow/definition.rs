//! Workflow and Step definitions
//!
//! A definition is what callers hand to the engine's `create`: the ordered
//! steps plus the per-workflow policy. Definitions are plain data and can be
//! written in YAML:
//!
//! ```yaml
//! name: term-report-publication
//! type: REPORT_PUBLICATION
//! report_id: rpt-2024-t1
//! allow_retry: true
//! max_retry_attempts: 2
//! data:
//!   publish_enabled: true
//! steps:
//!   - name: Validate grades
//!     action: VALIDATE
//!   - name: Principal sign-off
//!     action: APPROVE
//!     requires_approval: true
//!   - name: Publish
//!     action: PUBLISH
//!     if: publish_enabled
//! ```

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::action::ActionType;
use super::model::{Step, Workflow, WorkflowId, WorkflowPolicy, WorkflowStatus};

// ============================================================================
// Workflow
// ============================================================================

/// A complete workflow definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    /// Workflow name (required)
    pub name: String,

    /// Classification, opaque to the engine
    #[serde(rename = "type")]
    pub workflow_type: String,

    /// Report this workflow is about, opaque to the engine
    pub report_id: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Deadline used for overdue detection
    #[serde(default)]
    pub due_at: Option<DateTime<Utc>>,

    /// Data available to step conditions
    #[serde(default)]
    pub data: HashMap<String, serde_json::Value>,

    // Policy overrides; unset fields fall back to the engine defaults
    #[serde(default)]
    pub enabled: Option<bool>,

    #[serde(default)]
    pub auto_start: Option<bool>,

    #[serde(default)]
    pub allow_retry: Option<bool>,

    #[serde(default)]
    pub max_retry_attempts: Option<u32>,

    #[serde(default)]
    pub continue_on_error: Option<bool>,

    /// Steps in execution order
    #[serde(default)]
    pub steps: Vec<StepDefinition>,
}

impl WorkflowDefinition {
    pub fn new(
        name: impl Into<String>,
        workflow_type: impl Into<String>,
        report_id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            workflow_type: workflow_type.into(),
            report_id: report_id.into(),
            description: None,
            due_at: None,
            data: HashMap::new(),
            enabled: None,
            auto_start: None,
            allow_retry: None,
            max_retry_attempts: None,
            continue_on_error: None,
            steps: Vec::new(),
        }
    }

    pub fn with_step(mut self, step: StepDefinition) -> Self {
        self.steps.push(step);
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    pub fn with_due_at(mut self, due_at: DateTime<Utc>) -> Self {
        self.due_at = Some(due_at);
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    pub fn auto_start(mut self, auto_start: bool) -> Self {
        self.auto_start = Some(auto_start);
        self
    }

    /// Allow up to `max_attempts` retries per failed step
    pub fn with_retry(mut self, max_attempts: u32) -> Self {
        self.allow_retry = Some(true);
        self.max_retry_attempts = Some(max_attempts);
        self
    }

    pub fn continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = Some(continue_on_error);
        self
    }

    /// Merge the definition's overrides onto `defaults`
    pub fn resolve_policy(&self, defaults: &WorkflowPolicy) -> WorkflowPolicy {
        WorkflowPolicy {
            enabled: self.enabled.unwrap_or(defaults.enabled),
            auto_start: self.auto_start.unwrap_or(defaults.auto_start),
            allow_retry: self.allow_retry.unwrap_or(defaults.allow_retry),
            max_retry_attempts: self
                .max_retry_attempts
                .unwrap_or(defaults.max_retry_attempts),
            continue_on_error: self.continue_on_error.unwrap_or(defaults.continue_on_error),
        }
    }

    /// Build a fresh DRAFT workflow with zeroed counters
    pub fn instantiate(
        self,
        id: WorkflowId,
        defaults: &WorkflowPolicy,
        now: DateTime<Utc>,
    ) -> Workflow {
        let policy = self.resolve_policy(defaults);
        let steps: Vec<Step> = self
            .steps
            .into_iter()
            .enumerate()
            .map(|(idx, def)| def.into_step(idx))
            .collect();

        Workflow {
            id,
            name: self.name,
            workflow_type: self.workflow_type,
            report_id: self.report_id,
            description: self.description,
            status: WorkflowStatus::Draft,
            total_steps: steps.len(),
            steps,
            current_step_index: 0,
            completed_steps: 0,
            failed_steps: 0,
            skipped_steps: 0,
            failed_attempts: 0,
            execution_count: 0,
            success_count: 0,
            failure_count: 0,
            trigger_count: 0,
            policy,
            data: self.data,
            approvals: Vec::new(),
            escalated_to: None,
            escalated_at: None,
            error_message: None,
            due_at: self.due_at,
            created_at: now,
            last_triggered_at: None,
            status_changed_at: now,
            completed_at: None,
        }
    }
}

// ============================================================================
// Step
// ============================================================================

/// A single step in a workflow definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepDefinition {
    /// Step name (for logging)
    pub name: String,

    /// Action to perform
    pub action: ActionType,

    /// ID for referencing the step in logs
    #[serde(default)]
    pub id: Option<String>,

    /// Condition to run this step
    #[serde(rename = "if", default)]
    pub condition: Option<String>,

    /// Hold the workflow at this step until the approval policy is met
    #[serde(default)]
    pub requires_approval: bool,

    /// Action parameters
    #[serde(default)]
    pub with: HashMap<String, serde_json::Value>,
}

impl StepDefinition {
    pub fn new(name: impl Into<String>, action: ActionType) -> Self {
        Self {
            name: name.into(),
            action,
            id: None,
            condition: None,
            requires_approval: false,
            with: HashMap::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn when(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    pub fn requiring_approval(mut self) -> Self {
        self.requires_approval = true;
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.with.insert(key.into(), value);
        self
    }

    fn into_step(self, index: usize) -> Step {
        let id = self.id.unwrap_or_else(|| format!("step-{}", index + 1));
        let mut step = Step::new(id, self.name, self.action);
        step.condition = self.condition;
        step.requires_approval = self.requires_approval;
        step.parameters = self.with;
        step
    }
}

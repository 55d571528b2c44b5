//! Workflow Engine - drives workflows through their lifecycle
//!
//! The engine owns every state transition:
//! 1. Creates workflows from definitions and assigns their identity
//! 2. Runs steps in order, consulting the condition evaluator and action executor
//! 3. Applies the retry and continue-on-error policy to failed steps
//! 4. Holds approval-gated steps until the approval policy is satisfied
//! 5. Records every transition in the workflow's execution log
//!
//! There is no scheduler. `start`, `resume`, and `add_approval` drive the step
//! loop on the caller's task and return once the workflow reaches a terminal
//! state, is paused, or halts at an unmet approval gate.
//!
//! Calls on the same workflow are serialized by that workflow's lock, which
//! the step loop takes once per step attempt. A `pause` or `cancel` from
//! another task therefore lands between two steps of a running workflow.
//! Action handlers must not call back into the engine for the workflow they
//! are running.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, error, info, instrument, warn};

use crate::engine::actions::{self, ActionRegistry, StepActionExecutor, StepInvocation};
use crate::engine::clock::{Clock, SystemClock};
use crate::engine::error::EngineError;
use crate::engine::execution_log::{ExecutionLogEntry, LogAction, Severity};
use crate::engine::policy::{ApprovalPolicy, EscalationPolicy, MinimumApprovals, TimeInState};
use crate::engine::statistics::WorkflowStatistics;
use crate::engine::store::{RecordHandle, WorkflowRecord, WorkflowStore};
use crate::workflow::*;

/// Buffered events per subscriber before the slowest one starts lagging
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Default time a workflow may spend in one state before it needs escalating
const DEFAULT_ESCALATION_THRESHOLD: Duration = Duration::from_secs(48 * 3600);

/// An execution log entry, as published to subscribers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowEvent {
    pub workflow_id: WorkflowId,
    pub entry: ExecutionLogEntry,
}

/// Outcome of one step-loop iteration
enum Flow {
    Continue,
    Halt,
}

/// The workflow engine. Cloning yields another handle to the same store.
#[derive(Clone)]
pub struct WorkflowEngine {
    store: Arc<WorkflowStore>,
    executor: Arc<dyn StepActionExecutor>,
    conditions: Arc<dyn ConditionEvaluator>,
    approvals: Arc<dyn ApprovalPolicy>,
    escalation: Arc<dyn EscalationPolicy>,
    clock: Arc<dyn Clock>,
    defaults: WorkflowPolicy,
    events: broadcast::Sender<WorkflowEvent>,
}

impl Default for WorkflowEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkflowEngine {
    /// Engine with the stock action handlers, conditions that always hold,
    /// a single required approval, and a 48 hour escalation threshold
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            store: Arc::new(WorkflowStore::default()),
            executor: Arc::new(ActionRegistry::with_defaults()),
            conditions: Arc::new(AlwaysTrue),
            approvals: Arc::new(MinimumApprovals { required: 1 }),
            escalation: Arc::new(TimeInState {
                threshold: DEFAULT_ESCALATION_THRESHOLD,
            }),
            clock: Arc::new(SystemClock),
            defaults: WorkflowPolicy::default(),
            events,
        }
    }

    /// Engine configured from an `engine.yaml`
    pub fn from_config(config: &EngineConfig) -> Result<Self, EngineError> {
        let threshold = config
            .escalation
            .threshold()
            .map_err(|e| EngineError::Config(format!("escalation.after: {}", e)))?;
        let approvals: Box<dyn ApprovalPolicy> = (&config.approval).into();

        info!(
            "Engine configured: log capacity {}, approval {}, escalation after {:?}",
            config.log_capacity,
            approvals.describe(),
            threshold
        );

        let mut engine = Self::new();
        engine.store = Arc::new(WorkflowStore::new(config.log_capacity));
        engine.approvals = Arc::from(approvals);
        engine.escalation = Arc::new(TimeInState { threshold });
        engine.defaults = config.defaults.clone();
        Ok(engine)
    }

    pub fn with_executor(mut self, executor: impl StepActionExecutor + 'static) -> Self {
        self.executor = Arc::new(executor);
        self
    }

    pub fn with_conditions(mut self, conditions: impl ConditionEvaluator + 'static) -> Self {
        self.conditions = Arc::new(conditions);
        self
    }

    pub fn with_approval_policy(mut self, policy: impl ApprovalPolicy + 'static) -> Self {
        self.approvals = Arc::new(policy);
        self
    }

    pub fn with_escalation_policy(mut self, policy: impl EscalationPolicy + 'static) -> Self {
        self.escalation = Arc::new(policy);
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Use an existing store, e.g. one shared with another engine
    pub fn with_store(mut self, store: Arc<WorkflowStore>) -> Self {
        self.store = store;
        self
    }

    /// Policy applied to the fields a definition leaves out
    pub fn with_defaults(mut self, defaults: WorkflowPolicy) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn store(&self) -> &Arc<WorkflowStore> {
        &self.store
    }

    /// Receive every execution log entry written from now on
    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.events.subscribe()
    }

    // ========================================================================
    // Store operations
    // ========================================================================

    /// Create a workflow in DRAFT, starting it right away if it auto-starts
    #[instrument(skip(self, definition), fields(name = %definition.name))]
    pub async fn create(&self, definition: WorkflowDefinition) -> Result<Workflow, EngineError> {
        let now = self.clock.now().await;
        let id = self.store.allocate_id();
        let workflow = definition.instantiate(id, &self.defaults, now);
        let policy = workflow.policy.clone();

        let mut record = WorkflowRecord::new(workflow, self.store.log_capacity());
        let message = format!(
            "Workflow '{}' created for report {} with {} step(s)",
            record.workflow.name, record.workflow.report_id, record.workflow.total_steps
        );
        info!(workflow_id = %id, "{}", message);
        self.append(
            &mut record,
            ExecutionLogEntry::new(now, LogAction::WorkflowCreated, Severity::Info, message),
        );

        let generation = if policy.auto_start && policy.enabled {
            Some(self.begin_start(&mut record).await?)
        } else {
            if policy.auto_start {
                warn!(workflow_id = %id, "Auto-start skipped for disabled workflow");
                self.append(
                    &mut record,
                    ExecutionLogEntry::new(
                        now,
                        LogAction::AutoStartSkipped,
                        Severity::Warning,
                        "Auto-start skipped: workflow is disabled",
                    ),
                );
            }
            None
        };

        let handle: RecordHandle = Arc::new(Mutex::new(record));
        self.store.insert(id, handle.clone()).await;

        match generation {
            Some(generation) => Ok(self.drive(&handle, generation).await),
            None => Ok(handle.lock().await.workflow.clone()),
        }
    }

    pub async fn get(&self, id: WorkflowId) -> Result<Workflow, EngineError> {
        self.store.get(id).await.ok_or(EngineError::NotFound(id))
    }

    pub async fn list_by_report(&self, report_id: &str) -> Vec<Workflow> {
        self.store.list_by_report(report_id).await
    }

    pub async fn list_by_status(&self, status: WorkflowStatus) -> Vec<Workflow> {
        self.store.list_by_status(status).await
    }

    pub async fn list_by_type(&self, workflow_type: &str) -> Vec<Workflow> {
        self.store.list_by_type(workflow_type).await
    }

    /// Remove a workflow and its execution log. Unknown ids are a no-op.
    #[instrument(skip_all, fields(workflow_id = %id))]
    pub async fn delete(&self, id: WorkflowId) -> bool {
        let removed = self.store.delete(id).await;
        if removed {
            info!("Workflow deleted");
        } else {
            debug!("Delete of unknown workflow ignored");
        }
        removed
    }

    /// Execution log of a workflow, oldest entry first
    pub async fn execution_log(
        &self,
        id: WorkflowId,
    ) -> Result<Vec<ExecutionLogEntry>, EngineError> {
        self.store
            .execution_log(id)
            .await
            .ok_or(EngineError::NotFound(id))
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Start a DRAFT workflow and run it until it halts
    #[instrument(skip_all, fields(workflow_id = %id))]
    pub async fn start(&self, id: WorkflowId) -> Result<Workflow, EngineError> {
        let handle = self.handle(id).await?;
        let generation = {
            let mut record = handle.lock().await;
            self.begin_start(&mut record).await?
        };
        Ok(self.drive(&handle, generation).await)
    }

    /// Pause an ACTIVE or AWAITING_APPROVAL workflow.
    ///
    /// A run in progress stops before its next step.
    #[instrument(skip_all, fields(workflow_id = %id))]
    pub async fn pause(&self, id: WorkflowId) -> Result<Workflow, EngineError> {
        let handle = self.handle(id).await?;
        let mut record = handle.lock().await;

        let status = record.workflow.status;
        if !status.is_in_flight() {
            return Err(EngineError::invalid_state(id, status, "pause"));
        }

        let now = self.clock.now().await;
        record.workflow.set_status(WorkflowStatus::Paused, now);
        let message = format!(
            "Workflow paused at step {} of {}",
            record.workflow.current_step_index + 1,
            record.workflow.total_steps
        );
        info!("{}", message);
        self.append(
            &mut record,
            ExecutionLogEntry::new(now, LogAction::WorkflowPaused, Severity::Info, message),
        );
        Ok(record.workflow.clone())
    }

    /// Resume a PAUSED workflow at its current step and run it until it halts
    #[instrument(skip_all, fields(workflow_id = %id))]
    pub async fn resume(&self, id: WorkflowId) -> Result<Workflow, EngineError> {
        let handle = self.handle(id).await?;
        let generation = {
            let mut record = handle.lock().await;

            let status = record.workflow.status;
            if status != WorkflowStatus::Paused {
                return Err(EngineError::invalid_state(id, status, "resume"));
            }

            let now = self.clock.now().await;
            record.workflow.set_status(WorkflowStatus::Active, now);
            let message = format!(
                "Workflow resumed at step {} of {}",
                record.workflow.current_step_index + 1,
                record.workflow.total_steps
            );
            info!("{}", message);
            self.append(
                &mut record,
                ExecutionLogEntry::new(now, LogAction::WorkflowResumed, Severity::Info, message),
            );
            record.begin_run()
        };
        Ok(self.drive(&handle, generation).await)
    }

    /// Cancel a workflow that has not reached a terminal state
    #[instrument(skip_all, fields(workflow_id = %id))]
    pub async fn cancel(&self, id: WorkflowId) -> Result<Workflow, EngineError> {
        let handle = self.handle(id).await?;
        let mut record = handle.lock().await;

        let status = record.workflow.status;
        if status.is_terminal() {
            return Err(EngineError::invalid_state(id, status, "cancel"));
        }

        let now = self.clock.now().await;
        record.workflow.set_status(WorkflowStatus::Cancelled, now);
        record.workflow.completed_at = Some(now);
        let message = format!("Workflow cancelled (was {})", status);
        warn!("{}", message);
        self.append(
            &mut record,
            ExecutionLogEntry::new(now, LogAction::WorkflowCancelled, Severity::Warning, message),
        );
        Ok(record.workflow.clone())
    }

    /// Record that `target` has been asked to look after the workflow.
    /// Execution is not affected.
    #[instrument(skip_all, fields(workflow_id = %id))]
    pub async fn escalate(
        &self,
        id: WorkflowId,
        target: impl Into<String>,
    ) -> Result<Workflow, EngineError> {
        let target = target.into();
        let handle = self.handle(id).await?;
        let mut record = handle.lock().await;

        let now = self.clock.now().await;
        record.workflow.escalated_to = Some(target.clone());
        record.workflow.escalated_at = Some(now);
        let message = format!(
            "Workflow escalated to {} while {}",
            target, record.workflow.status
        );
        warn!("{}", message);
        self.append(
            &mut record,
            ExecutionLogEntry::new(now, LogAction::WorkflowEscalated, Severity::Warning, message),
        );
        Ok(record.workflow.clone())
    }

    // ========================================================================
    // Approvals
    // ========================================================================

    /// Record an approver's decision.
    ///
    /// When the workflow is waiting at an approval gate and the approval
    /// policy is now satisfied, the run continues from the gated step.
    #[instrument(skip(self, approver_id, comment), fields(workflow_id = %id))]
    pub async fn add_approval(
        &self,
        id: WorkflowId,
        approver_id: impl Into<String>,
        approved: bool,
        comment: Option<String>,
    ) -> Result<Workflow, EngineError> {
        let approver_id = approver_id.into();
        let handle = self.handle(id).await?;
        let generation = {
            let mut record = handle.lock().await;

            let status = record.workflow.status;
            if status.is_terminal() {
                return Err(EngineError::invalid_state(id, status, "approve"));
            }

            let now = self.clock.now().await;
            let mut message = if approved {
                format!("Approval granted by {}", approver_id)
            } else {
                format!("Approval rejected by {}", approver_id)
            };
            if let Some(comment) = &comment {
                message.push_str(": ");
                message.push_str(comment);
            }
            record.workflow.approvals.push(Approval {
                approver_id,
                approved,
                comment,
                timestamp: now,
            });

            let entry = if approved {
                info!("{}", message);
                ExecutionLogEntry::new(now, LogAction::ApprovalGranted, Severity::Info, message)
            } else {
                warn!("{}", message);
                ExecutionLogEntry::new(now, LogAction::ApprovalRejected, Severity::Warning, message)
            };
            self.append(&mut record, entry);

            if status != WorkflowStatus::AwaitingApproval
                || !self.approvals.is_satisfied(&record.workflow.approvals)
            {
                return Ok(record.workflow.clone());
            }

            record.workflow.set_status(WorkflowStatus::Active, now);
            let message = format!(
                "Approval requirement met ({}), resuming at step {}",
                self.approvals.describe(),
                record.workflow.current_step_index + 1
            );
            info!("{}", message);
            self.append(
                &mut record,
                ExecutionLogEntry::new(now, LogAction::WorkflowResumed, Severity::Info, message),
            );
            record.begin_run()
        };
        Ok(self.drive(&handle, generation).await)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Workflows that are ACTIVE or waiting for approval
    pub async fn active_workflows(&self) -> Vec<Workflow> {
        self.store.filter(|wf| wf.status.is_in_flight()).await
    }

    pub async fn overdue_workflows(&self) -> Vec<Workflow> {
        let now = self.clock.now().await;
        self.store.filter(|wf| wf.is_overdue(now)).await
    }

    pub async fn workflows_needing_escalation(&self) -> Vec<Workflow> {
        let now = self.clock.now().await;
        let policy = &self.escalation;
        self.store
            .filter(|wf| policy.needs_escalation(wf, now))
            .await
    }

    pub async fn statistics(&self) -> WorkflowStatistics {
        let now = self.clock.now().await;
        let workflows = self.store.all().await;
        WorkflowStatistics::from_workflows(&workflows, now)
    }

    // ========================================================================
    // Step loop
    // ========================================================================

    async fn handle(&self, id: WorkflowId) -> Result<RecordHandle, EngineError> {
        self.store.handle(id).await.ok_or(EngineError::NotFound(id))
    }

    fn append(&self, record: &mut WorkflowRecord, entry: ExecutionLogEntry) {
        // No subscribers is fine
        let _ = self.events.send(WorkflowEvent {
            workflow_id: record.workflow.id,
            entry: entry.clone(),
        });
        record.log.push(entry);
    }

    /// DRAFT -> ACTIVE; returns the generation of the new run
    async fn begin_start(&self, record: &mut WorkflowRecord) -> Result<u64, EngineError> {
        let id = record.workflow.id;
        let status = record.workflow.status;
        if status != WorkflowStatus::Draft {
            return Err(EngineError::invalid_state(id, status, "start"));
        }
        if !record.workflow.policy.enabled {
            return Err(EngineError::invalid_state(id, status, "start disabled"));
        }

        let now = self.clock.now().await;
        let wf = &mut record.workflow;
        wf.set_status(WorkflowStatus::Active, now);
        wf.trigger_count += 1;
        wf.last_triggered_at = Some(now);

        let message = format!("Workflow '{}' started with {} step(s)", wf.name, wf.total_steps);
        info!(workflow_id = %id, "{}", message);
        self.append(
            record,
            ExecutionLogEntry::new(now, LogAction::WorkflowStarted, Severity::Info, message),
        );
        Ok(record.begin_run())
    }

    /// Run steps until the workflow halts or another run takes over
    async fn drive(&self, handle: &RecordHandle, generation: u64) -> Workflow {
        loop {
            let mut record = handle.lock().await;
            if record.generation != generation || record.workflow.status != WorkflowStatus::Active
            {
                return record.workflow.clone();
            }
            if let Flow::Halt = self.advance(&mut record).await {
                return record.workflow.clone();
            }
        }
    }

    /// One iteration: complete the workflow, or make one attempt at the current step
    async fn advance(&self, record: &mut WorkflowRecord) -> Flow {
        let index = record.workflow.current_step_index;
        let now = self.clock.now().await;

        if index >= record.workflow.total_steps {
            self.complete_workflow(record, now);
            return Flow::Halt;
        }

        let step = &mut record.workflow.steps[index];
        step.status = StepStatus::InProgress;
        step.started_at = Some(now);
        step.completed_at = None;
        step.duration_ms = None;
        step.error_message = None;
        let step_id = step.id.clone();
        let step_name = step.name.clone();
        let message = format!(
            "Step '{}' ({}) started, attempt {}",
            step_name,
            step.action,
            step.retry_attempts + 1
        );
        debug!(workflow_id = %record.workflow.id, step = %step_id, "{}", message);
        self.append(
            record,
            ExecutionLogEntry::new(now, LogAction::StepStarted, Severity::Info, message)
                .for_step(&step_id),
        );

        if !self.condition_holds(&record.workflow, index) {
            let wf = &mut record.workflow;
            let step = &mut wf.steps[index];
            step.status = StepStatus::Skipped;
            step.completed_at = Some(now);
            step.duration_ms = Some(0);
            let message = format!(
                "Step '{}' skipped: condition '{}' not met",
                step_name,
                step.condition.as_deref().unwrap_or_default()
            );
            wf.skipped_steps += 1;
            wf.current_step_index += 1;
            warn!(workflow_id = %wf.id, step = %step_id, "{}", message);
            self.append(
                record,
                ExecutionLogEntry::new(now, LogAction::StepSkipped, Severity::Info, message)
                    .for_step(&step_id),
            );
            return Flow::Continue;
        }

        if record.workflow.steps[index].requires_approval
            && !self.approvals.is_satisfied(&record.workflow.approvals)
        {
            record.workflow.set_status(WorkflowStatus::AwaitingApproval, now);
            let message = format!(
                "Step '{}' requires approval: {}",
                step_name,
                self.approvals.describe()
            );
            info!(workflow_id = %record.workflow.id, step = %step_id, "{}", message);
            self.append(
                record,
                ExecutionLogEntry::new(now, LogAction::ApprovalRequired, Severity::Info, message)
                    .for_step(&step_id),
            );
            return Flow::Halt;
        }

        let invocation =
            StepInvocation::from_step(record.workflow.id, &record.workflow.steps[index]);
        record.workflow.execution_count += 1;
        let outcome = actions::invoke(self.executor.as_ref(), &invocation).await;
        let finished = self.clock.now().await;

        match outcome {
            Ok(outputs) => {
                self.complete_step(record, index, outputs, finished);
                Flow::Continue
            }
            Err(message) => self.fail_step(record, index, message, finished),
        }
    }

    fn condition_holds(&self, workflow: &Workflow, index: usize) -> bool {
        let step = &workflow.steps[index];
        match step.condition.as_deref() {
            Some(condition) if !condition.trim().is_empty() => self
                .conditions
                .evaluate(condition, &WorkflowContext::for_step(workflow, step)),
            _ => true,
        }
    }

    fn complete_workflow(&self, record: &mut WorkflowRecord, now: DateTime<Utc>) {
        let wf = &mut record.workflow;
        wf.set_status(WorkflowStatus::Completed, now);
        wf.completed_at = Some(now);
        let message = format!(
            "Workflow '{}' completed: {} completed, {} skipped, {} failed",
            wf.name, wf.completed_steps, wf.skipped_steps, wf.failed_steps
        );
        info!(workflow_id = %wf.id, "{}", message);
        self.append(
            record,
            ExecutionLogEntry::new(now, LogAction::WorkflowCompleted, Severity::Info, message),
        );
    }

    fn complete_step(
        &self,
        record: &mut WorkflowRecord,
        index: usize,
        outputs: std::collections::HashMap<String, String>,
        finished: DateTime<Utc>,
    ) {
        let wf = &mut record.workflow;
        let step = &mut wf.steps[index];
        let duration_ms = elapsed_ms(step.started_at, finished);
        step.status = StepStatus::Completed;
        step.completed_at = Some(finished);
        step.duration_ms = Some(duration_ms);
        step.outputs = outputs;
        let step_id = step.id.clone();
        let message = format!("Step '{}' completed in {}ms", step.name, duration_ms);

        wf.completed_steps += 1;
        wf.success_count += 1;
        wf.current_step_index += 1;
        debug!(
            workflow_id = %wf.id,
            step = %step_id,
            progress = wf.progress(),
            "{}",
            message
        );
        self.append(
            record,
            ExecutionLogEntry::new(finished, LogAction::StepCompleted, Severity::Info, message)
                .for_step(&step_id),
        );
    }

    fn fail_step(
        &self,
        record: &mut WorkflowRecord,
        index: usize,
        error_message: String,
        finished: DateTime<Utc>,
    ) -> Flow {
        let wf = &mut record.workflow;
        let policy = wf.policy.clone();
        let step = &mut wf.steps[index];
        step.status = StepStatus::Failed;
        step.error_message = Some(error_message.clone());
        step.completed_at = Some(finished);
        step.duration_ms = Some(elapsed_ms(step.started_at, finished));
        let step_id = step.id.clone();
        let step_name = step.name.clone();
        let retries = step.retry_attempts;

        wf.failed_steps += 1;
        wf.failed_attempts += 1;
        wf.failure_count += 1;
        let message = format!(
            "Step '{}' failed on attempt {}: {}",
            step_name,
            retries + 1,
            error_message
        );
        error!(workflow_id = %wf.id, step = %step_id, "{}", message);
        self.append(
            record,
            ExecutionLogEntry::new(finished, LogAction::StepFailed, Severity::Error, message)
                .for_step(&step_id),
        );

        if policy.allow_retry && retries < policy.max_retry_attempts {
            let wf = &mut record.workflow;
            let step = &mut wf.steps[index];
            step.retry_attempts += 1;
            step.status = StepStatus::Pending;
            wf.failed_steps -= 1;
            let message = format!(
                "Retrying step '{}' ({} of {})",
                step_name, step.retry_attempts, policy.max_retry_attempts
            );
            warn!(workflow_id = %wf.id, step = %step_id, "{}", message);
            self.append(
                record,
                ExecutionLogEntry::new(finished, LogAction::StepRetry, Severity::Warning, message)
                    .for_step(&step_id),
            );
            return Flow::Continue;
        }

        if policy.continue_on_error {
            record.workflow.current_step_index += 1;
            let message = format!("Continuing past failed step '{}'", step_name);
            warn!(workflow_id = %record.workflow.id, step = %step_id, "{}", message);
            self.append(
                record,
                ExecutionLogEntry::new(
                    finished,
                    LogAction::StepContinued,
                    Severity::Warning,
                    message,
                )
                .for_step(&step_id),
            );
            return Flow::Continue;
        }

        let wf = &mut record.workflow;
        wf.set_status(WorkflowStatus::Failed, finished);
        wf.completed_at = Some(finished);
        wf.error_message = Some(error_message);
        let message = format!("Workflow '{}' failed at step '{}'", wf.name, step_name);
        error!(workflow_id = %wf.id, "{}", message);
        self.append(
            record,
            ExecutionLogEntry::new(finished, LogAction::WorkflowFailed, Severity::Error, message)
                .for_step(&step_id),
        );
        Flow::Halt
    }
}

/// Milliseconds from `started` to `finished`, never negative
fn elapsed_ms(started: Option<DateTime<Utc>>, finished: DateTime<Utc>) -> i64 {
    started
        .map(|s| finished.signed_duration_since(s).num_milliseconds().max(0))
        .unwrap_or(0)
}

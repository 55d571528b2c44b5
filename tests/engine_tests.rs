mod common;

use std::time::Duration;

use chrono::Utc;
use common::*;
use report_workflows::engine::{Clock, MockClock, Severity, TimeInState};
use report_workflows::prelude::*;
use serde_json::json;

#[tokio::test]
async fn test_create_initializes_draft() {
    let engine = WorkflowEngine::new();
    let wf = engine.create(steps("term-grades", 3)).await.unwrap();

    assert_eq!(wf.status, WorkflowStatus::Draft);
    assert_eq!(wf.total_steps, 3);
    assert_eq!(wf.current_step_index, 0);
    assert_eq!(wf.completed_steps + wf.failed_steps + wf.skipped_steps, 0);
    assert_eq!(wf.trigger_count, 0);
    assert!(wf.steps.iter().all(|s| s.status == StepStatus::Pending));

    let log = engine.execution_log(wf.id).await.unwrap();
    assert_eq!(log_actions(&log), vec![LogAction::WorkflowCreated]);
}

#[tokio::test]
async fn test_empty_workflow_completes_on_start() {
    let engine = WorkflowEngine::new();
    let wf = engine.create(steps("empty", 0)).await.unwrap();

    let wf = engine.start(wf.id).await.unwrap();

    assert_eq!(wf.status, WorkflowStatus::Completed);
    assert_eq!(wf.total_steps, 0);
    assert_eq!(wf.trigger_count, 1);
    assert!(wf.completed_at.is_some());
    assert_eq!(
        log_actions(&engine.execution_log(wf.id).await.unwrap()),
        vec![
            LogAction::WorkflowCreated,
            LogAction::WorkflowStarted,
            LogAction::WorkflowCompleted
        ]
    );
}

#[tokio::test]
async fn test_all_steps_complete() {
    let executor = ScriptedExecutor::new();
    let engine = engine_with(&executor);
    let wf = engine.create(steps("term-grades", 3)).await.unwrap();

    let wf = engine.start(wf.id).await.unwrap();

    assert_eq!(wf.status, WorkflowStatus::Completed);
    assert_eq!(wf.completed_steps, 3);
    assert_eq!(wf.current_step_index, 3);
    assert_eq!(wf.execution_count, 3);
    assert_eq!(wf.success_count, 3);
    assert_eq!(wf.progress(), 1.0);
    assert_eq!(wf.success_rate(), Some(1.0));
    assert_eq!(executor.calls(), vec!["step-1", "step-2", "step-3"]);

    for step in &wf.steps {
        assert_eq!(step.status, StepStatus::Completed);
        assert!(step.duration_ms.unwrap() >= 0);
        assert_eq!(step.outputs.get("step"), Some(&step.id));
    }
    assert_step_counts(&wf);
}

#[tokio::test]
async fn test_retry_exhaustion() {
    let executor = ScriptedExecutor::new().always_failing("step-1");
    let engine = engine_with(&executor);
    let wf = engine
        .create(steps("flaky", 1).with_retry(2).continue_on_error(false))
        .await
        .unwrap();

    let wf = engine.start(wf.id).await.unwrap();

    assert_eq!(wf.status, WorkflowStatus::Failed);
    assert_eq!(executor.calls_for("step-1"), 3);
    assert_eq!(wf.steps[0].retry_attempts, 2);
    assert_eq!(wf.steps[0].status, StepStatus::Failed);
    assert_eq!(wf.failed_steps, 1);
    assert_eq!(wf.failed_attempts, 3);
    assert_eq!(wf.failure_count, 3);
    assert_eq!(wf.execution_count, 3);
    assert_eq!(
        wf.error_message.as_deref(),
        Some("step-1 failed on attempt 3")
    );
    assert_step_counts(&wf);

    let log = engine.execution_log(wf.id).await.unwrap();
    let count = |action| log.iter().filter(|e| e.action == action).count();
    assert_eq!(count(LogAction::StepFailed), 3);
    assert_eq!(count(LogAction::StepRetry), 2);
    assert_eq!(count(LogAction::WorkflowFailed), 1);
    assert!(log
        .iter()
        .filter(|e| e.action == LogAction::StepFailed)
        .all(|e| e.severity == Severity::Error && e.step_id.as_deref() == Some("step-1")));
    assert!(log
        .iter()
        .filter(|e| e.action == LogAction::StepRetry)
        .all(|e| e.severity == Severity::Warning));
}

#[tokio::test]
async fn test_retry_then_success() {
    let executor = ScriptedExecutor::new().failing("step-2", 1);
    let engine = engine_with(&executor);
    let wf = engine
        .create(steps("flaky", 3).with_retry(3))
        .await
        .unwrap();

    let wf = engine.start(wf.id).await.unwrap();

    assert_eq!(wf.status, WorkflowStatus::Completed);
    assert_eq!(executor.calls(), vec!["step-1", "step-2", "step-2", "step-3"]);
    assert_eq!(wf.steps[1].retry_attempts, 1);
    assert_eq!(wf.steps[1].status, StepStatus::Completed);
    assert_eq!(wf.steps[1].error_message, None);
    assert_eq!(wf.completed_steps, 3);
    assert_eq!(wf.failed_steps, 0);
    assert_eq!(wf.failed_attempts, 1);
    assert_eq!(wf.execution_count, 4);
    assert_eq!(wf.success_rate(), Some(0.75));
}

#[tokio::test]
async fn test_continue_on_error_skips_forward() {
    let executor = ScriptedExecutor::new().always_failing("step-2");
    let engine = engine_with(&executor);
    let wf = engine
        .create(steps("lenient", 3).continue_on_error(true))
        .await
        .unwrap();

    let wf = engine.start(wf.id).await.unwrap();

    assert_eq!(wf.status, WorkflowStatus::Completed);
    assert_eq!(wf.completed_steps, 2);
    assert_eq!(wf.failed_steps, 1);
    assert_eq!(wf.skipped_steps, 0);
    assert_eq!(wf.current_step_index, 3);
    assert_eq!(executor.calls_for("step-2"), 1);
    let statuses: Vec<_> = wf.steps.iter().map(|s| s.status).collect();
    assert_eq!(
        statuses,
        vec![StepStatus::Completed, StepStatus::Failed, StepStatus::Completed]
    );

    let log = engine.execution_log(wf.id).await.unwrap();
    let continued: Vec<_> = log
        .iter()
        .filter(|e| e.action == LogAction::StepContinued)
        .collect();
    assert_eq!(continued.len(), 1);
    assert_eq!(continued[0].severity, Severity::Warning);
}

#[tokio::test]
async fn test_failure_stops_workflow() {
    let executor = ScriptedExecutor::new().always_failing("step-2");
    let engine = engine_with(&executor);
    let wf = engine.create(steps("strict", 3)).await.unwrap();

    let wf = engine.start(wf.id).await.unwrap();

    assert_eq!(wf.status, WorkflowStatus::Failed);
    assert_eq!(executor.calls(), vec!["step-1", "step-2"]);
    assert_eq!(wf.current_step_index, 1);
    assert_eq!(wf.steps[2].status, StepStatus::Pending);
    assert_eq!(wf.completed_steps, 1);
    assert_eq!(wf.failed_steps, 1);
    assert_step_counts(&wf);
}

#[tokio::test]
async fn test_condition_skip_never_invokes_action() {
    let executor = ScriptedExecutor::new();
    let engine = engine_with(&executor).with_conditions(DataFlag);
    let definition = WorkflowDefinition::new("conditional", "GRADE_REPORT", "rpt-1")
        .with_data("publish_enabled", json!(false))
        .with_data("notify_parents", json!(true))
        .with_step(StepDefinition::new("Validate", ActionType::Validate))
        .with_step(StepDefinition::new("Publish", ActionType::Publish).when("publish_enabled"))
        .with_step(StepDefinition::new("Notify", ActionType::Notify).when("notify_parents"));
    let wf = engine.create(definition).await.unwrap();

    let wf = engine.start(wf.id).await.unwrap();

    assert_eq!(wf.status, WorkflowStatus::Completed);
    assert_eq!(executor.calls(), vec!["step-1", "step-3"]);
    assert_eq!(wf.steps[1].status, StepStatus::Skipped);
    assert_eq!(wf.skipped_steps, 1);
    assert_eq!(wf.completed_steps, 2);
    assert_eq!(wf.execution_count, 2);
    assert_step_counts(&wf);

    let log = engine.execution_log(wf.id).await.unwrap();
    let skipped: Vec<_> = log
        .iter()
        .filter(|e| e.action == LogAction::StepSkipped)
        .collect();
    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0].step_id.as_deref(), Some("step-2"));
}

#[tokio::test]
async fn test_condition_sees_workflow_context() {
    let engine = WorkflowEngine::new().with_conditions(FnCondition(
        |condition: &str, ctx: &report_workflows::workflow::WorkflowContext<'_>| {
            condition == "term-1" && ctx.report_id == "rpt-1" && ctx.step.name == "Publish"
        },
    ));
    let definition = steps("ctx", 1)
        .with_step(StepDefinition::new("Publish", ActionType::Publish).when("term-1"))
        .with_step(StepDefinition::new("Notify", ActionType::Notify).when("term-2"));
    let wf = engine.create(definition).await.unwrap();

    let wf = engine.start(wf.id).await.unwrap();

    assert_eq!(wf.steps[1].status, StepStatus::Completed);
    assert_eq!(wf.steps[2].status, StepStatus::Skipped);
}

#[tokio::test]
async fn test_panicking_handler_fails_step() {
    let registry = ActionRegistry::with_defaults().with_handler(
        ActionType::ExecuteScript,
        FnHandler(|_: &StepInvocation| -> Result<ActionResult, ActionError> {
            panic!("interpreter crashed")
        }),
    );
    let engine = WorkflowEngine::new().with_executor(registry);
    let definition = WorkflowDefinition::new("script", "GRADE_REPORT", "rpt-1")
        .with_step(StepDefinition::new("Run script", ActionType::ExecuteScript));
    let wf = engine.create(definition).await.unwrap();

    let wf = engine.start(wf.id).await.unwrap();

    assert_eq!(wf.status, WorkflowStatus::Failed);
    assert!(wf.steps[0]
        .error_message
        .as_deref()
        .unwrap()
        .contains("interpreter crashed"));

    // The engine is still usable afterwards
    let next = engine.create(steps("after", 1)).await.unwrap();
    assert_eq!(
        engine.start(next.id).await.unwrap().status,
        WorkflowStatus::Completed
    );
}

#[tokio::test]
async fn test_simulated_integration_failure() {
    let engine = WorkflowEngine::new();
    let definition = WorkflowDefinition::new("mail", "GRADE_REPORT", "rpt-1").with_step(
        StepDefinition::new("Email parents", ActionType::SendEmail)
            .with_param("simulate_failure", json!(true))
            .with_param("failure_message", json!("SMTP relay refused")),
    );
    let wf = engine.create(definition).await.unwrap();

    let wf = engine.start(wf.id).await.unwrap();

    assert_eq!(wf.status, WorkflowStatus::Failed);
    assert_eq!(wf.error_message.as_deref(), Some("SMTP relay refused"));
}

#[tokio::test]
async fn test_terminal_states_are_final() {
    let executor = ScriptedExecutor::new().always_failing("step-2");
    let engine = engine_with(&executor);

    let completed = engine.create(steps("done", 1)).await.unwrap();
    let completed = engine.start(completed.id).await.unwrap();
    let failed = engine.create(steps("broken", 3)).await.unwrap();
    let failed = engine.start(failed.id).await.unwrap();
    let cancelled = engine.create(steps("dropped", 2)).await.unwrap();
    let cancelled = engine.cancel(cancelled.id).await.unwrap();

    for before in [completed, failed, cancelled] {
        let id = before.id;
        assert!(before.status.is_terminal());

        for result in [
            engine.start(id).await,
            engine.pause(id).await,
            engine.resume(id).await,
            engine.cancel(id).await,
            engine.add_approval(id, "head", true, None).await,
        ] {
            assert!(matches!(result, Err(EngineError::InvalidState { .. })));
        }

        let after = engine.get(id).await.unwrap();
        assert_eq!(after.status, before.status);
        assert_eq!(after.current_step_index, before.current_step_index);
        assert_eq!(after.completed_steps, before.completed_steps);
        assert_eq!(after.failed_steps, before.failed_steps);
        assert_eq!(after.skipped_steps, before.skipped_steps);
        assert_eq!(after.execution_count, before.execution_count);
        let statuses = |wf: &Workflow| wf.steps.iter().map(|s| s.status).collect::<Vec<_>>();
        assert_eq!(statuses(&after), statuses(&before));
    }
}

#[tokio::test]
async fn test_start_requires_enabled_draft() {
    let engine = WorkflowEngine::new();
    let disabled = engine.create(steps("off", 1).enabled(false)).await.unwrap();

    let err = engine.start(disabled.id).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidState { .. }));
    let wf = engine.get(disabled.id).await.unwrap();
    assert_eq!(wf.status, WorkflowStatus::Draft);
    assert_eq!(wf.trigger_count, 0);

    let wf = engine.create(steps("twice", 1)).await.unwrap();
    engine.start(wf.id).await.unwrap();
    assert!(matches!(
        engine.start(wf.id).await,
        Err(EngineError::InvalidState { .. })
    ));
}

#[tokio::test]
async fn test_auto_start() {
    let engine = WorkflowEngine::new();

    let wf = engine.create(steps("auto", 2).auto_start(true)).await.unwrap();
    assert_eq!(wf.status, WorkflowStatus::Completed);
    assert_eq!(wf.trigger_count, 1);

    let wf = engine
        .create(steps("auto-off", 2).auto_start(true).enabled(false))
        .await
        .unwrap();
    assert_eq!(wf.status, WorkflowStatus::Draft);
    let log = engine.execution_log(wf.id).await.unwrap();
    assert_eq!(
        log_actions(&log),
        vec![LogAction::WorkflowCreated, LogAction::AutoStartSkipped]
    );
    assert_eq!(log[1].severity, Severity::Warning);
}

#[tokio::test]
async fn test_pause_and_resume_at_gate() {
    let executor = ScriptedExecutor::new();
    let engine = engine_with(&executor);
    let wf = engine.create(gated("gated")).await.unwrap();
    let wf = engine.start(wf.id).await.unwrap();
    assert_eq!(wf.status, WorkflowStatus::AwaitingApproval);

    let wf = engine.pause(wf.id).await.unwrap();
    assert_eq!(wf.status, WorkflowStatus::Paused);
    assert_eq!(wf.current_step_index, 1);

    // Pausing twice is not meaningful
    assert!(matches!(
        engine.pause(wf.id).await,
        Err(EngineError::InvalidState { .. })
    ));

    // Resuming re-checks the gate
    let wf = engine.resume(wf.id).await.unwrap();
    assert_eq!(wf.status, WorkflowStatus::AwaitingApproval);

    // An approval while paused is recorded but does not run anything
    engine.pause(wf.id).await.unwrap();
    let wf = engine.add_approval(wf.id, "principal", true, None).await.unwrap();
    assert_eq!(wf.status, WorkflowStatus::Paused);
    assert_eq!(executor.calls(), vec!["step-1"]);

    let wf = engine.resume(wf.id).await.unwrap();
    assert_eq!(wf.status, WorkflowStatus::Completed);
    assert_eq!(executor.calls(), vec!["step-1", "step-2", "step-3"]);
}

#[tokio::test]
async fn test_resume_requires_paused() {
    let engine = WorkflowEngine::new();
    let wf = engine.create(steps("draft", 1)).await.unwrap();

    assert!(matches!(
        engine.resume(wf.id).await,
        Err(EngineError::InvalidState { .. })
    ));
    assert!(matches!(
        engine.pause(wf.id).await,
        Err(EngineError::InvalidState { .. })
    ));
}

#[tokio::test]
async fn test_cancel() {
    let engine = WorkflowEngine::new();
    let wf = engine.create(gated("gated")).await.unwrap();
    let wf = engine.start(wf.id).await.unwrap();

    let wf = engine.cancel(wf.id).await.unwrap();
    assert_eq!(wf.status, WorkflowStatus::Cancelled);
    assert!(wf.completed_at.is_some());
    assert!(matches!(
        engine.resume(wf.id).await,
        Err(EngineError::InvalidState { .. })
    ));

    let log = engine.execution_log(wf.id).await.unwrap();
    let last = log.last().unwrap();
    assert_eq!(last.action, LogAction::WorkflowCancelled);
    assert_eq!(last.severity, Severity::Warning);
}

#[tokio::test]
async fn test_escalate_is_metadata_only() {
    let clock = MockClock::at(Utc::now());
    let engine = WorkflowEngine::new()
        .with_clock(clock.clone())
        .with_escalation_policy(TimeInState {
            threshold: Duration::from_secs(3600),
        });
    let wf = engine.create(gated("gated")).await.unwrap();
    let wf = engine.start(wf.id).await.unwrap();

    clock.forward(Duration::from_secs(2 * 3600)).await;
    let needing: Vec<_> = engine
        .workflows_needing_escalation()
        .await
        .iter()
        .map(|w| w.id)
        .collect();
    assert_eq!(needing, vec![wf.id]);

    let escalated = engine.escalate(wf.id, "deputy-head").await.unwrap();
    assert_eq!(escalated.status, WorkflowStatus::AwaitingApproval);
    assert_eq!(escalated.current_step_index, wf.current_step_index);
    assert_eq!(escalated.escalated_to.as_deref(), Some("deputy-head"));
    assert_eq!(escalated.escalated_at, Some(clock.now().await));
    assert!(engine.workflows_needing_escalation().await.is_empty());

    let log = engine.execution_log(wf.id).await.unwrap();
    let last = log.last().unwrap();
    assert_eq!(last.action, LogAction::WorkflowEscalated);
    assert_eq!(last.severity, Severity::Warning);
}

#[tokio::test]
async fn test_unknown_ids() {
    let engine = WorkflowEngine::new();
    let id = WorkflowId(42);

    assert!(matches!(engine.get(id).await, Err(EngineError::NotFound(_))));
    assert!(matches!(engine.start(id).await, Err(EngineError::NotFound(_))));
    assert!(matches!(engine.pause(id).await, Err(EngineError::NotFound(_))));
    assert!(matches!(engine.resume(id).await, Err(EngineError::NotFound(_))));
    assert!(matches!(engine.cancel(id).await, Err(EngineError::NotFound(_))));
    assert!(matches!(
        engine.escalate(id, "registrar").await,
        Err(EngineError::NotFound(_))
    ));
    assert!(matches!(
        engine.add_approval(id, "head", true, None).await,
        Err(EngineError::NotFound(_))
    ));
    assert!(matches!(
        engine.execution_log(id).await,
        Err(EngineError::NotFound(_))
    ));
    assert!(!engine.delete(id).await);
}

#[tokio::test]
async fn test_delete_discards_workflow_and_log() {
    let engine = WorkflowEngine::new();
    let wf = engine.create(steps("temp", 1)).await.unwrap();

    assert!(engine.delete(wf.id).await);
    assert!(!engine.delete(wf.id).await);
    assert!(matches!(engine.get(wf.id).await, Err(EngineError::NotFound(_))));
    assert!(matches!(
        engine.execution_log(wf.id).await,
        Err(EngineError::NotFound(_))
    ));

    // Ids are never reused
    let next = engine.create(steps("next", 1)).await.unwrap();
    assert!(next.id > wf.id);
}

#[tokio::test]
async fn test_log_bounded_to_most_recent() {
    let engine = WorkflowEngine::new();
    let wf = engine.create(gated("chatty")).await.unwrap();

    // 1 creation entry + 1100 approval entries
    for i in 0..1100 {
        engine
            .add_approval(wf.id, format!("approver-{}", i), true, None)
            .await
            .unwrap();
    }

    let log = engine.execution_log(wf.id).await.unwrap();
    assert_eq!(log.len(), 1000);
    assert_eq!(log.first().unwrap().message, "Approval granted by approver-100");
    assert_eq!(log.last().unwrap().message, "Approval granted by approver-1099");
    let expected: Vec<String> = (100..1100)
        .map(|i| format!("Approval granted by approver-{}", i))
        .collect();
    let messages: Vec<String> = log.iter().map(|e| e.message.clone()).collect();
    assert_eq!(messages, expected);
    assert_eq!(engine.get(wf.id).await.unwrap().approvals.len(), 1100);
}

#[tokio::test]
async fn test_listing_queries() {
    let engine = WorkflowEngine::new();
    let a = engine
        .create(WorkflowDefinition::new("a", "GRADE_REPORT", "rpt-1"))
        .await
        .unwrap();
    let b = engine
        .create(WorkflowDefinition::new("b", "FEE_STATEMENT", "rpt-1"))
        .await
        .unwrap();
    let c = engine
        .create(WorkflowDefinition::new("c", "GRADE_REPORT", "rpt-2"))
        .await
        .unwrap();
    engine.start(c.id).await.unwrap();

    let ids = |wfs: Vec<Workflow>| wfs.iter().map(|w| w.id).collect::<Vec<_>>();
    assert_eq!(ids(engine.list_by_report("rpt-1").await), vec![a.id, b.id]);
    assert_eq!(ids(engine.list_by_type("GRADE_REPORT").await), vec![a.id, c.id]);
    assert_eq!(
        ids(engine.list_by_status(WorkflowStatus::Draft).await),
        vec![a.id, b.id]
    );
    assert_eq!(
        ids(engine.list_by_status(WorkflowStatus::Completed).await),
        vec![c.id]
    );
    assert!(engine.list_by_report("rpt-404").await.is_empty());
}

#[tokio::test]
async fn test_overdue_and_statistics() {
    let now = Utc::now();
    let clock = MockClock::at(now);
    let executor = ScriptedExecutor::new().always_failing("step-2");
    let engine = engine_with(&executor).with_clock(clock.clone());
    let due = now + chrono::Duration::hours(1);

    let waiting = engine.create(gated("waiting").with_due_at(due)).await.unwrap();
    engine.start(waiting.id).await.unwrap();
    let done = engine.create(steps("done", 1).with_due_at(due)).await.unwrap();
    engine.start(done.id).await.unwrap();
    let failed = engine.create(steps("failed", 2)).await.unwrap();
    engine.start(failed.id).await.unwrap();
    engine.create(steps("draft", 1)).await.unwrap();

    assert!(engine.overdue_workflows().await.is_empty());
    clock.forward(Duration::from_secs(2 * 3600)).await;
    let overdue: Vec<_> = engine
        .overdue_workflows()
        .await
        .iter()
        .map(|w| w.id)
        .collect();
    assert_eq!(overdue, vec![waiting.id]);

    let active: Vec<_> = engine
        .active_workflows()
        .await
        .iter()
        .map(|w| w.id)
        .collect();
    assert_eq!(active, vec![waiting.id]);

    let stats = engine.statistics().await;
    assert_eq!(stats.total, 4);
    assert_eq!(stats.active, 1);
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.overdue, 1);
    // waiting 1/1, done 1/1, failed 1/2
    assert!((stats.average_success_rate - (2.5 / 3.0)).abs() < 1e-9);
    assert_eq!(stats.by_type.get("GRADE_REPORT"), Some(&3));
    assert_eq!(stats.by_type.get("REPORT_PUBLICATION"), Some(&1));
}

#[tokio::test]
async fn test_event_stream_mirrors_log() {
    let engine = WorkflowEngine::new();
    let mut events = engine.subscribe();

    let wf = engine.create(steps("watched", 2)).await.unwrap();
    engine.start(wf.id).await.unwrap();

    let log = engine.execution_log(wf.id).await.unwrap();
    let mut received = Vec::new();
    while let Ok(event) = events.try_recv() {
        assert_eq!(event.workflow_id, wf.id);
        received.push(event.entry);
    }
    assert_eq!(received, log);
    assert_eq!(
        log_actions(&log),
        vec![
            LogAction::WorkflowCreated,
            LogAction::WorkflowStarted,
            LogAction::StepStarted,
            LogAction::StepCompleted,
            LogAction::StepStarted,
            LogAction::StepCompleted,
            LogAction::WorkflowCompleted,
        ]
    );
}

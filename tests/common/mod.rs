#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use report_workflows::prelude::*;
use tempfile::TempDir;

pub fn create_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp directory")
}

pub fn write_workflow(dir: &Path, filename: &str, content: &str) {
    fs::write(dir.join(filename), content).expect("Failed to write workflow file");
}

pub fn write_engine_config(dir: &Path, content: &str) {
    fs::write(dir.join("engine.yaml"), content).expect("Failed to write engine.yaml");
}

/// A definition with `n` VALIDATE steps, ids `step-1` .. `step-n`
pub fn steps(name: &str, n: usize) -> WorkflowDefinition {
    (1..=n).fold(
        WorkflowDefinition::new(name, "GRADE_REPORT", "rpt-1"),
        |def, i| def.with_step(StepDefinition::new(format!("Step {}", i), ActionType::Validate)),
    )
}

/// validate -> approve (gated) -> publish
pub fn gated(name: &str) -> WorkflowDefinition {
    WorkflowDefinition::new(name, "REPORT_PUBLICATION", "rpt-1")
        .with_step(StepDefinition::new("Validate", ActionType::Validate))
        .with_step(
            StepDefinition::new("Principal sign-off", ActionType::Approve).requiring_approval(),
        )
        .with_step(StepDefinition::new("Publish", ActionType::Publish))
}

/// Executor that records the step ids it runs and fails on demand
#[derive(Clone, Default)]
pub struct ScriptedExecutor {
    calls: Arc<Mutex<Vec<String>>>,
    failures: Arc<Mutex<HashMap<String, usize>>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the first `times` attempts of `step_id`
    pub fn failing(self, step_id: &str, times: usize) -> Self {
        self.failures
            .lock()
            .unwrap()
            .insert(step_id.to_string(), times);
        self
    }

    pub fn always_failing(self, step_id: &str) -> Self {
        self.failing(step_id, usize::MAX)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, step_id: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == step_id).count()
    }
}

#[async_trait]
impl StepActionExecutor for ScriptedExecutor {
    async fn execute(&self, step: &StepInvocation) -> Result<ActionResult, ActionError> {
        self.calls.lock().unwrap().push(step.step_id.clone());

        let mut failures = self.failures.lock().unwrap();
        if let Some(remaining) = failures.get_mut(&step.step_id) {
            if *remaining > 0 {
                *remaining -= 1;
                return Ok(ActionResult::failed(format!(
                    "{} failed on attempt {}",
                    step.step_id, step.attempt
                )));
            }
        }
        Ok(ActionResult::succeeded().with_output("step", step.step_id.clone()))
    }
}

pub fn engine_with(executor: &ScriptedExecutor) -> WorkflowEngine {
    WorkflowEngine::new().with_executor(executor.clone())
}

pub fn assert_step_counts(wf: &Workflow) {
    assert!(
        wf.step_counts_consistent(),
        "completed {} + failed {} + skipped {} > total {}",
        wf.completed_steps,
        wf.failed_steps,
        wf.skipped_steps,
        wf.total_steps
    );
}

pub fn log_actions(log: &[report_workflows::ExecutionLogEntry]) -> Vec<LogAction> {
    log.iter().map(|e| e.action).collect()
}

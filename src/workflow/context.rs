//! Condition context
//!
//! The read-only view of a workflow that condition evaluators receive when a
//! step's gating condition is checked.

use std::collections::HashMap;

use super::model::{Step, Workflow, WorkflowId};

#[derive(Debug, Clone, Copy)]
pub struct WorkflowContext<'a> {
    pub workflow_id: WorkflowId,
    pub workflow_type: &'a str,
    pub report_id: &'a str,

    /// Workflow data supplied at creation
    pub data: &'a HashMap<String, serde_json::Value>,

    /// The step whose condition is being evaluated
    pub step: &'a Step,
}

impl<'a> WorkflowContext<'a> {
    pub fn for_step(workflow: &'a Workflow, step: &'a Step) -> Self {
        Self {
            workflow_id: workflow.id,
            workflow_type: &workflow.workflow_type,
            report_id: &workflow.report_id,
            data: &workflow.data,
            step,
        }
    }

    /// Look up a workflow data value
    pub fn get(&self, key: &str) -> Option<&'a serde_json::Value> {
        self.data.get(key)
    }
}

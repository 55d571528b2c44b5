//! Aggregate statistics over all workflows

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::workflow::{Workflow, WorkflowStatus};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStatistics {
    pub total: usize,
    /// ACTIVE or AWAITING_APPROVAL
    pub active: usize,
    pub paused: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub overdue: usize,
    /// Mean success rate over workflows that invoked at least one action;
    /// 0.0 when none has
    pub average_success_rate: f64,
    /// Workflow count per type
    pub by_type: BTreeMap<String, usize>,
}

impl WorkflowStatistics {
    pub fn from_workflows(workflows: &[Workflow], now: DateTime<Utc>) -> Self {
        let mut stats = Self {
            total: workflows.len(),
            ..Self::default()
        };

        let mut rate_sum = 0.0;
        let mut rated = 0usize;

        for wf in workflows {
            match wf.status {
                WorkflowStatus::Active | WorkflowStatus::AwaitingApproval => stats.active += 1,
                WorkflowStatus::Paused => stats.paused += 1,
                WorkflowStatus::Completed => stats.completed += 1,
                WorkflowStatus::Failed => stats.failed += 1,
                WorkflowStatus::Cancelled => stats.cancelled += 1,
                WorkflowStatus::Draft => {}
            }
            if wf.is_overdue(now) {
                stats.overdue += 1;
            }
            if let Some(rate) = wf.success_rate() {
                rate_sum += rate;
                rated += 1;
            }
            *stats.by_type.entry(wf.workflow_type.clone()).or_insert(0) += 1;
        }

        if rated > 0 {
            stats.average_success_rate = rate_sum / rated as f64;
        }
        stats
    }
}

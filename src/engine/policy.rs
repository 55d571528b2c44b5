//! Approval and escalation policies
//!
//! Both are pluggable predicates over a workflow's state. The engine only
//! asks them yes/no questions; which approvals are required and when a
//! workflow needs escalating is decided here.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::workflow::{Approval, ApprovalConfig, ApprovalPolicyKind, Workflow};

/// Decides whether the approvals collected so far release an approval gate
pub trait ApprovalPolicy: Send + Sync {
    fn is_satisfied(&self, approvals: &[Approval]) -> bool;

    fn describe(&self) -> String;
}

/// Latest decision of each approver, in first-appearance order
pub fn latest_decisions(approvals: &[Approval]) -> Vec<&Approval> {
    let mut order: Vec<&str> = Vec::new();
    let mut latest: HashMap<&str, &Approval> = HashMap::new();

    for approval in approvals {
        let approver = approval.approver_id.as_str();
        if latest.insert(approver, approval).is_none() {
            order.push(approver);
        }
    }

    order.into_iter().filter_map(|a| latest.get(a).copied()).collect()
}

/// At least `required` distinct approvers currently approve.
///
/// Rejections neither count toward the requirement nor block it.
#[derive(Debug, Clone, Copy)]
pub struct MinimumApprovals {
    pub required: usize,
}

impl ApprovalPolicy for MinimumApprovals {
    fn is_satisfied(&self, approvals: &[Approval]) -> bool {
        let granted = latest_decisions(approvals)
            .iter()
            .filter(|a| a.approved)
            .count();
        granted >= self.required
    }

    fn describe(&self) -> String {
        format!("at least {} approval(s)", self.required)
    }
}

/// At least `required` distinct approvers approve and none currently rejects
#[derive(Debug, Clone, Copy)]
pub struct Unanimous {
    pub required: usize,
}

impl ApprovalPolicy for Unanimous {
    fn is_satisfied(&self, approvals: &[Approval]) -> bool {
        let decisions = latest_decisions(approvals);
        decisions.iter().all(|a| a.approved) && decisions.len() >= self.required.max(1)
    }

    fn describe(&self) -> String {
        format!("{} unanimous approval(s)", self.required.max(1))
    }
}

impl From<&ApprovalConfig> for Box<dyn ApprovalPolicy> {
    fn from(config: &ApprovalConfig) -> Self {
        match config.policy {
            ApprovalPolicyKind::Minimum => Box::new(MinimumApprovals {
                required: config.required,
            }),
            ApprovalPolicyKind::Unanimous => Box::new(Unanimous {
                required: config.required,
            }),
        }
    }
}

/// Decides whether a workflow needs attention from someone else
pub trait EscalationPolicy: Send + Sync {
    fn needs_escalation(&self, workflow: &Workflow, now: DateTime<Utc>) -> bool;
}

/// Escalate a non-terminal, not yet escalated workflow once it has spent
/// longer than `threshold` in its current status
#[derive(Debug, Clone, Copy)]
pub struct TimeInState {
    pub threshold: Duration,
}

impl EscalationPolicy for TimeInState {
    fn needs_escalation(&self, workflow: &Workflow, now: DateTime<Utc>) -> bool {
        if workflow.status.is_terminal() || workflow.is_escalated() {
            return false;
        }
        let threshold = match chrono::Duration::from_std(self.threshold) {
            Ok(t) => t,
            Err(_) => return false,
        };
        now.signed_duration_since(workflow.status_changed_at) > threshold
    }
}

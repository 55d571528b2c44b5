//! Execution log
//!
//! Append-only, size-bounded audit trail of lifecycle and step events for one
//! workflow. Once the log is full the oldest entry is evicted for every new
//! one, so it always holds the most recent `capacity` entries in order.

use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::workflow::config::DEFAULT_LOG_CAPACITY;

/// Symbolic event name of a log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogAction {
    WorkflowCreated,
    WorkflowStarted,
    WorkflowCompleted,
    WorkflowFailed,
    WorkflowPaused,
    WorkflowResumed,
    WorkflowCancelled,
    WorkflowEscalated,
    AutoStartSkipped,
    StepStarted,
    StepCompleted,
    StepSkipped,
    StepFailed,
    StepRetry,
    StepContinued,
    ApprovalRequired,
    ApprovalGranted,
    ApprovalRejected,
}

impl fmt::Display for LogAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Serialized form is the canonical name
        let name = serde_json::to_value(self)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        f.pad(&name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionLogEntry {
    pub log_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub step_id: Option<String>,
    pub action: LogAction,
    pub message: String,
    pub severity: Severity,
}

impl ExecutionLogEntry {
    pub fn new(
        timestamp: DateTime<Utc>,
        action: LogAction,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            log_id: Uuid::new_v4(),
            timestamp,
            step_id: None,
            action,
            message: message.into(),
            severity,
        }
    }

    pub fn for_step(mut self, step_id: impl Into<String>) -> Self {
        self.step_id = Some(step_id.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct ExecutionLog {
    entries: VecDeque<ExecutionLogEntry>,
    capacity: usize,
}

impl Default for ExecutionLog {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}

impl ExecutionLog {
    /// Create an empty log holding at most `capacity` entries (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity.min(DEFAULT_LOG_CAPACITY)),
            capacity,
        }
    }

    pub fn push(&mut self, entry: ExecutionLogEntry) {
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Entries, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &ExecutionLogEntry> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&ExecutionLogEntry> {
        self.entries.back()
    }

    pub fn count(&self, action: LogAction) -> usize {
        self.entries.iter().filter(|e| e.action == action).count()
    }

    pub fn to_vec(&self) -> Vec<ExecutionLogEntry> {
        self.entries.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(n: usize) -> ExecutionLogEntry {
        ExecutionLogEntry::new(
            Utc::now(),
            LogAction::StepStarted,
            Severity::Info,
            format!("event {}", n),
        )
    }

    #[test]
    fn test_log_bounding_keeps_most_recent() {
        let mut log = ExecutionLog::new(1000);
        for n in 0..1500 {
            log.push(entry(n));
        }

        assert_eq!(log.len(), 1000);
        let messages: Vec<_> = log.iter().map(|e| e.message.clone()).collect();
        let expected: Vec<_> = (500..1500).map(|n| format!("event {}", n)).collect();
        assert_eq!(messages, expected);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let mut log = ExecutionLog::new(0);
        log.push(entry(1));
        log.push(entry(2));

        assert_eq!(log.capacity(), 1);
        assert_eq!(log.latest().unwrap().message, "event 2");
    }

    #[test]
    fn test_entry_ids_unique_and_step_tagging() {
        let a = entry(1).for_step("step-1");
        let b = entry(1);

        assert_ne!(a.log_id, b.log_id);
        assert_eq!(a.step_id.as_deref(), Some("step-1"));
        assert_eq!(b.step_id, None);
    }

    #[test]
    fn test_action_names() {
        assert_eq!(LogAction::StepRetry.to_string(), "STEP_RETRY");
        assert_eq!(LogAction::WorkflowEscalated.to_string(), "WORKFLOW_ESCALATED");

        let mut log = ExecutionLog::default();
        log.push(entry(1));
        log.push(entry(2));
        assert_eq!(log.count(LogAction::StepStarted), 2);
        assert_eq!(log.count(LogAction::StepFailed), 0);
    }
}

//! Workflow store
//!
//! The authoritative in-memory table of workflow instances and their
//! execution logs. Each workflow sits behind its own mutex; the table lock
//! is only held to look up, insert, or remove an entry, so callers working
//! on different workflows never wait on each other.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::engine::execution_log::{ExecutionLog, ExecutionLogEntry};
use crate::workflow::config::DEFAULT_LOG_CAPACITY;
use crate::workflow::{Workflow, WorkflowId, WorkflowStatus};

/// A workflow together with its execution log
#[derive(Debug)]
pub struct WorkflowRecord {
    pub workflow: Workflow,
    pub log: ExecutionLog,
    /// Bumped whenever a run (start, resume) begins; a step loop stops as
    /// soon as it no longer owns the current generation
    pub(crate) generation: u64,
}

impl WorkflowRecord {
    pub fn new(workflow: Workflow, log_capacity: usize) -> Self {
        Self {
            workflow,
            log: ExecutionLog::new(log_capacity),
            generation: 0,
        }
    }

    pub(crate) fn begin_run(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }
}

pub type RecordHandle = Arc<Mutex<WorkflowRecord>>;

#[derive(Debug)]
pub struct WorkflowStore {
    next_id: AtomicU64,
    records: RwLock<HashMap<WorkflowId, RecordHandle>>,
    log_capacity: usize,
}

impl Default for WorkflowStore {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}

impl WorkflowStore {
    /// Create an empty store whose workflow logs hold `log_capacity` entries
    pub fn new(log_capacity: usize) -> Self {
        Self {
            next_id: AtomicU64::new(1),
            records: RwLock::new(HashMap::new()),
            log_capacity,
        }
    }

    pub fn log_capacity(&self) -> usize {
        self.log_capacity
    }

    /// Allocate the next identity. Ids start at 1 and are never reused.
    pub fn allocate_id(&self) -> WorkflowId {
        WorkflowId(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    pub(crate) async fn insert(&self, id: WorkflowId, handle: RecordHandle) {
        self.records.write().await.insert(id, handle);
    }

    pub(crate) async fn handle(&self, id: WorkflowId) -> Option<RecordHandle> {
        self.records.read().await.get(&id).cloned()
    }

    /// Remove a workflow and its log; returns false if it did not exist
    pub async fn delete(&self, id: WorkflowId) -> bool {
        self.records.write().await.remove(&id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Snapshot of one workflow
    pub async fn get(&self, id: WorkflowId) -> Option<Workflow> {
        let handle = self.handle(id).await?;
        let record = handle.lock().await;
        Some(record.workflow.clone())
    }

    /// Snapshot of one workflow's execution log, oldest entry first
    pub async fn execution_log(&self, id: WorkflowId) -> Option<Vec<ExecutionLogEntry>> {
        let handle = self.handle(id).await?;
        let record = handle.lock().await;
        Some(record.log.to_vec())
    }

    /// Snapshots of every workflow, ordered by id
    pub async fn all(&self) -> Vec<Workflow> {
        self.filter(|_| true).await
    }

    /// Snapshots of the workflows matching `predicate`, ordered by id
    pub async fn filter<F>(&self, predicate: F) -> Vec<Workflow>
    where
        F: Fn(&Workflow) -> bool,
    {
        let mut handles: Vec<(WorkflowId, RecordHandle)> = self
            .records
            .read()
            .await
            .iter()
            .map(|(id, h)| (*id, h.clone()))
            .collect();
        handles.sort_by_key(|(id, _)| *id);

        let mut matching = Vec::new();
        for (_, handle) in handles {
            let record = handle.lock().await;
            if predicate(&record.workflow) {
                matching.push(record.workflow.clone());
            }
        }
        matching
    }

    pub async fn list_by_report(&self, report_id: &str) -> Vec<Workflow> {
        self.filter(|wf| wf.report_id == report_id).await
    }

    pub async fn list_by_status(&self, status: WorkflowStatus) -> Vec<Workflow> {
        self.filter(|wf| wf.status == status).await
    }

    pub async fn list_by_type(&self, workflow_type: &str) -> Vec<Workflow> {
        self.filter(|wf| wf.workflow_type == workflow_type).await
    }
}

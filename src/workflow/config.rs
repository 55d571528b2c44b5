//! Engine configuration
//!
//! Engine-wide settings loaded from `engine.yaml`. Every field is optional:
//!
//! ```yaml
//! log_capacity: 1000
//!
//! approval:
//!   policy: minimum   # or: unanimous
//!   required: 2
//!
//! escalation:
//!   after: 48h
//!
//! defaults:
//!   allow_retry: true
//!   max_retry_attempts: 2
//!   continue_on_error: false
//! ```
//!
//! Per-workflow policy still comes from each definition; `defaults` only
//! fills the fields a definition leaves out.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::model::WorkflowPolicy;
use crate::engine::clock::{parse_duration, ClockError};

/// Default bound of each workflow's execution log
pub const DEFAULT_LOG_CAPACITY: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalPolicyKind {
    /// At least `required` approvers currently approve
    #[default]
    Minimum,
    /// At least `required` approvers approve and nobody currently rejects
    Unanimous,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApprovalConfig {
    pub policy: ApprovalPolicyKind,
    pub required: usize,
}

impl Default for ApprovalConfig {
    fn default() -> Self {
        Self {
            policy: ApprovalPolicyKind::Minimum,
            required: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EscalationConfig {
    /// Time a workflow may stay in one non-terminal state, e.g. "48h", "1h30m"
    pub after: String,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            after: "48h".to_string(),
        }
    }
}

impl EscalationConfig {
    pub fn threshold(&self) -> Result<Duration, ClockError> {
        parse_duration(&self.after)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub log_capacity: usize,
    pub approval: ApprovalConfig,
    pub escalation: EscalationConfig,
    pub defaults: WorkflowPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            log_capacity: DEFAULT_LOG_CAPACITY,
            approval: ApprovalConfig::default(),
            escalation: EscalationConfig::default(),
            defaults: WorkflowPolicy::default(),
        }
    }
}

impl EngineConfig {
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self, crate::workflow::LoadError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config: EngineConfig =
            serde_yaml::from_str(&content).map_err(|e| crate::workflow::LoadError::Yaml {
                file: path.display().to_string(),
                error: e,
            })?;
        Ok(config)
    }
}

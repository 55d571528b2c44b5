//! Action types
//!
//! This module handles naming and categorizing the `action` field of workflow steps.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kinds of actions a step can perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    // Review actions (acknowledged by the engine)
    Approve,
    Review,
    Publish,
    Distribute,
    Notify,
    Validate,

    // Integration actions (may fail)
    ExecuteScript,
    CallApi,
    SendEmail,
}

impl ActionType {
    pub const ALL: [ActionType; 9] = [
        ActionType::Approve,
        ActionType::Review,
        ActionType::Publish,
        ActionType::Distribute,
        ActionType::Notify,
        ActionType::Validate,
        ActionType::ExecuteScript,
        ActionType::CallApi,
        ActionType::SendEmail,
    ];

    /// Returns true if the default handler for this action always succeeds
    pub fn is_acknowledged(&self) -> bool {
        matches!(
            self,
            ActionType::Approve
                | ActionType::Review
                | ActionType::Publish
                | ActionType::Distribute
                | ActionType::Notify
                | ActionType::Validate
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Approve => "APPROVE",
            ActionType::Review => "REVIEW",
            ActionType::Publish => "PUBLISH",
            ActionType::Distribute => "DISTRIBUTE",
            ActionType::Notify => "NOTIFY",
            ActionType::Validate => "VALIDATE",
            ActionType::ExecuteScript => "EXECUTE_SCRIPT",
            ActionType::CallApi => "CALL_API",
            ActionType::SendEmail => "SEND_EMAIL",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//! Action result types

use std::collections::HashMap;

/// Outcome of one action invocation
#[derive(Debug, Clone, PartialEq)]
pub struct ActionResult {
    pub success: bool,
    pub outputs: HashMap<String, String>,
    pub error: Option<String>,
}

impl Default for ActionResult {
    fn default() -> Self {
        Self {
            success: true,
            outputs: HashMap::new(),
            error: None,
        }
    }
}

impl ActionResult {
    pub fn succeeded() -> Self {
        Self::default()
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            outputs: HashMap::new(),
            error: Some(message.into()),
        }
    }

    pub fn with_output(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.outputs.insert(key.into(), value.into());
        self
    }
}

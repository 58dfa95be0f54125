// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The outcome of a single tool execution.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::Value;

#[derive(Debug, Clone)]
pub struct ToolResult {
    pub success: bool,
    pub output: Option<String>,
    pub error: Option<String>,
    pub execution_time: Duration,
    pub metadata: HashMap<String, Value>,
}

impl ToolResult {
    pub fn success(output: impl Into<String>, execution_time: Duration) -> Self {
        Self {
            success: true,
            output: Some(output.into()),
            error: None,
            execution_time,
            metadata: HashMap::new(),
        }
    }

    pub fn failure(error: impl Into<String>, execution_time: Duration) -> Self {
        Self {
            success: false,
            output: None,
            error: Some(error.into()),
            execution_time,
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

#[cfg(test)]
#[path = "result_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-call metadata and constraints passed to a [`crate::runtime::ToolRuntime`].

use std::collections::HashMap;
use std::time::Duration;

use archiflow_core::SessionId;
use serde_json::Value;

/// Execution constraints and metadata for a single tool call.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub session_id: SessionId,
    pub timeout: Duration,
    pub max_memory_mb: u64,
    pub max_cpu_percent: u8,
    pub allowed_network: bool,
    /// Set by the runtime to the session's workspace; not a caller-supplied
    /// path parameter.
    pub working_directory: Option<String>,
    pub environment: HashMap<String, String>,
    pub metadata: HashMap<String, Value>,
}

impl ExecutionContext {
    pub fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            timeout: Duration::from_secs(30),
            max_memory_mb: 512,
            max_cpu_percent: 80,
            allowed_network: false,
            working_directory: None,
            environment: HashMap::new(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_network(mut self, allowed: bool) -> Self {
        self.allowed_network = allowed;
        self
    }

    pub fn with_working_directory(mut self, working_directory: impl Into<String>) -> Self {
        self.working_directory = Some(working_directory.into());
        self
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Which runtime handles which tool, and the resource/permission defaults
//! each execution gets unless a tool-specific [`ToolPolicy`] overrides them.

use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct SecurityPolicy {
    pub default_runtime: String,
    pub tool_runtime_map: HashMap<String, String>,
    pub max_execution_time: Duration,
    pub max_memory_mb: u64,
    pub max_cpu_percent: u8,
    pub allow_network: bool,
    pub allow_filesystem_write: bool,
    pub allowed_paths: Vec<String>,
    pub blocked_commands: Vec<String>,
    pub tool_specific_policies: HashMap<String, ToolPolicy>,
}

impl Default for SecurityPolicy {
    fn default() -> Self {
        Self {
            default_runtime: "local".to_string(),
            tool_runtime_map: HashMap::new(),
            max_execution_time: Duration::from_secs(60),
            max_memory_mb: 1024,
            max_cpu_percent: 80,
            allow_network: false,
            allow_filesystem_write: true,
            allowed_paths: Vec::new(),
            blocked_commands: Vec::new(),
            tool_specific_policies: HashMap::new(),
        }
    }
}

impl SecurityPolicy {
    pub fn runtime_for_tool(&self, tool_name: &str) -> &str {
        self.tool_runtime_map.get(tool_name).map(String::as_str).unwrap_or(&self.default_runtime)
    }

    pub fn is_tool_allowed(&self, tool_name: &str) -> bool {
        !self.blocked_commands.iter().any(|c| c == tool_name)
    }

    pub fn tool_policy(&self, tool_name: &str) -> Option<&ToolPolicy> {
        self.tool_specific_policies.get(tool_name)
    }
}

/// Per-tool overrides of a subset of [`SecurityPolicy`]'s fields.
#[derive(Debug, Clone, Default)]
pub struct ToolPolicy {
    pub runtime: Option<String>,
    pub max_execution_time: Option<Duration>,
    pub max_memory_mb: Option<u64>,
    pub allow_network: Option<bool>,
    pub allowed_paths: Option<Vec<String>>,
}

#[cfg(test)]
#[path = "security_tests.rs"]
mod tests;

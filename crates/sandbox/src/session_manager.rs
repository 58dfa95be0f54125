// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-session runtime routing: file tools go to a session-owned
//! [`SandboxRuntime`], everything else is delegated to the shared
//! [`RuntimeManager`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;

use crate::audit::AuditTrail;
use crate::context::ExecutionContext;
use crate::error::SandboxError;
use crate::manager::RuntimeManager;
use crate::quota::StorageQuota;
use crate::result::ToolResult;
use crate::runtime::ToolRuntime;
use crate::sandbox_runtime::{SandboxConfig, SandboxMode, SandboxRuntime};

/// File tools that always route to the sandbox. `bash` is deliberately
/// excluded: it has its own command validation and doesn't carry path
/// parameters the same way.
const SANDBOX_TOOLS: &[&str] = &["read", "write", "edit", "multi_edit", "glob", "grep", "list"];

pub struct SessionRuntimeManager {
    session_id: String,
    workspace_path: PathBuf,
    global_manager: Arc<RuntimeManager>,
    sandbox_runtime: SandboxRuntime,
}

impl SessionRuntimeManager {
    pub fn new(
        session_id: String,
        workspace_path: PathBuf,
        global_manager: Arc<RuntimeManager>,
        storage_quota: Option<Arc<dyn StorageQuota>>,
        audit_trail: Option<Arc<AuditTrail>>,
        sandbox_mode: SandboxMode,
    ) -> Result<Self, SandboxError> {
        let config = SandboxConfig::new(workspace_path.clone()).with_mode(sandbox_mode);
        let sandbox_runtime = SandboxRuntime::new(config, storage_quota, audit_trail)?;

        tracing::info!(
            session_id = %session_id,
            workspace = %workspace_path.display(),
            mode = ?sandbox_mode,
            "session runtime manager created"
        );

        Ok(Self {
            session_id,
            workspace_path,
            global_manager,
            sandbox_runtime,
        })
    }

    fn should_use_sandbox(&self, tool_name: &str) -> bool {
        let lower = tool_name.to_lowercase();
        if SANDBOX_TOOLS.contains(&lower.as_str()) {
            return true;
        }
        self.global_manager.security_policy().runtime_for_tool(tool_name) == "sandbox"
    }

    pub async fn execute_tool(
        &self,
        tool_name: &str,
        params: HashMap<String, Value>,
        context: &ExecutionContext,
    ) -> Result<ToolResult, SandboxError> {
        let use_sandbox = self.should_use_sandbox(tool_name);
        let mut context = context.clone();
        context.working_directory = Some(self.workspace_path.display().to_string());

        tracing::debug!(
            session_id = %self.session_id,
            tool_name,
            runtime = if use_sandbox { "sandbox" } else { "global" },
            "routing tool execution"
        );

        if use_sandbox {
            self.sandbox_runtime.execute(tool_name, params, &context).await
        } else {
            self.global_manager.execute_tool(tool_name, params, &context).await
        }
    }

    pub fn sandbox_runtime(&self) -> &SandboxRuntime {
        &self.sandbox_runtime
    }

    pub fn workspace_path(&self) -> &Path {
        &self.workspace_path
    }

    pub async fn health_check(&self) -> HashMap<String, bool> {
        let mut health = self.global_manager.health_check_all().await;
        health.insert("sandbox".to_string(), self.sandbox_runtime.health_check().await);
        health
    }

    pub async fn cleanup(&self) {
        self.sandbox_runtime.cleanup().await;
        tracing::info!(session_id = %self.session_id, "session runtime manager cleaned up");
    }
}

#[cfg(test)]
#[path = "session_manager_tests.rs"]
mod tests;

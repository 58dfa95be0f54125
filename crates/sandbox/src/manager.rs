// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coordinates multiple [`ToolRuntime`] implementations and picks the right
//! one for each tool call based on a [`SecurityPolicy`].

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use crate::audit::AuditTrail;
use crate::context::ExecutionContext;
use crate::error::SandboxError;
use crate::quota::StorageQuota;
use crate::result::ToolResult;
use crate::runtime::ToolRuntime;
use crate::security::SecurityPolicy;
use crate::session_manager::SessionRuntimeManager;

#[derive(Debug, Clone)]
pub struct RuntimeStats {
    pub total_runtimes: usize,
    pub registered_runtimes: Vec<String>,
    pub default_runtime: String,
    pub last_runtime_used: Option<String>,
}

/// Registry of runtime implementations keyed by name (`"local"`, `"sandbox"`,
/// `"container"`, ...), dispatching each tool call through the configured
/// [`SecurityPolicy`].
pub struct RuntimeManager {
    runtimes: Mutex<HashMap<String, Arc<dyn ToolRuntime>>>,
    security_policy: SecurityPolicy,
    last_runtime_used: Mutex<Option<String>>,
}

impl RuntimeManager {
    pub fn new(security_policy: SecurityPolicy) -> Self {
        tracing::info!(default_runtime = %security_policy.default_runtime, "runtime manager initialized");
        Self {
            runtimes: Mutex::new(HashMap::new()),
            security_policy,
            last_runtime_used: Mutex::new(None),
        }
    }

    pub fn security_policy(&self) -> &SecurityPolicy {
        &self.security_policy
    }

    pub fn register_runtime(&self, name: impl Into<String>, runtime: Arc<dyn ToolRuntime>) {
        let name = name.into();
        tracing::info!(runtime = %name, "registered runtime");
        self.runtimes.lock().insert(name, runtime);
    }

    pub fn unregister_runtime(&self, name: &str) {
        if self.runtimes.lock().remove(name).is_some() {
            tracing::info!(runtime = %name, "unregistered runtime");
        }
    }

    pub fn get_runtime(&self, tool_name: &str) -> Result<Arc<dyn ToolRuntime>, SandboxError> {
        if !self.security_policy.is_tool_allowed(tool_name) {
            return Err(SandboxError::blocked_tool(tool_name));
        }

        let runtime_name = self.security_policy.runtime_for_tool(tool_name);
        self.runtimes
            .lock()
            .get(runtime_name)
            .cloned()
            .ok_or_else(|| SandboxError::RuntimeNotFound(runtime_name.to_string()))
    }

    /// Applies any tool-specific policy overrides to a copy of `context`.
    fn apply_tool_policy(&self, tool_name: &str, context: &ExecutionContext) -> ExecutionContext {
        let Some(policy) = self.security_policy.tool_policy(tool_name) else {
            return context.clone();
        };

        let mut modified = context.clone();
        if let Some(timeout) = policy.max_execution_time {
            modified.timeout = timeout;
        }
        if let Some(max_memory_mb) = policy.max_memory_mb {
            modified.max_memory_mb = max_memory_mb;
        }
        if let Some(allow_network) = policy.allow_network {
            modified.allowed_network = allow_network;
        }
        modified
    }

    pub async fn execute_tool(
        &self,
        tool_name: &str,
        params: HashMap<String, Value>,
        context: &ExecutionContext,
    ) -> Result<ToolResult, SandboxError> {
        let runtime = self.get_runtime(tool_name)?;
        let runtime_name = self.security_policy.runtime_for_tool(tool_name).to_string();
        *self.last_runtime_used.lock() = Some(runtime_name.clone());

        tracing::info!(tool_name, runtime = %runtime_name, "executing tool");

        let context = self.apply_tool_policy(tool_name, context);
        let result = runtime.execute(tool_name, params, &context).await?;

        tracing::info!(
            tool_name,
            runtime = %runtime_name,
            success = result.success,
            elapsed = ?result.execution_time,
            "tool execution finished"
        );

        Ok(result.with_metadata("runtime", Value::from(runtime_name)))
    }

    pub async fn health_check_all(&self) -> HashMap<String, bool> {
        let runtimes: Vec<(String, Arc<dyn ToolRuntime>)> =
            self.runtimes.lock().iter().map(|(k, v)| (k.clone(), v.clone())).collect();

        let mut status = HashMap::new();
        for (name, runtime) in runtimes {
            status.insert(name, runtime.health_check().await);
        }
        status
    }

    pub async fn cleanup_all(&self) {
        let runtimes: Vec<(String, Arc<dyn ToolRuntime>)> =
            self.runtimes.lock().iter().map(|(k, v)| (k.clone(), v.clone())).collect();

        for (name, runtime) in runtimes {
            runtime.cleanup().await;
            tracing::info!(runtime = %name, "cleaned up runtime");
        }
    }

    pub fn get_runtime_stats(&self) -> RuntimeStats {
        let runtimes = self.runtimes.lock();
        RuntimeStats {
            total_runtimes: runtimes.len(),
            registered_runtimes: runtimes.keys().cloned().collect(),
            default_runtime: self.security_policy.default_runtime.clone(),
            last_runtime_used: self.last_runtime_used.lock().clone(),
        }
    }

    /// Builds a session-scoped manager with its own workspace-bound sandbox
    /// runtime, delegating everything else back to `self`.
    pub fn create_session_manager(
        self: &Arc<Self>,
        session_id: impl Into<String>,
        workspace_path: PathBuf,
        storage_quota: Option<Arc<dyn StorageQuota>>,
        audit_trail: Option<Arc<AuditTrail>>,
        sandbox_mode: crate::sandbox_runtime::SandboxMode,
    ) -> Result<SessionRuntimeManager, SandboxError> {
        SessionRuntimeManager::new(session_id.into(), workspace_path, self.clone(), storage_quota, audit_trail, sandbox_mode)
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;

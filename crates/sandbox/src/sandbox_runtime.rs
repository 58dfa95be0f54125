// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wraps [`LocalRuntime`] with path validation, command filtering, storage
//! quotas, and audit logging. The only runtime a [`crate::manager::RuntimeManager`]
//! should point file and bash tools at.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::audit::{sanitize_params, AuditEntry, AuditTrail};
use crate::classify::{estimate_write_size, is_bash_tool, is_file_tool, is_path_param, is_write_operation};
use crate::command_validator::CommandValidator;
use crate::context::ExecutionContext;
use crate::error::SandboxError;
use crate::local::LocalRuntime;
use crate::path_validator::{PathValidator, ValidationMode};
use crate::quota::StorageQuota;
use crate::result::ToolResult;
use crate::runtime::ToolRuntime;

/// Identical to [`ValidationMode`], kept as an alias so call sites read
/// naturally against sandbox configuration rather than path validation
/// specifically.
pub type SandboxMode = ValidationMode;

/// `allowed_extensions` and `max_file_size_mb` are accepted and stored but
/// not enforced; no code path checks either field against a real operation.
#[derive(Clone)]
pub struct SandboxConfig {
    pub workspace_path: PathBuf,
    pub mode: SandboxMode,
    pub allowed_extensions: Option<Vec<String>>,
    pub max_file_size_mb: Option<u64>,
    pub allowed_commands: Option<std::collections::HashSet<String>>,
    pub blocked_patterns: Option<std::collections::HashSet<String>>,
}

impl SandboxConfig {
    pub fn new(workspace_path: impl Into<PathBuf>) -> Self {
        Self {
            workspace_path: workspace_path.into(),
            mode: SandboxMode::Strict,
            allowed_extensions: None,
            max_file_size_mb: None,
            allowed_commands: None,
            blocked_patterns: None,
        }
    }

    pub fn with_mode(mut self, mode: SandboxMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_allowed_commands(mut self, commands: std::collections::HashSet<String>) -> Self {
        self.allowed_commands = Some(commands);
        self
    }

    pub fn with_blocked_patterns(mut self, patterns: std::collections::HashSet<String>) -> Self {
        self.blocked_patterns = Some(patterns);
        self
    }
}

/// Sandboxed tool runtime: validates, delegates to [`LocalRuntime`], then
/// updates quota and audit state. Composition over inheritance, matching the
/// source's own comment about wrapping rather than subclassing the local
/// runtime.
pub struct SandboxRuntime {
    config: SandboxConfig,
    storage_quota: Option<Arc<dyn StorageQuota>>,
    audit_trail: Option<Arc<AuditTrail>>,
    local_runtime: LocalRuntime,
    path_validator: PathValidator,
    command_validator: CommandValidator,
}

impl SandboxRuntime {
    pub fn new(
        config: SandboxConfig,
        storage_quota: Option<Arc<dyn StorageQuota>>,
        audit_trail: Option<Arc<AuditTrail>>,
    ) -> Result<Self, SandboxError> {
        let path_validator = PathValidator::new(config.workspace_path.clone(), config.mode)?;
        let command_validator =
            CommandValidator::new(config.mode, config.allowed_commands.clone(), config.blocked_patterns.clone());

        tracing::info!(
            workspace = %config.workspace_path.display(),
            mode = ?config.mode,
            "sandbox runtime initialized"
        );

        Ok(Self {
            config,
            storage_quota,
            audit_trail,
            local_runtime: LocalRuntime::new(),
            path_validator,
            command_validator,
        })
    }

    pub fn get_workspace_path(&self) -> &std::path::Path {
        &self.config.workspace_path
    }

    /// Phase 1: path validation (rewriting to workspace-relative form),
    /// command validation, and a pre-execution quota check.
    async fn validate_execution(
        &self,
        tool_name: &str,
        params: HashMap<String, Value>,
        session_id: &str,
    ) -> Result<HashMap<String, Value>, SandboxError> {
        let mut validated = params.clone();

        if is_file_tool(tool_name) {
            for (param_name, value) in &params {
                if is_path_param(param_name) {
                    if let Some(requested) = value.as_str() {
                        let resolved = self.path_validator.validate(requested)?;
                        let relative = self.path_validator.make_relative(&resolved)?;
                        validated.insert(param_name.clone(), Value::from(relative.to_string_lossy().into_owned()));
                    }
                }
            }
        }

        if is_bash_tool(tool_name) {
            if let Some(command) = params.get("command").and_then(Value::as_str) {
                if !command.is_empty() {
                    self.command_validator.validate(command)?;
                }
            }
        }

        if let Some(quota) = &self.storage_quota {
            if is_write_operation(tool_name, &params) {
                let estimated = estimate_write_size(tool_name, &params);
                if estimated > 0 {
                    let allowed = quota.check_quota(session_id, &self.config.workspace_path, estimated).await;
                    if !allowed {
                        let current = quota.get_usage(&self.config.workspace_path);
                        let limit = quota.get_limit();
                        return Err(SandboxError::ResourceLimit {
                            resource_type: "storage".to_string(),
                            limit,
                            actual: current + estimated,
                        });
                    }
                }
            }
        }

        Ok(validated)
    }

    async fn audit(
        &self,
        session_id: &str,
        tool_name: &str,
        params: &HashMap<String, Value>,
        success: bool,
        error: Option<String>,
        duration_ms: f64,
    ) {
        let Some(trail) = &self.audit_trail else {
            return;
        };
        trail.record(AuditEntry {
            session_id: Some(archiflow_core::SessionId::new(session_id)),
            tool_name: tool_name.to_string(),
            params: sanitize_params(params),
            success,
            error,
            workspace: self.config.workspace_path.display().to_string(),
            mode: format!("{:?}", self.config.mode).to_lowercase(),
            duration_ms,
            epoch_ms: 0,
        });
    }
}

#[async_trait]
impl ToolRuntime for SandboxRuntime {
    async fn execute(
        &self,
        tool_name: &str,
        params: HashMap<String, Value>,
        context: &ExecutionContext,
    ) -> Result<ToolResult, SandboxError> {
        let session_id = context.session_id.as_str().to_string();
        let started_at = std::time::Instant::now();

        let validated = match self.validate_execution(tool_name, params.clone(), &session_id).await {
            Ok(validated) => validated,
            Err(err) => {
                let security_err = err.as_security_violation().unwrap_or(err);
                let duration_ms = started_at.elapsed().as_secs_f64() * 1000.0;
                self.audit(&session_id, tool_name, &params, false, Some(security_err.to_string()), duration_ms).await;
                return Err(security_err);
            }
        };

        let is_write = is_write_operation(tool_name, &validated);
        let estimated_size = if is_write { estimate_write_size(tool_name, &validated) } else { 0 };

        let result = self.local_runtime.execute(tool_name, validated.clone(), context).await?;

        if result.success && is_write && estimated_size > 0 {
            if let Some(quota) = &self.storage_quota {
                quota.reserve_space(&session_id, &self.config.workspace_path, estimated_size).await;
            }
        }

        let duration_ms = result.execution_time.as_secs_f64() * 1000.0;
        self.audit(&session_id, tool_name, &validated, result.success, result.error.clone(), duration_ms).await;

        Ok(result)
    }

    async fn health_check(&self) -> bool {
        self.local_runtime.health_check().await
    }

    async fn cleanup(&self) {
        self.local_runtime.cleanup().await;
        tracing::info!(workspace = %self.config.workspace_path.display(), "sandbox runtime cleaned up");
    }
}

#[cfg(test)]
#[path = "sandbox_runtime_tests.rs"]
mod tests;

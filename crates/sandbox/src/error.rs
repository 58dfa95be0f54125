// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy for path/command validation, storage quotas, and tool
//! execution runtimes.

use std::time::Duration;

use thiserror::Error;

/// The three ways a [`crate::security::SecurityPolicy`] can refuse a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityViolationKind {
    PathViolation,
    CommandViolation,
    BlockedTool,
}

impl std::fmt::Display for SecurityViolationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::PathViolation => "path_violation",
            Self::CommandViolation => "command_violation",
            Self::BlockedTool => "blocked_tool",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Error)]
pub enum SandboxError {
    /// Raised at the tool-execution boundary once a lower-level validation
    /// error (path, command) or policy lookup has been classified.
    #[error("security violation ({kind}): {message}")]
    SecurityViolation { kind: SecurityViolationKind, message: String },

    #[error("resource limit exceeded for {resource_type}: requested {actual}, limit {limit}")]
    ResourceLimit {
        resource_type: String,
        limit: u64,
        actual: u64,
    },

    #[error("tool execution timed out after {timeout:?}")]
    RuntimeTimeout { timeout: Duration },

    #[error("path validation failed: '{requested}' -> '{resolved}'")]
    PathValidation { requested: String, resolved: String },

    #[error("command validation failed: '{command}' matched blocked pattern '{pattern}'")]
    CommandValidation { command: String, pattern: String },

    #[error("runtime not found: {0}")]
    RuntimeNotFound(String),

    #[error("tool not found: {0}")]
    ToolNotFound(String),

    #[error("runtime initialization failed: {0}")]
    RuntimeInitialization(String),

    #[error("tool execution failed: {0}")]
    Execution(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl SandboxError {
    /// Classifies a lower-level validation failure as the boundary-level
    /// security violation the sandbox runtime surfaces to callers.
    pub fn as_security_violation(&self) -> Option<SandboxError> {
        match self {
            Self::PathValidation { .. } => Some(Self::SecurityViolation {
                kind: SecurityViolationKind::PathViolation,
                message: self.to_string(),
            }),
            Self::CommandValidation { .. } => Some(Self::SecurityViolation {
                kind: SecurityViolationKind::CommandViolation,
                message: self.to_string(),
            }),
            _ => None,
        }
    }

    pub fn blocked_tool(tool_name: impl Into<String>) -> Self {
        let tool_name = tool_name.into();
        Self::SecurityViolation {
            kind: SecurityViolationKind::BlockedTool,
            message: format!("tool '{tool_name}' is not permitted by the security policy"),
        }
    }
}

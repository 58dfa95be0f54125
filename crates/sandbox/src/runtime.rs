// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The interface every tool-execution runtime implements: [`LocalRuntime`],
//! [`crate::sandbox_runtime::SandboxRuntime`], and any future runtime
//! (container, MCP, remote) registered with a [`crate::manager::RuntimeManager`].

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::context::ExecutionContext;
use crate::error::SandboxError;
use crate::result::ToolResult;

#[async_trait]
pub trait ToolRuntime: Send + Sync {
    async fn execute(
        &self,
        tool_name: &str,
        params: HashMap<String, Value>,
        context: &ExecutionContext,
    ) -> Result<ToolResult, SandboxError>;

    async fn health_check(&self) -> bool;

    async fn cleanup(&self);
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Executes file and bash tools directly in this process. The only runtime
//! [`crate::sandbox_runtime::SandboxRuntime`] delegates validated calls to;
//! registered with a [`crate::manager::RuntimeManager`] like any other
//! [`ToolRuntime`].
//!
//! Memory monitoring is not implemented here: there's no process-inspection
//! crate in this workspace's dependency stack, so `max_memory_mb` stays an
//! advertised limit in [`ExecutionContext`] without an enforcement path.
//! Recorded as a DESIGN.md decision.

use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;

use crate::context::ExecutionContext;
use crate::error::SandboxError;
use crate::result::ToolResult;
use crate::runtime::ToolRuntime;

fn param_str<'a>(params: &'a HashMap<String, Value>, key: &str) -> Result<&'a str, SandboxError> {
    params
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| SandboxError::Execution(format!("missing or non-string parameter '{key}'")))
}

fn param_str_any<'a>(params: &'a HashMap<String, Value>, keys: &[&str]) -> Result<&'a str, SandboxError> {
    keys.iter()
        .find_map(|k| params.get(*k).and_then(Value::as_str))
        .ok_or_else(|| SandboxError::Execution(format!("missing one of {keys:?}")))
}

/// Translates a glob pattern (`*`, `**`, `?`) into an anchored regex.
fn glob_to_regex(pattern: &str) -> Regex {
    let mut out = String::from("^");
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                out.push_str(".*");
            }
            '*' => out.push_str("[^/]*"),
            '?' => out.push('.'),
            c if "\\.+^$()[]{}|".contains(c) => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push('$');
    // `out` is built entirely from escaped literals plus `[^/]*`/`.*`/`.`, so
    // it always compiles; the fallback is an unreachable safety net.
    #[allow(clippy::unwrap_used)]
    Regex::new(&out).unwrap_or_else(|_| Regex::new("").unwrap())
}

/// Plain in-process executor with per-call timeout enforcement; the inner
/// runtime every [`ToolRuntime`] call in this crate eventually bottoms out
/// on.
#[derive(Default)]
pub struct LocalRuntime;

impl LocalRuntime {
    pub fn new() -> Self {
        Self
    }

    async fn dispatch(
        &self,
        tool_name: &str,
        params: HashMap<String, Value>,
        context: &ExecutionContext,
    ) -> Result<String, SandboxError> {
        match tool_name {
            "read" => Self::read(&params).await,
            "write" => Self::write(&params).await,
            "edit" => Self::edit(&params).await,
            "multi_edit" => Self::multi_edit(&params).await,
            "list" => Self::list(&params).await,
            "glob" => Self::glob(&params).await,
            "grep" => Self::grep(&params).await,
            "bash" | "restricted_bash" => Self::bash(&params, context).await,
            other => Err(SandboxError::ToolNotFound(other.to_string())),
        }
    }

    async fn read(params: &HashMap<String, Value>) -> Result<String, SandboxError> {
        let path = param_str(params, "file_path")?;
        tokio::fs::read_to_string(path)
            .await
            .map_err(|e| SandboxError::Execution(format!("read {path}: {e}")))
    }

    async fn write(params: &HashMap<String, Value>) -> Result<String, SandboxError> {
        let path = param_str(params, "file_path")?;
        let content = param_str(params, "content")?;
        if let Some(parent) = Path::new(path).parent() {
            tokio::fs::create_dir_all(parent).await.ok();
        }
        tokio::fs::write(path, content)
            .await
            .map_err(|e| SandboxError::Execution(format!("write {path}: {e}")))?;
        Ok(format!("wrote {} bytes to {path}", content.len()))
    }

    async fn edit(params: &HashMap<String, Value>) -> Result<String, SandboxError> {
        let path = param_str(params, "file_path")?;
        let old_text = param_str(params, "old_text")?;
        let new_text = param_str(params, "new_text")?;
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| SandboxError::Execution(format!("read {path}: {e}")))?;
        let replaced = apply_single_edit(&content, old_text, new_text)?;
        tokio::fs::write(path, &replaced)
            .await
            .map_err(|e| SandboxError::Execution(format!("write {path}: {e}")))?;
        Ok(format!("applied 1 edit to {path}"))
    }

    async fn multi_edit(params: &HashMap<String, Value>) -> Result<String, SandboxError> {
        let path = param_str(params, "file_path")?;
        let edits = params
            .get("edits")
            .and_then(Value::as_array)
            .ok_or_else(|| SandboxError::Execution("missing 'edits' array".to_string()))?;

        let mut content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| SandboxError::Execution(format!("read {path}: {e}")))?;

        for (i, edit) in edits.iter().enumerate() {
            let old_text = edit
                .get("old_text")
                .and_then(Value::as_str)
                .ok_or_else(|| SandboxError::Execution(format!("edit {i} missing 'old_text'")))?;
            let new_text = edit
                .get("new_text")
                .and_then(Value::as_str)
                .ok_or_else(|| SandboxError::Execution(format!("edit {i} missing 'new_text'")))?;
            content = apply_single_edit(&content, old_text, new_text)?;
        }

        tokio::fs::write(path, &content)
            .await
            .map_err(|e| SandboxError::Execution(format!("write {path}: {e}")))?;
        Ok(format!("applied {} edits to {path}", edits.len()))
    }

    async fn list(params: &HashMap<String, Value>) -> Result<String, SandboxError> {
        let dir = param_str_any(params, &["directory", "path"])?;
        let mut entries = tokio::fs::read_dir(dir)
            .await
            .map_err(|e| SandboxError::Execution(format!("list {dir}: {e}")))?;
        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| SandboxError::Execution(format!("list {dir}: {e}")))?
        {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names.join("\n"))
    }

    async fn glob(params: &HashMap<String, Value>) -> Result<String, SandboxError> {
        let pattern = param_str(params, "pattern")?;
        let dir = param_str_any(params, &["directory", "path"]).unwrap_or(".");
        let matcher = glob_to_regex(pattern);

        let mut matches = Vec::new();
        let mut stack = vec![std::path::PathBuf::from(dir)];
        while let Some(current) = stack.pop() {
            let Ok(mut entries) = tokio::fs::read_dir(&current).await else {
                continue;
            };
            while let Ok(Some(entry)) = entries.next_entry().await {
                let path = entry.path();
                let relative = path.strip_prefix(dir).unwrap_or(&path);
                let relative_str = relative.to_string_lossy();
                if let Ok(file_type) = entry.file_type().await {
                    if file_type.is_dir() {
                        stack.push(path.clone());
                    } else if matcher.is_match(&relative_str) {
                        matches.push(relative_str.into_owned());
                    }
                }
            }
        }
        matches.sort();
        Ok(matches.join("\n"))
    }

    async fn grep(params: &HashMap<String, Value>) -> Result<String, SandboxError> {
        let pattern = param_str(params, "pattern")?;
        let dir = param_str_any(params, &["directory", "path"]).unwrap_or(".");
        let matcher = Regex::new(pattern).map_err(|e| SandboxError::Execution(format!("invalid pattern: {e}")))?;

        let mut matches = Vec::new();
        let mut stack = vec![std::path::PathBuf::from(dir)];
        while let Some(current) = stack.pop() {
            if current.is_dir() {
                let Ok(mut entries) = tokio::fs::read_dir(&current).await else {
                    continue;
                };
                while let Ok(Some(entry)) = entries.next_entry().await {
                    stack.push(entry.path());
                }
                continue;
            }
            let Ok(content) = tokio::fs::read_to_string(&current).await else {
                continue;
            };
            for (lineno, line) in content.lines().enumerate() {
                if matcher.is_match(line) {
                    matches.push(format!("{}:{}:{}", current.display(), lineno + 1, line));
                }
            }
        }
        Ok(matches.join("\n"))
    }

    async fn bash(params: &HashMap<String, Value>, context: &ExecutionContext) -> Result<String, SandboxError> {
        let command = param_str(params, "command")?;
        let mut cmd = tokio::process::Command::new("sh");
        cmd.arg("-c").arg(command);
        if let Some(cwd) = &context.working_directory {
            cmd.current_dir(cwd);
        }
        for (key, value) in &context.environment {
            cmd.env(key, value);
        }
        let output = cmd
            .output()
            .await
            .map_err(|e| SandboxError::Execution(format!("spawn failed: {e}")))?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        if !output.stderr.is_empty() {
            combined.push_str(&String::from_utf8_lossy(&output.stderr));
        }
        if !output.status.success() {
            return Err(SandboxError::Execution(format!(
                "command exited with {}: {combined}",
                output.status
            )));
        }
        Ok(combined)
    }
}

fn apply_single_edit(content: &str, old_text: &str, new_text: &str) -> Result<String, SandboxError> {
    let count = content.matches(old_text).count();
    if count == 0 {
        return Err(SandboxError::Execution("old_text not found in file".to_string()));
    }
    if count > 1 {
        return Err(SandboxError::Execution(format!(
            "old_text is not unique ({count} occurrences); provide more context"
        )));
    }
    Ok(content.replacen(old_text, new_text, 1))
}

#[async_trait]
impl ToolRuntime for LocalRuntime {
    async fn execute(
        &self,
        tool_name: &str,
        params: HashMap<String, Value>,
        context: &ExecutionContext,
    ) -> Result<ToolResult, SandboxError> {
        tracing::info!(tool_name, timeout = ?context.timeout, "executing tool locally");
        let start = Instant::now();

        match tokio::time::timeout(context.timeout, self.dispatch(tool_name, params, context)).await {
            Ok(Ok(output)) => Ok(ToolResult::success(output, start.elapsed()).with_metadata("runtime", Value::from("local"))),
            Ok(Err(err)) => Ok(ToolResult::failure(err.to_string(), start.elapsed()).with_metadata("runtime", Value::from("local"))),
            Err(_) => {
                tracing::warn!(tool_name, elapsed = ?start.elapsed(), "tool exceeded timeout");
                Err(SandboxError::RuntimeTimeout { timeout: context.timeout })
            }
        }
    }

    async fn health_check(&self) -> bool {
        true
    }

    async fn cleanup(&self) {
        tracing::debug!("local runtime cleanup (no-op)");
    }
}

#[cfg(test)]
#[path = "local_tests.rs"]
mod tests;

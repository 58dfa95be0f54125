// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tool/parameter classification shared between [`crate::sandbox_runtime::SandboxRuntime`]
//! and [`crate::session_manager::SessionRuntimeManager`].

use serde_json::Value;
use std::collections::HashMap;

/// Parameters that carry a user-supplied path and need [`crate::path_validator::PathValidator`].
/// `working_directory` is deliberately excluded: the runtime sets it to the
/// workspace itself, it is never a caller-supplied value.
const PATH_PARAMETERS: &[&str] = &[
    "file_path",
    "path",
    "directory",
    "source",
    "destination",
    "target",
    "output_path",
    "input_path",
];

const FILE_TOOLS: &[&str] = &["read", "write", "edit", "multi_edit", "glob", "grep", "list"];

const BASH_TOOLS: &[&str] = &["bash", "restricted_bash"];

pub fn is_file_tool(tool_name: &str) -> bool {
    FILE_TOOLS.contains(&tool_name.to_lowercase().as_str())
}

pub fn is_bash_tool(tool_name: &str) -> bool {
    BASH_TOOLS.contains(&tool_name.to_lowercase().as_str())
}

pub fn is_path_param(param_name: &str) -> bool {
    let lower = param_name.to_lowercase();
    lower != "working_directory" && PATH_PARAMETERS.contains(&lower.as_str())
}

pub fn is_write_operation(tool_name: &str, params: &HashMap<String, Value>) -> bool {
    if matches!(tool_name, "write" | "edit" | "multi_edit") {
        return true;
    }
    params.keys().any(|k| {
        let lower = k.to_lowercase();
        lower.contains("content") || lower.contains("data")
    })
}

/// A rough byte estimate for the quota check, not an exact accounting.
pub fn estimate_write_size(tool_name: &str, params: &HashMap<String, Value>) -> u64 {
    match tool_name {
        "write" => params.get("content").and_then(Value::as_str).map(str::len).unwrap_or(1024) as u64,
        "edit" => params.get("new_text").and_then(Value::as_str).map(str::len).unwrap_or(1024) as u64,
        _ => 1024,
    }
}

#[cfg(test)]
#[path = "classify_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Loading individual JSON and Markdown files from the hierarchy.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::error::ConfigError;
use crate::paths::ConfigPaths;

/// Load a single JSON settings file. The file must parse to a JSON object.
pub fn load_json_file(path: &Path) -> Result<Value, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::load(path, e.to_string()))?;
    let value: Value =
        serde_json::from_str(&raw).map_err(|e| ConfigError::load(path, format!("invalid JSON: {e}")))?;

    if !value.is_object() {
        return Err(ConfigError::load(
            path,
            format!("expected a JSON object, got {}", value_kind(&value)),
        ));
    }

    debug!(path = %path.display(), "loaded JSON config");
    Ok(value)
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Load a Markdown/context file's raw contents.
pub fn load_markdown_file(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::load(path, e.to_string()))?;
    debug!(path = %path.display(), "loaded markdown file");
    Ok(content)
}

/// Load every settings file in precedence order (lowest precedence first),
/// pairing each with its source path. A source that fails to parse is
/// reported to the caller rather than silently skipped: a malformed settings
/// file is an operator error, not a missing-file case.
pub fn load_settings_with_precedence(
    paths: &ConfigPaths,
    config_type: &str,
    include_local: bool,
) -> Result<Vec<(PathBuf, Value)>, ConfigError> {
    paths
        .resolve_config_paths(config_type, include_local)
        .into_iter()
        .map(|path| {
            let value = load_json_file(&path)?;
            Ok((path.clone(), value))
        })
        .collect()
}

/// Load every context file in precedence order, pairing each with its
/// source path. A file that fails to read is logged and skipped: context
/// files are advisory prose, not structural configuration.
pub fn load_context_files(paths: &ConfigPaths, context_file: &str, include_local: bool) -> Vec<(PathBuf, String)> {
    paths
        .resolve_context_paths(context_file, include_local)
        .into_iter()
        .filter_map(|path| match load_markdown_file(&path) {
            Ok(content) => Some((path, content)),
            Err(err) => {
                tracing::warn!(error = %err, "failed to load context file, skipping");
                None
            }
        })
        .collect()
}

#[cfg(test)]
#[path = "loader_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! [`ConfigSnapshot`]: an immutable, cloneable view of merged configuration.

use std::path::PathBuf;

use serde_json::Value;

use crate::merge::get_effective_value;

/// A point-in-time view of the merged configuration hierarchy.
///
/// Cheap to clone: callers that hold onto a snapshot are isolated from
/// subsequent reloads of the owning [`crate::ConfigHierarchy`].
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigSnapshot {
    pub settings: Value,
    pub context: String,
    pub sources: Vec<PathBuf>,
}

impl ConfigSnapshot {
    pub fn empty() -> Self {
        Self {
            settings: Value::Object(Default::default()),
            context: String::new(),
            sources: Vec::new(),
        }
    }

    /// Whether any settings were actually loaded.
    pub fn is_valid(&self) -> bool {
        self.settings.as_object().is_some_and(|m| !m.is_empty())
    }

    /// Whether non-whitespace context content was loaded.
    pub fn has_context(&self) -> bool {
        !self.context.trim().is_empty()
    }

    /// Look up a dot-separated setting path, e.g. `"agent.timeout"`.
    pub fn get_setting(&self, key_path: &str) -> Option<&Value> {
        get_effective_value(&self.settings, key_path)
    }

    /// Look up a dot-separated setting path, falling back to `default` when
    /// absent or present-but-wrong-shaped.
    pub fn get_setting_or<T: serde::de::DeserializeOwned>(&self, key_path: &str, default: T) -> T {
        self.get_setting(key_path)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or(default)
    }
}

impl Default for ConfigSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;

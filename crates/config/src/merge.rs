// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deep-merge utilities for combining JSON settings objects across the
//! configuration hierarchy.

use serde_json::Value;

/// How array-valued keys are combined when both sides define the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListMergeStrategy {
    /// The override's list wins outright (the default, matching the
    /// original loader's behavior).
    #[default]
    Replace,
    /// Base items followed by override items, duplicates included.
    Append,
    /// Base items followed by override items, duplicates dropped.
    Unique,
}

/// Deep-merge `override_` onto `base`, returning a new value. Nested objects
/// merge recursively; arrays are combined per `strategy`; anything else is
/// replaced by the override's value.
pub fn deep_merge_with_strategy(base: &Value, override_: &Value, strategy: ListMergeStrategy) -> Value {
    match (base, override_) {
        (Value::Object(base_map), Value::Object(override_map)) => {
            let mut result = base_map.clone();
            for (key, override_value) in override_map {
                let merged = match result.get(key) {
                    Some(base_value) => deep_merge_with_strategy(base_value, override_value, strategy),
                    None => override_value.clone(),
                };
                result.insert(key.clone(), merged);
            }
            Value::Object(result)
        }
        (Value::Array(base_list), Value::Array(override_list)) => match strategy {
            ListMergeStrategy::Replace => Value::Array(override_list.clone()),
            ListMergeStrategy::Append => {
                let mut merged = base_list.clone();
                merged.extend(override_list.clone());
                Value::Array(merged)
            }
            ListMergeStrategy::Unique => {
                let mut merged = Vec::new();
                for item in base_list.iter().chain(override_list.iter()) {
                    if !merged.contains(item) {
                        merged.push(item.clone());
                    }
                }
                Value::Array(merged)
            }
        },
        (_, override_value) => override_value.clone(),
    }
}

/// Deep-merge using the default (replace) list strategy.
pub fn deep_merge(base: &Value, override_: &Value) -> Value {
    deep_merge_with_strategy(base, override_, ListMergeStrategy::Replace)
}

/// Deep-merge a precedence-ordered list of values (lowest precedence first).
pub fn deep_merge_multiple(values: &[Value], strategy: ListMergeStrategy) -> Value {
    values.iter().fold(Value::Object(Default::default()), |acc, v| {
        deep_merge_with_strategy(&acc, v, strategy)
    })
}

/// Look up a dot-separated key path (e.g. `"agent.timeout"`) in a settings value.
pub fn get_effective_value<'a>(settings: &'a Value, key_path: &str) -> Option<&'a Value> {
    let mut current = settings;
    for key in key_path.split('.') {
        current = current.as_object()?.get(key)?;
    }
    Some(current)
}

#[cfg(test)]
#[path = "merge_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[test]
fn merges_nested_objects_recursively() {
    let base = json!({"a": {"x": 1, "y": 2}, "b": 3});
    let override_ = json!({"a": {"y": 20, "z": 30}, "c": 4});

    let merged = deep_merge(&base, &override_);

    assert_eq!(merged, json!({"a": {"x": 1, "y": 20, "z": 30}, "b": 3, "c": 4}));
}

#[test]
fn replace_strategy_overwrites_lists_by_default() {
    let base = json!({"paths": ["a", "b"]});
    let override_ = json!({"paths": ["c"]});

    let merged = deep_merge(&base, &override_);

    assert_eq!(merged, json!({"paths": ["c"]}));
}

#[test]
fn append_strategy_concatenates_lists() {
    let base = json!({"paths": ["a", "b"]});
    let override_ = json!({"paths": ["c"]});

    let merged = deep_merge_with_strategy(&base, &override_, ListMergeStrategy::Append);

    assert_eq!(merged, json!({"paths": ["a", "b", "c"]}));
}

#[test]
fn unique_strategy_dedupes_preserving_order() {
    let base = json!({"paths": ["a", "b", "c"]});
    let override_ = json!({"paths": ["c", "d"]});

    let merged = deep_merge_with_strategy(&base, &override_, ListMergeStrategy::Unique);

    assert_eq!(merged, json!({"paths": ["a", "b", "c", "d"]}));
}

#[yare::parameterized(
    scalar_override_wins       = { json!({"a": 1}), json!({"a": 2}), json!({"a": 2}) },
    mismatched_types_take_override = { json!({"a": {"x": 1}}), json!({"a": "scalar now"}), json!({"a": "scalar now"}) },
    override_object_replaces_scalar = { json!({"a": 1}), json!({"a": {"x": 1}}), json!({"a": {"x": 1}}) },
)]
fn scalar_and_shape_changing_overrides(base: serde_json::Value, override_: serde_json::Value, expected: serde_json::Value) {
    assert_eq!(deep_merge(&base, &override_), expected);
}

#[test]
fn deep_merge_multiple_applies_in_order() {
    let c1 = json!({"a": {"x": 1}});
    let c2 = json!({"a": {"y": 2}});
    let c3 = json!({"a": {"z": 3}, "b": 4});

    let merged = deep_merge_multiple(&[c1, c2, c3], ListMergeStrategy::Replace);

    assert_eq!(merged, json!({"a": {"x": 1, "y": 2, "z": 3}, "b": 4}));
}

#[test]
fn deep_merge_multiple_empty_yields_empty_object() {
    assert_eq!(deep_merge_multiple(&[], ListMergeStrategy::Replace), json!({}));
}

#[test]
fn get_effective_value_navigates_dotted_path() {
    let settings = json!({"agent": {"timeout": 300}});
    assert_eq!(get_effective_value(&settings, "agent.timeout"), Some(&json!(300)));
}

#[test]
fn get_effective_value_missing_key_returns_none() {
    let settings = json!({"agent": {"timeout": 300}});
    assert_eq!(get_effective_value(&settings, "agent.retries"), None);
    assert_eq!(get_effective_value(&settings, "missing.path"), None);
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::paths::ConfigPaths;
use serde_json::json;
use tempfile::tempdir;

#[test]
fn load_json_file_parses_object() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(&path, r#"{"a": 1}"#).unwrap();

    assert_eq!(load_json_file(&path).unwrap(), json!({"a": 1}));
}

#[test]
fn load_json_file_rejects_non_object() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(&path, "[1, 2, 3]").unwrap();

    let err = load_json_file(&path).unwrap_err();
    assert!(err.to_string().contains("expected a JSON object"));
}

#[test]
fn load_json_file_rejects_invalid_json() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(&path, "{not json").unwrap();

    let err = load_json_file(&path).unwrap_err();
    assert!(err.to_string().contains("invalid JSON"));
}

#[test]
fn load_json_file_missing_path_is_io_error() {
    let err = load_json_file(Path::new("/nonexistent/settings.json")).unwrap_err();
    assert!(matches!(err, ConfigError::ConfigLoadError { .. }));
}

#[test]
fn load_settings_with_precedence_collects_in_order() {
    let framework = tempdir().unwrap();
    let cwd = tempdir().unwrap();
    let archiflow = cwd.path().join(".archiflow");
    std::fs::create_dir(&archiflow).unwrap();

    std::fs::write(framework.path().join("settings.json"), r#"{"a": 1}"#).unwrap();
    std::fs::write(archiflow.join("settings.json"), r#"{"a": 2}"#).unwrap();

    let paths = ConfigPaths::with_framework_dir(cwd.path(), framework.path());
    let loaded = load_settings_with_precedence(&paths, "settings", true).unwrap();

    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded[0].1, json!({"a": 1}));
    assert_eq!(loaded[1].1, json!({"a": 2}));
}

#[test]
fn load_settings_with_precedence_propagates_parse_error() {
    let framework = tempdir().unwrap();
    let cwd = tempdir().unwrap();
    let archiflow = cwd.path().join(".archiflow");
    std::fs::create_dir(&archiflow).unwrap();
    std::fs::write(archiflow.join("settings.json"), "not json").unwrap();

    let paths = ConfigPaths::with_framework_dir(cwd.path(), framework.path());
    assert!(load_settings_with_precedence(&paths, "settings", true).is_err());
}

#[test]
fn load_context_files_skips_unreadable_entries() {
    let framework = tempdir().unwrap();
    let cwd = tempdir().unwrap();
    let archiflow = cwd.path().join(".archiflow");
    std::fs::create_dir(&archiflow).unwrap();
    std::fs::write(archiflow.join("ARCHIFLOW.md"), "hello").unwrap();

    let paths = ConfigPaths::with_framework_dir(cwd.path(), framework.path());
    let loaded = load_context_files(&paths, "ARCHIFLOW.md", true);

    assert_eq!(loaded, vec![(archiflow.join("ARCHIFLOW.md"), "hello".to_string())]);
}

//! A `ConfigHierarchy` snapshot feeds tunables into a freshly constructed
//! broker and sandbox exactly the way a process bootstrap would: project
//! settings override framework defaults, and the downstream components
//! never see the raw files.

use std::sync::Arc;

use archiflow_broker::{AolBackend, MessageBroker};
use archiflow_config::ConfigHierarchy;
use archiflow_core::SystemClock;
use archiflow_sandbox::{InMemoryQuota, SandboxConfig, SandboxMode, SandboxRuntime, StorageQuota};

#[tokio::test]
async fn project_settings_override_framework_defaults_for_segment_size() {
    let project_root = tempfile::tempdir().unwrap();
    let archiflow_dir = project_root.path().join(".archiflow");
    std::fs::create_dir(&archiflow_dir).unwrap();
    std::fs::write(
        archiflow_dir.join("settings.json"),
        serde_json::json!({"broker": {"segment_size_bytes": 200}}).to_string(),
    )
    .unwrap();

    let hierarchy = ConfigHierarchy::new(project_root.path());
    let snapshot = hierarchy.load().unwrap();

    let segment_size: u64 = snapshot.get_setting_or("broker.segment_size_bytes", 10 * 1024 * 1024);
    assert_eq!(segment_size, 200);

    let aol_root = tempfile::tempdir().unwrap();
    let backend = Arc::new(AolBackend::new(aol_root.path()).with_segment_size_bytes(segment_size));
    let broker = MessageBroker::new(backend, SystemClock);
    broker.create_queue("q", 3, true).await.unwrap();

    // A small segment size means even a handful of enqueues roll over to a
    // second segment file; the broker doesn't need to know that happened.
    for i in 0..50 {
        broker
            .enqueue("q", format!("payload-{i}"), Default::default())
            .await
            .unwrap();
    }

    let segment_files: Vec<_> = std::fs::read_dir(aol_root.path().join("queues/q"))
        .unwrap()
        .filter_map(|e| e.ok())
        .collect();
    assert!(segment_files.len() > 1, "expected segment rotation at a 200-byte threshold");
}

#[tokio::test]
async fn sandbox_quota_limit_is_driven_by_config() {
    let project_root = tempfile::tempdir().unwrap();
    let archiflow_dir = project_root.path().join(".archiflow");
    std::fs::create_dir(&archiflow_dir).unwrap();
    std::fs::write(
        archiflow_dir.join("settings.json"),
        serde_json::json!({"sandbox": {"quota_limit_bytes": 10}}).to_string(),
    )
    .unwrap();

    let hierarchy = ConfigHierarchy::new(project_root.path());
    let snapshot = hierarchy.load().unwrap();
    let limit: u64 = snapshot.get_setting_or("sandbox.quota_limit_bytes", 1024 * 1024 * 1024);
    assert_eq!(limit, 10);

    let quota: Arc<dyn StorageQuota> = Arc::new(InMemoryQuota::new(limit));
    let workspace = tempfile::tempdir().unwrap();
    let config = SandboxConfig::new(workspace.path()).with_mode(SandboxMode::Strict);
    let runtime = SandboxRuntime::new(config, Some(quota), None).unwrap();

    let params: std::collections::HashMap<String, serde_json::Value> = [
        ("file_path".to_string(), serde_json::json!("note.txt")),
        ("content".to_string(), serde_json::json!("way too long for a 10 byte quota")),
    ]
    .into_iter()
    .collect();

    let ctx = archiflow_sandbox::ExecutionContext::new(archiflow_core::SessionId::new("s1"));
    let err = runtime.execute("write", params, &ctx).await.unwrap_err();
    assert!(matches!(err, archiflow_sandbox::SandboxError::ResourceLimit { .. }));
}

#[test]
fn history_retention_window_is_driven_by_config() {
    let project_root = tempfile::tempdir().unwrap();
    let archiflow_dir = project_root.path().join(".archiflow");
    std::fs::create_dir(&archiflow_dir).unwrap();
    std::fs::write(
        archiflow_dir.join("settings.json"),
        serde_json::json!({"history": {"max_tokens": 50, "retention_window": 3}}).to_string(),
    )
    .unwrap();

    let hierarchy = ConfigHierarchy::new(project_root.path());
    let snapshot = hierarchy.load().unwrap();

    let max_tokens: usize = snapshot.get_setting_or("history.max_tokens", 4000);
    let retention_window: usize = snapshot.get_setting_or("history.retention_window", 20);
    assert_eq!(max_tokens, 50);
    assert_eq!(retention_window, 3);
}

//! A `RuntimeManager` with a registered `LocalRuntime`, scoped per session
//! through a `SessionRuntimeManager`, the way a controller would wire up
//! tool execution for one agent session: file tools stay confined to the
//! session's own workspace, `bash` is delegated straight to the shared
//! runtime, and a path-traversal attempt never reaches the filesystem.

use std::collections::HashMap;
use std::sync::Arc;

use archiflow_core::SessionId;
use archiflow_sandbox::{
    AuditTrail, ExecutionContext, LocalRuntime, RuntimeManager, SandboxError, SandboxMode, SecurityPolicy,
};

fn params(pairs: &[(&str, serde_json::Value)]) -> HashMap<String, serde_json::Value> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

#[tokio::test]
async fn session_manager_confines_file_writes_and_delegates_bash_to_the_shared_runtime() {
    let manager = Arc::new(RuntimeManager::new(SecurityPolicy::default()));
    manager.register_runtime("local", Arc::new(LocalRuntime::new()));

    let workspace = tempfile::tempdir().unwrap();
    let audit = Arc::new(AuditTrail::new());
    let session = manager
        .create_session_manager("session-1", workspace.path().to_path_buf(), None, Some(audit.clone()), SandboxMode::Strict)
        .unwrap();

    let ctx = ExecutionContext::new(SessionId::new("session-1"));

    let write_result = session
        .execute_tool("write", params(&[("file_path", "note.txt".into()), ("content", "hello".into())]), &ctx)
        .await
        .unwrap();
    assert!(write_result.success);

    let read_result = session.execute_tool("read", params(&[("file_path", "note.txt".into())]), &ctx).await.unwrap();
    assert_eq!(read_result.output.as_deref(), Some("hello"));

    let bash_result = session
        .execute_tool("bash", params(&[("command", "echo from-shared-runtime".into())]), &ctx)
        .await
        .unwrap();
    assert!(bash_result.success);
    assert_eq!(bash_result.output.as_deref(), Some("from-shared-runtime\n"));
    // `bash` isn't in the sandbox's file-tool list, so it went through the
    // global manager rather than the session's own sandbox runtime.
    assert_eq!(bash_result.metadata.get("runtime").and_then(|v| v.as_str()), Some("local"));

    assert!(workspace.path().join("note.txt").exists());

    let entries = audit.entries_for_session(&SessionId::new("session-1"));
    assert_eq!(entries.len(), 2, "write and read should both have been audited by the session's sandbox");
    assert!(entries.iter().all(|e| e.success));
}

#[tokio::test]
async fn session_manager_blocks_path_traversal_out_of_the_workspace() {
    let manager = Arc::new(RuntimeManager::new(SecurityPolicy::default()));
    manager.register_runtime("local", Arc::new(LocalRuntime::new()));

    let workspace = tempfile::tempdir().unwrap();
    let session = manager
        .create_session_manager("session-2", workspace.path().to_path_buf(), None, None, SandboxMode::Strict)
        .unwrap();

    let ctx = ExecutionContext::new(SessionId::new("session-2"));

    let err = session
        .execute_tool(
            "write",
            params(&[("file_path", "../../etc/passwd".into()), ("content", "pwned".into())]),
            &ctx,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, SandboxError::SecurityViolation { .. }), "expected a security violation, got {err:?}");
}

#[tokio::test]
async fn blocked_tool_never_reaches_any_runtime() {
    let policy = SecurityPolicy {
        blocked_commands: vec!["dangerous_tool".to_string()],
        ..SecurityPolicy::default()
    };
    let manager = Arc::new(RuntimeManager::new(policy));
    manager.register_runtime("local", Arc::new(LocalRuntime::new()));

    let ctx = ExecutionContext::new(SessionId::new("session-3"));
    let err = manager.execute_tool("dangerous_tool", HashMap::new(), &ctx).await.unwrap_err();
    assert!(matches!(err, SandboxError::SecurityViolation { .. }));
}

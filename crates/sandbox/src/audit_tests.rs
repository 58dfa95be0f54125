use super::*;
use archiflow_core::FakeClock;
use serde_json::json;

fn entry(tool_name: &str, success: bool) -> AuditEntry {
    AuditEntry {
        session_id: Some(SessionId::new("s1")),
        tool_name: tool_name.to_string(),
        params: json!({}),
        success,
        error: if success { None } else { Some("boom".to_string()) },
        workspace: "/tmp/ws".to_string(),
        mode: "strict".to_string(),
        duration_ms: 1.5,
        epoch_ms: 0,
    }
}

#[test]
fn record_stamps_entry_with_clock_time() {
    let clock = FakeClock::new();
    clock.set_epoch_ms(42);
    let trail = AuditTrail::with_clock(10, clock);

    trail.record(entry("read", true));

    let recent = trail.recent(1);
    assert_eq!(recent[0].epoch_ms, 42);
}

#[test]
fn recent_returns_entries_in_chronological_order() {
    let trail = AuditTrail::with_clock(10, FakeClock::new());
    trail.record(entry("read", true));
    trail.record(entry("write", true));
    trail.record(entry("bash", false));

    let recent = trail.recent(2);
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].tool_name, "write");
    assert_eq!(recent[1].tool_name, "bash");
    assert!(!recent[1].success);
}

#[test]
fn ring_buffer_evicts_oldest_past_capacity() {
    let trail = AuditTrail::with_clock(2, FakeClock::new());
    trail.record(entry("a", true));
    trail.record(entry("b", true));
    trail.record(entry("c", true));

    let recent = trail.recent(10);
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].tool_name, "b");
    assert_eq!(recent[1].tool_name, "c");
}

#[test]
fn entries_for_session_filters_by_id() {
    let trail = AuditTrail::with_clock(10, FakeClock::new());
    let mut other = entry("read", true);
    other.session_id = Some(SessionId::new("other"));
    trail.record(entry("write", true));
    trail.record(other);

    let mine = trail.entries_for_session(&SessionId::new("s1"));
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].tool_name, "write");
}

#[test]
fn sanitize_params_redacts_sensitive_keys() {
    let mut params = std::collections::HashMap::new();
    params.insert("api_key".to_string(), json!("super-secret"));
    params.insert("file_path".to_string(), json!("a.txt"));

    let sanitized = sanitize_params(&params);
    assert_eq!(sanitized["api_key"], json!("[REDACTED]"));
    assert_eq!(sanitized["file_path"], json!("a.txt"));
}

#[test]
fn sanitize_params_truncates_long_values() {
    let mut params = std::collections::HashMap::new();
    params.insert("content".to_string(), json!("x".repeat(2000)));

    let sanitized = sanitize_params(&params);
    let value = sanitized["content"].as_str().unwrap();
    assert!(value.contains("truncated"));
    assert!(value.len() < 2000);
}

use super::*;

#[test]
fn defaults_match_source_constants() {
    let ctx = ExecutionContext::new(SessionId::new("s1"));
    assert_eq!(ctx.timeout, Duration::from_secs(30));
    assert_eq!(ctx.max_memory_mb, 512);
    assert_eq!(ctx.max_cpu_percent, 80);
    assert!(!ctx.allowed_network);
    assert!(ctx.working_directory.is_none());
}

#[test]
fn builders_return_independent_contexts() {
    let base = ExecutionContext::new(SessionId::new("s1"));
    let timed_out = base.clone().with_timeout(Duration::from_secs(5));
    let networked = base.clone().with_network(true);

    assert_eq!(timed_out.timeout, Duration::from_secs(5));
    assert!(!timed_out.allowed_network);
    assert!(networked.allowed_network);
    assert_eq!(networked.timeout, Duration::from_secs(30));
}

#[test]
fn with_working_directory_sets_the_runtime_cwd() {
    let ctx = ExecutionContext::new(SessionId::new("s1")).with_working_directory("/ws/session_1");
    assert_eq!(ctx.working_directory.as_deref(), Some("/ws/session_1"));
}

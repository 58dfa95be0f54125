use super::*;
use std::fs;
use std::time::Duration;
use tempfile::tempdir;

#[tokio::test]
async fn get_usage_reflects_file_sizes() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), vec![0u8; 100]).unwrap();
    fs::write(dir.path().join("b.txt"), vec![0u8; 50]).unwrap();

    let quota = FileSystemQuota::new(10_000);
    assert_eq!(quota.get_usage(dir.path()), 150);
}

#[tokio::test]
async fn check_quota_rejects_when_would_exceed() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), vec![0u8; 900]).unwrap();

    let quota = FileSystemQuota::new(1000);
    assert!(!quota.check_quota("s1", dir.path(), 200).await);
    assert!(quota.check_quota("s1", dir.path(), 50).await);
}

#[tokio::test]
async fn usage_is_cached_within_ttl() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), vec![0u8; 100]).unwrap();

    let quota = FileSystemQuota::with_cache_ttl(10_000, Duration::from_secs(60));
    assert_eq!(quota.get_usage(dir.path()), 100);

    fs::write(dir.path().join("b.txt"), vec![0u8; 900]).unwrap();
    assert_eq!(quota.get_usage(dir.path()), 100, "stale cache should still report pre-write usage");
}

#[tokio::test]
async fn clear_cache_forces_rescan() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), vec![0u8; 100]).unwrap();

    let quota = FileSystemQuota::with_cache_ttl(10_000, Duration::from_secs(60));
    assert_eq!(quota.get_usage(dir.path()), 100);

    fs::write(dir.path().join("b.txt"), vec![0u8; 900]).unwrap();
    quota.clear_cache();
    assert_eq!(quota.get_usage(dir.path()), 1000);
}

#[tokio::test]
async fn missing_workspace_reports_zero_usage() {
    let missing = std::env::temp_dir().join("archiflow-sandbox-quota-missing");
    let quota = FileSystemQuota::new(1000);
    assert_eq!(quota.get_usage(&missing), 0);
}

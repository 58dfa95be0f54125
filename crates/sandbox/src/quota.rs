// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Storage quota enforcement, keyed by `(session_id, workspace_path)`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;

/// Enforces a storage limit, at whatever granularity the implementation
/// chooses (per-workspace, per-user, global).
#[async_trait]
pub trait StorageQuota: Send + Sync {
    /// Would adding `additional_bytes` exceed the quota?
    async fn check_quota(&self, session_id: &str, workspace: &Path, additional_bytes: u64) -> bool;

    /// Current usage in bytes for `workspace`.
    fn get_usage(&self, workspace: &Path) -> u64;

    /// The quota limit in bytes. Constant for the instance's lifetime.
    fn get_limit(&self) -> u64;

    /// Tracks that `bytes_to_reserve` have been used. A hint, not a true
    /// pre-allocation: some implementations just re-check the quota.
    async fn reserve_space(&self, session_id: &str, workspace: &Path, bytes_to_reserve: u64) -> bool;
}

/// Tracks usage purely in memory, keyed by workspace path. Cheap and exact
/// for callers that route every write through `reserve_space`, but has no
/// visibility into files written outside this process's bookkeeping.
#[derive(Default)]
pub struct InMemoryQuota {
    limit: u64,
    usage: Mutex<HashMap<PathBuf, u64>>,
}

impl InMemoryQuota {
    pub fn new(limit_bytes: u64) -> Self {
        Self {
            limit: limit_bytes,
            usage: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl StorageQuota for InMemoryQuota {
    async fn check_quota(&self, _session_id: &str, workspace: &Path, additional_bytes: u64) -> bool {
        let current = self.get_usage(workspace);
        current.saturating_add(additional_bytes) <= self.limit
    }

    fn get_usage(&self, workspace: &Path) -> u64 {
        self.usage.lock().get(workspace).copied().unwrap_or(0)
    }

    fn get_limit(&self) -> u64 {
        self.limit
    }

    async fn reserve_space(&self, session_id: &str, workspace: &Path, bytes_to_reserve: u64) -> bool {
        if !self.check_quota(session_id, workspace, bytes_to_reserve).await {
            return false;
        }
        let mut usage = self.usage.lock();
        *usage.entry(workspace.to_path_buf()).or_insert(0) += bytes_to_reserve;
        true
    }
}

#[cfg(test)]
#[path = "quota_tests.rs"]
mod tests;

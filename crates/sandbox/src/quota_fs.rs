// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Quota backed by actual filesystem usage: more accurate than
//! [`crate::quota::InMemoryQuota`] but requires scanning the workspace tree,
//! so usage is cached for a short TTL.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::quota::StorageQuota;

const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5);

pub struct FileSystemQuota {
    limit: u64,
    cache_ttl: Duration,
    cache: Mutex<HashMap<PathBuf, (u64, Instant)>>,
}

impl FileSystemQuota {
    pub fn new(limit_bytes: u64) -> Self {
        Self::with_cache_ttl(limit_bytes, DEFAULT_CACHE_TTL)
    }

    pub fn with_cache_ttl(limit_bytes: u64, cache_ttl: Duration) -> Self {
        Self {
            limit: limit_bytes,
            cache_ttl,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn clear_cache(&self) {
        self.cache.lock().clear();
    }

    fn scan(workspace: &Path) -> u64 {
        if !workspace.exists() {
            return 0;
        }
        let mut total = 0u64;
        let mut stack = vec![workspace.to_path_buf()];
        while let Some(dir) = stack.pop() {
            let Ok(entries) = std::fs::read_dir(&dir) else {
                continue;
            };
            for entry in entries.flatten() {
                let Ok(file_type) = entry.file_type() else {
                    continue;
                };
                if file_type.is_symlink() {
                    continue;
                }
                if file_type.is_dir() {
                    stack.push(entry.path());
                } else if let Ok(metadata) = entry.metadata() {
                    total += metadata.len();
                }
            }
        }
        total
    }
}

#[async_trait]
impl StorageQuota for FileSystemQuota {
    async fn check_quota(&self, _session_id: &str, workspace: &Path, additional_bytes: u64) -> bool {
        self.get_usage(workspace).saturating_add(additional_bytes) <= self.limit
    }

    fn get_usage(&self, workspace: &Path) -> u64 {
        let key = workspace.to_path_buf();
        {
            let cache = self.cache.lock();
            if let Some((usage, computed_at)) = cache.get(&key) {
                if computed_at.elapsed() < self.cache_ttl {
                    return *usage;
                }
            }
        }

        let usage = Self::scan(workspace);
        self.cache.lock().insert(key, (usage, Instant::now()));
        usage
    }

    fn get_limit(&self) -> u64 {
        self.limit
    }

    /// Doesn't pre-allocate — this implementation just re-checks the quota,
    /// since not every backend supports true reservation.
    async fn reserve_space(&self, session_id: &str, workspace: &Path, bytes_to_reserve: u64) -> bool {
        self.check_quota(session_id, workspace, bytes_to_reserve).await
    }
}

#[cfg(test)]
#[path = "quota_fs_tests.rs"]
mod tests;

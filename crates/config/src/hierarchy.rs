// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! [`ConfigHierarchy`]: loads, deep-merges, and mtime-caches settings and
//! context files across the framework/global/project precedence levels.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::error::ConfigError;
use crate::loader::{load_context_files, load_settings_with_precedence};
use crate::merge::{deep_merge_multiple, ListMergeStrategy};
use crate::paths::ConfigPaths;
use crate::snapshot::ConfigSnapshot;

struct CacheEntry {
    snapshot: ConfigSnapshot,
    mtimes: HashMap<PathBuf, SystemTime>,
}

/// Coordinates the five-level settings hierarchy (framework defaults,
/// global-user, global-local, project, project-local) plus the parallel
/// context-file hierarchy, with mtime-based caching.
pub struct ConfigHierarchy {
    paths: ConfigPaths,
    config_type: String,
    context_file: String,
    list_merge: ListMergeStrategy,
    cache: Mutex<Option<CacheEntry>>,
}

impl ConfigHierarchy {
    /// Build a hierarchy rooted at `working_dir`, using `"settings"` as the
    /// settings file stem and `ARCHIFLOW.md` as the context file.
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self::with_paths(ConfigPaths::new(working_dir))
    }

    pub fn with_paths(paths: ConfigPaths) -> Self {
        Self {
            paths,
            config_type: "settings".to_string(),
            context_file: "ARCHIFLOW.md".to_string(),
            list_merge: ListMergeStrategy::Replace,
            cache: Mutex::new(None),
        }
    }

    pub fn with_config_type(mut self, config_type: impl Into<String>) -> Self {
        self.config_type = config_type.into();
        self
    }

    pub fn with_context_file(mut self, context_file: impl Into<String>) -> Self {
        self.context_file = context_file.into();
        self
    }

    pub fn with_list_merge_strategy(mut self, strategy: ListMergeStrategy) -> Self {
        self.list_merge = strategy;
        self
    }

    pub fn paths(&self) -> &ConfigPaths {
        &self.paths
    }

    /// Load the merged configuration, reusing a cached snapshot unless any
    /// source file's mtime has changed, appeared, or disappeared.
    pub fn load(&self) -> Result<ConfigSnapshot, ConfigError> {
        {
            let cache = self.cache.lock();
            if let Some(entry) = cache.as_ref() {
                if !self.files_changed(&entry.mtimes) {
                    debug!("returning cached configuration");
                    return Ok(entry.snapshot.clone());
                }
            }
        }
        self.reload()
    }

    /// Force a fresh load, bypassing the cache.
    pub fn reload(&self) -> Result<ConfigSnapshot, ConfigError> {
        let settings_sources = load_settings_with_precedence(&self.paths, &self.config_type, true)?;
        let settings_values: Vec<_> = settings_sources.iter().map(|(_, v)| v.clone()).collect();
        let settings = deep_merge_multiple(&settings_values, self.list_merge);

        let context_sources = load_context_files(&self.paths, &self.context_file, true);
        let context = self.concatenate_context(&context_sources);

        let mut sources: Vec<PathBuf> = settings_sources.into_iter().map(|(p, _)| p).collect();
        sources.extend(context_sources.iter().map(|(p, _)| p.clone()));

        info!(
            sources = sources.len(),
            config_type = %self.config_type,
            "loaded configuration hierarchy"
        );

        let snapshot = ConfigSnapshot {
            settings,
            context,
            sources: sources.clone(),
        };

        let mtimes = mtimes_for(&sources);
        *self.cache.lock() = Some(CacheEntry {
            snapshot: snapshot.clone(),
            mtimes,
        });

        Ok(snapshot)
    }

    /// Clear the cached snapshot; the next `load()` call reads from disk.
    pub fn clear_cache(&self) {
        *self.cache.lock() = None;
        debug!("config cache cleared");
    }

    /// Convenience accessor for a single dotted setting path.
    pub fn get_setting(&self, key_path: &str) -> Result<Option<serde_json::Value>, ConfigError> {
        Ok(self.load()?.get_setting(key_path).cloned())
    }

    /// Delegate to [`ConfigPaths::resolve_tool_config_path`].
    pub fn resolve_tool_config_path(&self, tool_name: &str, config_file: &str) -> Option<PathBuf> {
        self.paths.resolve_tool_config_path(tool_name, config_file)
    }

    fn files_changed(&self, cached: &HashMap<PathBuf, SystemTime>) -> bool {
        let current_paths = self.paths.resolve_config_paths(&self.config_type, true);
        let context_paths = self.paths.resolve_context_paths(&self.context_file, true);

        for path in current_paths.iter().chain(context_paths.iter()) {
            let Ok(metadata) = std::fs::metadata(path) else {
                return true;
            };
            let Ok(modified) = metadata.modified() else {
                return true;
            };
            match cached.get(path) {
                Some(cached_mtime) if *cached_mtime == modified => {}
                _ => return true,
            }
        }

        // A previously-tracked file that's gone now also invalidates the cache.
        for path in cached.keys() {
            if !path.exists() {
                return true;
            }
        }

        false
    }

    fn concatenate_context(&self, sources: &[(PathBuf, String)]) -> String {
        if sources.is_empty() {
            return String::new();
        }

        let parts: Vec<String> = sources
            .iter()
            .map(|(path, content)| {
                let label = self.source_label(path);
                format!("### From: {label}{}\n\n{content}", self.context_file)
            })
            .collect();

        format!("\n\n{}\n\n", parts.join("\n\n---\n\n"))
    }

    fn source_label(&self, path: &Path) -> &'static str {
        let global_dir = self.paths.global_dir();
        if path.starts_with(&global_dir) {
            return "~/.archiflow/";
        }
        if let Some(project_dir) = self.paths.project_dir() {
            if path.starts_with(&project_dir) {
                return "./.archiflow/";
            }
        }
        "framework/"
    }
}

fn mtimes_for(paths: &[PathBuf]) -> HashMap<PathBuf, SystemTime> {
    paths
        .iter()
        .filter_map(|path| {
            let modified = std::fs::metadata(path).ok()?.modified().ok()?;
            Some((path.clone(), modified))
        })
        .collect()
}

#[cfg(test)]
#[path = "hierarchy_tests.rs"]
mod tests;

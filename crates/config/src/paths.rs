// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Path resolution across the configuration hierarchy: framework defaults,
//! global user config (`~/.archiflow`), and project config (`<cwd>/.archiflow`).

use std::io;
use std::path::{Path, PathBuf};

/// Framework defaults shipped with this crate, embedded at build time.
const EMBEDDED_FRAMEWORK_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/config_defaults");

/// Resolves the set of directories and files that make up the five-level
/// configuration hierarchy for a given working directory.
///
/// The project level only exists when `<working_dir>/.archiflow` is itself a
/// directory; there is no parent-directory search, matching the original
/// loader's behavior.
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    working_dir: PathBuf,
    framework_dir: PathBuf,
}

impl ConfigPaths {
    /// Build path resolution rooted at `working_dir`, using the crate's
    /// embedded framework-defaults directory.
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self::with_framework_dir(working_dir, EMBEDDED_FRAMEWORK_DIR)
    }

    /// Like [`ConfigPaths::new`] but with an explicit framework-defaults
    /// directory, primarily for tests.
    pub fn with_framework_dir(working_dir: impl Into<PathBuf>, framework_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            framework_dir: framework_dir.into(),
        }
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn framework_dir(&self) -> &Path {
        &self.framework_dir
    }

    /// The global ArchiFlow directory, `$HOME/.archiflow`.
    pub fn global_dir(&self) -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".archiflow")
    }

    /// The project ArchiFlow directory, `<working_dir>/.archiflow`, if it
    /// exists as a directory. No parent-directory search is performed.
    pub fn project_dir(&self) -> Option<PathBuf> {
        let dir = self.working_dir.join(".archiflow");
        if dir.is_dir() {
            Some(dir)
        } else {
            None
        }
    }

    /// Resolve the settings file paths that exist, in precedence order
    /// (lowest precedence first): framework, global, global-local, project,
    /// project-local.
    pub fn resolve_config_paths(&self, config_type: &str, include_local: bool) -> Vec<PathBuf> {
        let mut paths = Vec::new();

        let framework_path = self.framework_dir.join(format!("{config_type}.json"));
        if framework_path.exists() {
            paths.push(framework_path);
        }

        let global_dir = self.global_dir();
        let global_path = global_dir.join(format!("{config_type}.json"));
        if global_path.exists() {
            paths.push(global_path);
        }

        if include_local {
            let global_local_path = global_dir.join(format!("{config_type}.local.json"));
            if global_local_path.exists() {
                paths.push(global_local_path);
            }
        }

        if let Some(project_dir) = self.project_dir() {
            let project_path = project_dir.join(format!("{config_type}.json"));
            if project_path.exists() {
                paths.push(project_path);
            }

            if include_local {
                let project_local_path = project_dir.join(format!("{config_type}.local.json"));
                if project_local_path.exists() {
                    paths.push(project_local_path);
                }
            }
        }

        paths
    }

    /// Resolve context file paths that exist, in the same precedence order
    /// as [`ConfigPaths::resolve_config_paths`].
    pub fn resolve_context_paths(&self, context_file: &str, include_local: bool) -> Vec<PathBuf> {
        let local_name = |name: &str| -> String {
            match name.rsplit_once(".md") {
                Some((stem, "")) => format!("{stem}.local.md"),
                _ => format!("{name}.local"),
            }
        };

        let mut paths = Vec::new();

        let framework_path = self.framework_dir.join(context_file);
        if framework_path.exists() {
            paths.push(framework_path);
        }

        let global_dir = self.global_dir();
        let global_path = global_dir.join(context_file);
        if global_path.exists() {
            paths.push(global_path);
        }

        if include_local {
            let global_local_path = global_dir.join(local_name(context_file));
            if global_local_path.exists() {
                paths.push(global_local_path);
            }
        }

        if let Some(project_dir) = self.project_dir() {
            let project_path = project_dir.join(context_file);
            if project_path.exists() {
                paths.push(project_path);
            }

            if include_local {
                let project_local_path = project_dir.join(local_name(context_file));
                if project_local_path.exists() {
                    paths.push(project_local_path);
                }
            }
        }

        paths
    }

    /// Resolve a per-tool configuration file, project then global then
    /// framework precedence, returning the first one found (highest
    /// precedence wins, unlike the merged-settings case).
    pub fn resolve_tool_config_path(&self, tool_name: &str, config_file: &str) -> Option<PathBuf> {
        if let Some(project_dir) = self.project_dir() {
            let project_path = project_dir.join("tools").join(tool_name).join(config_file);
            if project_path.exists() {
                return Some(project_path);
            }
        }

        let global_path = self.global_dir().join("tools").join(tool_name).join(config_file);
        if global_path.exists() {
            return Some(global_path);
        }

        let framework_path = self
            .framework_dir
            .join("tools")
            .join(tool_name)
            .join(config_file);
        if framework_path.exists() {
            return Some(framework_path);
        }

        None
    }

    /// Create the global ArchiFlow directory if it doesn't exist.
    pub fn ensure_global_dir(&self) -> io::Result<PathBuf> {
        let dir = self.global_dir();
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Create the project ArchiFlow directory if it doesn't exist.
    pub fn ensure_project_dir(&self) -> io::Result<PathBuf> {
        let dir = self.working_dir.join(".archiflow");
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}

#[cfg(test)]
#[path = "paths_tests.rs"]
mod tests;

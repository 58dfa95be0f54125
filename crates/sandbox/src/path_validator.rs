// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Confines tool-supplied paths to a workspace directory: blocks absolute
//! paths, lexical traversal (`../`), and symlinks whose target escapes the
//! workspace.

use std::path::{Component, Path, PathBuf};

use crate::error::SandboxError;

/// How strictly [`PathValidator`] enforces workspace confinement.
///
/// `Strict` and `Permissive` are not actually differentiated for path
/// validation (only `Disabled` short-circuits); both enforce full
/// confinement and symlink-escape checking identically. The distinction
/// carries real weight for [`crate::command_validator::CommandValidator`]
/// instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    Strict,
    Permissive,
    Disabled,
}

pub struct PathValidator {
    workspace: PathBuf,
    mode: ValidationMode,
}

impl PathValidator {
    /// `workspace` must already exist, rather than silently building a
    /// validator that can never succeed.
    pub fn new(workspace: impl Into<PathBuf>, mode: ValidationMode) -> Result<Self, SandboxError> {
        let workspace = workspace.into();
        let workspace = workspace.canonicalize().map_err(|_| {
            SandboxError::RuntimeInitialization(format!(
                "workspace path does not exist: {}",
                workspace.display()
            ))
        })?;
        tracing::info!(workspace = %workspace.display(), mode = ?mode, "path validator initialized");
        Ok(Self { workspace, mode })
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    /// Validates and resolves `requested`, returning the absolute,
    /// within-workspace path.
    pub fn validate(&self, requested: impl AsRef<Path>) -> Result<PathBuf, SandboxError> {
        let requested = requested.as_ref();

        if self.mode == ValidationMode::Disabled {
            tracing::warn!(path = %requested.display(), "path validation disabled");
            return Ok(normalize(&self.workspace.join(requested)));
        }

        if requested.is_absolute() {
            return Err(SandboxError::PathValidation {
                requested: requested.display().to_string(),
                resolved: requested.display().to_string(),
            });
        }

        let joined = self.workspace.join(requested);
        let resolved = normalize(&joined);

        if !resolved.starts_with(&self.workspace) {
            tracing::warn!(
                requested = %requested.display(),
                resolved = %resolved.display(),
                "blocked path traversal"
            );
            return Err(SandboxError::PathValidation {
                requested: requested.display().to_string(),
                resolved: resolved.display().to_string(),
            });
        }

        if joined.is_symlink() {
            let real = joined.canonicalize().map_err(SandboxError::Io)?;
            if !real.starts_with(&self.workspace) {
                tracing::warn!(
                    requested = %requested.display(),
                    real = %real.display(),
                    "blocked symlink escape"
                );
                return Err(SandboxError::PathValidation {
                    requested: requested.display().to_string(),
                    resolved: real.display().to_string(),
                });
            }
        }

        Ok(resolved)
    }

    pub fn is_safe(&self, requested: impl AsRef<Path>) -> bool {
        self.validate(requested).is_ok()
    }

    /// Converts an absolute within-workspace path back to a relative one.
    pub fn make_relative(&self, absolute: impl AsRef<Path>) -> Result<PathBuf, SandboxError> {
        let absolute = absolute.as_ref();
        absolute
            .strip_prefix(&self.workspace)
            .map(Path::to_path_buf)
            .map_err(|_| SandboxError::PathValidation {
                requested: absolute.display().to_string(),
                resolved: self.workspace.display().to_string(),
            })
    }
}

/// Lexically collapses `.` and `..` components without touching the
/// filesystem, so traversal is caught even for paths that don't exist yet
/// (e.g. a `write` target).
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
#[path = "path_validator_tests.rs"]
mod tests;

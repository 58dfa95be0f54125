// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy for the configuration hierarchy loader.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load {path}: {reason}")]
    ConfigLoadError { path: PathBuf, reason: String },
}

impl ConfigError {
    pub fn load(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        ConfigError::ConfigLoadError {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy for the history manager.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("invalid history configuration: {0}")]
    InvalidConfig(String),
}

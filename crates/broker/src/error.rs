// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy for the message broker and its storage backends.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("queue already exists: {0}")]
    QueueAlreadyExists(String),

    #[error("queue not found: {0}")]
    QueueNotFound(String),

    #[error("message not found: {0}")]
    MessageNotFound(String),

    #[error("broker is not running")]
    BrokerNotRunning,

    #[error("broker is already running")]
    BrokerAlreadyRunning,

    #[error("invalid callback: {0}")]
    InvalidCallback(String),

    #[error("storage backend error: {0}")]
    Storage(#[from] StorageError),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("queue already exists: {0}")]
    QueueAlreadyExists(String),

    #[error("queue not found: {0}")]
    QueueNotFound(String),

    #[error("io error on queue {queue}: {source}")]
    Io {
        queue: String,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt record in queue {queue} segment {segment}: {reason}")]
    CorruptRecord {
        queue: String,
        segment: u32,
        reason: String,
    },

    #[error("failed to (de)serialize message: {0}")]
    Serialization(#[from] serde_json::Error),
}

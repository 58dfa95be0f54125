// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Storage backend abstraction plus its three implementations:
//! in-memory (reference oracle), append-only log (production default),
//! and a directory-rename-based file backend (portable fallback).

pub mod aol;
pub mod file_backend;
pub mod memory;

use async_trait::async_trait;
use std::time::Duration;

use crate::error::StorageError;
use crate::message::Message;

/// Persistence operations a `MessageBroker` drives its queues through.
///
/// All operations must be safe to call from multiple concurrent callers;
/// implementations are expected to hold their own internal locking.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    async fn initialize(&self) -> Result<(), StorageError>;
    async fn close(&self) -> Result<(), StorageError>;

    async fn create_queue(&self, name: &str) -> Result<(), StorageError>;
    async fn delete_queue(&self, name: &str) -> Result<(), StorageError>;

    async fn enqueue(&self, queue: &str, message: Message) -> Result<(), StorageError>;

    /// Block up to `timeout` for a PENDING message. `None` means return
    /// immediately; `Ok(None)` means the wait (or immediate check) found
    /// nothing.
    async fn dequeue(
        &self,
        queue: &str,
        timeout: Option<Duration>,
    ) -> Result<Option<Message>, StorageError>;

    async fn ack(&self, queue: &str, message_id: &str) -> Result<(), StorageError>;
    async fn nack(&self, queue: &str, message_id: &str) -> Result<(), StorageError>;

    async fn move_to_dlq(&self, queue: &str, message: Message) -> Result<(), StorageError>;
    async fn requeue_from_dlq(&self, queue: &str, message_id: &str) -> Result<(), StorageError>;
    async fn delete_dlq_message(&self, queue: &str, message_id: &str) -> Result<(), StorageError>;
    async fn get_dlq_messages(&self, queue: &str) -> Result<Vec<Message>, StorageError>;

    async fn get_queue_depth(&self, queue: &str) -> Result<u64, StorageError>;
    async fn get_dlq_depth(&self, queue: &str) -> Result<u64, StorageError>;
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory storage backend: one pending queue, one DLQ list, and one
//! in-flight map per queue name, all guarded by a single lock per queue.
//! Has no durability and exists as a reference oracle for AOL behavior
//! and for tests that don't need crash-recovery coverage.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::error::StorageError;
use crate::message::Message;
use crate::storage::StorageBackend;

#[derive(Default)]
struct QueueState {
    pending: VecDeque<Message>,
    processing: HashMap<String, Message>,
    dlq: Vec<Message>,
}

struct Queue {
    state: Mutex<QueueState>,
    notify: Notify,
}

impl Default for Queue {
    fn default() -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            notify: Notify::new(),
        }
    }
}

#[derive(Default)]
pub struct MemoryBackend {
    queues: Mutex<HashMap<String, Arc<Queue>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn get_queue(&self, name: &str) -> Result<Arc<Queue>, StorageError> {
        self.queues
            .lock()
            .get(name)
            .cloned()
            .ok_or_else(|| StorageError::QueueNotFound(name.to_string()))
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn initialize(&self) -> Result<(), StorageError> {
        Ok(())
    }

    async fn close(&self) -> Result<(), StorageError> {
        Ok(())
    }

    async fn create_queue(&self, name: &str) -> Result<(), StorageError> {
        let mut queues = self.queues.lock();
        if queues.contains_key(name) {
            return Err(StorageError::QueueAlreadyExists(name.to_string()));
        }
        queues.insert(name.to_string(), Arc::new(Queue::default()));
        Ok(())
    }

    async fn delete_queue(&self, name: &str) -> Result<(), StorageError> {
        self.queues
            .lock()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| StorageError::QueueNotFound(name.to_string()))
    }

    async fn enqueue(&self, queue: &str, message: Message) -> Result<(), StorageError> {
        let q = self.get_queue(queue)?;
        q.state.lock().pending.push_back(message);
        q.notify.notify_one();
        Ok(())
    }

    async fn dequeue(
        &self,
        queue: &str,
        timeout: Option<Duration>,
    ) -> Result<Option<Message>, StorageError> {
        let q = self.get_queue(queue)?;

        if let Some(msg) = pop_pending(&q) {
            return Ok(Some(msg));
        }
        let Some(timeout) = timeout else {
            return Ok(None);
        };

        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return Ok(pop_pending(&q));
            }
            let notified = q.notify.notified();
            if tokio::time::timeout(remaining, notified).await.is_err() {
                return Ok(pop_pending(&q));
            }
            if let Some(msg) = pop_pending(&q) {
                return Ok(Some(msg));
            }
        }
    }

    async fn ack(&self, queue: &str, message_id: &str) -> Result<(), StorageError> {
        let q = self.get_queue(queue)?;
        q.state.lock().processing.remove(message_id);
        Ok(())
    }

    async fn nack(&self, queue: &str, message_id: &str) -> Result<(), StorageError> {
        let q = self.get_queue(queue)?;
        let mut state = q.state.lock();
        if let Some(mut msg) = state.processing.remove(message_id) {
            msg.retry_count += 1;
            state.pending.push_back(msg);
            drop(state);
            q.notify.notify_one();
        }
        Ok(())
    }

    async fn move_to_dlq(&self, queue: &str, message: Message) -> Result<(), StorageError> {
        let q = self.get_queue(queue)?;
        let mut state = q.state.lock();
        state.processing.remove(message.id.as_str());
        state.dlq.push(message);
        Ok(())
    }

    async fn requeue_from_dlq(&self, queue: &str, message_id: &str) -> Result<(), StorageError> {
        let q = self.get_queue(queue)?;
        let mut state = q.state.lock();
        if let Some(pos) = state.dlq.iter().position(|m| m.id.as_str() == message_id) {
            let mut msg = state.dlq.remove(pos);
            msg.retry_count += 1;
            state.pending.push_back(msg);
            drop(state);
            q.notify.notify_one();
        }
        Ok(())
    }

    async fn delete_dlq_message(&self, queue: &str, message_id: &str) -> Result<(), StorageError> {
        let q = self.get_queue(queue)?;
        q.state.lock().dlq.retain(|m| m.id.as_str() != message_id);
        Ok(())
    }

    async fn get_dlq_messages(&self, queue: &str) -> Result<Vec<Message>, StorageError> {
        let q = self.get_queue(queue)?;
        Ok(q.state.lock().dlq.clone())
    }

    async fn get_queue_depth(&self, queue: &str) -> Result<u64, StorageError> {
        let q = self.get_queue(queue)?;
        Ok(q.state.lock().pending.len() as u64)
    }

    async fn get_dlq_depth(&self, queue: &str) -> Result<u64, StorageError> {
        let q = self.get_queue(queue)?;
        Ok(q.state.lock().dlq.len() as u64)
    }
}

fn pop_pending(q: &Queue) -> Option<Message> {
    let mut state = q.state.lock();
    let msg = state.pending.pop_front()?;
    state.processing.insert(msg.id.as_str().to_string(), msg.clone());
    Some(msg)
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;

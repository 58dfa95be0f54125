// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Directory-rename-based storage backend: a portable fallback for when
//! binary-log compaction is undesirable (debugging by hand, NFS-backed
//! workspaces where mmap/seek semantics are unreliable).
//!
//! Each message is a file under `<root>/queues/<name>/{pending,processing,dlq}/`
//! named `<unix_ts>_<uuid>.msg`. The directory a file lives in *is* its
//! state; `pending -> processing -> (gone|dlq)` transitions are plain
//! renames, which are atomic on a single filesystem. There is no segment
//! rotation, no CRC framing, and no compaction — the tradeoff is an
//! `O(n log n)` directory scan per dequeue in exchange for the index
//! being directly inspectable on disk.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::StorageError;
use crate::message::Message;
use crate::storage::StorageBackend;

const DEQUEUE_POLL_INTERVAL: Duration = Duration::from_millis(100);

pub struct FileBackend {
    root: PathBuf,
    // Guards directory creation/listing races; the filesystem itself
    // arbitrates the actual rename-based state transitions.
    lock: Mutex<()>,
}

impl FileBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            lock: Mutex::new(()),
        }
    }

    fn queue_dir(&self, name: &str) -> PathBuf {
        self.root.join("queues").join(name)
    }

    fn state_dir(&self, name: &str, state: &str) -> PathBuf {
        self.queue_dir(name).join(state)
    }

    fn io_err(queue: &str, source: std::io::Error) -> StorageError {
        StorageError::Io {
            queue: queue.to_string(),
            source,
        }
    }

    fn list_sorted(dir: &Path, queue: &str) -> Result<Vec<PathBuf>, StorageError> {
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut names: Vec<PathBuf> = std::fs::read_dir(dir)
            .map_err(|e| Self::io_err(queue, e))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "msg"))
            .collect();
        // Filenames are `<unix_ts>_<uuid>.msg`; lexical sort on the
        // zero-less decimal prefix is not timestamp order in general, so
        // sort by the parsed numeric prefix explicitly.
        names.sort_by_key(|p| file_timestamp(p).unwrap_or(u64::MAX));
        Ok(names)
    }

    fn write_message(dir: &Path, queue: &str, message: &Message, file_name: &str) -> Result<(), StorageError> {
        std::fs::create_dir_all(dir).map_err(|e| Self::io_err(queue, e))?;
        let bytes = serde_json::to_vec(message)?;
        std::fs::write(dir.join(file_name), bytes).map_err(|e| Self::io_err(queue, e))?;
        Ok(())
    }

    fn read_message(path: &Path, queue: &str) -> Result<Message, StorageError> {
        let bytes = std::fs::read(path).map_err(|e| Self::io_err(queue, e))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn find_by_id(dir: &Path, queue: &str, message_id: &str) -> Result<Option<PathBuf>, StorageError> {
        for path in Self::list_sorted(dir, queue)? {
            if let Ok(message) = Self::read_message(&path, queue) {
                if message.id.as_str() == message_id {
                    return Ok(Some(path));
                }
            }
        }
        Ok(None)
    }
}

fn file_name_for(message: &Message) -> String {
    format!("{}_{}.msg", message.timestamp as u64, message.id.as_str())
}

fn file_timestamp(path: &Path) -> Option<u64> {
    path.file_stem()?
        .to_str()?
        .split('_')
        .next()?
        .parse()
        .ok()
}

#[async_trait]
impl StorageBackend for FileBackend {
    async fn initialize(&self) -> Result<(), StorageError> {
        std::fs::create_dir_all(self.root.join("queues")).map_err(|e| Self::io_err("<root>", e))
    }

    async fn close(&self) -> Result<(), StorageError> {
        Ok(())
    }

    async fn create_queue(&self, name: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock();
        let dir = self.queue_dir(name);
        if dir.exists() {
            return Err(StorageError::QueueAlreadyExists(name.to_string()));
        }
        for state in ["pending", "processing", "dlq"] {
            std::fs::create_dir_all(dir.join(state)).map_err(|e| Self::io_err(name, e))?;
        }
        Ok(())
    }

    async fn delete_queue(&self, name: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock();
        let dir = self.queue_dir(name);
        if !dir.exists() {
            return Err(StorageError::QueueNotFound(name.to_string()));
        }
        std::fs::remove_dir_all(&dir).map_err(|e| Self::io_err(name, e))
    }

    async fn enqueue(&self, queue: &str, message: Message) -> Result<(), StorageError> {
        let dir = self.state_dir(queue, "pending");
        if !dir.exists() {
            return Err(StorageError::QueueNotFound(queue.to_string()));
        }
        Self::write_message(&dir, queue, &message, &file_name_for(&message))
    }

    async fn dequeue(
        &self,
        queue: &str,
        timeout: Option<Duration>,
    ) -> Result<Option<Message>, StorageError> {
        let deadline = timeout.map(|t| std::time::Instant::now() + t);
        loop {
            if let Some(message) = self.try_dequeue_once(queue)? {
                return Ok(Some(message));
            }
            let Some(deadline) = deadline else {
                return Ok(None);
            };
            if std::time::Instant::now() >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(
                DEQUEUE_POLL_INTERVAL.min(deadline.saturating_duration_since(std::time::Instant::now())),
            )
            .await;
        }
    }

    async fn ack(&self, queue: &str, message_id: &str) -> Result<(), StorageError> {
        let dir = self.state_dir(queue, "processing");
        if let Some(path) = Self::find_by_id(&dir, queue, message_id)? {
            std::fs::remove_file(path).map_err(|e| Self::io_err(queue, e))?;
        }
        Ok(())
    }

    async fn nack(&self, queue: &str, message_id: &str) -> Result<(), StorageError> {
        let processing_dir = self.state_dir(queue, "processing");
        let Some(path) = Self::find_by_id(&processing_dir, queue, message_id)? else {
            return Ok(());
        };
        let mut message = Self::read_message(&path, queue)?;
        message.retry_count += 1;
        std::fs::remove_file(&path).map_err(|e| Self::io_err(queue, e))?;
        // Filename (and thus FIFO position) is preserved across the rename
        // even though the serialized retry_count inside changes.
        let file_name = path.file_name().and_then(|n| n.to_str()).map(str::to_string);
        let file_name = file_name.unwrap_or_else(|| file_name_for(&message));
        Self::write_message(&self.state_dir(queue, "pending"), queue, &message, &file_name)
    }

    async fn move_to_dlq(&self, queue: &str, message: Message) -> Result<(), StorageError> {
        let processing_dir = self.state_dir(queue, "processing");
        if let Some(path) = Self::find_by_id(&processing_dir, queue, message.id.as_str())? {
            std::fs::remove_file(path).map_err(|e| Self::io_err(queue, e))?;
        }
        Self::write_message(&self.state_dir(queue, "dlq"), queue, &message, &file_name_for(&message))
    }

    async fn requeue_from_dlq(&self, queue: &str, message_id: &str) -> Result<(), StorageError> {
        let dlq_dir = self.state_dir(queue, "dlq");
        let Some(path) = Self::find_by_id(&dlq_dir, queue, message_id)? else {
            return Ok(());
        };
        let mut message = Self::read_message(&path, queue)?;
        message.retry_count += 1;
        std::fs::remove_file(&path).map_err(|e| Self::io_err(queue, e))?;
        Self::write_message(&self.state_dir(queue, "pending"), queue, &message, &file_name_for(&message))
    }

    async fn delete_dlq_message(&self, queue: &str, message_id: &str) -> Result<(), StorageError> {
        let dir = self.state_dir(queue, "dlq");
        if let Some(path) = Self::find_by_id(&dir, queue, message_id)? {
            std::fs::remove_file(path).map_err(|e| Self::io_err(queue, e))?;
        }
        Ok(())
    }

    async fn get_dlq_messages(&self, queue: &str) -> Result<Vec<Message>, StorageError> {
        let dir = self.state_dir(queue, "dlq");
        Self::list_sorted(&dir, queue)?
            .iter()
            .map(|path| Self::read_message(path, queue))
            .collect()
    }

    async fn get_queue_depth(&self, queue: &str) -> Result<u64, StorageError> {
        Ok(Self::list_sorted(&self.state_dir(queue, "pending"), queue)?.len() as u64)
    }

    async fn get_dlq_depth(&self, queue: &str) -> Result<u64, StorageError> {
        Ok(Self::list_sorted(&self.state_dir(queue, "dlq"), queue)?.len() as u64)
    }
}

impl FileBackend {
    fn try_dequeue_once(&self, queue: &str) -> Result<Option<Message>, StorageError> {
        let _guard = self.lock.lock();
        let pending_dir = self.state_dir(queue, "pending");
        let candidates = Self::list_sorted(&pending_dir, queue)?;
        let Some(path) = candidates.into_iter().next() else {
            return Ok(None);
        };
        let message = Self::read_message(&path, queue)?;
        let processing_dir = self.state_dir(queue, "processing");
        std::fs::create_dir_all(&processing_dir).map_err(|e| Self::io_err(queue, e))?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .unwrap_or_else(|| file_name_for(&message));
        std::fs::rename(&path, processing_dir.join(&file_name)).map_err(|e| Self::io_err(queue, e))?;
        Ok(Some(message))
    }
}

#[cfg(test)]
#[path = "file_backend_tests.rs"]
mod tests;

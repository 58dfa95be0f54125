// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only log backend: one segmented log per queue, replayed into an
//! in-memory index on open, with a lazy min-heap for O(log N) dequeue.
//!
//! ACK is optimized: it marks the index entry `Deleted` in memory only and
//! writes no log record. An ACK is therefore only durable across a crash
//! once the queue has been compacted — compaction rewrites the log with
//! only the surviving (non-Deleted) entries, so an un-compacted ACK just
//! replays back to PENDING on the next cold start. This trades some
//! crash-window durability for avoiding doubling log size on the hot path;
//! auto-compaction (default: 50% deletion ratio, 300s cooldown) keeps that
//! window bounded. There is no "classic" ACK-with-record variant in this
//! port — see DESIGN.md.

pub mod index;
pub mod record;
pub mod segment;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use archiflow_core::{Clock, SystemClock};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tracing::warn;

use crate::error::StorageError;
use crate::message::Message;
use crate::storage::StorageBackend;

use index::{EntryState, HeapEntry, IndexEntry, PendingHeap};
use record::{HeaderParseError, RecordType, HEADER_LEN};
use segment::{Segment, DEFAULT_SEGMENT_SIZE_BYTES};

/// Deletion ratio across a queue's index that triggers auto-compaction.
const COMPACTION_DELETE_RATIO: f64 = 0.5;
/// Minimum time between compactions of the same queue.
const COMPACTION_COOLDOWN: Duration = Duration::from_secs(300);
/// Poll granularity while `dequeue` waits for a message to arrive.
const DEQUEUE_POLL_INTERVAL: Duration = Duration::from_millis(100);

struct QueueState {
    segments: HashMap<u32, Segment>,
    active_segment: u32,
    index: HashMap<String, IndexEntry>,
    heap: PendingHeap,
    last_compaction: Option<std::time::Instant>,
}

struct Queue {
    dir: PathBuf,
    state: Mutex<QueueState>,
}

/// Append-only log storage backend. `root` holds one subdirectory per
/// queue under `root/queues/<name>/`.
pub struct AolBackend {
    root: PathBuf,
    segment_size_bytes: u64,
    queues: RwLock<HashMap<String, Arc<Queue>>>,
    /// Sampled fresh at every `enqueue()` push rather than reusing
    /// `Message::timestamp` (see `enqueue`'s doc comment). Type-erased so
    /// `AolBackend` itself doesn't need to be generic over `Clock` the way
    /// `MessageBroker<C>` is.
    clock: Arc<dyn Fn() -> f64 + Send + Sync>,
}

impl AolBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_clock(root, SystemClock)
    }

    /// Build a backend sampling push-time timestamps from `clock` instead of
    /// the real system clock; used by tests that need deterministic ordering.
    pub fn with_clock(root: impl Into<PathBuf>, clock: impl Clock + 'static) -> Self {
        Self {
            root: root.into(),
            segment_size_bytes: DEFAULT_SEGMENT_SIZE_BYTES,
            queues: RwLock::new(HashMap::new()),
            clock: Arc::new(move || clock.epoch_seconds()),
        }
    }

    pub fn with_segment_size_bytes(mut self, bytes: u64) -> Self {
        self.segment_size_bytes = bytes;
        self
    }

    fn queues_root(&self) -> PathBuf {
        self.root.join("queues")
    }

    fn queue_dir(&self, name: &str) -> PathBuf {
        self.queues_root().join(name)
    }

    fn get_queue(&self, name: &str) -> Result<Arc<Queue>, StorageError> {
        self.queues
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| StorageError::QueueNotFound(name.to_string()))
    }

    /// Discover existing queue directories under `root/queues` and open them.
    fn discover(&self) -> Result<(), StorageError> {
        let root = self.queues_root();
        if !root.exists() {
            return Ok(());
        }
        let entries = std::fs::read_dir(&root).map_err(|source| StorageError::Io {
            queue: "<root>".to_string(),
            source,
        })?;
        for entry in entries {
            let entry = entry.map_err(|source| StorageError::Io {
                queue: "<root>".to_string(),
                source,
            })?;
            if !entry.path().is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            let queue = open_queue(&self.queue_dir(&name), &name)?;
            self.queues.write().insert(name, Arc::new(queue));
        }
        Ok(())
    }
}

/// List segment ids present in `dir`, sorted ascending.
fn list_segment_ids(dir: &Path, queue: &str) -> Result<Vec<u32>, StorageError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut ids = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|source| StorageError::Io {
        queue: queue.to_string(),
        source,
    })? {
        let entry = entry.map_err(|source| StorageError::Io {
            queue: queue.to_string(),
            source,
        })?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if let Some(stem) = name.strip_suffix(".log") {
            if let Ok(id) = stem.parse::<u32>() {
                ids.push(id);
            }
        }
    }
    ids.sort_unstable();
    Ok(ids)
}

/// Open (or create) a queue directory, replaying every segment to build
/// the in-memory index and pending heap.
fn open_queue(dir: &Path, queue: &str) -> Result<Queue, StorageError> {
    std::fs::create_dir_all(dir).map_err(|source| StorageError::Io {
        queue: queue.to_string(),
        source,
    })?;

    let ids = list_segment_ids(dir, queue)?;
    let mut index: HashMap<String, IndexEntry> = HashMap::new();
    let mut heap = PendingHeap::new();
    let mut segments = HashMap::new();

    let active_segment = ids.last().copied().unwrap_or(0);

    if ids.is_empty() {
        let segment = Segment::open(dir, 0, queue)?;
        segments.insert(0, segment);
    } else {
        for id in &ids {
            let segment = Segment::open(dir, *id, queue)?;
            replay_segment(&segment, *id, queue, &mut index, &mut heap)?;
            segments.insert(*id, segment);
        }
    }

    // Cold-start reconciliation: PROCESSING entries left over from a crash
    // mid-call are unsafe to leave as-is for at-least-once delivery, so
    // they are demoted back to PENDING and re-pushed onto the heap.
    for (id, entry) in index.iter_mut() {
        if entry.state == EntryState::Processing {
            entry.state = EntryState::Pending;
            heap.push(HeapEntry {
                timestamp: entry.timestamp,
                offset: entry.offset,
                segment_id: entry.segment_id,
                message_id: id.clone(),
            });
        }
    }

    Ok(Queue {
        dir: dir.to_path_buf(),
        state: Mutex::new(QueueState {
            segments,
            active_segment,
            index,
            heap,
            last_compaction: None,
        }),
    })
}

fn replay_segment(
    segment: &Segment,
    segment_id: u32,
    queue: &str,
    index: &mut HashMap<String, IndexEntry>,
    heap: &mut PendingHeap,
) -> Result<(), StorageError> {
    use std::io::Read;

    let mut reader = segment.reader(queue)?;
    let mut offset: u64 = 0;

    loop {
        let mut header_buf = [0u8; HEADER_LEN];
        match reader.read_exact(&mut header_buf) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(source) => {
                return Err(StorageError::Io {
                    queue: queue.to_string(),
                    source,
                })
            }
        }

        let header = match record::parse_header(&header_buf) {
            Ok(h) => h,
            Err(HeaderParseError::Truncated) => break,
            Err(HeaderParseError::BadMagic) => {
                warn!(queue, segment_id, offset, "bad magic byte, stopping replay of segment");
                break;
            }
            Err(HeaderParseError::UnknownType(t)) => {
                warn!(queue, segment_id, offset, record_type = t, "unknown record type, stopping replay");
                break;
            }
        };

        let mut payload = vec![0u8; header.length as usize];
        match reader.read_exact(&mut payload) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                warn!(queue, segment_id, offset, "truncated payload at end of segment, stopping replay");
                break;
            }
            Err(source) => {
                return Err(StorageError::Io {
                    queue: queue.to_string(),
                    source,
                })
            }
        }

        if !record::verify_crc(&header, &payload) {
            warn!(queue, segment_id, offset, "CRC mismatch, skipping record");
            offset += (HEADER_LEN + payload.len()) as u64;
            continue;
        }

        let record_offset = offset;
        offset += (HEADER_LEN + payload.len()) as u64;

        match header.record_type {
            RecordType::Enqueue => {
                let message: Message = match serde_json::from_slice(&payload) {
                    Ok(m) => m,
                    Err(e) => {
                        warn!(queue, segment_id, offset = record_offset, error = %e, "corrupt ENQUEUE payload, skipping");
                        continue;
                    }
                };
                let id = message.id.as_str().to_string();
                index.insert(
                    id.clone(),
                    IndexEntry {
                        offset: record_offset,
                        length: (HEADER_LEN + payload.len()) as u32,
                        state: EntryState::Pending,
                        retry_count: message.retry_count,
                        timestamp: header.timestamp,
                        segment_id,
                    },
                );
                heap.push(HeapEntry {
                    timestamp: header.timestamp,
                    offset: record_offset,
                    segment_id,
                    message_id: id,
                });
            }
            RecordType::Ack => {
                if let Some(id) = decode_id(&payload, queue, segment_id, record_offset) {
                    if let Some(entry) = index.get_mut(&id) {
                        entry.state = EntryState::Deleted;
                    }
                }
            }
            RecordType::Nack => {
                if let Some(id) = decode_id(&payload, queue, segment_id, record_offset) {
                    if let Some(entry) = index.get_mut(&id) {
                        entry.retry_count += 1;
                        entry.state = EntryState::Pending;
                        heap.push(HeapEntry {
                            timestamp: entry.timestamp,
                            offset: entry.offset,
                            segment_id: entry.segment_id,
                            message_id: id,
                        });
                    }
                }
            }
            RecordType::Processing => {
                if let Some(id) = decode_id(&payload, queue, segment_id, record_offset) {
                    if let Some(entry) = index.get_mut(&id) {
                        entry.state = EntryState::Processing;
                    }
                }
            }
            RecordType::Dlq => {
                if let Some(id) = decode_id(&payload, queue, segment_id, record_offset) {
                    if let Some(entry) = index.get_mut(&id) {
                        entry.state = EntryState::Dlq;
                    }
                }
            }
        }
    }

    Ok(())
}

fn decode_id(payload: &[u8], queue: &str, segment_id: u32, offset: u64) -> Option<String> {
    match std::str::from_utf8(payload) {
        Ok(s) => Some(s.to_string()),
        Err(_) => {
            warn!(queue, segment_id, offset, "non-UTF8 message id in record, skipping");
            None
        }
    }
}

impl QueueState {
    fn active_segment_mut(&mut self, queue: &str) -> Result<&mut Segment, StorageError> {
        self.segments
            .get_mut(&self.active_segment)
            .ok_or_else(|| StorageError::CorruptRecord {
                queue: queue.to_string(),
                segment: self.active_segment,
                reason: "active segment not open".to_string(),
            })
    }

    fn append_active(&mut self, bytes: &[u8], queue: &str) -> Result<(u64, u32), StorageError> {
        let active_id = self.active_segment;
        let offset = self.active_segment_mut(queue)?.append(bytes, queue)?;
        Ok((offset, active_id))
    }

    fn maybe_rotate(&mut self, queue: &str, threshold: u64) -> Result<(), StorageError> {
        if self.active_segment_mut(queue)?.size() < threshold {
            return Ok(());
        }
        let next_id = self.active_segment + 1;
        let dir = self.dir.clone();
        let segment = Segment::open(&dir, next_id, queue)?;
        self.segments.insert(next_id, segment);
        self.active_segment = next_id;
        tracing::info!(queue, segment_id = next_id, "rotated AOL segment");
        Ok(())
    }

    fn read_payload(&self, entry: &IndexEntry, queue: &str) -> Result<Vec<u8>, StorageError> {
        let segment = self
            .segments
            .get(&entry.segment_id)
            .ok_or_else(|| StorageError::CorruptRecord {
                queue: queue.to_string(),
                segment: entry.segment_id,
                reason: "segment not open".to_string(),
            })?;
        let full = segment.read_at(entry.offset, entry.length as usize, queue)?;
        Ok(full[HEADER_LEN..].to_vec())
    }
}

#[async_trait]
impl StorageBackend for AolBackend {
    async fn initialize(&self) -> Result<(), StorageError> {
        self.discover()
    }

    async fn close(&self) -> Result<(), StorageError> {
        Ok(())
    }

    async fn create_queue(&self, name: &str) -> Result<(), StorageError> {
        let mut queues = self.queues.write();
        if queues.contains_key(name) {
            return Err(StorageError::QueueAlreadyExists(name.to_string()));
        }
        let queue = open_queue(&self.queue_dir(name), name)?;
        queues.insert(name.to_string(), Arc::new(queue));
        Ok(())
    }

    async fn delete_queue(&self, name: &str) -> Result<(), StorageError> {
        let mut queues = self.queues.write();
        if queues.remove(name).is_none() {
            return Err(StorageError::QueueNotFound(name.to_string()));
        }
        let dir = self.queue_dir(name);
        if dir.exists() {
            std::fs::remove_dir_all(&dir).map_err(|source| StorageError::Io {
                queue: name.to_string(),
                source,
            })?;
        }
        Ok(())
    }

    async fn enqueue(&self, queue_name: &str, message: Message) -> Result<(), StorageError> {
        let queue = self.get_queue(queue_name)?;
        // Sampled at push time rather than reusing `message.timestamp` (the
        // message-creation-time value), so the heap's arrival-order
        // tie-breaking reflects when the message actually entered the log.
        let push_timestamp = (self.clock)();
        let payload = serde_json::to_vec(&message)?;
        let bytes = record::encode(RecordType::Enqueue, push_timestamp, &payload);
        let id = message.id.as_str().to_string();

        let mut state = queue.state.lock();
        state.maybe_rotate(queue_name, self.segment_size_bytes)?;
        let (offset, segment_id) = state.append_active(&bytes, queue_name)?;
        state.index.insert(
            id.clone(),
            IndexEntry {
                offset,
                length: bytes.len() as u32,
                state: EntryState::Pending,
                retry_count: message.retry_count,
                timestamp: push_timestamp,
                segment_id,
            },
        );
        state.heap.push(HeapEntry {
            timestamp: push_timestamp,
            offset,
            segment_id,
            message_id: id,
        });
        Ok(())
    }

    async fn dequeue(
        &self,
        queue_name: &str,
        timeout: Option<Duration>,
    ) -> Result<Option<Message>, StorageError> {
        let queue = self.get_queue(queue_name)?;
        let deadline = timeout.map(|t| std::time::Instant::now() + t);

        loop {
            if let Some(message) = self.try_dequeue_once(&queue, queue_name)? {
                return Ok(Some(message));
            }
            let Some(deadline) = deadline else {
                return Ok(None);
            };
            if std::time::Instant::now() >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(DEQUEUE_POLL_INTERVAL.min(
                deadline.saturating_duration_since(std::time::Instant::now()),
            ))
            .await;
        }
    }

    async fn ack(&self, queue_name: &str, message_id: &str) -> Result<(), StorageError> {
        let queue = self.get_queue(queue_name)?;
        let mut state = queue.state.lock();
        let should_compact = {
            let Some(entry) = state.index.get_mut(message_id) else {
                return Ok(());
            };
            if entry.state == EntryState::Dlq {
                // DLQ entries must go through delete_dlq_message.
                return Ok(());
            }
            entry.state = EntryState::Deleted;
            deletion_ratio_exceeded(&state.index) && cooldown_elapsed(&state.last_compaction)
        };
        drop(state);
        if should_compact {
            self.compact_queue(&queue, queue_name)?;
        }
        Ok(())
    }

    async fn nack(&self, queue_name: &str, message_id: &str) -> Result<(), StorageError> {
        let queue = self.get_queue(queue_name)?;
        let payload = message_id.as_bytes();
        let mut state = queue.state.lock();
        let Some(timestamp) = state.index.get(message_id).map(|e| e.timestamp) else {
            return Ok(());
        };
        let bytes = record::encode(RecordType::Nack, timestamp, payload);
        state.maybe_rotate(queue_name, self.segment_size_bytes)?;
        state.append_active(&bytes, queue_name)?;

        let Some(entry) = state.index.get_mut(message_id) else {
            return Ok(());
        };
        entry.retry_count += 1;
        entry.state = EntryState::Pending;
        let (orig_offset, orig_segment, orig_ts) = (entry.offset, entry.segment_id, entry.timestamp);
        state.heap.push(HeapEntry {
            timestamp: orig_ts,
            offset: orig_offset,
            segment_id: orig_segment,
            message_id: message_id.to_string(),
        });
        Ok(())
    }

    async fn move_to_dlq(&self, queue_name: &str, message: Message) -> Result<(), StorageError> {
        let queue = self.get_queue(queue_name)?;
        let id = message.id.as_str();
        let bytes = record::encode(RecordType::Dlq, message.timestamp, id.as_bytes());
        let mut state = queue.state.lock();
        state.maybe_rotate(queue_name, self.segment_size_bytes)?;
        state.append_active(&bytes, queue_name)?;
        if let Some(entry) = state.index.get_mut(id) {
            entry.state = EntryState::Dlq;
        }
        Ok(())
    }

    async fn requeue_from_dlq(&self, queue_name: &str, message_id: &str) -> Result<(), StorageError> {
        self.nack(queue_name, message_id).await
    }

    async fn delete_dlq_message(&self, queue_name: &str, message_id: &str) -> Result<(), StorageError> {
        let queue = self.get_queue(queue_name)?;
        let mut state = queue.state.lock();
        if let Some(entry) = state.index.get_mut(message_id) {
            if entry.state == EntryState::Dlq {
                entry.state = EntryState::Deleted;
            }
        }
        Ok(())
    }

    async fn get_dlq_messages(&self, queue_name: &str) -> Result<Vec<Message>, StorageError> {
        let queue = self.get_queue(queue_name)?;
        let state = queue.state.lock();
        let mut out = Vec::new();
        for entry in state.index.values() {
            if entry.state == EntryState::Dlq {
                let payload = state.read_payload(entry, queue_name)?;
                out.push(serde_json::from_slice(&payload)?);
            }
        }
        Ok(out)
    }

    async fn get_queue_depth(&self, queue_name: &str) -> Result<u64, StorageError> {
        let queue = self.get_queue(queue_name)?;
        let state = queue.state.lock();
        Ok(state
            .index
            .values()
            .filter(|e| e.state == EntryState::Pending)
            .count() as u64)
    }

    async fn get_dlq_depth(&self, queue_name: &str) -> Result<u64, StorageError> {
        let queue = self.get_queue(queue_name)?;
        let state = queue.state.lock();
        Ok(state
            .index
            .values()
            .filter(|e| e.state == EntryState::Dlq)
            .count() as u64)
    }
}

fn deletion_ratio_exceeded(index: &HashMap<String, IndexEntry>) -> bool {
    if index.is_empty() {
        return false;
    }
    let deleted = index.values().filter(|e| e.state == EntryState::Deleted).count();
    (deleted as f64 / index.len() as f64) >= COMPACTION_DELETE_RATIO
}

fn cooldown_elapsed(last: &Option<std::time::Instant>) -> bool {
    match last {
        None => true,
        Some(last) => last.elapsed() >= COMPACTION_COOLDOWN,
    }
}

impl AolBackend {
    /// Pop heap entries until a still-PENDING one is found, transition it to
    /// PROCESSING, and return its deserialized message. `None` means the
    /// queue had nothing pending right now (caller decides whether to poll).
    fn try_dequeue_once(
        &self,
        queue: &Arc<Queue>,
        queue_name: &str,
    ) -> Result<Option<Message>, StorageError> {
        let mut state = queue.state.lock();
        let (message_id, entry_snapshot) = loop {
            let Some(hint) = state.heap.pop() else {
                return Ok(None);
            };
            match state.index.get(&hint.message_id) {
                Some(entry) if entry.state == EntryState::Pending => {
                    break (hint.message_id, entry.clone());
                }
                _ => continue, // stale hint: deleted, requeued elsewhere, or already processing
            }
        };

        let payload = state.read_payload(&entry_snapshot, queue_name)?;
        let mut message: Message = serde_json::from_slice(&payload)?;
        message.retry_count = entry_snapshot.retry_count;

        let bytes = record::encode(RecordType::Processing, entry_snapshot.timestamp, message_id.as_bytes());
        state.maybe_rotate(queue_name, self.segment_size_bytes)?;
        state.append_active(&bytes, queue_name)?;
        if let Some(entry) = state.index.get_mut(&message_id) {
            entry.state = EntryState::Processing;
        }

        Ok(Some(message))
    }

    /// Rewrite `queue`'s log keeping only non-Deleted entries, preserving
    /// their relative timestamp order. Stop-the-world under the queue lock.
    fn compact_queue(&self, queue: &Arc<Queue>, queue_name: &str) -> Result<(), StorageError> {
        let mut state = queue.state.lock();

        let mut survivors: Vec<(String, IndexEntry, Vec<u8>)> = Vec::new();
        for (id, entry) in state.index.iter() {
            if entry.state == EntryState::Deleted {
                continue;
            }
            let payload = state.read_payload(entry, queue_name)?;
            survivors.push((id.clone(), entry.clone(), payload));
        }
        survivors.sort_by(|a, b| a.1.timestamp.partial_cmp(&b.1.timestamp).unwrap_or(std::cmp::Ordering::Equal));

        let tmp_path = state.dir.join("compacted.log");
        {
            let mut tmp = std::fs::File::create(&tmp_path).map_err(|source| StorageError::Io {
                queue: queue_name.to_string(),
                source,
            })?;
            use std::io::Write;
            for (_, entry, payload) in &survivors {
                // Re-serialize with the current retry_count so a compacted
                // PENDING message carries its accumulated retries forward.
                let mut message: Message = serde_json::from_slice(payload)?;
                message.retry_count = entry.retry_count;
                let reserialized = serde_json::to_vec(&message)?;
                let bytes = record::encode(RecordType::Enqueue, entry.timestamp, &reserialized);
                tmp.write_all(&bytes).map_err(|source| StorageError::Io {
                    queue: queue_name.to_string(),
                    source,
                })?;
            }
            tmp.sync_all().map_err(|source| StorageError::Io {
                queue: queue_name.to_string(),
                source,
            })?;
        }

        for id in state.segments.keys().copied().collect::<Vec<_>>() {
            let path = state.segments[&id].path.clone();
            drop(state.segments.remove(&id));
            let _ = std::fs::remove_file(path);
        }

        let final_path = state.dir.join("0000.log");
        std::fs::rename(&tmp_path, &final_path).map_err(|source| StorageError::Io {
            queue: queue_name.to_string(),
            source,
        })?;

        let mut new_index = HashMap::new();
        let mut new_heap = PendingHeap::new();
        let mut offset = 0u64;
        for (id, entry, payload) in &survivors {
            let mut message: Message = serde_json::from_slice(payload)?;
            message.retry_count = entry.retry_count;
            let reserialized = serde_json::to_vec(&message)?;
            let bytes = record::encode(RecordType::Enqueue, entry.timestamp, &reserialized);
            let new_entry = IndexEntry {
                offset,
                length: bytes.len() as u32,
                state: entry.state,
                retry_count: entry.retry_count,
                timestamp: entry.timestamp,
                segment_id: 0,
            };
            if new_entry.state == EntryState::Pending {
                new_heap.push(HeapEntry {
                    timestamp: entry.timestamp,
                    offset,
                    segment_id: 0,
                    message_id: id.clone(),
                });
            }
            offset += bytes.len() as u64;
            new_index.insert(id.clone(), new_entry);
        }

        let segment = Segment::open(&state.dir, 0, queue_name)?;
        state.segments = HashMap::from([(0, segment)]);
        state.active_segment = 0;
        state.index = new_index;
        state.heap = new_heap;
        state.last_compaction = Some(std::time::Instant::now());

        tracing::info!(queue = queue_name, survivors = survivors.len(), "compacted AOL queue");
        Ok(())
    }
}

#[cfg(test)]
#[path = "aol_tests.rs"]
mod tests;

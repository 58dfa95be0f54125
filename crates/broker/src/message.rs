// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Message and QueueConfig: the wire-level unit the broker moves around,
//! and the per-queue policy attached to it.

use std::collections::HashMap;

use archiflow_core::Clock;
use serde::{Deserialize, Serialize};
use serde_json::Value;

archiflow_core::define_id! {
    pub struct MessageId;
}

/// A message payload. Closed sum type rather than a dynamically-typed
/// `Any`: the wire format tags which variant it is, so a replayed AOL
/// record round-trips exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum Payload {
    Json(Value),
    Bytes(Vec<u8>),
    String(String),
}

impl From<Value> for Payload {
    fn from(v: Value) -> Self {
        Payload::Json(v)
    }
}

impl From<String> for Payload {
    fn from(s: String) -> Self {
        Payload::String(s)
    }
}

impl From<&str> for Payload {
    fn from(s: &str) -> Self {
        Payload::String(s.to_string())
    }
}

impl From<Vec<u8>> for Payload {
    fn from(b: Vec<u8>) -> Self {
        Payload::Bytes(b)
    }
}

/// A single message/task moving through a topic or a queue.
///
/// `id`, `timestamp`, and `topic` are immutable after creation; `retry_count`
/// and `error` are mutated in place by the broker's worker loop as retries
/// are exhausted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub topic: String,
    pub payload: Payload,
    pub timestamp: f64,
    pub retry_count: u32,
    pub max_retries: u32,
    pub error: Option<String>,
    pub metadata: HashMap<String, Value>,
}

impl Message {
    /// Create a new message with a fresh id and the clock's current time.
    pub fn create(
        clock: &impl Clock,
        topic: impl Into<String>,
        payload: impl Into<Payload>,
        max_retries: u32,
        metadata: HashMap<String, Value>,
    ) -> Self {
        Self {
            id: MessageId::new(uuid::Uuid::new_v4().to_string()),
            topic: topic.into(),
            payload: payload.into(),
            timestamp: clock.epoch_seconds(),
            retry_count: 0,
            max_retries,
            error: None,
            metadata,
        }
    }

    pub fn can_retry(&self) -> bool {
        self.retry_count <= self.max_retries
    }
}

/// Per-queue configuration, fixed at creation time and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueConfig {
    pub name: String,
    pub max_retries: u32,
    pub dlq_enabled: bool,
}

impl QueueConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            max_retries: 3,
            dlq_enabled: true,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_dlq_enabled(mut self, dlq_enabled: bool) -> Self {
        self.dlq_enabled = dlq_enabled;
        self
    }
}

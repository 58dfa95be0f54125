// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Concurrent, persistent message broker: pub/sub topics plus
//! at-least-once task queues, backed by a pluggable [`storage::StorageBackend`].

mod broker;
mod error;
mod message;
mod metrics;
pub mod storage;

pub use broker::{BoxFuture, MessageBroker, SubscriberFn, WorkerFn};
pub use error::{BrokerError, StorageError};
pub use message::{Message, MessageId, Payload, QueueConfig};
pub use metrics::{MetricsCollector, QueueMetrics, TopicMetrics};
pub use storage::aol::AolBackend;
pub use storage::file_backend::FileBackend;
pub use storage::memory::MemoryBackend;
pub use storage::StorageBackend;

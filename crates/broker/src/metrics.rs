// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Thread-safe counters for queues, topics, and the broker as a whole.
//!
//! Every mutation goes through the single `Mutex` guarding `Inner`; readers
//! get fresh, owned copies so that a caller mutating a returned snapshot
//! never reaches back into the collector's state.

use std::collections::BTreeMap;

use archiflow_core::Clock;
use parking_lot::Mutex;

const PROCESSING_TIME_WINDOW: usize = 1000;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueueMetrics {
    pub published: u64,
    pub processed: u64,
    pub failed: u64,
    pub dlq_count: u64,
    pub depth: u64,
    pub worker_count: u32,
    processing_times_ms: Vec<f64>,
}

impl QueueMetrics {
    pub fn avg_processing_time_ms(&self) -> f64 {
        if self.processing_times_ms.is_empty() {
            return 0.0;
        }
        self.processing_times_ms.iter().sum::<f64>() / self.processing_times_ms.len() as f64
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TopicMetrics {
    pub published: u64,
    pub subscriber_count: u32,
    pub failed_deliveries: u64,
}

struct Inner {
    queues: BTreeMap<String, QueueMetrics>,
    topics: BTreeMap<String, TopicMetrics>,
    start_time: f64,
    active_threads: u32,
}

/// Collects counters for every queue and topic under a single lock.
pub struct MetricsCollector {
    inner: Mutex<Inner>,
}

impl MetricsCollector {
    pub fn new(clock: &impl Clock) -> Self {
        Self {
            inner: Mutex::new(Inner {
                queues: BTreeMap::new(),
                topics: BTreeMap::new(),
                start_time: clock.epoch_seconds(),
                active_threads: 0,
            }),
        }
    }

    // --- Queue metrics ---

    pub fn increment_queue_published(&self, queue: &str) {
        self.inner.lock().queues.entry(queue.to_string()).or_default().published += 1;
    }

    pub fn increment_queue_processed(&self, queue: &str) {
        self.inner.lock().queues.entry(queue.to_string()).or_default().processed += 1;
    }

    pub fn increment_queue_failed(&self, queue: &str) {
        self.inner.lock().queues.entry(queue.to_string()).or_default().failed += 1;
    }

    pub fn increment_queue_dlq_count(&self, queue: &str) {
        self.inner.lock().queues.entry(queue.to_string()).or_default().dlq_count += 1;
    }

    pub fn decrement_queue_dlq_count(&self, queue: &str) {
        let mut inner = self.inner.lock();
        let m = inner.queues.entry(queue.to_string()).or_default();
        if m.dlq_count > 0 {
            m.dlq_count -= 1;
        }
    }

    pub fn record_processing_time(&self, queue: &str, time_ms: f64) {
        let mut inner = self.inner.lock();
        let m = inner.queues.entry(queue.to_string()).or_default();
        m.processing_times_ms.push(time_ms);
        if m.processing_times_ms.len() > PROCESSING_TIME_WINDOW {
            m.processing_times_ms.remove(0);
        }
    }

    pub fn set_queue_depth(&self, queue: &str, depth: u64) {
        self.inner.lock().queues.entry(queue.to_string()).or_default().depth = depth;
    }

    pub fn set_worker_count(&self, queue: &str, count: u32) {
        self.inner.lock().queues.entry(queue.to_string()).or_default().worker_count = count;
    }

    pub fn queue_stats(&self, queue: &str) -> QueueMetrics {
        self.inner.lock().queues.get(queue).cloned().unwrap_or_default()
    }

    pub fn reset_queue_metrics(&self, queue: &str) {
        self.inner.lock().queues.insert(queue.to_string(), QueueMetrics::default());
    }

    // --- Topic metrics ---

    pub fn increment_topic_published(&self, topic: &str) {
        self.inner.lock().topics.entry(topic.to_string()).or_default().published += 1;
    }

    pub fn increment_topic_failed_delivery(&self, topic: &str) {
        self.inner.lock().topics.entry(topic.to_string()).or_default().failed_deliveries += 1;
    }

    pub fn set_subscriber_count(&self, topic: &str, count: u32) {
        self.inner.lock().topics.entry(topic.to_string()).or_default().subscriber_count = count;
    }

    pub fn topic_stats(&self, topic: &str) -> TopicMetrics {
        self.inner.lock().topics.get(topic).cloned().unwrap_or_default()
    }

    // --- System-wide metrics ---

    pub fn total_messages(&self) -> u64 {
        let inner = self.inner.lock();
        inner.queues.values().map(|m| m.published).sum::<u64>()
            + inner.topics.values().map(|m| m.published).sum::<u64>()
    }

    pub fn uptime_seconds(&self, clock: &impl Clock) -> f64 {
        clock.epoch_seconds() - self.inner.lock().start_time
    }

    pub fn set_active_threads(&self, count: u32) {
        self.inner.lock().active_threads = count;
    }

    pub fn active_threads(&self) -> u32 {
        self.inner.lock().active_threads
    }

    pub fn list_queues(&self) -> Vec<String> {
        self.inner.lock().queues.keys().cloned().collect()
    }

    pub fn list_topics(&self) -> Vec<String> {
        self.inner.lock().topics.keys().cloned().collect()
    }

    pub fn reset_all(&self, clock: &impl Clock) {
        let mut inner = self.inner.lock();
        inner.queues.clear();
        inner.topics.clear();
        inner.start_time = clock.epoch_seconds();
        inner.active_threads = 0;
    }
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;

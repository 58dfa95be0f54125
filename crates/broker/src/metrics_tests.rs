// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use archiflow_core::SystemClock;

#[test]
fn queue_counters_accumulate() {
    let m = MetricsCollector::new(&SystemClock);
    m.increment_queue_published("q");
    m.increment_queue_published("q");
    m.increment_queue_processed("q");
    let stats = m.queue_stats("q");
    assert_eq!(stats.published, 2);
    assert_eq!(stats.processed, 1);
}

#[test]
fn dlq_count_does_not_go_negative() {
    let m = MetricsCollector::new(&SystemClock);
    m.decrement_queue_dlq_count("q");
    assert_eq!(m.queue_stats("q").dlq_count, 0);
}

#[test]
fn processing_time_window_is_capped() {
    let m = MetricsCollector::new(&SystemClock);
    for i in 0..1500 {
        m.record_processing_time("q", i as f64);
    }
    let avg = m.queue_stats("q").avg_processing_time_ms();
    // Only the last 1000 samples (500..1499) should remain.
    assert!((avg - 999.5).abs() < 1.0);
}

#[test]
fn total_messages_sums_queues_and_topics() {
    let m = MetricsCollector::new(&SystemClock);
    m.increment_queue_published("q");
    m.increment_topic_published("t");
    m.increment_topic_published("t");
    assert_eq!(m.total_messages(), 3);
}

#[test]
fn snapshots_are_independent_copies() {
    let m = MetricsCollector::new(&SystemClock);
    m.increment_queue_published("q");
    let mut snap = m.queue_stats("q");
    snap.published = 999;
    assert_eq!(m.queue_stats("q").published, 1);
}

#[test]
fn list_topics_and_queues_reflect_seen_names() {
    let m = MetricsCollector::new(&SystemClock);
    m.increment_queue_published("a");
    m.increment_topic_published("t1");
    assert_eq!(m.list_queues(), vec!["a".to_string()]);
    assert_eq!(m.list_topics(), vec!["t1".to_string()]);
}

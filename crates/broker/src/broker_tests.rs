// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::storage::memory::MemoryBackend;
use archiflow_core::SystemClock;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::sync::Mutex as AsyncMutex;

fn new_broker() -> MessageBroker<SystemClock> {
    MessageBroker::new(Arc::new(MemoryBackend::new()), SystemClock)
}

fn ok_subscriber(counter: Arc<AtomicU32>) -> SubscriberFn {
    Arc::new(move |_msg| {
        let counter = Arc::clone(&counter);
        Box::pin(async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    })
}

#[tokio::test]
async fn publish_fans_out_to_every_subscriber_exactly_once() {
    let broker = new_broker();
    broker.start().await.unwrap();

    let a = Arc::new(AtomicU32::new(0));
    let b = Arc::new(AtomicU32::new(0));
    broker.subscribe("topic", ok_subscriber(Arc::clone(&a)));
    broker.subscribe("topic", ok_subscriber(Arc::clone(&b)));

    broker.publish("topic", "hello", HashMap::new()).await;
    // Delivery runs on a spawned task; give it a tick to run.
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(a.load(Ordering::SeqCst), 1);
    assert_eq!(b.load(Ordering::SeqCst), 1);
    assert_eq!(broker.get_topic_stats("topic").published, 1);
}

#[tokio::test]
async fn subscriber_order_is_preserved_per_message() {
    let broker = new_broker();
    broker.start().await.unwrap();

    let order: Arc<AsyncMutex<Vec<u32>>> = Arc::new(AsyncMutex::new(Vec::new()));
    for id in 0..3u32 {
        let order = Arc::clone(&order);
        broker.subscribe(
            "topic",
            Arc::new(move |_msg| {
                let order = Arc::clone(&order);
                Box::pin(async move {
                    order.lock().await.push(id);
                    Ok(())
                })
            }),
        );
    }

    broker.publish("topic", "x", HashMap::new()).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(*order.lock().await, vec![0, 1, 2]);
}

#[tokio::test]
async fn failing_subscriber_is_counted_but_does_not_block_others() {
    let broker = new_broker();
    broker.start().await.unwrap();

    let after = Arc::new(AtomicU32::new(0));
    broker.subscribe(
        "topic",
        Arc::new(|_msg| Box::pin(async move { Err("boom".to_string()) })),
    );
    broker.subscribe("topic", ok_subscriber(Arc::clone(&after)));

    broker.publish("topic", "x", HashMap::new()).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(after.load(Ordering::SeqCst), 1);
    assert_eq!(broker.get_topic_stats("topic").failed_deliveries, 1);
}

#[tokio::test]
async fn worker_processes_enqueued_task_and_acks() {
    let broker = new_broker();
    broker.create_queue("q", 2, true).await.unwrap();
    broker.start().await.unwrap();

    let seen = Arc::new(AsyncMutex::new(Vec::new()));
    let seen_clone = Arc::clone(&seen);
    broker
        .register_worker(
            "q",
            Arc::new(move |payload| {
                let seen = Arc::clone(&seen_clone);
                Box::pin(async move {
                    seen.lock().await.push(payload);
                    Ok(())
                })
            }),
            1,
        )
        .unwrap();

    broker.enqueue("q", "work-item", HashMap::new()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(seen.lock().await.len(), 1);
    assert_eq!(broker.get_queue_stats("q").processed, 1);
}

#[tokio::test]
async fn retry_to_dlq_s2() {
    let broker = new_broker();
    broker.create_queue("q", 2, true).await.unwrap();
    broker.start().await.unwrap();

    let attempts = Arc::new(AtomicU32::new(0));
    let attempts_clone = Arc::clone(&attempts);
    broker
        .register_worker(
            "q",
            Arc::new(move |_payload| {
                attempts_clone.fetch_add(1, Ordering::SeqCst);
                Box::pin(async move { Err("boom".to_string()) })
            }),
            1,
        )
        .unwrap();

    broker
        .enqueue("q", serde_json::json!({"k": 1}), HashMap::new())
        .await
        .unwrap();

    // max_retries=2 means 3 total attempts before landing in the DLQ.
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        if !broker.get_dlq_messages("q").await.unwrap().is_empty() || Instant::now() >= deadline {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    let dlq = broker.get_dlq_messages("q").await.unwrap();
    assert_eq!(dlq.len(), 1);
    assert_eq!(dlq[0].payload, Payload::Json(serde_json::json!({"k": 1})));
    assert!(dlq[0].error.as_deref().unwrap_or_default().contains("boom"));
    assert_eq!(broker.get_queue_stats("q").dlq_count, 1);
}

#[tokio::test]
async fn list_topics_unions_subscriptions_and_metrics() {
    let broker = new_broker();
    broker.start().await.unwrap();
    broker.subscribe("only-subscribed", ok_subscriber(Arc::new(AtomicU32::new(0))));
    broker.publish("only-published", "x", HashMap::new()).await;
    tokio::time::sleep(Duration::from_millis(20)).await;

    let topics = broker.list_topics();
    assert!(topics.contains(&"only-subscribed".to_string()));
    assert!(topics.contains(&"only-published".to_string()));
}

#[tokio::test]
async fn purge_queue_resets_depth_and_returns_prior_depth() {
    let broker = new_broker();
    broker.create_queue("q", 3, true).await.unwrap();
    broker.enqueue("q", "a", HashMap::new()).await.unwrap();
    broker.enqueue("q", "b", HashMap::new()).await.unwrap();

    let prior = broker.purge_queue("q").await.unwrap();
    assert_eq!(prior, 2);
    assert_eq!(broker.get_queue_stats("q").depth, 0);
}

#[tokio::test]
async fn stop_is_idempotent_and_joins_tasks() {
    let broker = new_broker();
    broker.create_queue("q", 1, true).await.unwrap();
    broker.start().await.unwrap();
    broker.stop(Duration::from_secs(1)).await.unwrap();
    broker.stop(Duration::from_secs(1)).await.unwrap();
}

#[tokio::test]
async fn enqueue_on_unknown_queue_errors() {
    let broker = new_broker();
    let err = broker.enqueue("missing", "x", HashMap::new()).await.unwrap_err();
    assert!(matches!(err, BrokerError::QueueNotFound(_)));
}

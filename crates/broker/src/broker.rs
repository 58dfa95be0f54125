// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `MessageBroker`: fan-out pub/sub topics plus work-distribution task
//! queues, both backed by a shared [`StorageBackend`].
//!
//! Pub/sub delivery runs one dedicated `tokio` task per topic; publishing
//! enqueues onto that topic's in-process delivery channel and the task
//! invokes every subscriber callback in order, sequentially, so a slow
//! subscriber only delays its own topic's queue. Task queues run `n`
//! worker tasks per queue, each polling the storage backend with a short
//! timeout and interpreting a callback error as nack-and-retry.

use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use archiflow_core::Clock;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::BrokerError;
use crate::message::{Message, Payload, QueueConfig};
use crate::metrics::MetricsCollector;
use crate::storage::StorageBackend;

const WORKER_DEQUEUE_TIMEOUT: Duration = Duration::from_millis(100);

pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// A pub/sub subscriber callback. An `Err` is logged and counted in
/// `failed_deliveries`; delivery proceeds to the next subscriber.
pub type SubscriberFn = Arc<dyn Fn(Message) -> BoxFuture<Result<(), String>> + Send + Sync>;
/// A task-queue worker callback. An `Err` is interpreted as nack-and-retry.
pub type WorkerFn = Arc<dyn Fn(Payload) -> BoxFuture<Result<(), String>> + Send + Sync>;

enum DeliveryItem {
    Message(Message),
    Shutdown,
}

struct TopicState {
    subscribers: Vec<SubscriberFn>,
    sender: mpsc::UnboundedSender<DeliveryItem>,
}

struct QueueState {
    config: QueueConfig,
    worker: Option<WorkerFn>,
    num_threads: u32,
    tasks: Vec<JoinHandle<()>>,
}

struct Inner {
    topics: HashMap<String, TopicState>,
    queues: HashMap<String, QueueState>,
    running: bool,
    delivery_tasks: Vec<JoinHandle<()>>,
}

fn new_topic_state() -> TopicState {
    let (tx, _rx) = mpsc::unbounded_channel();
    TopicState {
        subscribers: Vec::new(),
        sender: tx,
    }
}

/// Dispatches pub/sub messages to subscriber callbacks and drives
/// per-queue worker pools against a shared storage backend.
pub struct MessageBroker<C: Clock> {
    storage: Arc<dyn StorageBackend>,
    metrics: Arc<MetricsCollector>,
    clock: C,
    inner: Arc<Mutex<Inner>>,
}

impl<C: Clock + 'static> MessageBroker<C> {
    pub fn new(storage: Arc<dyn StorageBackend>, clock: C) -> Self {
        let metrics = Arc::new(MetricsCollector::new(&clock));
        Self {
            storage,
            metrics,
            clock,
            inner: Arc::new(Mutex::new(Inner {
                topics: HashMap::new(),
                queues: HashMap::new(),
                running: false,
                delivery_tasks: Vec::new(),
            })),
        }
    }

    pub fn metrics(&self) -> &Arc<MetricsCollector> {
        &self.metrics
    }

    // --- Lifecycle ---

    pub async fn start(&self) -> Result<(), BrokerError> {
        self.storage.initialize().await?;
        let was_running = {
            let mut inner = self.inner.lock();
            let was_running = inner.running;
            inner.running = true;
            was_running
        };
        if was_running {
            return Ok(());
        }

        let topic_names: Vec<String> = self.inner.lock().topics.keys().cloned().collect();
        for topic in topic_names {
            self.spawn_delivery_task(&topic);
        }

        let queue_names: Vec<String> = self.inner.lock().queues.keys().cloned().collect();
        for queue in queue_names {
            self.spawn_workers_for(&queue);
        }
        Ok(())
    }

    pub async fn stop(&self, timeout: Duration) -> Result<(), BrokerError> {
        let (delivery_tasks, worker_tasks, senders) = {
            let mut inner = self.inner.lock();
            if !inner.running {
                return Ok(());
            }
            inner.running = false;
            let senders: Vec<_> = inner.topics.values().map(|t| t.sender.clone()).collect();
            let delivery_tasks = std::mem::take(&mut inner.delivery_tasks);
            let worker_tasks: Vec<JoinHandle<()>> = inner
                .queues
                .values_mut()
                .flat_map(|q| std::mem::take(&mut q.tasks))
                .collect();
            (delivery_tasks, worker_tasks, senders)
        };

        for sender in senders {
            let _ = sender.send(DeliveryItem::Shutdown);
        }

        let deadline = Instant::now() + timeout;
        for task in delivery_tasks.into_iter().chain(worker_tasks) {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if tokio::time::timeout(remaining, task).await.is_err() {
                tracing::warn!("broker task did not join within stop timeout, leaking it");
            }
        }

        self.storage.close().await?;
        Ok(())
    }

    // --- Pub/Sub ---

    pub fn subscribe(&self, topic: &str, callback: SubscriberFn) {
        let (running, is_new_topic, count) = {
            let mut inner = self.inner.lock();
            let is_new_topic = !inner.topics.contains_key(topic);
            let entry = inner.topics.entry(topic.to_string()).or_insert_with(new_topic_state);
            entry.subscribers.push(callback);
            (inner.running, is_new_topic, inner.topics[topic].subscribers.len() as u32)
        };
        self.metrics.set_subscriber_count(topic, count);
        if running && is_new_topic {
            self.spawn_delivery_task(topic);
        }
    }

    pub fn unsubscribe_all(&self, topic: &str) {
        if let Some(state) = self.inner.lock().topics.get_mut(topic) {
            state.subscribers.clear();
        }
        self.metrics.set_subscriber_count(topic, 0);
    }

    pub async fn publish(
        &self,
        topic: &str,
        payload: impl Into<Payload>,
        metadata: HashMap<String, Value>,
    ) -> Message {
        let message = Message::create(&self.clock, topic, payload, 0, metadata);
        self.metrics.increment_topic_published(topic);

        let (sender, running, is_new) = {
            let mut inner = self.inner.lock();
            let is_new = !inner.topics.contains_key(topic);
            let entry = inner.topics.entry(topic.to_string()).or_insert_with(new_topic_state);
            (entry.sender.clone(), inner.running, is_new)
        };
        if running && is_new {
            self.spawn_delivery_task(topic);
        }
        let _ = sender.send(DeliveryItem::Message(message.clone()));
        message
    }

    pub async fn broadcast(
        &self,
        topics: &[&str],
        payload: impl Into<Payload>,
        metadata: HashMap<String, Value>,
    ) -> HashMap<String, Message> {
        let payload = payload.into();
        let mut out = HashMap::new();
        for topic in topics {
            let message = self.publish(topic, payload.clone(), metadata.clone()).await;
            out.insert(topic.to_string(), message);
        }
        out
    }

    /// Re-creates the topic's channel so this task owns the only receiver;
    /// the sender already stored in `TopicState` (and any clone handed out
    /// to `publish`) keeps feeding the new receiver.
    fn spawn_delivery_task(&self, topic: &str) {
        let (tx, mut rx) = mpsc::unbounded_channel::<DeliveryItem>();
        let topic_name = topic.to_string();
        let inner = Arc::clone(&self.inner);
        let metrics = Arc::clone(&self.metrics);

        if let Some(state) = inner.lock().topics.get_mut(&topic_name) {
            state.sender = tx;
        }

        let handle = tokio::spawn(async move {
            while let Some(item) = rx.recv().await {
                let message = match item {
                    DeliveryItem::Message(m) => m,
                    DeliveryItem::Shutdown => break,
                };
                let subscribers = {
                    let guard = inner.lock();
                    guard
                        .topics
                        .get(&topic_name)
                        .map(|t| t.subscribers.clone())
                        .unwrap_or_default()
                };
                for subscriber in subscribers {
                    if let Err(error) = subscriber(message.clone()).await {
                        metrics.increment_topic_failed_delivery(&topic_name);
                        tracing::warn!(topic = %topic_name, %error, "subscriber callback failed");
                    }
                }
            }
        });
        self.inner.lock().delivery_tasks.push(handle);
    }

    // --- Task queues ---

    pub async fn create_queue(&self, name: &str, max_retries: u32, dlq_enabled: bool) -> Result<(), BrokerError> {
        self.storage.create_queue(name).await?;
        self.inner.lock().queues.insert(
            name.to_string(),
            QueueState {
                config: QueueConfig::new(name).with_max_retries(max_retries).with_dlq_enabled(dlq_enabled),
                worker: None,
                num_threads: 0,
                tasks: Vec::new(),
            },
        );
        Ok(())
    }

    pub async fn enqueue(
        &self,
        queue: &str,
        payload: impl Into<Payload>,
        metadata: HashMap<String, Value>,
    ) -> Result<Message, BrokerError> {
        let max_retries = self
            .inner
            .lock()
            .queues
            .get(queue)
            .map(|q| q.config.max_retries)
            .ok_or_else(|| BrokerError::QueueNotFound(queue.to_string()))?;
        let message = Message::create(&self.clock, queue, payload, max_retries, metadata);
        self.storage.enqueue(queue, message.clone()).await?;
        self.metrics.increment_queue_published(queue);
        let depth = self.storage.get_queue_depth(queue).await?;
        self.metrics.set_queue_depth(queue, depth);
        Ok(message)
    }

    pub fn register_worker(&self, queue: &str, callback: WorkerFn, num_threads: u32) -> Result<(), BrokerError> {
        let running = {
            let mut inner = self.inner.lock();
            let state = inner
                .queues
                .get_mut(queue)
                .ok_or_else(|| BrokerError::QueueNotFound(queue.to_string()))?;
            state.worker = Some(callback);
            state.num_threads = num_threads;
            inner.running
        };
        self.metrics.set_worker_count(queue, num_threads);
        if running {
            self.spawn_workers_for(queue);
        }
        Ok(())
    }

    fn spawn_workers_for(&self, queue: &str) {
        let (callback, num_threads) = {
            let inner = self.inner.lock();
            let Some(state) = inner.queues.get(queue) else {
                return;
            };
            let Some(cb) = state.worker.clone() else {
                return;
            };
            (cb, state.num_threads)
        };

        let mut handles = Vec::with_capacity(num_threads as usize);
        for _ in 0..num_threads {
            let storage = Arc::clone(&self.storage);
            let metrics = Arc::clone(&self.metrics);
            let inner = Arc::clone(&self.inner);
            let queue_name = queue.to_string();
            let callback = Arc::clone(&callback);
            let clock = self.clock.clone();

            handles.push(tokio::spawn(worker_loop(
                storage, metrics, inner, queue_name, callback, clock,
            )));
        }
        if let Some(state) = self.inner.lock().queues.get_mut(queue) {
            state.tasks.extend(handles);
        }
    }

    // --- DLQ admin ---

    pub async fn get_dlq_messages(&self, queue: &str) -> Result<Vec<Message>, BrokerError> {
        Ok(self.storage.get_dlq_messages(queue).await?)
    }

    pub async fn requeue_from_dlq(&self, queue: &str, message_id: &str) -> Result<(), BrokerError> {
        self.storage.requeue_from_dlq(queue, message_id).await?;
        self.metrics.decrement_queue_dlq_count(queue);
        Ok(())
    }

    pub async fn delete_dlq_message(&self, queue: &str, message_id: &str) -> Result<(), BrokerError> {
        self.storage.delete_dlq_message(queue, message_id).await?;
        self.metrics.decrement_queue_dlq_count(queue);
        Ok(())
    }

    // --- Observability / admin ---

    pub fn list_queues(&self) -> Vec<String> {
        self.inner.lock().queues.keys().cloned().collect()
    }

    /// Union of topics with active subscribers and topics seen in metrics
    /// (resolving the distilled spec's "two sources" Open Question
    /// explicitly, per DESIGN.md).
    pub fn list_topics(&self) -> Vec<String> {
        let mut set: BTreeSet<String> = self.inner.lock().topics.keys().cloned().collect();
        set.extend(self.metrics.list_topics());
        set.into_iter().collect()
    }

    pub async fn purge_queue(&self, name: &str) -> Result<u64, BrokerError> {
        let prior_depth = self.storage.get_queue_depth(name).await.unwrap_or(0);
        self.storage.delete_queue(name).await?;
        self.storage.create_queue(name).await?;
        self.metrics.set_queue_depth(name, 0);
        Ok(prior_depth)
    }

    pub fn get_queue_stats(&self, name: &str) -> crate::metrics::QueueMetrics {
        self.metrics.queue_stats(name)
    }

    pub fn get_topic_stats(&self, name: &str) -> crate::metrics::TopicMetrics {
        self.metrics.topic_stats(name)
    }
}

async fn worker_loop<C: Clock>(
    storage: Arc<dyn StorageBackend>,
    metrics: Arc<MetricsCollector>,
    inner: Arc<Mutex<Inner>>,
    queue_name: String,
    callback: WorkerFn,
    clock: C,
) {
    loop {
        if !inner.lock().running {
            break;
        }
        let dequeued = storage.dequeue(&queue_name, Some(WORKER_DEQUEUE_TIMEOUT)).await;
        let message = match dequeued {
            Ok(Some(m)) => m,
            Ok(None) => continue,
            Err(error) => {
                tracing::warn!(queue = %queue_name, %error, "storage error in worker loop, continuing");
                continue;
            }
        };

        let start = clock.now();
        let result = callback(message.payload.clone()).await;
        let elapsed_ms = clock.now().saturating_duration_since(start).as_secs_f64() * 1000.0;
        metrics.record_processing_time(&queue_name, elapsed_ms);

        match result {
            Ok(()) => {
                let _ = storage.ack(&queue_name, message.id.as_str()).await;
                metrics.increment_queue_processed(&queue_name);
            }
            Err(error) => {
                handle_worker_failure(&storage, &metrics, &inner, &queue_name, message, error).await;
            }
        }
        if let Ok(depth) = storage.get_queue_depth(&queue_name).await {
            metrics.set_queue_depth(&queue_name, depth);
        }
    }
}

async fn handle_worker_failure(
    storage: &Arc<dyn StorageBackend>,
    metrics: &Arc<MetricsCollector>,
    inner: &Arc<Mutex<Inner>>,
    queue_name: &str,
    mut message: Message,
    error: String,
) {
    message.error = Some(error);
    message.retry_count += 1;
    let (max_retries, dlq_enabled) = inner
        .lock()
        .queues
        .get(queue_name)
        .map(|q| (q.config.max_retries, q.config.dlq_enabled))
        .unwrap_or((0, true));

    if message.retry_count <= max_retries {
        let _ = storage.nack(queue_name, message.id.as_str()).await;
    } else {
        metrics.increment_queue_failed(queue_name);
        if dlq_enabled {
            let _ = storage.move_to_dlq(queue_name, message).await;
            metrics.increment_queue_dlq_count(queue_name);
        } else {
            let _ = storage.ack(queue_name, message.id.as_str()).await;
        }
    }
}

#[cfg(test)]
#[path = "broker_tests.rs"]
mod tests;

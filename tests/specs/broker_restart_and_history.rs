//! A broker backed by the AOL survives a full `stop`/reconstruct cycle, and
//! a history manager's compacted summary can itself be published onto a
//! broker topic as a downstream side effect — the two subsystems composed
//! the way an agent controller would use them together.

use std::sync::Arc;
use std::time::Duration;

use archiflow_broker::{AolBackend, Message, MessageBroker, Payload, StorageBackend};
use archiflow_core::SystemClock;
use archiflow_history::{HistoryConfig, HistoryManager, HistoryMessage, SelectiveRetentionStrategy, SimpleSummarizer, ToolCallEntry, ToolResultEntry};

#[tokio::test]
async fn broker_survives_stop_and_reconstruction_with_same_aol_root() {
    let root = tempfile::tempdir().unwrap();

    {
        let backend = Arc::new(AolBackend::new(root.path()));
        let broker = MessageBroker::new(backend, SystemClock);
        broker.start().await.unwrap();
        broker.create_queue("q", 3, true).await.unwrap();
        broker.enqueue("q", "m1", Default::default()).await.unwrap();
        broker.enqueue("q", "m2", Default::default()).await.unwrap();
        broker.enqueue("q", "m3", Default::default()).await.unwrap();
        broker.stop(Duration::from_secs(1)).await.unwrap();
    }

    let backend = Arc::new(AolBackend::new(root.path()));
    let broker = MessageBroker::new(backend.clone(), SystemClock);
    broker.start().await.unwrap();

    assert_eq!(backend.get_queue_depth("q").await.unwrap(), 3);

    let first = backend.dequeue("q", None).await.unwrap().unwrap();
    assert_eq!(first.payload, Payload::String("m1".to_string()));

    broker.stop(Duration::from_secs(1)).await.unwrap();
}

#[tokio::test]
async fn compacted_history_summary_is_published_as_a_broker_message() {
    let mut history = HistoryManager::new(
        HistoryConfig {
            max_tokens: 50,
            retention_window: 3,
            ..HistoryConfig::default()
        },
        Box::new(SelectiveRetentionStrategy),
        Box::new(SimpleSummarizer),
    );

    history.add(HistoryMessage::System("S".to_string())).await;
    history.add(HistoryMessage::User("goal".to_string())).await;
    for i in 0..5 {
        history.add(HistoryMessage::User(format!("middle message {i}"))).await;
    }
    history
        .add(HistoryMessage::ToolCall(vec![ToolCallEntry {
            call_id: "call_X".to_string(),
            tool_name: "write".to_string(),
            arguments: serde_json::json!({}),
        }]))
        .await;
    history
        .add(HistoryMessage::ToolResult(ToolResultEntry {
            call_id: "call_X".to_string(),
            content: "ok".to_string(),
        }))
        .await;
    history.add(HistoryMessage::User("tail".to_string())).await;

    let summary = history
        .summary_message()
        .expect("compaction over a 50-token budget should have produced a summary");
    let HistoryMessage::System(summary_text) = summary else {
        panic!("summary message is always a System variant");
    };

    let backend = Arc::new(archiflow_broker::MemoryBackend::new());
    let broker = MessageBroker::new(backend, SystemClock);
    broker.start().await.unwrap();

    let published: Message = broker
        .publish("history.summaries", summary_text.clone(), Default::default())
        .await;

    assert_eq!(published.payload, Payload::String(summary_text));
    assert_eq!(broker.get_topic_stats("history.summaries").published, 1);

    broker.stop(Duration::from_secs(1)).await.unwrap();
}

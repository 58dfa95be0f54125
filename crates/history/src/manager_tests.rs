use super::*;
use crate::compaction::{SelectiveRetentionStrategy, SlidingWindowStrategy};
use crate::message::{ToolCallEntry, ToolResultEntry};
use crate::summarizer::SimpleSummarizer;
use serde_json::json;

fn manager(max_tokens: usize, retention_window: usize) -> HistoryManager {
    let config = HistoryConfig {
        max_tokens,
        retention_window,
        auto_remove_old_todos: true,
        proactive_threshold: 0.8,
    };
    HistoryManager::new(config, Box::new(SelectiveRetentionStrategy), Box::new(SimpleSummarizer))
}

fn user(s: &str) -> HistoryMessage {
    HistoryMessage::User(s.to_string())
}

fn tool_call(id: &str, tool: &str) -> HistoryMessage {
    HistoryMessage::ToolCall(vec![ToolCallEntry {
        call_id: id.to_string(),
        tool_name: tool.to_string(),
        arguments: json!({}),
    }])
}

fn tool_result(id: &str, content: &str) -> HistoryMessage {
    HistoryMessage::ToolResult(ToolResultEntry {
        call_id: id.to_string(),
        content: content.to_string(),
    })
}

#[tokio::test]
async fn compact_preserves_tool_call_result_pairs_s4() {
    let mut mgr = manager(50, 3);
    mgr.add(HistoryMessage::System("S".into())).await;
    mgr.add(user("goal")).await;
    for i in 0..5 {
        mgr.add(user(&format!("middle-{i}"))).await;
    }
    mgr.add(tool_call("call_X", "write")).await;
    mgr.add(tool_result("call_X", "ok")).await;
    mgr.add(user("tail")).await;

    mgr.compact().await;

    let expected = vec![
        HistoryMessage::System("S".into()),
        user("goal"),
        HistoryMessage::System("[Summary of 5 messages: 5 user message(s), 0 tool call(s)]".into()),
        tool_call("call_X", "write"),
        tool_result("call_X", "ok"),
        user("tail"),
    ];
    similar_asserts::assert_eq!(mgr.messages(), expected.as_slice());
}

#[tokio::test]
async fn compact_extends_tail_to_include_dangling_tool_call() {
    let mut mgr = manager(50, 2);
    mgr.add(HistoryMessage::System("S".into())).await;
    mgr.add(user("goal")).await;
    mgr.add(tool_call("call_Y", "write")).await;
    for i in 0..4 {
        mgr.add(user(&format!("filler-{i}"))).await;
    }
    mgr.add(tool_result("call_Y", "ok")).await;
    mgr.add(user("tail")).await;

    mgr.compact().await;

    let messages = mgr.messages();
    let call_idx = messages.iter().position(|m| matches!(m, HistoryMessage::ToolCall(c) if c[0].call_id == "call_Y")).unwrap();
    let result_idx = messages.iter().position(|m| matches!(m, HistoryMessage::ToolResult(r) if r.call_id == "call_Y")).unwrap();
    assert!(call_idx < result_idx, "tool call must precede its result after compaction");
}

#[tokio::test]
async fn compact_is_noop_when_short() {
    let mut mgr = manager(50, 10);
    mgr.add(HistoryMessage::System("S".into())).await;
    mgr.add(user("goal")).await;
    mgr.add(user("reply")).await;
    let before = mgr.messages().to_vec();

    mgr.compact().await;

    similar_asserts::assert_eq!(mgr.messages(), before.as_slice());
}

#[tokio::test]
async fn add_triggers_compaction_over_budget() {
    let mut mgr = manager(10, 2);
    mgr.add(HistoryMessage::System("S".into())).await;
    mgr.add(user("goal")).await;
    for i in 0..10 {
        mgr.add(user(&format!("this is message number {i} with enough content to blow the budget"))).await;
    }

    assert!(mgr.summary_message().is_some());
    assert!(mgr.estimate_tokens() < 10_000);
}

#[tokio::test]
async fn auto_remove_old_todos_drops_stale_pair_before_append() {
    let mut mgr = manager(10_000, 2);
    mgr.add(tool_call("t1", "todo_write")).await;
    mgr.add(tool_result("t1", "done")).await;
    mgr.add(user("a")).await;
    mgr.add(user("b")).await;
    // A fresh todo_write result triggers the pre-pass; the window is 2
    // so the first pair (now 2 messages back) is outside it.
    mgr.add(tool_call("t2", "todo_write")).await;
    mgr.add(tool_result("t2", "done again")).await;

    let has_stale_pair = mgr
        .messages()
        .iter()
        .any(|m| matches!(m, HistoryMessage::ToolCall(c) if c[0].call_id == "t1"));
    assert!(!has_stale_pair);
}

#[tokio::test]
async fn sliding_window_strategy_has_no_head_slice() {
    let config = HistoryConfig {
        max_tokens: 50,
        retention_window: 2,
        auto_remove_old_todos: false,
        proactive_threshold: 0.8,
    };
    let mut mgr = HistoryManager::new(config, Box::new(SlidingWindowStrategy), Box::new(SimpleSummarizer));
    for i in 0..5 {
        mgr.add(user(&format!("m{i}"))).await;
    }
    mgr.compact().await;

    let messages = mgr.messages();
    assert!(messages.iter().any(|m| matches!(m, HistoryMessage::System(_))), "summary should be present");
    assert_eq!(messages.last().unwrap(), &user("m4"));
}

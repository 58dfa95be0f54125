use super::*;
use crate::message::{HistoryMessage, ToolCallEntry, ToolResultEntry};
use serde_json::json;

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

#[test]
fn todo_cleaner_drops_pair_outside_window() {
    let messages = vec![
        tool_call("call_1", "todo_write"),
        tool_result("call_1", "done"),
        HistoryMessage::User("a".into()),
        HistoryMessage::User("b".into()),
    ];
    let cleaned = TodoCleaner.clean(messages, 2);
    assert_eq!(cleaned, vec![HistoryMessage::User("a".into()), HistoryMessage::User("b".into())]);
}

#[test]
fn todo_cleaner_keeps_pair_inside_window() {
    let messages = vec![
        HistoryMessage::User("a".into()),
        tool_call("call_1", "todo_write"),
        tool_result("call_1", "done"),
    ];
    let cleaned = TodoCleaner.clean(messages.clone(), 2);
    assert_eq!(cleaned, messages);
}

#[test]
fn todo_cleaner_ignores_non_todo_tools() {
    let messages = vec![
        tool_call("call_1", "write"),
        tool_result("call_1", "ok"),
        HistoryMessage::User("a".into()),
        HistoryMessage::User("b".into()),
    ];
    let cleaned = TodoCleaner.clean(messages.clone(), 2);
    assert_eq!(cleaned, messages);
}

#[test]
fn duplicate_cleaner_drops_repeat_outside_window() {
    let messages = vec![
        HistoryMessage::User("same".into()),
        HistoryMessage::User("same".into()),
        HistoryMessage::User("tail".into()),
    ];
    let cleaned = DuplicateCleaner.clean(messages, 1);
    assert_eq!(cleaned, vec![HistoryMessage::User("same".into()), HistoryMessage::User("tail".into())]);
}

#[test]
fn duplicate_cleaner_is_noop_when_window_covers_everything() {
    let messages = vec![HistoryMessage::User("same".into()), HistoryMessage::User("same".into())];
    let cleaned = DuplicateCleaner.clean(messages.clone(), messages.len());
    assert_eq!(cleaned, messages);
}

#[test]
fn composite_cleaner_chains_in_order() {
    let messages = vec![
        HistoryMessage::User("same".into()),
        HistoryMessage::User("same".into()),
        tool_call("call_1", "todo_write"),
        tool_result("call_1", "done"),
        HistoryMessage::User("tail".into()),
    ];
    let composite = CompositeCleaner::new(vec![Box::new(DuplicateCleaner), Box::new(TodoCleaner)]);
    let cleaned = composite.clean(messages, 1);
    assert_eq!(cleaned, vec![HistoryMessage::User("same".into()), HistoryMessage::User("tail".into())]);
}

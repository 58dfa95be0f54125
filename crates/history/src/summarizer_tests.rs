use super::*;
use crate::message::{HistoryMessage, ToolCallEntry};
use serde_json::json;

fn tool_call(tool: &str) -> HistoryMessage {
    HistoryMessage::ToolCall(vec![ToolCallEntry {
        call_id: "c1".into(),
        tool_name: tool.to_string(),
        arguments: json!({}),
    }])
}

#[tokio::test]
async fn simple_summarizer_counts_users_and_tools() {
    let middle = vec![HistoryMessage::User("a".into()), HistoryMessage::User("b".into()), tool_call("write")];
    let summary = SimpleSummarizer.summarize(&middle).await;
    assert!(summary.contains("3 messages"));
    assert!(summary.contains("2 user message(s)"));
    assert!(summary.contains("1 tool call(s)"));
}

#[tokio::test]
async fn llm_summarizer_uses_callback_result() {
    let callback: SummarizeCallback = Arc::new(|_rendered| Box::pin(async { Ok("a short summary".to_string()) }));
    let summarizer = LlmSummarizer::new(callback);
    let middle = vec![HistoryMessage::User("a".into())];
    let summary = summarizer.summarize(&middle).await;
    assert_eq!(summary, "[Summary of 1 messages] a short summary");
}

#[tokio::test]
async fn llm_summarizer_falls_back_on_error() {
    let callback: SummarizeCallback = Arc::new(|_rendered| Box::pin(async { Err("provider down".to_string()) }));
    let summarizer = LlmSummarizer::new(callback);
    let middle = vec![HistoryMessage::User("a".into())];
    let summary = summarizer.summarize(&middle).await;
    assert!(summary.starts_with("[Summary of 1 messages:"));
}

#[tokio::test]
async fn llm_summarizer_falls_back_on_empty_response() {
    let callback: SummarizeCallback = Arc::new(|_rendered| Box::pin(async { Ok(String::new()) }));
    let summarizer = LlmSummarizer::new(callback);
    let middle = vec![HistoryMessage::User("a".into())];
    let summary = summarizer.summarize(&middle).await;
    assert!(summary.starts_with("[Summary of 1 messages:"));
}

#[tokio::test]
async fn hybrid_summarizer_picks_simple_below_threshold() {
    let callback: SummarizeCallback = Arc::new(|_rendered| Box::pin(async { Ok("should not be used".to_string()) }));
    let summarizer = HybridSummarizer::new(callback).with_threshold(5);
    let middle = vec![HistoryMessage::User("a".into())];
    let summary = summarizer.summarize(&middle).await;
    assert!(summary.starts_with("[Summary of 1 messages:"));
}

#[tokio::test]
async fn hybrid_summarizer_picks_llm_above_threshold() {
    let callback: SummarizeCallback = Arc::new(|_rendered| Box::pin(async { Ok("llm summary".to_string()) }));
    let summarizer = HybridSummarizer::new(callback).with_threshold(1);
    let middle = vec![HistoryMessage::User("a".into()), HistoryMessage::User("b".into())];
    let summary = summarizer.summarize(&middle).await;
    assert_eq!(summary, "[Summary of 2 messages] llm summary");
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Summarizers turn a compacted-away middle slice into a single replacement
//! string. `SimpleSummarizer` has no external dependency; `LLMSummarizer`
//! delegates to an injected callback (never a concrete HTTP client — the
//! LLM provider adapter stays an external collaborator) and falls back to
//! the simple form on any failure.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;

use crate::message::HistoryMessage;

const TOOL_RESULT_TRUNCATE: usize = 200;

/// Turns a middle slice of messages into a summary string.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, middle: &[HistoryMessage]) -> String;
}

/// No external dependency: counts users and tool calls, returns a fixed
/// descriptive sentence. Used as the default and as every other
/// summarizer's fallback.
pub struct SimpleSummarizer;

#[async_trait]
impl Summarizer for SimpleSummarizer {
    async fn summarize(&self, middle: &[HistoryMessage]) -> String {
        let user_count = middle.iter().filter(|m| m.is_user()).count();
        let tool_count = middle.iter().filter(|m| m.is_tool_call()).count();
        format!(
            "[Summary of {} messages: {} user message(s), {} tool call(s)]",
            middle.len(),
            user_count,
            tool_count
        )
    }
}

fn render_middle(middle: &[HistoryMessage]) -> String {
    let mut lines = Vec::with_capacity(middle.len());
    for message in middle {
        match message {
            HistoryMessage::System(s) => lines.push(format!("system: {s}")),
            HistoryMessage::User(s) => lines.push(format!("user: {s}")),
            HistoryMessage::LlmRespond(s) => lines.push(format!("assistant: {s}")),
            HistoryMessage::Environment(s) => lines.push(format!("environment: {s}")),
            HistoryMessage::ToolCall(calls) => {
                for call in calls {
                    lines.push(format!("tool_call: {}", call.tool_name));
                }
            }
            HistoryMessage::ToolResult(r) => lines.push(truncated_result_line(&r.content)),
            HistoryMessage::BatchToolResult(rs) => {
                for r in rs {
                    lines.push(truncated_result_line(&r.content));
                }
            }
        }
    }
    lines.join("\n")
}

fn truncated_result_line(content: &str) -> String {
    if content.chars().count() <= TOOL_RESULT_TRUNCATE {
        format!("tool_result: {content}")
    } else {
        let head: String = content.chars().take(TOOL_RESULT_TRUNCATE).collect();
        format!("tool_result: {head}…")
    }
}

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// An injected external summarization call — the one touchpoint from the
/// spec's "external collaborators" (token-count estimator / LLM call)
/// that this crate never hard-wires to a concrete provider.
pub type SummarizeCallback = Arc<dyn Fn(String) -> BoxFuture<'static, Result<String, String>> + Send + Sync>;

/// Formats the middle slice as readable lines and asks an injected
/// callback for a 2-4 sentence summary. Falls back to `SimpleSummarizer`
/// on any error or an empty response.
pub struct LlmSummarizer {
    callback: SummarizeCallback,
    fallback: SimpleSummarizer,
}

impl LlmSummarizer {
    pub fn new(callback: SummarizeCallback) -> Self {
        Self { callback, fallback: SimpleSummarizer }
    }
}

#[async_trait]
impl Summarizer for LlmSummarizer {
    async fn summarize(&self, middle: &[HistoryMessage]) -> String {
        let rendered = render_middle(middle);
        match (self.callback)(rendered).await {
            Ok(summary) if !summary.trim().is_empty() => {
                format!("[Summary of {} messages] {}", middle.len(), summary.trim())
            }
            Ok(_) => {
                tracing::warn!("llm summarizer returned an empty response, falling back");
                self.fallback.summarize(middle).await
            }
            Err(reason) => {
                tracing::warn!(reason, "llm summarizer failed, falling back");
                self.fallback.summarize(middle).await
            }
        }
    }
}

/// Simple below a message-count threshold, LLM above — avoids paying for
/// a round-trip to summarize a handful of messages.
pub struct HybridSummarizer {
    threshold: usize,
    simple: SimpleSummarizer,
    llm: LlmSummarizer,
}

impl HybridSummarizer {
    pub const DEFAULT_THRESHOLD: usize = 20;

    pub fn new(callback: SummarizeCallback) -> Self {
        Self {
            threshold: Self::DEFAULT_THRESHOLD,
            simple: SimpleSummarizer,
            llm: LlmSummarizer::new(callback),
        }
    }

    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.threshold = threshold;
        self
    }
}

#[async_trait]
impl Summarizer for HybridSummarizer {
    async fn summarize(&self, middle: &[HistoryMessage]) -> String {
        if middle.len() < self.threshold {
            self.simple.summarize(middle).await
        } else {
            self.llm.summarize(middle).await
        }
    }
}

#[cfg(test)]
#[path = "summarizer_tests.rs"]
mod tests;

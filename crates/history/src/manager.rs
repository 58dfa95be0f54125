// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `HistoryManager`: the token-budgeted, single-consumer conversation
//! store an agent controller steps on every user or tool-result message.

use std::collections::HashSet;

use crate::cleaner::{call_id_to_tool_name, CompositeCleaner, MessageCleaner, TODO_WRITE_TOOL};
use crate::compaction::CompactionStrategy;
use crate::message::HistoryMessage;
use crate::summarizer::Summarizer;

const CHARS_PER_TOKEN: usize = 4;
const DEFAULT_MAX_TOKENS: usize = 4000;
const DEFAULT_BUDGET_BUFFER: usize = 500;

/// A model's context window, used to derive `max_tokens` when the caller
/// doesn't supply a budget directly.
#[derive(Debug, Clone, Copy)]
pub struct ModelDescriptor {
    pub context_window: usize,
    pub max_output_tokens: usize,
}

/// `max_tokens = context_window - max_output_tokens - system_prompt_tokens
/// - tools_tokens - buffer`, floored at zero.
pub fn compute_budget(
    model: ModelDescriptor,
    system_prompt_tokens: usize,
    tools_tokens: usize,
    buffer: usize,
) -> usize {
    model
        .context_window
        .saturating_sub(model.max_output_tokens)
        .saturating_sub(system_prompt_tokens)
        .saturating_sub(tools_tokens)
        .saturating_sub(buffer)
}

#[derive(Debug, Clone)]
pub struct HistoryConfig {
    pub max_tokens: usize,
    pub retention_window: usize,
    pub auto_remove_old_todos: bool,
    /// Fraction of `max_tokens` at which a proactive warning is logged,
    /// ahead of the hard `compact()` trigger at 1.0.
    pub proactive_threshold: f64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            retention_window: 20,
            auto_remove_old_todos: true,
            proactive_threshold: 0.8,
        }
    }
}

impl HistoryConfig {
    /// Derives `max_tokens` from a model descriptor instead of a fixed
    /// number; everything else keeps its default.
    pub fn from_model(model: ModelDescriptor, system_prompt_tokens: usize, tools_tokens: usize) -> Self {
        Self {
            max_tokens: compute_budget(model, system_prompt_tokens, tools_tokens, DEFAULT_BUDGET_BUFFER),
            ..Self::default()
        }
    }
}

/// Token-budgeted conversation store. Single-consumer: the agent
/// controller steps it serially, so no internal locking is needed.
pub struct HistoryManager {
    config: HistoryConfig,
    messages: Vec<HistoryMessage>,
    summary_message: Option<HistoryMessage>,
    cleaner: CompositeCleaner,
    strategy: Box<dyn CompactionStrategy>,
    summarizer: Box<dyn Summarizer>,
}

impl HistoryManager {
    pub fn new(config: HistoryConfig, strategy: Box<dyn CompactionStrategy>, summarizer: Box<dyn Summarizer>) -> Self {
        Self {
            config,
            messages: Vec::new(),
            summary_message: None,
            cleaner: CompositeCleaner::default_cleaners(),
            strategy,
            summarizer,
        }
    }

    pub fn with_cleaner(mut self, cleaner: CompositeCleaner) -> Self {
        self.cleaner = cleaner;
        self
    }

    pub fn messages(&self) -> &[HistoryMessage] {
        &self.messages
    }

    pub fn summary_message(&self) -> Option<&HistoryMessage> {
        self.summary_message.as_ref()
    }

    /// Sum of `len(content) + len(serialized tool_calls)` across messages,
    /// divided by 4 — the chars-per-token approximation.
    pub fn estimate_tokens(&self) -> usize {
        self.messages.iter().map(HistoryMessage::char_len).sum::<usize>() / CHARS_PER_TOKEN
    }

    /// Appends `message`. If it's a tool-result for a `todo_write` call and
    /// `auto_remove_old_todos` is set, first drops older todo-related pairs
    /// outside the retention window. Triggers `compact()` if the token
    /// estimate now exceeds the budget.
    pub async fn add(&mut self, message: HistoryMessage) {
        if self.config.auto_remove_old_todos && self.is_todo_write_result(&message) {
            let messages = std::mem::take(&mut self.messages);
            self.messages = self.cleaner.clean(messages, self.config.retention_window);
        }

        self.messages.push(message);

        let estimate = self.estimate_tokens();
        if estimate as f64 > self.config.max_tokens as f64 * self.config.proactive_threshold {
            tracing::warn!(estimate, max_tokens = self.config.max_tokens, "history approaching token budget");
        }
        if estimate > self.config.max_tokens {
            self.compact().await;
        }
    }

    fn is_todo_write_result(&self, message: &HistoryMessage) -> bool {
        let HistoryMessage::ToolResult(result) = message else {
            return false;
        };
        call_id_to_tool_name(&self.messages)
            .get(&result.call_id)
            .map(|name| name == TODO_WRITE_TOOL)
            .unwrap_or(false)
    }

    /// Selective-retention compaction: head + summarized middle + tail,
    /// preserving every tool-call whose result survives into the tail.
    pub async fn compact(&mut self) {
        let len = self.messages.len();
        if len <= self.config.retention_window + 2 {
            return;
        }

        let (head_end, mut tail_start) = self.strategy.anchor(&self.messages, self.config.retention_window);
        tail_start = tail_start.max(head_end);

        let mut needed: HashSet<String> = self.messages[tail_start..]
            .iter()
            .flat_map(|m| match m {
                HistoryMessage::ToolResult(r) => vec![r.call_id.clone()],
                HistoryMessage::BatchToolResult(rs) => rs.iter().map(|r| r.call_id.clone()).collect(),
                _ => Vec::new(),
            })
            .collect();

        if !needed.is_empty() {
            let mut i = tail_start;
            while i > head_end && !needed.is_empty() {
                i -= 1;
                if let HistoryMessage::ToolCall(calls) = &self.messages[i] {
                    let matched: Vec<String> = calls
                        .iter()
                        .map(|c| c.call_id.clone())
                        .filter(|id| needed.contains(id))
                        .collect();
                    if !matched.is_empty() {
                        tail_start = i;
                        for id in matched {
                            needed.remove(&id);
                        }
                    }
                }
            }
        }

        if tail_start <= head_end {
            // Tool-call extension consumed the entire middle.
            return;
        }

        let middle = &self.messages[head_end..tail_start];
        if middle.is_empty() {
            return;
        }

        let summary_text = self.summarizer.summarize(middle).await;
        let summary = HistoryMessage::System(summary_text);

        let mut new_messages = Vec::with_capacity(head_end + 1 + (len - tail_start));
        new_messages.extend_from_slice(&self.messages[..head_end]);
        new_messages.push(summary.clone());
        new_messages.extend_from_slice(&self.messages[tail_start..]);

        self.summary_message = Some(summary);
        self.messages = new_messages;
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;

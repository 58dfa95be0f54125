// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Compaction strategies: where to draw the head/tail anchors before the
//! shared tool-call-preserving extension logic in [`crate::manager`] runs.

use crate::message::HistoryMessage;

/// Decides the head and initial tail anchors for a compaction pass. The
/// manager owns the shared tool-call-preservation walk and summarization;
/// a strategy only answers "where does the head end and the tail begin,
/// before any extension for dangling tool calls".
pub trait CompactionStrategy: Send + Sync {
    /// Returns `(head_end, tail_start)`, both exclusive/inclusive indices
    /// into `messages` such that `head = messages[..head_end]` and the
    /// initial tail candidate is `messages[tail_start..]`.
    fn anchor(&self, messages: &[HistoryMessage], retention_window: usize) -> (usize, usize);
}

const HEAD_SCAN_LIMIT: usize = 5;

/// Selective retention: keep a System+first-User head, a recent tail,
/// summarize everything else. The default strategy for agent sessions
/// where the first user message is the task the rest of the transcript
/// serves.
pub struct SelectiveRetentionStrategy;

impl CompactionStrategy for SelectiveRetentionStrategy {
    fn anchor(&self, messages: &[HistoryMessage], retention_window: usize) -> (usize, usize) {
        let len = messages.len();
        let cursor = if messages.first().map(HistoryMessage::is_system).unwrap_or(false) {
            1
        } else {
            0
        };
        let scan_end = (cursor + HEAD_SCAN_LIMIT).min(len);
        let head_end = messages[cursor..scan_end]
            .iter()
            .position(HistoryMessage::is_user)
            .map(|k| cursor + k + 1)
            .unwrap_or_else(|| (cursor + 1).min(len));

        let tail_start = len.saturating_sub(retention_window).max(head_end);
        (head_end, tail_start)
    }
}

/// No head preservation: just a sliding tail, for chat-like uses where
/// there's no anchor "goal" message worth pinning forever.
pub struct SlidingWindowStrategy;

impl CompactionStrategy for SlidingWindowStrategy {
    fn anchor(&self, messages: &[HistoryMessage], retention_window: usize) -> (usize, usize) {
        let len = messages.len();
        (0, len.saturating_sub(retention_window))
    }
}

#[cfg(test)]
#[path = "compaction_tests.rs"]
mod tests;

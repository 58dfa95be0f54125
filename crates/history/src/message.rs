// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed conversation messages the history manager steps through.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One invocation inside a `ToolCall` message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallEntry {
    pub call_id: String,
    pub tool_name: String,
    pub arguments: Value,
}

/// The result of one previously-issued tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResultEntry {
    pub call_id: String,
    pub content: String,
}

/// A single turn in the conversation. The variant carries its own
/// "content" for token-estimation and duplicate-detection purposes —
/// there is no separate content field shared across variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HistoryMessage {
    System(String),
    User(String),
    LlmRespond(String),
    ToolCall(Vec<ToolCallEntry>),
    ToolResult(ToolResultEntry),
    BatchToolResult(Vec<ToolResultEntry>),
    Environment(String),
}

impl HistoryMessage {
    /// Rough character count used for the chars/4 token estimate: message
    /// text content, or the serialized form of tool_calls/tool results.
    pub fn char_len(&self) -> usize {
        match self {
            HistoryMessage::System(s) | HistoryMessage::User(s) | HistoryMessage::LlmRespond(s) | HistoryMessage::Environment(s) => s.len(),
            HistoryMessage::ToolCall(calls) => serde_json::to_string(calls).map(|s| s.len()).unwrap_or(0),
            HistoryMessage::ToolResult(r) => r.content.len(),
            HistoryMessage::BatchToolResult(rs) => rs.iter().map(|r| r.content.len()).sum(),
        }
    }

    /// Call ids this message either introduces (`ToolCall`) or references
    /// (`ToolResult`/`BatchToolResult`). Everything else has none.
    pub fn call_ids(&self) -> Vec<&str> {
        match self {
            HistoryMessage::ToolCall(calls) => calls.iter().map(|c| c.call_id.as_str()).collect(),
            HistoryMessage::ToolResult(r) => vec![r.call_id.as_str()],
            HistoryMessage::BatchToolResult(rs) => rs.iter().map(|r| r.call_id.as_str()).collect(),
            _ => Vec::new(),
        }
    }

    pub fn is_system(&self) -> bool {
        matches!(self, HistoryMessage::System(_))
    }

    pub fn is_user(&self) -> bool {
        matches!(self, HistoryMessage::User(_))
    }

    pub fn is_tool_call(&self) -> bool {
        matches!(self, HistoryMessage::ToolCall(_))
    }
}

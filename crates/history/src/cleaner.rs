// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Composable pre-compaction cleaners: run before token estimation decides
//! whether a full `compact()` is needed, trimming obviously-stale entries
//! (superseded TODO updates, exact duplicates) cheaply.

use std::collections::{HashMap, HashSet};

use crate::message::HistoryMessage;

pub(crate) const TODO_WRITE_TOOL: &str = "todo_write";

/// A cleaner inspects the full message list and the retention window and
/// returns a (possibly shorter) replacement list. Messages within the last
/// `retention_window` entries are never touched.
pub trait MessageCleaner: Send + Sync {
    fn clean(&self, messages: Vec<HistoryMessage>, retention_window: usize) -> Vec<HistoryMessage>;
}

pub(crate) fn call_id_to_tool_name(messages: &[HistoryMessage]) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for message in messages {
        if let HistoryMessage::ToolCall(calls) = message {
            for call in calls {
                map.insert(call.call_id.clone(), call.tool_name.clone());
            }
        }
    }
    map
}

/// Drops `todo_write` tool-call/result pairs that lie entirely outside the
/// retention window and whose ids aren't referenced by anything still in
/// the window.
pub struct TodoCleaner;

impl MessageCleaner for TodoCleaner {
    fn clean(&self, messages: Vec<HistoryMessage>, retention_window: usize) -> Vec<HistoryMessage> {
        let len = messages.len();
        let retained_start = len.saturating_sub(retention_window);
        let tool_names = call_id_to_tool_name(&messages);
        let keep_ids: HashSet<String> = messages[retained_start..]
            .iter()
            .flat_map(|m| m.call_ids().into_iter().map(str::to_string))
            .collect();

        messages
            .into_iter()
            .enumerate()
            .filter(|(i, m)| {
                if *i >= retained_start {
                    return true;
                }
                let ids = m.call_ids();
                if ids.is_empty() {
                    return true;
                }
                let all_todo_write = ids.iter().all(|id| {
                    tool_names.get(*id).map(|name| name == TODO_WRITE_TOOL).unwrap_or(false)
                });
                if !all_todo_write {
                    return true;
                }
                let any_kept = ids.iter().any(|id| keep_ids.contains(*id));
                any_kept
            })
            .map(|(_, m)| m)
            .collect()
    }
}

/// Drops a message that is identical (same variant, same content) to its
/// immediate predecessor, outside the retention window. Compares against
/// the original adjacency, not the already-filtered output, so it matches
/// a single left-to-right pass rather than cascading removals.
pub struct DuplicateCleaner;

impl MessageCleaner for DuplicateCleaner {
    fn clean(&self, messages: Vec<HistoryMessage>, retention_window: usize) -> Vec<HistoryMessage> {
        let len = messages.len();
        let retained_start = len.saturating_sub(retention_window);
        let mut keep = vec![true; len];
        for i in 1..len {
            if i < retained_start && messages[i] == messages[i - 1] {
                keep[i] = false;
            }
        }
        messages.into_iter().zip(keep).filter_map(|(m, k)| k.then_some(m)).collect()
    }
}

/// Runs an ordered list of cleaners, each over the previous one's output.
pub struct CompositeCleaner {
    cleaners: Vec<Box<dyn MessageCleaner>>,
}

impl CompositeCleaner {
    pub fn new(cleaners: Vec<Box<dyn MessageCleaner>>) -> Self {
        Self { cleaners }
    }

    /// The manager's default pre-compaction pass: drop stale todos, then
    /// collapse exact duplicates.
    pub fn default_cleaners() -> Self {
        Self::new(vec![Box::new(TodoCleaner), Box::new(DuplicateCleaner)])
    }
}

impl MessageCleaner for CompositeCleaner {
    fn clean(&self, mut messages: Vec<HistoryMessage>, retention_window: usize) -> Vec<HistoryMessage> {
        for cleaner in &self.cleaners {
            messages = cleaner.clean(messages, retention_window);
        }
        messages
    }
}

#[cfg(test)]
#[path = "cleaner_tests.rs"]
mod tests;

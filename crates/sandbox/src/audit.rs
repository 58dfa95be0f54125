// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only audit trail for tool executions, consumed by
//! [`crate::sandbox_runtime::SandboxRuntime`].

use std::collections::VecDeque;

use parking_lot::Mutex;
use serde_json::Value;

use archiflow_core::{Clock, SessionId, SystemClock};

const DEFAULT_CAPACITY: usize = 1000;

#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub session_id: Option<SessionId>,
    pub tool_name: String,
    pub params: Value,
    pub success: bool,
    pub error: Option<String>,
    pub workspace: String,
    pub mode: String,
    pub duration_ms: f64,
    pub epoch_ms: u64,
}

/// Thread-safe ring buffer of [`AuditEntry`] records; every `record` also
/// emits a `tracing` event so audit data reaches the ambient log sink even
/// when nobody queries the in-process buffer.
pub struct AuditTrail<C: Clock = SystemClock> {
    capacity: usize,
    entries: Mutex<VecDeque<AuditEntry>>,
    clock: C,
}

impl AuditTrail<SystemClock> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_clock(capacity, SystemClock)
    }
}

impl<C: Clock> AuditTrail<C> {
    pub fn with_clock(capacity: usize, clock: C) -> Self {
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(64))),
            clock,
        }
    }

    pub fn record(&self, mut entry: AuditEntry) {
        entry.epoch_ms = self.clock.epoch_ms();

        if entry.success {
            tracing::info!(
                tool_name = %entry.tool_name,
                workspace = %entry.workspace,
                mode = %entry.mode,
                "tool execution audited"
            );
        } else {
            tracing::warn!(
                tool_name = %entry.tool_name,
                workspace = %entry.workspace,
                mode = %entry.mode,
                error = entry.error.as_deref().unwrap_or(""),
                "tool execution audited (failed)"
            );
        }

        let mut entries = self.entries.lock();
        if entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    pub fn entries_for_session(&self, session_id: &SessionId) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.session_id.as_ref() == Some(session_id))
            .cloned()
            .collect()
    }

    pub fn recent(&self, n: usize) -> Vec<AuditEntry> {
        let entries = self.entries.lock();
        entries.iter().rev().take(n).rev().cloned().collect()
    }
}

impl Default for AuditTrail<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

/// Redacts parameters before they're written to the audit trail: keys whose
/// name suggests a secret are replaced outright; long string values are
/// truncated.
pub fn sanitize_params(params: &std::collections::HashMap<String, Value>) -> Value {
    const SENSITIVE: &[&str] = &["password", "secret", "token", "key", "api_key"];
    const MAX_LEN: usize = 1000;

    let mut out = serde_json::Map::new();
    for (key, value) in params {
        let lower = key.to_lowercase();
        if SENSITIVE.iter().any(|s| lower.contains(s)) {
            out.insert(key.clone(), Value::from("[REDACTED]"));
            continue;
        }
        if let Some(s) = value.as_str() {
            let char_count = s.chars().count();
            if char_count > MAX_LEN {
                let head: String = s.chars().take(100).collect();
                out.insert(key.clone(), Value::from(format!("{head}...[truncated {char_count} chars]")));
                continue;
            }
        }
        out.insert(key.clone(), value.clone());
    }
    Value::Object(out)
}

#[cfg(test)]
#[path = "audit_tests.rs"]
mod tests;

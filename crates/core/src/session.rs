// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session identifier type threaded through the sandbox and broker crates.

crate::define_id! {
    /// Identifies the session a `SessionRuntimeManager` scopes a sandboxed
    /// workspace and its file-tool confinement to.
    pub struct SessionId;
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;

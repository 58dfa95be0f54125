// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! archiflow-history: a token-budgeted conversation store with
//! selective-retention compaction. Single-consumer — the agent controller
//! steps it serially on every user or tool-result message — so there's no
//! internal locking, only a plain `Vec` of typed messages plus pluggable
//! cleaners and summarizers.

pub mod cleaner;
pub mod compaction;
mod error;
pub mod manager;
pub mod message;
pub mod summarizer;

pub use cleaner::{CompositeCleaner, DuplicateCleaner, MessageCleaner, TodoCleaner};
pub use compaction::{CompactionStrategy, SelectiveRetentionStrategy, SlidingWindowStrategy};
pub use error::HistoryError;
pub use manager::{compute_budget, HistoryConfig, HistoryManager, ModelDescriptor};
pub use message::{HistoryMessage, ToolCallEntry, ToolResultEntry};
pub use summarizer::{BoxFuture, HybridSummarizer, LlmSummarizer, SimpleSummarizer, SummarizeCallback, Summarizer};

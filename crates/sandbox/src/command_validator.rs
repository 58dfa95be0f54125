// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Blocks dangerous bash commands by regex pattern and, optionally, by a
//! command-name whitelist.

use std::collections::HashSet;

use regex::RegexSet;

use crate::error::SandboxError;
use crate::path_validator::ValidationMode;

const CRITICAL_PATTERNS: &[&str] = &[r"\brm\s+-rf\s+/", r">\s*/dev/", r"\bsudo\b"];

const STRICT_PATTERNS: &[&str] = &[
    r"\brm\s+-rf\s+/",
    r"\bdd\s+if=",
    r"\bmkfs\b",
    r"\bformat\b",
    r">\s*/dev/",
    r"\bsudo\b",
    r"\bchmod\s+777\b",
    r"\bcurl\b.*\|\s*bash",
    r"\bwget\b.*\|\s*bash",
    r"\bnc\s+",
    r"\bncat\s+",
];

pub struct CommandValidator {
    mode: ValidationMode,
    patterns: Vec<String>,
    compiled: Option<RegexSet>,
    allowed_commands: Option<HashSet<String>>,
}

impl CommandValidator {
    /// In `strict` mode, `blocked_patterns` (if given) extends the default
    /// list rather than replacing it.
    pub fn new(
        mode: ValidationMode,
        allowed_commands: Option<HashSet<String>>,
        blocked_patterns: Option<HashSet<String>>,
    ) -> Self {
        let patterns: Vec<String> = match mode {
            ValidationMode::Disabled => Vec::new(),
            ValidationMode::Permissive => CRITICAL_PATTERNS.iter().map(|s| (*s).to_string()).collect(),
            ValidationMode::Strict => {
                let mut patterns: Vec<String> = STRICT_PATTERNS.iter().map(|s| (*s).to_string()).collect();
                patterns.extend(blocked_patterns.into_iter().flatten());
                patterns
            }
        };

        let compiled = if patterns.is_empty() {
            None
        } else {
            RegexSet::new(patterns.iter().map(|p| format!("(?i){p}"))).ok()
        };

        tracing::info!(mode = ?mode, blocked_patterns = patterns.len(), "command validator initialized");

        Self {
            mode,
            patterns,
            compiled,
            allowed_commands,
        }
    }

    pub fn validate(&self, command: &str) -> Result<(), SandboxError> {
        if self.mode == ValidationMode::Disabled {
            return Ok(());
        }

        if command.trim().is_empty() {
            return Err(SandboxError::CommandValidation {
                command: command.to_string(),
                pattern: "<empty command>".to_string(),
            });
        }

        if let Some(set) = &self.compiled {
            if let Some(index) = set.matches(command).iter().next() {
                return Err(SandboxError::CommandValidation {
                    command: command.to_string(),
                    pattern: self.patterns[index].clone(),
                });
            }
        }

        if let Some(allowed) = &self.allowed_commands {
            let cmd_name = command.split_whitespace().next().unwrap_or("");
            if !allowed.contains(cmd_name) {
                return Err(SandboxError::CommandValidation {
                    command: command.to_string(),
                    pattern: format!("not in allowed list: {cmd_name}"),
                });
            }
        }

        Ok(())
    }

    pub fn is_safe(&self, command: &str) -> bool {
        self.validate(command).is_ok()
    }
}

#[cfg(test)]
#[path = "command_validator_tests.rs"]
mod tests;

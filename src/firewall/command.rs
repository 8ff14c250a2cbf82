// Dynafire - Command Runner
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Execution of host control commands (`firewall-cmd`).

use std::process::Command;

use anyhow::{Context, Result};

/// Captured result of a command run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Whether the process exited with status zero.
    pub success: bool,
    /// Combined stdout and stderr, trimmed.
    pub text: String,
}

#[cfg(test)]
impl CommandOutput {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            success: true,
            text: text.into(),
        }
    }

    pub fn failed(text: impl Into<String>) -> Self {
        Self {
            success: false,
            text: text.into(),
        }
    }
}

/// Runs external programs.
pub trait CommandRunner: Send + Sync {
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput>;
}

/// Runs commands on the host.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        let output = Command::new(program)
            .args(args)
            .output()
            .context(format!("Failed to execute {} {}", program, args.join(" ")))?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(CommandOutput {
            success: output.status.success(),
            text: text.trim().to_string(),
        })
    }
}

// Dynafire - Logging
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Tracing subscriber setup with a filter that can be changed after startup.

use anyhow::{Context, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::reload;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};

/// Handle used to swap the active log filter.
pub struct LogHandle {
    filter: reload::Handle<EnvFilter, Registry>,
}

impl LogHandle {
    /// Replace the active filter with `directive` (e.g. "debug").
    pub fn set_level(&self, directive: &str) -> Result<()> {
        let filter = EnvFilter::try_new(directive)
            .context(format!("Invalid log filter {:?}", directive))?;
        self.filter
            .reload(filter)
            .context("Failed to update log filter")
    }
}

/// Install the global subscriber at INFO, writing to stderr.
pub fn init() -> Result<LogHandle> {
    let (filter, handle) = reload::Layer::new(EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .with_target(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(LogHandle { filter: handle })
}

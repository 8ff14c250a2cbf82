// Dynafire - Systemd Module
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Systemd D-Bus client for service status checks.

mod client;

pub use client::SystemdClient;

/// Source of systemd unit activity.
pub trait UnitStatus {
    /// Whether the unit's `ActiveState` is `active`.
    fn is_active(&self, unit: &str) -> anyhow::Result<bool>;
}

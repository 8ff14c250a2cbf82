// Dynafire - Models
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Data models for firewall rules.

mod rule;

pub use rule::{RichRule, ZonePolicy};

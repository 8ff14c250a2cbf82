// Dynafire - Firewall Module
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Firewalld zone management for the dynafire blacklist.

mod client;
mod command;
mod zone_file;

use std::net::IpAddr;
use std::path::PathBuf;

use anyhow::Result;

pub use client::FirewallClient;

/// Name of the firewalld zone owned by the daemon.
pub const ZONE_NAME: &str = "dynafire";

/// Persisted zone file paths.
pub mod paths {
    pub const ZONE_FILE: &str = "/etc/firewalld/zones/dynafire.xml";
    pub const ZONE_BACKUP_FILE: &str = "/etc/firewalld/zones/dynafire.xml.old";
}

/// Location of the zone file and the backup firewalld keeps next to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneFiles {
    pub current: PathBuf,
    pub backup: PathBuf,
}

#[cfg(test)]
impl ZoneFiles {
    /// Zone files under an alternate directory.
    pub fn in_dir(dir: &std::path::Path) -> Self {
        Self {
            current: dir.join("dynafire.xml"),
            backup: dir.join("dynafire.xml.old"),
        }
    }
}

impl Default for ZoneFiles {
    fn default() -> Self {
        Self {
            current: PathBuf::from(paths::ZONE_FILE),
            backup: PathBuf::from(paths::ZONE_BACKUP_FILE),
        }
    }
}

/// Operations the blacklist orchestrator needs from the firewall.
///
/// Calls are blocking and must never overlap; callers serialize them.
pub trait Blocker: Send + 'static {
    /// Remove every blacklist rule and reload.
    fn reset_firewall_rules(&self) -> Result<()>;

    /// Install a full blacklist and apply the zone target policy.
    fn block_ip_list(&self, blacklist: &[IpAddr]) -> Result<()>;

    /// Add a drop rule for one address unless it is already present.
    fn block_ip(&self, address: IpAddr) -> Result<()>;

    /// Remove the drop rule for one address if present.
    fn unblock_ip(&self, address: IpAddr) -> Result<()>;
}

// Dynafire - Rich Rule Model
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Address-based firewalld rich rules and zone target policies.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

/// IP family of a rich rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpFamily {
    Ipv4,
    Ipv6,
}

impl IpFamily {
    /// Family of an address. IPv4-mapped IPv6 addresses count as IPv4.
    pub fn of(address: &IpAddr) -> Self {
        match address.to_canonical() {
            IpAddr::V4(_) => IpFamily::Ipv4,
            IpAddr::V6(_) => IpFamily::Ipv6,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IpFamily::Ipv4 => "ipv4",
            IpFamily::Ipv6 => "ipv6",
        }
    }
}

impl fmt::Display for IpFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Action taken on traffic matched by a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleAction {
    Drop,
}

impl RuleAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleAction::Drop => "drop",
        }
    }
}

/// A single address-scoped rich rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RichRule {
    pub family: IpFamily,
    pub address: IpAddr,
    pub action: RuleAction,
}

impl RichRule {
    /// Create a drop rule for an address.
    pub fn drop(address: IpAddr) -> Self {
        let address = address.to_canonical();
        Self {
            family: IpFamily::of(&address),
            address,
            action: RuleAction::Drop,
        }
    }

    /// Rule string understood by `firewall-cmd --add-rich-rule` and friends.
    pub fn to_command_string(&self) -> String {
        format!(
            "rule family={} source address={} {}",
            self.family,
            self.address,
            self.action.as_str()
        )
    }
}

/// Default target applied to the dynafire zone after a bulk load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZonePolicy {
    Accept,
    Reject,
    Drop,
}

impl ZonePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ZonePolicy::Accept => "ACCEPT",
            ZonePolicy::Reject => "REJECT",
            ZonePolicy::Drop => "DROP",
        }
    }
}

impl FromStr for ZonePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ACCEPT" => Ok(ZonePolicy::Accept),
            "REJECT" => Ok(ZonePolicy::Reject),
            "DROP" => Ok(ZonePolicy::Drop),
            _ => Err(anyhow::anyhow!("unknown firewalld target policy: {}", s)),
        }
    }
}

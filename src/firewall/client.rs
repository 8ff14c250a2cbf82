// Dynafire - Firewalld Client
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Firewalld client driving `firewall-cmd` and the dynafire zone file.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::net::IpAddr;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tracing::{debug, info, warn};

use super::command::{CommandRunner, SystemRunner};
use super::zone_file::render_zone;
use super::{Blocker, ZoneFiles, ZONE_NAME};
use crate::models::{RichRule, ZonePolicy};
use crate::systemd::UnitStatus;

const FIREWALL_CMD: &str = "firewall-cmd";
const ZONE_ARG: &str = "--zone=dynafire";
const SUCCESS: &str = "success";

/// Host services that must be running before the zone is touched.
const REQUIRED_UNITS: &[(&str, &str)] = &[
    ("NetworkManager.service", "NetworkManager"),
    ("firewalld.service", "firewalld"),
];

/// Client owning the dynafire firewalld zone.
pub struct FirewallClient<R: CommandRunner = SystemRunner> {
    runner: R,
    zone_target_policy: String,
    zone_files: ZoneFiles,
}

impl FirewallClient<SystemRunner> {
    /// Create a client for the host's firewalld.
    pub fn new(zone_target_policy: &str) -> Self {
        Self::with_runner(SystemRunner, zone_target_policy, ZoneFiles::default())
    }
}

impl<R: CommandRunner> FirewallClient<R> {
    /// Create a client with an explicit command runner and zone file location.
    pub fn with_runner(runner: R, zone_target_policy: &str, zone_files: ZoneFiles) -> Self {
        Self {
            runner,
            zone_target_policy: zone_target_policy.to_string(),
            zone_files,
        }
    }

    /// Verify host prerequisites and make the dynafire zone the default zone.
    ///
    /// Every step is fatal: the daemon must not run against a zone in an
    /// unknown state.
    pub fn bootstrap(&self, units: &dyn UnitStatus) -> Result<()> {
        for (unit, label) in REQUIRED_UNITS {
            let active = units
                .is_active(unit)
                .context(format!("Failed to check {} service status", label))?;
            if !active {
                return Err(anyhow!(
                    "please ensure {} is installed and running before continuing",
                    label
                ));
            }
        }

        if !self.has_zone()? {
            self.create_zone()?;
        }

        if !self.default_zone_is_ours()? {
            self.save_and_reload()?;
            self.set_default_zone()?;
        }

        self.save_and_reload()?;
        self.check_config()?;

        info!("Firewalld zone {} is ready", ZONE_NAME);
        Ok(())
    }

    /// Run `firewall-cmd`, failing if it cannot run or exits non-zero.
    fn firewall_cmd(&self, args: &[&str]) -> Result<String> {
        let output = self.runner.run(FIREWALL_CMD, args)?;
        if !output.success {
            return Err(anyhow!(
                "{} {} did not complete successfully: {}",
                FIREWALL_CMD,
                args.join(" "),
                output.text
            ));
        }
        Ok(output.text)
    }

    /// Run `firewall-cmd` and require the literal success marker.
    fn expect_success(&self, args: &[&str], action: &str) -> Result<()> {
        let text = self
            .firewall_cmd(args)
            .context(format!("Failed while {}", action))?;

        if text != SUCCESS {
            return Err(anyhow!(
                "unexpected output while {}; expected '{}' but got {}",
                action,
                SUCCESS,
                text
            ));
        }
        Ok(())
    }

    fn has_zone(&self) -> Result<bool> {
        let zones = self.firewall_cmd(&["--get-zones"])?;
        Ok(zones.split_whitespace().any(|zone| zone == ZONE_NAME))
    }

    fn create_zone(&self) -> Result<()> {
        self.expect_success(
            &["--permanent", "--new-zone=dynafire"],
            "creating the dynafire firewalld zone",
        )?;
        info!("Created firewalld zone {}", ZONE_NAME);
        Ok(())
    }

    fn default_zone_is_ours(&self) -> Result<bool> {
        Ok(self.firewall_cmd(&["--get-default-zone"])? == ZONE_NAME)
    }

    fn set_default_zone(&self) -> Result<()> {
        self.expect_success(
            &["--set-default-zone=dynafire"],
            "setting the firewalld default zone",
        )?;
        info!("Set default zone to: {}", ZONE_NAME);
        Ok(())
    }

    fn reload(&self) -> Result<()> {
        self.expect_success(&["--reload"], "reloading firewalld")?;
        debug!("Firewalld configuration reloaded");
        Ok(())
    }

    fn save_runtime_config(&self) -> Result<()> {
        self.expect_success(
            &["--runtime-to-permanent"],
            "saving runtime firewalld configuration as permanent",
        )
    }

    fn save_and_reload(&self) -> Result<()> {
        self.save_runtime_config()?;
        self.reload()
    }

    fn check_config(&self) -> Result<()> {
        self.expect_success(&["--check-config"], "checking firewalld configuration")
    }

    fn set_zone_target(&self, policy: ZonePolicy) -> Result<()> {
        let target = format!("--set-target={}", policy.as_str());
        self.expect_success(
            &["--permanent", ZONE_ARG, &target],
            "setting the dynafire zone traffic policy",
        )?;
        self.reload()
    }

    /// Whether a rich rule is present in the live zone.
    ///
    /// firewall-cmd sometimes exits non-zero while still answering, so only
    /// the textual answer is trusted.
    fn rule_exists(&self, rule: &str) -> bool {
        match self.runner.run(FIREWALL_CMD, &[ZONE_ARG, "--query-rich-rule", rule]) {
            Ok(output) => output.text == "yes",
            Err(e) => {
                warn!(error = %e, rule, "unable to query rich rule");
                false
            }
        }
    }

    fn append_zone_file(&self, contents: &str) -> Result<()> {
        let path = &self.zone_files.current;
        let mut options = OpenOptions::new();
        options.create(true).append(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o644);
        }

        let mut file = options
            .open(path)
            .context(format!("Failed to open zone file {}", path.display()))?;
        file.write_all(contents.as_bytes())
            .context(format!("Failed to write zone file {}", path.display()))?;
        Ok(())
    }
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!("Removed {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).context(format!("Failed to remove {}", path.display())),
    }
}

impl<R: CommandRunner + 'static> Blocker for FirewallClient<R> {
    fn reset_firewall_rules(&self) -> Result<()> {
        // Dropping the zone files is far faster than removing rules one by one.
        remove_if_exists(&self.zone_files.current)?;
        remove_if_exists(&self.zone_files.backup)?;
        self.reload()
    }

    fn block_ip_list(&self, blacklist: &[IpAddr]) -> Result<()> {
        let policy: ZonePolicy = self.zone_target_policy.parse()?;

        let rules: Vec<RichRule> = blacklist.iter().copied().map(RichRule::drop).collect();
        self.append_zone_file(&render_zone(&rules)?)?;

        self.reload()?;
        self.set_zone_target(policy)?;

        info!("Loaded {} blacklist rules into zone {}", rules.len(), ZONE_NAME);
        Ok(())
    }

    fn block_ip(&self, address: IpAddr) -> Result<()> {
        let rule = RichRule::drop(address).to_command_string();
        if self.rule_exists(&rule) {
            debug!(rule = %rule, "skipping adding existing rule");
            return Ok(());
        }

        self.expect_success(
            &[ZONE_ARG, "--add-rich-rule", &rule],
            "adding a firewalld rich rule to blacklist an IP",
        )
    }

    fn unblock_ip(&self, address: IpAddr) -> Result<()> {
        let rule = RichRule::drop(address).to_command_string();
        if !self.rule_exists(&rule) {
            debug!(rule = %rule, "skipping removing non-existent rule");
            return Ok(());
        }

        self.expect_success(
            &[ZONE_ARG, "--remove-rich-rule", &rule],
            "removing a firewalld rich rule to whitelist an IP",
        )
    }
}

// Dynafire - Systemd D-Bus Client
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Systemd D-Bus client used to check that host services are running.

use anyhow::{anyhow, Context, Result};
use tracing::{debug, info};
use zbus::blocking::Connection;
use zbus::zvariant::OwnedObjectPath;

use super::UnitStatus;

const SYSTEMD_BUS: &str = "org.freedesktop.systemd1";
const SYSTEMD_PATH: &str = "/org/freedesktop/systemd1";
const MANAGER_INTERFACE: &str = "org.freedesktop.systemd1.Manager";
const UNIT_INTERFACE: &str = "org.freedesktop.systemd1.Unit";

/// Client for interacting with systemd via D-Bus.
pub struct SystemdClient {
    connection: Option<Connection>,
}

impl SystemdClient {
    /// Create a new systemd client.
    pub fn new() -> Self {
        Self { connection: None }
    }

    /// Connect to systemd.
    pub fn connect(&mut self) -> Result<()> {
        info!("Connecting to systemd...");

        let conn = Connection::system()
            .context("Failed to connect to system D-Bus")?;

        // Test connection by getting systemd version
        let value: zbus::zvariant::OwnedValue = conn
            .call_method(
                Some(SYSTEMD_BUS),
                SYSTEMD_PATH,
                Some("org.freedesktop.DBus.Properties"),
                "Get",
                &(MANAGER_INTERFACE, "Version"),
            )?
            .body()
            .deserialize()?;

        let version: String = value.try_into().unwrap_or_default();
        debug!("systemd version {}", version);

        self.connection = Some(conn);
        info!("Connected to systemd");
        Ok(())
    }

    /// Get the `ActiveState` of a unit ("active", "inactive", "failed", ...).
    pub fn active_state(&self, name: &str) -> Result<String> {
        let conn = self.connection.as_ref()
            .ok_or_else(|| anyhow!("Not connected to systemd"))?;

        let unit_path: OwnedObjectPath = conn
            .call_method(
                Some(SYSTEMD_BUS),
                SYSTEMD_PATH,
                Some(MANAGER_INTERFACE),
                "GetUnit",
                &(name,),
            )
            .or_else(|_| {
                // Try LoadUnit if GetUnit fails (unit not loaded)
                conn.call_method(
                    Some(SYSTEMD_BUS),
                    SYSTEMD_PATH,
                    Some(MANAGER_INTERFACE),
                    "LoadUnit",
                    &(name,),
                )
            })
            .context(format!("Failed to look up unit {}", name))?
            .body()
            .deserialize()?;

        let value: zbus::zvariant::OwnedValue = conn
            .call_method(
                Some(SYSTEMD_BUS),
                unit_path.as_ref(),
                Some("org.freedesktop.DBus.Properties"),
                "Get",
                &(UNIT_INTERFACE, "ActiveState"),
            )?
            .body()
            .deserialize()?;

        let state: String = value.try_into()
            .map_err(|_| anyhow!("ActiveState of {} is not a string", name))?;
        Ok(state)
    }
}

impl UnitStatus for SystemdClient {
    fn is_active(&self, unit: &str) -> Result<bool> {
        let state = self.active_state(unit)?;
        debug!("unit {} is {}", unit, state);
        Ok(state == "active")
    }
}

impl Default for SystemdClient {
    fn default() -> Self {
        Self::new()
    }
}

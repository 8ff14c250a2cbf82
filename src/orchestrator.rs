// Dynafire - Synchronization
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Applies feed events to the firewall.
//!
//! Lists and deltas are consumed concurrently, but only one of them may
//! touch the firewall at a time. Any firewall error ends the run.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, Mutex, OwnedMutexGuard};
use tracing::{debug, info};

use crate::feed::{Delta, DeltaOperation, FeedStreams, List};
use crate::firewall::Blocker;

/// Pause after each delta before the firewall is released.
pub const DELTA_PACING: Duration = Duration::from_millis(250);

/// Drives a [`Blocker`] from the feed's event queues.
pub struct Orchestrator<B: Blocker> {
    blocker: Arc<Mutex<B>>,
    delta_pacing: Duration,
}

impl<B: Blocker> Orchestrator<B> {
    pub fn new(blocker: B) -> Self {
        Self::with_pacing(blocker, DELTA_PACING)
    }

    pub fn with_pacing(blocker: B, delta_pacing: Duration) -> Self {
        Self {
            blocker: Arc::new(Mutex::new(blocker)),
            delta_pacing,
        }
    }

    /// Consume both queues until they close or a firewall call fails.
    pub async fn run(&self, streams: FeedStreams) -> Result<()> {
        let FeedStreams { lists, deltas } = streams;
        tokio::try_join!(self.consume_lists(lists), self.consume_deltas(deltas))?;
        info!("Feed queues closed, synchronization stopped");
        Ok(())
    }

    async fn consume_lists(&self, mut lists: mpsc::Receiver<List>) -> Result<()> {
        while let Some(list) = lists.recv().await {
            let guard = self.blocker.clone().lock_owned().await;
            info!(serial = list.serial, entries = list.blacklist.len(), "applying full blacklist");

            with_blocker(guard, move |blocker| {
                blocker
                    .reset_firewall_rules()
                    .context("unable to clear old IP blacklist")?;
                blocker
                    .block_ip_list(&list.blacklist)
                    .context("unable to initialize IP blacklist")
            })
            .await?;
        }
        Ok(())
    }

    async fn consume_deltas(&self, mut deltas: mpsc::Receiver<Delta>) -> Result<()> {
        while let Some(delta) = deltas.recv().await {
            let guard = self.blocker.clone().lock_owned().await;
            let guard = apply_delta(guard, delta).await?;

            tokio::time::sleep(self.delta_pacing).await;
            drop(guard);
        }
        Ok(())
    }
}

async fn apply_delta<B: Blocker>(
    guard: OwnedMutexGuard<B>,
    delta: Delta,
) -> Result<OwnedMutexGuard<B>> {
    let ip = delta.ip;
    match delta.operation {
        DeltaOperation::Positive => {
            let guard = with_blocker(guard, move |blocker| {
                blocker.block_ip(ip).context(format!("unable to blacklist IP {}", ip))
            })
            .await?;
            debug!(ip = %ip, "blacklisting");
            Ok(guard)
        }
        DeltaOperation::Negative => {
            let guard = with_blocker(guard, move |blocker| {
                blocker.unblock_ip(ip).context(format!("unable to whitelist IP {}", ip))
            })
            .await?;
            debug!(ip = %ip, "whitelisting");
            Ok(guard)
        }
        DeltaOperation::Other(operation) => {
            debug!(ip = %ip, operation = %operation, "ignoring unknown delta operation");
            Ok(guard)
        }
    }
}

/// Run a blocking firewall call off the async workers, keeping the lock.
async fn with_blocker<B, F>(guard: OwnedMutexGuard<B>, call: F) -> Result<OwnedMutexGuard<B>>
where
    B: Blocker,
    F: FnOnce(&B) -> Result<()> + Send + 'static,
{
    tokio::task::spawn_blocking(move || -> Result<OwnedMutexGuard<B>> {
        call(&*guard)?;
        Ok(guard)
    })
    .await
    .context("firewall task panicked")?
}

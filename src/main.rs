// Dynafire - Main Entry Point
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Dynafire - keeps a firewalld zone in sync with the Turris dynfw blacklist.

mod config;
mod feed;
mod firewall;
mod logging;
mod models;
mod orchestrator;
mod systemd;

use std::path::Path;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use config::{Config, CONFIG_PATH};
use feed::{fetch_server_key, FeedClient, FeedEndpoint, ZmqTransport, SERVER_KEY_URL};
use firewall::FirewallClient;
use logging::LogHandle;
use orchestrator::Orchestrator;
use systemd::SystemdClient;

/// Daemon version.
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if std::env::args().skip(1).any(|arg| arg == "--version" || arg == "-V") {
        println!("dynafire {}", VERSION);
        return;
    }

    let log = match logging::init() {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("dynafire: {:#}", e);
            std::process::exit(1);
        }
    };

    // The feed thread may be parked in a receive, so leave without waiting
    // for the runtime to join it.
    let code = match run(log).await {
        Ok(()) => 0,
        Err(e) => {
            error!("{:#}", e);
            1
        }
    };
    std::process::exit(code);
}

async fn run(log: LogHandle) -> Result<()> {
    let config = Config::load_or_create(Path::new(CONFIG_PATH))?;
    log.set_level(config.log_filter())?;
    info!("Starting dynafire {}", VERSION);

    let policy = config.zone_target_policy.clone();
    let firewall = tokio::task::spawn_blocking(move || -> Result<FirewallClient> {
        let mut systemd = SystemdClient::new();
        systemd.connect()?;

        let firewall = FirewallClient::new(&policy);
        firewall.bootstrap(&systemd)?;
        Ok(firewall)
    })
    .await
    .context("firewall bootstrap task panicked")?
    .context("Failed to prepare firewalld")?;

    let server_key = fetch_server_key(SERVER_KEY_URL).await?;
    let endpoint = FeedEndpoint::default();
    let (client, streams) = tokio::task::spawn_blocking(move || -> Result<_> {
        let transport = ZmqTransport::connect(&endpoint, &server_key)?;
        let (mut client, streams) = FeedClient::new(transport);
        client.verify_session()?;
        Ok((client, streams))
    })
    .await
    .context("feed connection task panicked")?
    .context("Failed to establish dynfw session")?;
    info!("dynfw session established");

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_signal(cancel.clone()));

    let feed = tokio::task::spawn_blocking(move || client.run(cancel));
    Orchestrator::new(firewall).run(streams).await?;

    feed.await
        .context("feed task panicked")?
        .context("dynfw feed stopped")?;

    info!("dynafire stopped");
    Ok(())
}

/// Cancel the feed on SIGINT or SIGTERM.
async fn cancel_on_signal(cancel: CancellationToken) {
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "unable to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = terminate => {}
    }

    info!("Shutting down after the current feed message...");
    cancel.cancel();
}

// Dynafire - Feed Transport
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! CURVE-encrypted ZeroMQ subscription to the dynfw publisher.

use anyhow::{anyhow, Context, Result};
use tracing::{error, info};

use super::{FeedEndpoint, TOPIC_PREFIX};

/// Source of multi-part feed messages.
pub trait FeedTransport: Send {
    /// Block until the next message arrives and return its parts.
    fn recv_frames(&mut self) -> Result<Vec<Vec<u8>>>;

    /// Unsubscribe and close the session.
    fn shutdown(&mut self);
}

/// ZeroMQ SUB socket authenticated with CURVE.
pub struct ZmqTransport {
    // The context must outlive the socket.
    _context: zmq::Context,
    socket: Option<zmq::Socket>,
}

impl ZmqTransport {
    /// Configure a CURVE session with a fresh client keypair, subscribe to
    /// the dynfw topics and connect to the publisher.
    pub fn connect(endpoint: &FeedEndpoint, server_key: &str) -> Result<Self> {
        let context = zmq::Context::new();
        let socket = context
            .socket(zmq::SUB)
            .context("Failed to create ZMQ subscriber socket")?;
        socket.set_linger(0).context("Failed to set ZMQ linger")?;

        let server_key = zmq::z85_decode(server_key.trim())
            .map_err(|e| anyhow!("Invalid publisher public key: {:?}", e))?;
        let keypair = zmq::CurveKeyPair::new().context("Failed to generate CURVE keypair")?;

        socket
            .set_curve_serverkey(&server_key)
            .context("Failed to set CURVE server key")?;
        socket
            .set_curve_publickey(&keypair.public_key)
            .context("Failed to set CURVE public key")?;
        socket
            .set_curve_secretkey(&keypair.secret_key)
            .context("Failed to set CURVE secret key")?;
        socket
            .set_subscribe(TOPIC_PREFIX.as_bytes())
            .context(format!("Failed to subscribe to {}", TOPIC_PREFIX))?;

        let address = endpoint.address();
        socket
            .connect(&address)
            .context(format!("Failed to connect to {}", address))?;

        info!("Connected to dynfw publisher at {}", address);
        Ok(Self {
            _context: context,
            socket: Some(socket),
        })
    }
}

impl FeedTransport for ZmqTransport {
    fn recv_frames(&mut self) -> Result<Vec<Vec<u8>>> {
        let socket = self
            .socket
            .as_ref()
            .ok_or_else(|| anyhow!("ZMQ socket already closed"))?;

        socket
            .recv_multipart(0)
            .context("Unable to receive dynfw message")
    }

    fn shutdown(&mut self) {
        let Some(socket) = self.socket.take() else {
            return;
        };

        if let Err(e) = socket.set_unsubscribe(TOPIC_PREFIX.as_bytes()) {
            error!(error = %e, "unable to unsubscribe from {} topic", TOPIC_PREFIX);
        }
        drop(socket);
        info!("Closed dynfw subscription");
    }
}

impl Drop for ZmqTransport {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// Dynafire - Feed Client
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Receive loop for the dynfw feed.
//!
//! The loop is blocking and is meant to run on its own blocking task. Each
//! decoded event is handed to the orchestrator through a single-slot queue,
//! so a slow consumer holds back the next receive.

use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::codec::{Delta, List};
use super::sequencer::Sequencer;
use super::transport::FeedTransport;
use super::TOPIC_PREFIX;

/// Errors that end the receive loop.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("failed to verify connection: {0}")]
    Liveness(String),

    #[error("malformed dynfw message: expected 2 parts, got {parts}")]
    MalformedFrame { parts: usize },

    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}

/// Topic of an inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    Event,
    Delta,
    List,
    Unknown,
}

impl Topic {
    pub fn parse(raw: &[u8]) -> Self {
        let Some(suffix) = raw.strip_prefix(TOPIC_PREFIX.as_bytes()) else {
            return Topic::Unknown;
        };

        match suffix {
            b"event" => Topic::Event,
            b"delta" => Topic::Delta,
            b"list" => Topic::List,
            _ => Topic::Unknown,
        }
    }
}

/// Receiving ends of the feed's event queues.
pub struct FeedStreams {
    pub lists: mpsc::Receiver<List>,
    pub deltas: mpsc::Receiver<Delta>,
}

/// Client for one subscribed dynfw session.
pub struct FeedClient<T: FeedTransport> {
    transport: T,
    sequencer: Sequencer,
    list_tx: mpsc::Sender<List>,
    delta_tx: mpsc::Sender<Delta>,
}

impl<T: FeedTransport> FeedClient<T> {
    /// Create a client over a connected transport.
    pub fn new(transport: T) -> (Self, FeedStreams) {
        let (list_tx, lists) = mpsc::channel(1);
        let (delta_tx, deltas) = mpsc::channel(1);

        let client = Self {
            transport,
            sequencer: Sequencer::new(),
            list_tx,
            delta_tx,
        };

        (client, FeedStreams { lists, deltas })
    }

    /// Block for one message to prove the subscription is live.
    pub fn verify_session(&mut self) -> Result<(), FeedError> {
        let frames = self
            .transport
            .recv_frames()
            .map_err(|e| FeedError::Liveness(format!("no dynfw test message: {:#}", e)))?;

        if frames.is_empty() || frames.iter().all(|part| part.is_empty()) {
            return Err(FeedError::Liveness("dynfw test message has no data".to_string()));
        }

        debug!(parts = frames.len(), "dynfw session verified");
        Ok(())
    }

    /// Run the receive loop until cancelled, the consumers go away, or a
    /// fatal error occurs. Both event queues are closed on return.
    pub fn run(mut self, cancel: CancellationToken) -> Result<(), FeedError> {
        let result = self.receive_loop(&cancel);
        self.transport.shutdown();
        result
    }

    fn receive_loop(&mut self, cancel: &CancellationToken) -> Result<(), FeedError> {
        loop {
            let frames = self.transport.recv_frames().map_err(|e| {
                error!(error = %e, "unable to receive dynfw message");
                FeedError::Transport(e)
            })?;

            if frames.len() != 2 {
                error!(parts = frames.len(), "malformed dynfw message");
                return Err(FeedError::MalformedFrame { parts: frames.len() });
            }

            let delivered = match Topic::parse(&frames[0]) {
                Topic::List => match self.sequencer.on_list(&frames[1]) {
                    Some(list) => self.list_tx.blocking_send(list).is_ok(),
                    None => true,
                },
                Topic::Delta => match self.sequencer.on_delta(&frames[1]) {
                    Some(delta) => self.delta_tx.blocking_send(delta).is_ok(),
                    None => true,
                },
                Topic::Event | Topic::Unknown => true,
            };

            if !delivered {
                info!("feed consumers stopped, ending receive loop");
                return Ok(());
            }

            if cancel.is_cancelled() {
                info!("feed cancelled, ending receive loop");
                return Ok(());
            }
        }
    }
}

// Dynafire - Feed Module
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Client for the Turris Sentinel dynamic firewall (dynfw) feed.

mod client;
mod codec;
mod pubkey;
mod sequencer;
mod transport;

pub use client::{FeedClient, FeedStreams};
pub use codec::{Delta, DeltaOperation, List};
pub use pubkey::fetch_server_key;
pub use transport::ZmqTransport;


/// Topic prefix all dynfw messages are published under.
pub const TOPIC_PREFIX: &str = "dynfw/";

/// Location of the publisher's CURVE public key.
pub const SERVER_KEY_URL: &str = "https://repo.turris.cz/sentinel/dynfw.pub";

/// Address of a dynfw publisher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEndpoint {
    pub host: String,
    pub port: u16,
}

impl FeedEndpoint {
    pub fn address(&self) -> String {
        format!("tcp://{}:{}", self.host, self.port)
    }
}

impl Default for FeedEndpoint {
    fn default() -> Self {
        Self {
            host: "sentinel.turris.cz".to_string(),
            port: 7087,
        }
    }
}

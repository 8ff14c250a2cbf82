// Dynafire - Feed Sequencing
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! List/delta continuity tracking.
//!
//! A fresh session (or one that lost a delta) waits for a full list before
//! any delta is let through. Deltas must then arrive with consecutive
//! serials; serial `0` on either side always passes. A gapped delta still
//! becomes the last seen serial, so the first delta after the resync list
//! must follow it.

use tracing::{debug, info, warn};

use super::codec::{decode_delta, decode_list, Delta, List};

/// Continuity state owned by the feed receive loop.
#[derive(Debug)]
pub struct Sequencer {
    awaiting_full_list: bool,
    last_delta_serial: u16,
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new()
    }
}

impl Sequencer {
    pub fn new() -> Self {
        Self {
            awaiting_full_list: true,
            last_delta_serial: 0,
        }
    }

    #[cfg(test)]
    pub fn awaiting_full_list(&self) -> bool {
        self.awaiting_full_list
    }

    #[cfg(test)]
    pub fn last_delta_serial(&self) -> u16 {
        self.last_delta_serial
    }

    /// Handle a `list` payload. Returns the list if it should be applied.
    pub fn on_list(&mut self, payload: &[u8]) -> Option<List> {
        if !self.awaiting_full_list {
            return None;
        }

        match decode_list(payload) {
            Ok(list) => {
                info!(serial = list.serial, entries = list.blacklist.len(), "received full blacklist");
                self.awaiting_full_list = false;
                Some(list)
            }
            Err(e) => {
                warn!(error = %e, "unable to decode list message");
                None
            }
        }
    }

    /// Handle a `delta` payload. Returns the delta if it should be applied.
    ///
    /// A delta that breaks continuity puts the sequencer back into resync
    /// but is still returned to the caller and recorded as the last serial.
    pub fn on_delta(&mut self, payload: &[u8]) -> Option<Delta> {
        if self.awaiting_full_list {
            return None;
        }

        let delta = match decode_delta(payload) {
            Ok(delta) => delta,
            Err(e) => {
                warn!(error = %e, "unable to decode delta message");
                return None;
            }
        };

        if !serial_follows(self.last_delta_serial, delta.serial) {
            info!(
                previous = self.last_delta_serial,
                received = delta.serial,
                "delta serial gap, waiting for a fresh list"
            );
            self.awaiting_full_list = true;
        }
        self.last_delta_serial = delta.serial;

        debug!(serial = delta.serial, ip = %delta.ip, "delta accepted");
        Some(delta)
    }
}

fn serial_follows(previous: u16, current: u16) -> bool {
    previous == 0 || current == 0 || u32::from(previous) + 1 == u32::from(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::codec::tests::{delta_payload, list_payload};

    fn synced() -> Sequencer {
        let mut seq = Sequencer::new();
        assert!(seq.on_list(&list_payload(1, 1000, &["9.9.9.9"])).is_some());
        seq
    }

    #[test]
    fn test_deltas_suppressed_until_list() {
        let mut seq = Sequencer::new();
        for serial in 0..20 {
            assert!(seq.on_delta(&delta_payload("positive", "1.1.1.1", serial, 1)).is_none());
        }
        assert!(seq.awaiting_full_list());
        assert_eq!(seq.last_delta_serial(), 0);
    }

    #[test]
    fn test_list_accepted_once_per_resync() {
        let mut seq = synced();
        assert!(!seq.awaiting_full_list());
        assert!(seq.on_list(&list_payload(2, 1001, &["1.1.1.1"])).is_none());
        assert!(seq.on_list(&list_payload(3, 1002, &["1.1.1.1"])).is_none());
    }

    #[test]
    fn test_undecodable_list_keeps_waiting() {
        let mut seq = Sequencer::new();
        assert!(seq.on_list(b"\x01\x02").is_none());
        assert!(seq.awaiting_full_list());
        assert!(seq.on_list(&list_payload(1, 1, &[])).is_some());
    }

    #[test]
    fn test_consecutive_serials_accepted() {
        for start in [1u16, 41, 1000, 65_000] {
            let mut seq = synced();
            assert!(seq.on_delta(&delta_payload("positive", "1.1.1.1", start, 1)).is_some());
            assert_eq!(seq.last_delta_serial(), start);

            assert!(seq.on_delta(&delta_payload("positive", "1.1.1.2", start + 1, 1)).is_some());
            assert_eq!(seq.last_delta_serial(), start + 1);
            assert!(!seq.awaiting_full_list());
        }
    }

    #[test]
    fn test_gap_triggers_resync() {
        for start in [1u16, 41, 1000] {
            let mut seq = synced();
            seq.on_delta(&delta_payload("positive", "1.1.1.1", start, 1));

            let gapped = seq.on_delta(&delta_payload("positive", "1.1.1.3", start + 2, 1));
            assert!(gapped.is_some());
            assert!(seq.awaiting_full_list());
            assert_eq!(seq.last_delta_serial(), start + 2);

            assert!(seq.on_delta(&delta_payload("positive", "1.1.1.4", start + 3, 1)).is_none());
        }
    }

    #[test]
    fn test_delta_after_resync_must_follow_gapped_serial() {
        let mut seq = synced();
        seq.on_delta(&delta_payload("positive", "1.1.1.1", 1, 1));
        seq.on_delta(&delta_payload("positive", "1.1.1.3", 3, 1));
        assert!(seq.on_list(&list_payload(2, 2, &["9.9.9.9"])).is_some());

        // 10 does not follow 3: forwarded, but back to resync
        assert!(seq.on_delta(&delta_payload("positive", "1.1.1.10", 10, 1)).is_some());
        assert!(seq.awaiting_full_list());
        assert_eq!(seq.last_delta_serial(), 10);

        assert!(seq.on_list(&list_payload(3, 3, &["9.9.9.9"])).is_some());
        assert!(seq.on_delta(&delta_payload("positive", "1.1.1.11", 11, 1)).is_some());
        assert!(!seq.awaiting_full_list());
        assert_eq!(seq.last_delta_serial(), 11);
    }

    #[test]
    fn test_zero_serial_always_passes() {
        let mut seq = synced();
        seq.on_delta(&delta_payload("positive", "1.1.1.1", 10, 1));
        assert!(seq.on_delta(&delta_payload("negative", "1.1.1.1", 0, 1)).is_some());
        assert!(!seq.awaiting_full_list());

        // last serial 0 accepts anything
        assert!(seq.on_delta(&delta_payload("positive", "1.1.1.1", 500, 1)).is_some());
        assert!(!seq.awaiting_full_list());
        assert_eq!(seq.last_delta_serial(), 500);
    }

    #[test]
    fn test_undecodable_delta_is_skipped() {
        let mut seq = synced();
        seq.on_delta(&delta_payload("positive", "1.1.1.1", 5, 1));
        assert!(seq.on_delta(b"garbage").is_none());
        assert_eq!(seq.last_delta_serial(), 5);
        assert!(!seq.awaiting_full_list());
    }
}

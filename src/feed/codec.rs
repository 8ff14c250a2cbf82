// Dynafire - Feed Wire Codec
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Decoding of dynfw `list` and `delta` payloads.
//!
//! Both payloads are a single MessagePack map. Decoding parses the map,
//! checks that every required key is present, then extracts typed fields.
//! A field of the wrong type fails the whole message.

use std::fmt;
use std::net::IpAddr;

use chrono::{DateTime, Utc};
use rmpv::Value;
use thiserror::Error;

const LIST_KEYS: &[&str] = &["ts", "version", "serial", "list"];
const DELTA_KEYS: &[&str] = &["delta", "ip", "serial", "ts"];

/// Kind of feed message being decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    List,
    Delta,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageKind::List => f.write_str("list"),
            MessageKind::Delta => f.write_str("delta"),
        }
    }
}

/// Errors produced while decoding a feed payload.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unable to decode {kind} message: {reason}")]
    Undecodable { kind: MessageKind, reason: String },

    #[error("malformed {kind} message: missing key `{key}`")]
    Malformed { kind: MessageKind, key: &'static str },

    #[error("{kind} field `{field}` is not {expected}")]
    FieldType {
        kind: MessageKind,
        field: &'static str,
        expected: &'static str,
    },

    #[error("{kind} field `{field}` value {value} is out of range")]
    OutOfRange {
        kind: MessageKind,
        field: &'static str,
        value: u64,
    },
}

/// Full blacklist snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct List {
    pub version: DateTime<Utc>,
    pub serial: u32,
    pub blacklist: Vec<IpAddr>,
    pub timestamp: DateTime<Utc>,
}

/// What a delta does to the blacklist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeltaOperation {
    /// Add the address to the blacklist.
    Positive,
    /// Remove the address from the blacklist.
    Negative,
    /// Anything else the publisher sends; acknowledged and ignored.
    Other(String),
}

impl DeltaOperation {
    fn parse(raw: &str) -> Self {
        match raw {
            "positive" => DeltaOperation::Positive,
            "negative" => DeltaOperation::Negative,
            other => DeltaOperation::Other(other.to_string()),
        }
    }
}

/// Incremental blacklist change.
#[derive(Debug, Clone, PartialEq)]
pub struct Delta {
    pub operation: DeltaOperation,
    pub ip: IpAddr,
    pub serial: u16,
    pub timestamp: DateTime<Utc>,
}

/// Decode a `dynfw/list` payload.
pub fn decode_list(payload: &[u8]) -> Result<List, DecodeError> {
    let fields = Fields::parse(MessageKind::List, payload, LIST_KEYS)?;

    let version = fields.epoch("version")?;
    let serial = fields.uint("serial", u32::MAX as u64)? as u32;
    let timestamp = fields.epoch("ts")?;

    // Entries that are not valid addresses are dropped, not fatal.
    let blacklist = fields
        .array("list")?
        .iter()
        .filter_map(Value::as_str)
        .filter_map(|entry| entry.trim().parse::<IpAddr>().ok())
        .collect();

    Ok(List {
        version,
        serial,
        blacklist,
        timestamp,
    })
}

/// Decode a `dynfw/delta` payload.
pub fn decode_delta(payload: &[u8]) -> Result<Delta, DecodeError> {
    let fields = Fields::parse(MessageKind::Delta, payload, DELTA_KEYS)?;

    let operation = DeltaOperation::parse(fields.string("delta")?);
    let ip = fields
        .string("ip")?
        .trim()
        .parse::<IpAddr>()
        .map_err(|_| fields.type_error("ip", "an IP address"))?;
    let serial = fields.uint("serial", u16::MAX as u64)? as u16;
    let timestamp = fields.epoch("ts")?;

    Ok(Delta {
        operation,
        ip,
        serial,
        timestamp,
    })
}

/// Top-level map of a payload with typed accessors.
struct Fields {
    kind: MessageKind,
    entries: Vec<(Value, Value)>,
}

impl Fields {
    fn parse(kind: MessageKind, payload: &[u8], required: &[&'static str]) -> Result<Self, DecodeError> {
        let mut reader = payload;
        let value = rmpv::decode::read_value(&mut reader).map_err(|e| DecodeError::Undecodable {
            kind,
            reason: e.to_string(),
        })?;

        let entries = match value {
            Value::Map(entries) => entries,
            other => {
                return Err(DecodeError::Undecodable {
                    kind,
                    reason: format!("expected a map, got {}", value_type(&other)),
                })
            }
        };

        let fields = Self { kind, entries };
        for &key in required {
            if fields.get(key).is_none() {
                return Err(DecodeError::Malformed { kind, key });
            }
        }

        Ok(fields)
    }

    fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(k, _)| k.as_str() == Some(key))
            .map(|(_, v)| v)
    }

    fn require(&self, key: &'static str) -> Result<&Value, DecodeError> {
        self.get(key).ok_or(DecodeError::Malformed { kind: self.kind, key })
    }

    fn type_error(&self, field: &'static str, expected: &'static str) -> DecodeError {
        DecodeError::FieldType {
            kind: self.kind,
            field,
            expected,
        }
    }

    fn string(&self, key: &'static str) -> Result<&str, DecodeError> {
        self.require(key)?
            .as_str()
            .ok_or_else(|| self.type_error(key, "a string"))
    }

    fn uint(&self, key: &'static str, max: u64) -> Result<u64, DecodeError> {
        let value = self
            .require(key)?
            .as_u64()
            .ok_or_else(|| self.type_error(key, "an unsigned integer"))?;

        if value > max {
            return Err(DecodeError::OutOfRange {
                kind: self.kind,
                field: key,
                value,
            });
        }
        Ok(value)
    }

    fn epoch(&self, key: &'static str) -> Result<DateTime<Utc>, DecodeError> {
        let secs = self.uint(key, u32::MAX as u64)?;
        DateTime::from_timestamp(secs as i64, 0).ok_or(DecodeError::OutOfRange {
            kind: self.kind,
            field: key,
            value: secs,
        })
    }

    fn array(&self, key: &'static str) -> Result<&[Value], DecodeError> {
        self.require(key)?
            .as_array()
            .map(Vec::as_slice)
            .ok_or_else(|| self.type_error(key, "an array"))
    }
}

fn value_type(value: &Value) -> &'static str {
    match value {
        Value::Nil => "nil",
        Value::Boolean(_) => "a boolean",
        Value::Integer(_) => "an integer",
        Value::F32(_) | Value::F64(_) => "a float",
        Value::String(_) => "a string",
        Value::Binary(_) => "binary data",
        Value::Array(_) => "an array",
        Value::Map(_) => "a map",
        Value::Ext(..) => "an extension value",
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn encode(pairs: Vec<(&str, Value)>) -> Vec<u8> {
        let map = Value::Map(pairs.into_iter().map(|(k, v)| (Value::from(k), v)).collect());
        let mut buf = Vec::new();
        rmpv::encode::write_value(&mut buf, &map).unwrap();
        buf
    }

    pub(crate) fn list_payload(serial: u32, ts: u32, ips: &[&str]) -> Vec<u8> {
        encode(vec![
            ("ts", Value::from(ts)),
            ("version", Value::from(ts)),
            ("serial", Value::from(serial)),
            ("list", Value::Array(ips.iter().map(|ip| Value::from(*ip)).collect())),
        ])
    }

    pub(crate) fn delta_payload(op: &str, ip: &str, serial: u16, ts: u32) -> Vec<u8> {
        encode(vec![
            ("delta", Value::from(op)),
            ("ip", Value::from(ip)),
            ("serial", Value::from(serial)),
            ("ts", Value::from(ts)),
        ])
    }

    #[test]
    fn test_decode_list() {
        let list = decode_list(&list_payload(7, 1000, &["9.9.9.9", "::1"])).unwrap();
        assert_eq!(list.serial, 7);
        assert_eq!(list.timestamp.timestamp(), 1000);
        assert_eq!(list.version.timestamp(), 1000);
        assert_eq!(
            list.blacklist,
            vec!["9.9.9.9".parse::<IpAddr>().unwrap(), "::1".parse().unwrap()]
        );
    }

    #[test]
    fn test_list_drops_unparsable_entries() {
        let payload = encode(vec![
            ("ts", Value::from(1u32)),
            ("version", Value::from(1u32)),
            ("serial", Value::from(1u32)),
            (
                "list",
                Value::Array(vec![
                    Value::from("1.1.1.1"),
                    Value::from("not-an-ip"),
                    Value::from(42),
                    Value::from("10.0.0.300"),
                    Value::from("2001:db8::2"),
                ]),
            ),
        ]);

        let list = decode_list(&payload).unwrap();
        assert_eq!(list.blacklist.len(), 2);
    }

    #[test]
    fn test_list_missing_key_is_malformed() {
        for missing in LIST_KEYS {
            let pairs: Vec<(&str, Value)> = vec![
                ("ts", Value::from(1u32)),
                ("version", Value::from(1u32)),
                ("serial", Value::from(1u32)),
                ("list", Value::Array(vec![])),
            ]
            .into_iter()
            .filter(|(k, _)| k != missing)
            .collect();

            match decode_list(&encode(pairs)) {
                Err(DecodeError::Malformed { kind, key }) => {
                    assert_eq!(kind, MessageKind::List);
                    assert_eq!(key, *missing);
                }
                other => panic!("expected malformed error, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_delta_missing_key_is_malformed() {
        for missing in DELTA_KEYS {
            let pairs: Vec<(&str, Value)> = vec![
                ("delta", Value::from("positive")),
                ("ip", Value::from("1.2.3.4")),
                ("serial", Value::from(1u16)),
                ("ts", Value::from(1u32)),
            ]
            .into_iter()
            .filter(|(k, _)| k != missing)
            .collect();

            assert!(matches!(
                decode_delta(&encode(pairs)),
                Err(DecodeError::Malformed { kind: MessageKind::Delta, .. })
            ));
        }
    }

    #[test]
    fn test_decode_delta() {
        let delta = decode_delta(&delta_payload("positive", "8.8.8.8", 1, 1001)).unwrap();
        assert_eq!(delta.operation, DeltaOperation::Positive);
        assert_eq!(delta.ip, "8.8.8.8".parse::<IpAddr>().unwrap());
        assert_eq!(delta.serial, 1);
        assert_eq!(delta.timestamp.timestamp(), 1001);

        let delta = decode_delta(&delta_payload("negative", "::1", 2, 1002)).unwrap();
        assert_eq!(delta.operation, DeltaOperation::Negative);

        let delta = decode_delta(&delta_payload("sideways", "::1", 3, 1003)).unwrap();
        assert_eq!(delta.operation, DeltaOperation::Other("sideways".to_string()));
    }

    #[test]
    fn test_not_a_map() {
        let mut buf = Vec::new();
        rmpv::encode::write_value(&mut buf, &Value::from("hello")).unwrap();
        assert!(matches!(decode_list(&buf), Err(DecodeError::Undecodable { .. })));
        assert!(matches!(decode_delta(&[]), Err(DecodeError::Undecodable { .. })));
    }

    #[test]
    fn test_wrong_field_type() {
        let payload = encode(vec![
            ("delta", Value::from("positive")),
            ("ip", Value::from("1.2.3.4")),
            ("serial", Value::from("one")),
            ("ts", Value::from(1u32)),
        ]);
        assert!(matches!(
            decode_delta(&payload),
            Err(DecodeError::FieldType { field: "serial", .. })
        ));

        let payload = encode(vec![
            ("ts", Value::from(1u32)),
            ("version", Value::from(1u32)),
            ("serial", Value::from(1u32)),
            ("list", Value::from("1.2.3.4")),
        ]);
        assert!(matches!(
            decode_list(&payload),
            Err(DecodeError::FieldType { field: "list", .. })
        ));
    }

    #[test]
    fn test_delta_serial_out_of_range() {
        let payload = encode(vec![
            ("delta", Value::from("positive")),
            ("ip", Value::from("1.2.3.4")),
            ("serial", Value::from(70_000u32)),
            ("ts", Value::from(1u32)),
        ]);
        assert!(matches!(
            decode_delta(&payload),
            Err(DecodeError::OutOfRange { field: "serial", value: 70_000, .. })
        ));
    }

    #[test]
    fn test_delta_with_bad_address() {
        let payload = delta_payload("positive", "nope", 1, 1);
        assert!(matches!(
            decode_delta(&payload),
            Err(DecodeError::FieldType { field: "ip", .. })
        ));
    }
}

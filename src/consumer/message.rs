//! Normalized messages returned by a consumption task.
//!
//! Broker-native records are translated into [`ConsumedMessage`] values so
//! the verification pipeline never has to know which broker family they
//! came from.
//!
//! # Example
//!
//! ```rust
//! use async_minion::consumer::message::{build_headers, ConsumedMessage, MessagePayload};
//!
//! let headers = build_headers(vec![
//!     ("trace-id", Some(b"abc".as_slice())),
//!     ("tag", Some(b"blue".as_slice())),
//!     ("tag", Some(b"green".as_slice())),
//! ]);
//!
//! let message = ConsumedMessage::new(headers, MessagePayload::Raw(b"hello".to_vec()));
//! assert_eq!(message.headers.len(), 2);
//! assert_eq!(message.header("tag").unwrap().values.len(), 2);
//! ```

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, BTreeSet};

/// A message header: one name with every value seen for it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Header {
    /// Header name.
    pub name: String,
    /// Distinct values carried under this name.
    pub values: BTreeSet<String>,
}

/// Payload of a consumed message.
///
/// Exactly one representation is ever present.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "content", rename_all = "camelCase")]
pub enum MessagePayload {
    /// Undecoded bytes, serialized as base64.
    Raw(#[serde(serialize_with = "serialize_base64")] Vec<u8>),
    /// Structured record decoded with the help of a schema registry.
    Record(JsonValue),
}

impl MessagePayload {
    /// Returns the raw bytes if this is a raw payload.
    pub fn as_raw(&self) -> Option<&[u8]> {
        match self {
            Self::Raw(bytes) => Some(bytes),
            Self::Record(_) => None,
        }
    }

    /// Returns the decoded record if this is a structured payload.
    pub fn as_record(&self) -> Option<&JsonValue> {
        match self {
            Self::Raw(_) => None,
            Self::Record(record) => Some(record),
        }
    }
}

fn serialize_base64<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&BASE64.encode(bytes))
}

/// A message collected during the consumption window.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumedMessage {
    /// Local wall-clock time at which the message was received.
    pub received_at: DateTime<Utc>,
    /// Headers, one entry per distinct name, sorted by name.
    pub headers: Vec<Header>,
    /// Message body.
    pub payload: MessagePayload,
}

impl ConsumedMessage {
    /// Creates a message stamped with the current time.
    pub fn new(headers: Vec<Header>, payload: MessagePayload) -> Self {
        Self {
            received_at: Utc::now(),
            headers,
            payload,
        }
    }

    /// Looks up a header by exact name.
    pub fn header(&self, name: &str) -> Option<&Header> {
        self.headers.iter().find(|h| h.name == name)
    }
}

/// Groups broker headers by name.
///
/// Every header contributes its value (decoded as lossy UTF-8) to the set
/// of its name. A header without a value still yields an entry, with no
/// value added.
pub fn build_headers<'a, I>(headers: I) -> Vec<Header>
where
    I: IntoIterator<Item = (&'a str, Option<&'a [u8]>)>,
{
    let mut grouped: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for (name, value) in headers {
        let values = grouped.entry(name.to_string()).or_default();
        if let Some(value) = value {
            values.insert(String::from_utf8_lossy(value).into_owned());
        }
    }

    grouped
        .into_iter()
        .map(|(name, values)| Header { name, values })
        .collect()
}

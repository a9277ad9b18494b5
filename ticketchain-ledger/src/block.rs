//! Blocks: immutable, hash-linked ledger entries.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt;

use crate::canonical::canonical_bytes;
use crate::error::EncodingError;

/// `previous_hash` of the genesis block.
pub const GENESIS_PREVIOUS_HASH: &str = "0";

/// Payload carried by the genesis block.
pub const GENESIS_DATA: &str = "Genesis Block";

/// Creation instant of a block, kept in its persisted text form.
///
/// Locally created timestamps are RFC 3339 UTC with microsecond precision.
/// Timestamps decoded from a snapshot are kept verbatim so that blocks from
/// other writers hash exactly as they were written.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(String);

impl Timestamp {
    /// Creates a timestamp at the current instant.
    #[must_use]
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// Renders a UTC instant in canonical form.
    #[must_use]
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self(at.to_rfc3339_opts(SecondsFormat::Micros, true))
    }

    /// Returns the stored text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parses the stored text, if it is RFC 3339.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.0)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque business data stored in a block.
///
/// The ledger never interprets the payload. Objects are canonicalized with
/// sorted keys, so insertion order does not affect the hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(Value);

impl Payload {
    /// The payload of the genesis block.
    #[must_use]
    pub fn genesis() -> Self {
        Self(Value::String(GENESIS_DATA.to_string()))
    }

    /// Builds a key/value payload from field pairs.
    pub fn from_fields<K, I>(fields: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let map = fields
            .into_iter()
            .map(|(k, v)| (k.into(), v))
            .collect::<serde_json::Map<String, Value>>();
        Self(Value::Object(map))
    }

    /// Returns the underlying value.
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Looks up a field of an object payload.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns true if this is the genesis marker.
    pub fn is_genesis(&self) -> bool {
        self.0.as_str() == Some(GENESIS_DATA)
    }
}

/// Hash input: the three content fields in canonical form.
#[derive(Serialize)]
struct HashInput<'a> {
    timestamp: &'a Timestamp,
    data: &'a Payload,
    previous_hash: &'a str,
}

/// Computes the hex SHA-256 content hash of a block's fields.
pub fn compute_hash(
    timestamp: &Timestamp,
    data: &Payload,
    previous_hash: &str,
) -> Result<String, EncodingError> {
    let bytes = canonical_bytes(&HashInput {
        timestamp,
        data,
        previous_hash,
    })?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

/// An immutable ledger entry bound to its predecessor by hash.
///
/// Field order matches the persisted snapshot record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Block {
    timestamp: Timestamp,
    data: Payload,
    previous_hash: String,
    hash: String,
}

impl Block {
    /// Creates a block, computing its hash from the given fields.
    pub(crate) fn create(
        data: Payload,
        previous_hash: impl Into<String>,
        timestamp: Timestamp,
    ) -> Result<Self, EncodingError> {
        let previous_hash = previous_hash.into();
        let hash = compute_hash(&timestamp, &data, &previous_hash)?;
        Ok(Self {
            timestamp,
            data,
            previous_hash,
            hash,
        })
    }

    /// Creates the genesis block.
    pub(crate) fn genesis(timestamp: Timestamp) -> Result<Self, EncodingError> {
        Self::create(Payload::genesis(), GENESIS_PREVIOUS_HASH, timestamp)
    }

    /// Recomputes the content hash from the stored fields.
    pub fn recompute_hash(&self) -> Result<String, EncodingError> {
        compute_hash(&self.timestamp, &self.data, &self.previous_hash)
    }

    /// Returns true if the stored hash matches the fields and the block links
    /// to `expected_previous_hash`.
    pub fn verify(&self, expected_previous_hash: &str) -> bool {
        self.previous_hash == expected_previous_hash
            && self
                .recompute_hash()
                .is_ok_and(|computed| computed == self.hash)
    }

    pub fn timestamp(&self) -> &Timestamp {
        &self.timestamp
    }

    pub fn data(&self) -> &Payload {
        &self.data
    }

    pub fn previous_hash(&self) -> &str {
        &self.previous_hash
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }
}

//! Time-ordered, process-monotonic identifiers.
//!
//! An [`Identifier`] is 12 bytes: a 4-byte big-endian Unix-seconds prefix
//! followed by an 8-byte big-endian in-process counter. Because both fields
//! are stored big-endian, byte-wise (derived) `Ord` gives the ordering we
//! want: newer seconds sort after older ones, and within the same second
//! the counter breaks ties.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::warn;

use crate::error::{StoreError, StoreResult};

const LEN: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Identifier([u8; LEN]);

impl Identifier {
    /// The reserved zero value. Precedes every other Identifier and is the
    /// Identifier of the root dataset.
    pub const EMPTY: Identifier = Identifier([0u8; LEN]);

    fn from_parts(seconds: u32, counter: u64) -> Self {
        let mut bytes = [0u8; LEN];
        bytes[0..4].copy_from_slice(&seconds.to_be_bytes());
        bytes[4..12].copy_from_slice(&counter.to_be_bytes());
        Identifier(bytes)
    }

    pub fn seconds(&self) -> u32 {
        u32::from_be_bytes(self.0[0..4].try_into().unwrap())
    }

    pub fn counter(&self) -> u64 {
        u64::from_be_bytes(self.0[4..12].try_into().unwrap())
    }

    pub fn is_empty(&self) -> bool {
        *self == Identifier::EMPTY
    }

    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }

    pub fn from_hex(s: &str) -> Result<Self, IdentifierParseError> {
        if s.len() != LEN * 2 {
            return Err(IdentifierParseError::WrongLength(s.len()));
        }
        let mut bytes = [0u8; LEN];
        for i in 0..LEN {
            let byte_str = &s[i * 2..i * 2 + 2];
            bytes[i] = u8::from_str_radix(byte_str, 16).map_err(|_| IdentifierParseError::InvalidHex)?;
        }
        Ok(Identifier(bytes))
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum IdentifierParseError {
    #[error("identifier must be 24 hex chars, got {0}")]
    WrongLength(usize),
    #[error("identifier is not valid hex")]
    InvalidHex,
}

impl FromStr for Identifier {
    type Err = IdentifierParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Identifier::from_hex(s)
    }
}

impl Serialize for Identifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Identifier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Identifier::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

fn unix_seconds_now() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or(0)
}

/// Per-DataSource generator of strictly monotonic Identifiers.
///
/// `previous` is the last Identifier handed out; `counter` is a raw
/// in-process sequence that only ever increases, so repeated candidates
/// generated within the same wall-clock second (or across a backward clock
/// step) are guaranteed to climb past `previous` in a bounded number of
/// retries.
pub struct IdentifierGenerator {
    previous: Mutex<Identifier>,
    counter: AtomicU64,
    read_only: Mutex<bool>,
}

impl IdentifierGenerator {
    pub fn new() -> Self {
        Self {
            previous: Mutex::new(Identifier::EMPTY),
            counter: AtomicU64::new(0),
            read_only: Mutex::new(false),
        }
    }

    pub fn set_read_only(&self, read_only: bool) {
        *self.read_only.lock() = read_only;
    }

    pub fn is_read_only(&self) -> bool {
        *self.read_only.lock()
    }

    /// Returns an Identifier strictly greater than any previously returned
    /// by this generator. Fails with `ReadOnlyViolation` if the owning
    /// DataSource is read-only.
    pub fn next(&self) -> StoreResult<Identifier> {
        if self.is_read_only() {
            return Err(StoreError::ReadOnlyViolation {
                operation: "Identifier::next".to_string(),
            });
        }
        let mut previous = self.previous.lock();
        let mut retried = false;
        let mut candidate = Identifier::from_parts(unix_seconds_now(), self.counter.fetch_add(1, Ordering::Relaxed));
        while candidate <= *previous {
            if !retried {
                warn!(target: "temporal_store::identifier", "monotonicity violation, regenerating identifier");
                retried = true;
            }
            candidate = Identifier::from_parts(unix_seconds_now(), self.counter.fetch_add(1, Ordering::Relaxed));
        }
        if retried {
            warn!(target: "temporal_store::identifier", "identifier monotonicity restored after retry");
        }
        *previous = candidate;
        Ok(candidate)
    }
}

impl Default for IdentifierGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "identifier_tests.rs"]
mod identifier_tests;

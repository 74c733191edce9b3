use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};
use thiserror::Error;

/// Identifier of a stored record.
///
/// The first four bytes are the unix time of the insert in seconds, the
/// remaining eight bytes are a per-collection sequence number handed out by
/// the store. Ordering follows the creation time first, which makes ids of
/// records created more than a second apart strictly increasing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordId {
    timestamp: u32,
    sequence: u64,
}

impl RecordId {
    pub fn new(timestamp: u32, sequence: u64) -> Self {
        RecordId {
            timestamp,
            sequence,
        }
    }

    /// Creation time in unix seconds.
    pub fn timestamp(&self) -> i64 {
        i64::from(self.timestamp)
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}{:016x}", self.timestamp, self.sequence)
    }
}

#[derive(Debug, Error, PartialEq)]
#[error("invalid record id: {0:?}")]
pub struct InvalidRecordId(String);

impl FromStr for RecordId {
    type Err = InvalidRecordId;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidRecordId(text.to_owned());

        if text.len() != 24 || !text.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        let timestamp = u32::from_str_radix(&text[..8], 16).map_err(|_| invalid())?;
        let sequence = u64::from_str_radix(&text[8..], 16).map_err(|_| invalid())?;

        Ok(RecordId {
            timestamp,
            sequence,
        })
    }
}

impl Serialize for RecordId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

//! Storage identifiers
//!
//! A [`StorageId`] is assigned by a blob store when an event is saved and is
//! the only key stored events are looked up by. It is unrelated to the
//! [`DomainId`](crate::envelope::DomainId) an event may carry in its own
//! envelope; the two are separate types so one cannot be passed for the other.

use std::fmt;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicU32, Ordering};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Per-process counter, seeded randomly so restarts do not replay sequences
static COUNTER: LazyLock<AtomicU32> = LazyLock::new(|| AtomicU32::new(rand::random()));

/// Opaque identifier of a stored blob
///
/// Layout (12 bytes):
/// - 4 bytes: creation time, unix seconds, big-endian
/// - 5 bytes: random
/// - 3 bytes: process counter, big-endian
///
/// Printed and parsed as 24 lowercase hex characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorageId([u8; StorageId::LEN]);

impl StorageId {
    /// Length of the raw id in bytes
    pub const LEN: usize = 12;

    /// Generate a fresh id
    pub fn generate() -> Self {
        let secs = chrono::Utc::now().timestamp() as u32;
        let random: [u8; 5] = rand::random();
        let count = COUNTER.fetch_add(1, Ordering::Relaxed);

        let mut bytes = [0u8; Self::LEN];
        bytes[..4].copy_from_slice(&secs.to_be_bytes());
        bytes[4..9].copy_from_slice(&random);
        bytes[9..].copy_from_slice(&count.to_be_bytes()[1..]);
        Self(bytes)
    }

    /// Wrap raw id bytes
    pub fn from_bytes(bytes: [u8; Self::LEN]) -> Self {
        Self(bytes)
    }

    /// Parse the printed form; `None` if the string cannot be an id
    pub fn parse(s: &str) -> Option<Self> {
        if s.len() != Self::LEN * 2 {
            return None;
        }
        let bytes: [u8; Self::LEN] = hex::decode(s).ok()?.try_into().ok()?;
        Some(Self(bytes))
    }

    /// Raw id bytes
    pub fn as_bytes(&self) -> &[u8; Self::LEN] {
        &self.0
    }

    /// Hex form of the id
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Creation time embedded in the id (unix seconds)
    pub fn timestamp_secs(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }
}

impl fmt::Display for StorageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for StorageId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for StorageId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        StorageId::parse(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid storage id: {s}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generated_ids_are_unique() {
        let ids: HashSet<StorageId> = (0..10_000).map(|_| StorageId::generate()).collect();
        assert_eq!(ids.len(), 10_000);
    }

    #[test]
    fn test_display_and_parse() {
        let id = StorageId::generate();
        let printed = id.to_string();

        assert_eq!(printed.len(), 24);
        assert!(printed.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(StorageId::parse(&printed), Some(id));
    }

    #[test]
    fn test_parse_rejects_ill_formed_ids() {
        assert_eq!(StorageId::parse("does-not-exist"), None);
        assert_eq!(StorageId::parse(""), None);
        assert_eq!(StorageId::parse("0123456789abcdef0123456"), None);
        assert_eq!(StorageId::parse("zz23456789abcdef01234567"), None);
    }

    #[test]
    fn test_timestamp_is_embedded() {
        let before = chrono::Utc::now().timestamp() as u32;
        let id = StorageId::generate();
        let after = chrono::Utc::now().timestamp() as u32;

        assert!(id.timestamp_secs() >= before);
        assert!(id.timestamp_secs() <= after);
    }

    #[test]
    fn test_serde_uses_hex_string() {
        let id = StorageId::from_bytes([0xab; 12]);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"abababababababababababab\"");

        let back: StorageId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);

        assert!(serde_json::from_str::<StorageId>("\"nope\"").is_err());
    }
}

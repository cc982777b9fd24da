//! Public Key Identifiers
//!
//! 32-byte opaque account identifiers. Base58 in configuration, serde and
//! logs, the way explorers and wallets print them; raw bytes on the wire.

use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Public key size in bytes.
pub const PUBKEY_LEN: usize = 32;

/// 32-byte account identifier.
///
/// Implements Ord for deterministic BTreeMap ordering.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Pubkey(pub [u8; PUBKEY_LEN]);

impl Pubkey {
    /// Create from raw bytes.
    pub const fn new(bytes: [u8; PUBKEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse a base58 address. `None` unless it decodes to exactly 32 bytes.
    pub fn from_base58(s: &str) -> Option<Self> {
        let bytes = bs58::decode(s.trim()).into_vec().ok()?;
        let arr: [u8; PUBKEY_LEN] = bytes.try_into().ok()?;
        Some(Self(arr))
    }

    /// Base58 encoding.
    pub fn to_base58(&self) -> String {
        bs58::encode(self.0).into_string()
    }

    /// Abbreviated address for log lines: first and last four characters.
    pub fn short(&self) -> String {
        let full = self.to_base58();
        // 32 bytes always encode to at least 32 ASCII characters.
        format!("{}..{}", &full[..4], &full[full.len() - 4..])
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; PUBKEY_LEN] {
        &self.0
    }

    /// All-zero key (also the system program id).
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; PUBKEY_LEN]
    }
}

impl fmt::Display for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58())
    }
}

impl fmt::Debug for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pubkey({})", self.short())
    }
}

/// Error parsing a base58 public key.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid public key: expected base58 for 32 bytes, got {0:?}")]
pub struct ParsePubkeyError(pub String);

impl FromStr for Pubkey {
    type Err = ParsePubkeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_base58(s).ok_or_else(|| ParsePubkeyError(s.to_string()))
    }
}

impl Serialize for Pubkey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base58())
    }
}

impl<'de> Deserialize<'de> for Pubkey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

use crate::serializer::{Reader, ReaderError, Serializer, Writer};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer as SerdeSerializer};
use sha3::{Digest, Keccak256};
use std::{fmt, str::FromStr};

pub const HASH_SIZE: usize = 32;

/// Keccak-256 digest. Prints as lowercase hex without a prefix and parses
/// with or without `0x`.
#[derive(Eq, PartialEq, PartialOrd, Ord, Clone, Copy, Debug, Hash, Default)]
pub struct Hash([u8; HASH_SIZE]);

impl Hash {
    pub const fn new(bytes: [u8; HASH_SIZE]) -> Self {
        Self(bytes)
    }

    pub const fn zero() -> Self {
        Self([0; HASH_SIZE])
    }

    pub fn as_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }

    pub fn to_bytes(self) -> [u8; HASH_SIZE] {
        self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl From<[u8; HASH_SIZE]> for Hash {
    fn from(bytes: [u8; HASH_SIZE]) -> Self {
        Self(bytes)
    }
}

impl FromStr for Hash {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let mut bytes = [0u8; HASH_SIZE];
        hex::decode_to_slice(digits, &mut bytes).map_err(|_| "expected 32 hex-encoded bytes")?;
        Ok(Self(bytes))
    }
}

/// keccak256 of `value`
pub fn hash(value: &[u8]) -> Hash {
    Hash(Keccak256::digest(value).into())
}

/// Identified by the keccak256 of the binary encoding
pub trait Hashable: Serializer {
    fn hash(&self) -> Hash {
        hash(&self.to_bytes())
    }
}

impl Serializer for Hash {
    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        reader.read_hash()
    }

    fn write(&self, writer: &mut Writer) {
        writer.write_hash(self);
    }

    fn size(&self) -> usize {
        HASH_SIZE
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Hash {
    fn serialize<S: SerdeSerializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keccak_empty() {
        // Empty code hash
        assert_eq!(
            hash(&[]).to_hex(),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_from_str_accepts_prefix() {
        let h = hash(b"vela");
        let parsed: Hash = format!("0x{}", h).parse().unwrap();
        assert_eq!(parsed, h);
        assert!("abcd".parse::<Hash>().is_err());
    }

    #[test]
    fn test_json_is_plain_hex() {
        let h = hash(b"block");
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(json, format!("\"{}\"", h.to_hex()));
        assert_eq!(serde_json::from_str::<Hash>(&json).unwrap(), h);
    }
}

use super::{bech32, hash, CryptoError};
use crate::serializer::{Reader, ReaderError, Serializer, Writer};
use serde::de::Error as SerdeError;
use serde::{Deserialize, Serialize};
use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};

pub const ADDRESS_SIZE: usize = 20;

/// Ethereum style account address: the last 20 bytes of the keccak256
/// of the uncompressed public key (without its 0x04 tag).
#[derive(Eq, PartialEq, PartialOrd, Ord, Clone, Copy, Hash, Default)]
pub struct Address([u8; ADDRESS_SIZE]);

impl Address {
    pub const fn new(bytes: [u8; ADDRESS_SIZE]) -> Self {
        Self(bytes)
    }

    pub const fn zero() -> Self {
        Self([0; ADDRESS_SIZE])
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let bytes: [u8; ADDRESS_SIZE] =
            bytes
                .try_into()
                .map_err(|_| CryptoError::InvalidAddressLength {
                    len: bytes.len(),
                    expected: ADDRESS_SIZE,
                })?;
        Ok(Self(bytes))
    }

    // Derive the address from a 65 bytes uncompressed public key
    pub fn from_uncompressed_public_key(public_key: &[u8; 65]) -> Self {
        let digest = hash(&public_key[1..]);
        let mut bytes = [0u8; ADDRESS_SIZE];
        bytes.copy_from_slice(&digest.as_bytes()[12..]);
        Self(bytes)
    }

    // Deterministic address of a module account (fee collector, bonded pool...)
    pub fn from_module_name(name: &str) -> Self {
        let digest = hash(name.as_bytes());
        let mut bytes = [0u8; ADDRESS_SIZE];
        bytes.copy_from_slice(&digest.as_bytes()[..ADDRESS_SIZE]);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_SIZE] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn to_bech32(&self, prefix: &str) -> Result<String, CryptoError> {
        bech32::encode(prefix, &self.0)
    }

    pub fn from_bech32(expected_prefix: &str, value: &str) -> Result<Self, CryptoError> {
        let (prefix, data) = bech32::decode(value)?;
        if prefix != expected_prefix {
            return Err(CryptoError::Bech32(format!(
                "unexpected prefix '{}', expected '{}'",
                prefix, expected_prefix
            )));
        }
        Self::from_slice(&data)
    }
}

impl FromStr for Address {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(stripped).map_err(|e| CryptoError::InvalidHex(e.to_string()))?;
        Self::from_slice(&bytes)
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Address(0x{})", self.to_hex())
    }
}

impl Serializer for Address {
    fn write(&self, writer: &mut Writer) {
        writer.write_bytes(&self.0);
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        Ok(Self(reader.read_bytes()?))
    }

    fn size(&self) -> usize {
        ADDRESS_SIZE
    }
}

impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'a> Deserialize<'a> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'a>,
    {
        let value = String::deserialize(deserializer)?;
        Address::from_str(&value).map_err(SerdeError::custom)
    }
}

use super::Serializer;
use crate::crypto::{Hash, HASH_SIZE};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReaderError {
    #[error("not enough bytes: needed {needed}, remaining {remaining}")]
    InvalidSize { needed: usize, remaining: usize },
    #[error("invalid value")]
    InvalidValue,
    #[error("length {len} exceeds limit of {max}")]
    ExceedsLimit { len: usize, max: usize },
    #[error("{0} trailing bytes after value")]
    TrailingBytes(usize),
    #[error("invalid hex")]
    InvalidHex,
}

pub struct Reader<'a> {
    bytes: &'a [u8],
    total: usize,
}

impl<'a> Reader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, total: 0 }
    }

    pub fn read_bytes_ref(&mut self, n: usize) -> Result<&'a [u8], ReaderError> {
        let remaining = self.size();
        if n > remaining {
            return Err(ReaderError::InvalidSize {
                needed: n,
                remaining,
            });
        }

        let bytes = &self.bytes[self.total..self.total + n];
        self.total += n;
        Ok(bytes)
    }

    pub fn read_bytes<const N: usize>(&mut self) -> Result<[u8; N], ReaderError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes_ref(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, ReaderError> {
        Ok(self.read_bytes::<1>()?[0])
    }

    pub fn read_bool(&mut self) -> Result<bool, ReaderError> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(ReaderError::InvalidValue),
        }
    }

    pub fn read_u32(&mut self) -> Result<u32, ReaderError> {
        Ok(u32::from_be_bytes(self.read_bytes()?))
    }

    pub fn read_u64(&mut self) -> Result<u64, ReaderError> {
        Ok(u64::from_be_bytes(self.read_bytes()?))
    }

    pub fn read_i64(&mut self) -> Result<i64, ReaderError> {
        Ok(i64::from_be_bytes(self.read_bytes()?))
    }

    pub fn read_hash(&mut self) -> Result<Hash, ReaderError> {
        Ok(Hash::new(self.read_bytes::<HASH_SIZE>()?))
    }

    // u32 length prefix followed by the bytes
    pub fn read_vec(&mut self, max: usize) -> Result<Vec<u8>, ReaderError> {
        let len = self.read_u32()? as usize;
        if len > max {
            return Err(ReaderError::ExceedsLimit { len, max });
        }
        Ok(self.read_bytes_ref(len)?.to_vec())
    }

    pub fn read_optional<T: Serializer>(&mut self) -> Result<Option<T>, ReaderError> {
        if self.read_bool()? {
            Ok(Some(T::read(self)?))
        } else {
            Ok(None)
        }
    }

    pub fn total_read(&self) -> usize {
        self.total
    }

    // Remaining bytes
    pub fn size(&self) -> usize {
        self.bytes.len() - self.total
    }
}

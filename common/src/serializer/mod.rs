mod reader;
mod writer;

pub use reader::{Reader, ReaderError};
pub use writer::Writer;

/// Binary (big-endian) encoding used for transactions and block headers.
pub trait Serializer: Sized {
    fn write(&self, writer: &mut Writer);

    fn read(reader: &mut Reader) -> Result<Self, ReaderError>;

    fn size(&self) -> usize {
        let mut writer = Writer::new();
        self.write(&mut writer);
        writer.total_write()
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut writer = Writer::new();
        self.write(&mut writer);
        writer.bytes()
    }

    fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    // Decode a value, every byte must be consumed
    fn from_bytes(bytes: &[u8]) -> Result<Self, ReaderError> {
        let mut reader = Reader::new(bytes);
        let value = Self::read(&mut reader)?;
        let remaining = reader.size();
        if remaining > 0 {
            return Err(ReaderError::TrailingBytes(remaining));
        }
        Ok(value)
    }

    fn from_hex(hex: &str) -> Result<Self, ReaderError> {
        let bytes = hex::decode(hex).map_err(|_| ReaderError::InvalidHex)?;
        Self::from_bytes(&bytes)
    }
}

impl Serializer for u64 {
    fn write(&self, writer: &mut Writer) {
        writer.write_u64(*self);
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        reader.read_u64()
    }

    fn size(&self) -> usize {
        8
    }
}

impl<T: Serializer> Serializer for Option<T> {
    fn write(&self, writer: &mut Writer) {
        writer.write_optional(self);
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        reader.read_optional()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bytes_rejects_trailing_bytes() {
        let mut bytes = 42u64.to_bytes();
        assert_eq!(u64::from_bytes(&bytes), Ok(42));

        bytes.push(0);
        assert_eq!(u64::from_bytes(&bytes), Err(ReaderError::TrailingBytes(1)));
    }

    #[test]
    fn test_short_read() {
        assert_eq!(
            u64::from_bytes(&[1, 2, 3]),
            Err(ReaderError::InvalidSize {
                needed: 8,
                remaining: 3
            })
        );
    }

    #[test]
    fn test_optional_flag_must_be_boolean() {
        assert_eq!(Option::<u64>::from_bytes(&[0]), Ok(None));
        assert_eq!(Option::<u64>::from_bytes(&[2]), Err(ReaderError::InvalidValue));

        let some = Some(7u64).to_bytes();
        assert_eq!(some.len(), 9);
        assert_eq!(Option::<u64>::from_bytes(&some), Ok(Some(7)));
    }

    #[test]
    fn test_from_hex_invalid() {
        assert_eq!(u64::from_hex("zz"), Err(ReaderError::InvalidHex));
    }
}

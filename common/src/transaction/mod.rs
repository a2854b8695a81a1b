//! Signed EVM-style transactions and their binary envelope.
//!
//! Envelope layout (big-endian):
//!
//! ```text
//! version u8 | chain_id u64 | nonce u64 | to Option<[20]> | value i64
//! | gas_limit u64 | gas_price i64 | payload u32 + bytes | signature Option<[65]>
//! ```
//!
//! Amounts are signed on purpose: the envelope carries whatever the sender
//! produced and leaves rejection of negative values to the handler.

mod contract;

pub use contract::contract_address;

use crate::{
    crypto::{hash, Address, CryptoError, Hash, KeyPair, Signature},
    serializer::{Reader, ReaderError, Serializer, Writer},
};

pub const TX_ENVELOPE_VERSION: u8 = 1;
pub const MAX_PAYLOAD_SIZE: usize = 128 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    ContractCreation,
    ContractCall(Address),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub chain_id: u64,
    pub nonce: u64,
    pub to: Option<Address>,
    pub value: i64,
    pub gas_limit: u64,
    pub gas_price: i64,
    pub payload: Vec<u8>,
    pub signature: Option<Signature>,
}

impl Transaction {
    /// Contract creation: the payload is the init code
    pub fn new_contract(
        chain_id: u64,
        nonce: u64,
        value: i64,
        gas_limit: u64,
        gas_price: i64,
        init_code: Vec<u8>,
    ) -> Self {
        Self {
            chain_id,
            nonce,
            to: None,
            value,
            gas_limit,
            gas_price,
            payload: init_code,
            signature: None,
        }
    }

    pub fn new_call(
        chain_id: u64,
        nonce: u64,
        to: Address,
        value: i64,
        gas_limit: u64,
        gas_price: i64,
        input: Vec<u8>,
    ) -> Self {
        Self {
            chain_id,
            nonce,
            to: Some(to),
            value,
            gas_limit,
            gas_price,
            payload: input,
            signature: None,
        }
    }

    pub fn kind(&self) -> TransactionKind {
        match self.to {
            Some(to) => TransactionKind::ContractCall(to),
            None => TransactionKind::ContractCreation,
        }
    }

    pub fn is_contract_creation(&self) -> bool {
        self.to.is_none()
    }

    fn write_unsigned(&self, writer: &mut Writer) {
        writer.write_u8(TX_ENVELOPE_VERSION);
        writer.write_u64(self.chain_id);
        writer.write_u64(self.nonce);
        writer.write_optional(&self.to);
        writer.write_i64(self.value);
        writer.write_u64(self.gas_limit);
        writer.write_i64(self.gas_price);
        writer.write_vec(&self.payload);
    }

    /// Hash covered by the signature (envelope without the signature)
    pub fn signing_hash(&self) -> Hash {
        let mut writer = Writer::new();
        self.write_unsigned(&mut writer);
        hash(writer.as_bytes())
    }

    /// Transaction id: hash of the full signed envelope
    pub fn hash(&self) -> Hash {
        hash(&self.to_bytes())
    }

    pub fn sign(&mut self, key: &KeyPair) {
        self.signature = Some(key.sign(&self.signing_hash()));
    }

    pub fn signed(mut self, key: &KeyPair) -> Self {
        self.sign(key);
        self
    }

    pub fn recover_sender(&self) -> Result<Address, CryptoError> {
        let signature = self.signature.as_ref().ok_or(CryptoError::MissingSignature)?;
        signature.recover(&self.signing_hash())
    }
}

impl Serializer for Transaction {
    fn write(&self, writer: &mut Writer) {
        self.write_unsigned(writer);
        writer.write_optional(&self.signature);
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        let version = reader.read_u8()?;
        if version != TX_ENVELOPE_VERSION {
            return Err(ReaderError::InvalidValue);
        }

        Ok(Self {
            chain_id: reader.read_u64()?,
            nonce: reader.read_u64()?,
            to: reader.read_optional()?,
            value: reader.read_i64()?,
            gas_limit: reader.read_u64()?,
            gas_price: reader.read_i64()?,
            payload: reader.read_vec(MAX_PAYLOAD_SIZE)?,
            signature: reader.read_optional()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample(key: &KeyPair) -> Transaction {
        Transaction::new_call(9000, 3, Address::new([9; 20]), -5, 21_000, 1, vec![0, 1, 2])
            .signed(key)
    }

    #[test]
    fn test_sender_recovery() {
        let key = KeyPair::new();
        let tx = sample(&key);
        assert_eq!(tx.recover_sender().unwrap(), key.address());
    }

    #[test]
    fn test_tampering_changes_sender() {
        let key = KeyPair::new();
        let mut tx = sample(&key);
        tx.nonce += 1;
        assert_ne!(tx.recover_sender().ok(), Some(key.address()));
    }

    #[test]
    fn test_unsigned_transaction() {
        let tx = Transaction::new_contract(9000, 0, 0, 0, 0, Vec::new());
        assert_eq!(tx.recover_sender(), Err(CryptoError::MissingSignature));
        assert_eq!(tx.kind(), TransactionKind::ContractCreation);
    }

    #[test]
    fn test_envelope_decode() {
        let key = KeyPair::new();
        let tx = sample(&key);
        let bytes = tx.to_bytes();
        assert_eq!(bytes.len(), tx.size());

        let decoded = Transaction::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, tx);
        assert_eq!(decoded.hash(), tx.hash());
    }

    #[test]
    fn test_envelope_rejects_garbage() {
        assert!(Transaction::from_bytes(&[]).is_err());
        assert_eq!(
            Transaction::from_bytes(&[2; 64]),
            Err(ReaderError::InvalidValue)
        );

        let key = KeyPair::new();
        let mut bytes = sample(&key).to_bytes();
        bytes.push(0xff);
        assert_eq!(
            Transaction::from_bytes(&bytes),
            Err(ReaderError::TrailingBytes(1))
        );
    }

    #[test]
    fn test_envelope_payload_limit() {
        let mut writer = Writer::new();
        writer.write_u8(TX_ENVELOPE_VERSION);
        writer.write_u64(1);
        writer.write_u64(0);
        writer.write_bool(false);
        writer.write_i64(0);
        writer.write_u64(0);
        writer.write_i64(0);
        writer.write_u32(MAX_PAYLOAD_SIZE as u32 + 1);

        assert_eq!(
            Transaction::from_bytes(writer.as_bytes()),
            Err(ReaderError::ExceedsLimit {
                len: MAX_PAYLOAD_SIZE + 1,
                max: MAX_PAYLOAD_SIZE
            })
        );
    }

    proptest! {
        #[test]
        fn prop_accepted_envelopes_are_canonical(data in prop::collection::vec(any::<u8>(), 0..160)) {
            if let Ok(tx) = Transaction::from_bytes(&data) {
                prop_assert_eq!(tx.to_bytes(), data);
            }
        }
    }
}

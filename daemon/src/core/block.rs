use std::sync::Arc;
use vela_common::{
    crypto::{hash, Address, Hash, Hashable},
    serializer::{Reader, ReaderError, Serializer, Writer},
    time::TimestampMillis,
    transaction::Transaction,
};

// Upper bound when decoding a block body
pub const MAX_BLOCK_TXS: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHeader {
    pub height: u64,
    pub previous: Hash,
    pub proposer: Address,
    pub timestamp: TimestampMillis,
    pub tx_root: Hash,
}

impl Serializer for BlockHeader {
    fn write(&self, writer: &mut Writer) {
        writer.write_u64(self.height);
        writer.write_hash(&self.previous);
        self.proposer.write(writer);
        writer.write_u64(self.timestamp);
        writer.write_hash(&self.tx_root);
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        Ok(Self {
            height: reader.read_u64()?,
            previous: reader.read_hash()?,
            proposer: Address::read(reader)?,
            timestamp: reader.read_u64()?,
            tx_root: reader.read_hash()?,
        })
    }
}

impl Hashable for BlockHeader {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    header: BlockHeader,
    transactions: Vec<Arc<Transaction>>,
}

// keccak256 over the concatenated transaction hashes
pub fn compute_tx_root(transactions: &[Arc<Transaction>]) -> Hash {
    let mut bytes = Vec::with_capacity(transactions.len() * 32);
    for tx in transactions {
        bytes.extend_from_slice(tx.hash().as_bytes());
    }
    hash(&bytes)
}

impl Block {
    pub fn new(
        height: u64,
        previous: Hash,
        proposer: Address,
        timestamp: TimestampMillis,
        transactions: Vec<Arc<Transaction>>,
    ) -> Self {
        let header = BlockHeader {
            height,
            previous,
            proposer,
            timestamp,
            tx_root: compute_tx_root(&transactions),
        };
        Self {
            header,
            transactions,
        }
    }

    pub fn header(&self) -> &BlockHeader {
        &self.header
    }

    pub fn height(&self) -> u64 {
        self.header.height
    }

    pub fn hash(&self) -> Hash {
        self.header.hash()
    }

    pub fn transactions(&self) -> &[Arc<Transaction>] {
        &self.transactions
    }

    pub fn has_valid_tx_root(&self) -> bool {
        compute_tx_root(&self.transactions) == self.header.tx_root
    }
}

impl Serializer for Block {
    fn write(&self, writer: &mut Writer) {
        self.header.write(writer);
        writer.write_u32(self.transactions.len() as u32);
        for tx in &self.transactions {
            tx.write(writer);
        }
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        let header = BlockHeader::read(reader)?;
        let count = reader.read_u32()? as usize;
        if count > MAX_BLOCK_TXS {
            return Err(ReaderError::ExceedsLimit {
                len: count,
                max: MAX_BLOCK_TXS,
            });
        }
        // Each envelope is at least a few bytes, don't trust the count for capacity
        let mut transactions = Vec::with_capacity(count.min(reader.size() / 32 + 1));
        for _ in 0..count {
            transactions.push(Arc::new(Transaction::read(reader)?));
        }
        Ok(Self {
            header,
            transactions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vela_common::crypto::KeyPair;

    fn sample_block() -> Block {
        let key = KeyPair::from_seed(2);
        let txs = (0..3)
            .map(|nonce| {
                Arc::new(
                    Transaction::new_contract(9000, nonce, 0, 60_000, 1, vec![nonce as u8])
                        .signed(&key),
                )
            })
            .collect();
        Block::new(4, Hash::new([1; 32]), key.address(), 1_700_000_000_000, txs)
    }

    #[test]
    fn test_block_hash_covers_header() {
        let block = sample_block();
        assert!(block.has_valid_tx_root());

        let mut other = block.clone();
        other.header.timestamp += 1;
        assert_ne!(block.hash(), other.hash());
    }

    #[test]
    fn test_tampered_body_detected() {
        let mut block = sample_block();
        block.transactions.pop();
        assert!(!block.has_valid_tx_root());
    }

    #[test]
    fn test_block_decode() {
        let block = sample_block();
        let decoded = Block::from_bytes(&block.to_bytes()).unwrap();
        assert_eq!(decoded, block);
        assert_eq!(decoded.hash(), block.hash());
    }

    #[test]
    fn test_oversized_body_count() {
        let mut writer = Writer::new();
        sample_block().header().write(&mut writer);
        writer.write_u32(u32::MAX);
        assert!(matches!(
            Block::from_bytes(writer.as_bytes()),
            Err(ReaderError::ExceedsLimit { .. })
        ));
    }
}

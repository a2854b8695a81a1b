use super::state::StateError;
use thiserror::Error;
use vela_common::{crypto::Hash, serializer::ReaderError};
use vela_genesis::GenesisError;

#[derive(Error, Debug)]
pub enum BlockchainError {
    #[error("chain is not initialized")]
    NotInitialized,
    #[error("chain is already initialized")]
    AlreadyInitialized,
    #[error("chain id mismatch: node runs {expected}, init request is for {got}")]
    ChainIdMismatch { expected: String, got: String },
    #[error("init chain request carries {0} validator updates, validators come from genesis")]
    UnexpectedValidatorUpdates(usize),
    #[error("invalid genesis: {0}")]
    Genesis(#[from] GenesisError),
    #[error(transparent)]
    State(#[from] StateError),
    #[error("invalid transaction signature")]
    InvalidTxSignature,
    #[error("transaction is for chain {got}, expected {expected}")]
    InvalidTxChainId { expected: u64, got: u64 },
    #[error("transaction payload of {size} bytes exceeds {max}")]
    TxTooLarge { size: usize, max: usize },
    #[error("transaction {0} is already in mempool")]
    TxAlreadyInMempool(Hash),
    #[error("mempool is full ({0} transactions)")]
    MempoolFull(usize),
    #[error("invalid block height: expected {expected}, got {got}")]
    InvalidBlockHeight { expected: u64, got: u64 },
    #[error("block references {got} but the top block is {expected}")]
    InvalidPreviousHash { expected: Hash, got: Hash },
    #[error("block transactions do not match the header root")]
    InvalidTxRoot,
    #[error("block {0} not found")]
    BlockNotFound(u64),
    #[error(transparent)]
    Decode(#[from] ReaderError),
}

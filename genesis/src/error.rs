use thiserror::Error;
use vela_common::crypto::{Address, CryptoError};

#[derive(Error, Debug)]
pub enum GenesisError {
    #[error("failed to serialize module '{module}': {source}")]
    Serialization {
        module: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid genesis document: {0}")]
    Document(#[source] serde_json::Error),
    #[error("genesis module '{0}' is missing")]
    MissingModule(String),
    #[error("validator stakes require {required} but the primary account is only funded with {available}")]
    InsufficientFunding { required: u128, available: u128 },
    #[error("amount overflow while computing {0}")]
    Overflow(&'static str),
    #[error("total supply of {denom} is {declared} but balances sum to {actual}")]
    SupplyMismatch {
        denom: String,
        declared: u128,
        actual: u128,
    },
    #[error("validator {0} has no bonded stake")]
    UnbondedValidator(Address),
    #[error("bonded pool holds {pool} but validators have {staked} bonded")]
    BondedPoolMismatch { pool: u128, staked: u128 },
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

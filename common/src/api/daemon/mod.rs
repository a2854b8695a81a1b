use crate::{
    crypto::{Address, Hash},
    time::TimestampMillis,
};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

#[derive(Serialize, Deserialize)]
pub struct GetBalanceParams<'a> {
    pub address: Cow<'a, Address>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct GetBalanceResult {
    #[serde(with = "crate::utils::amount_string")]
    pub balance: u128,
    pub height: u64,
}

#[derive(Serialize, Deserialize)]
pub struct GetNonceParams<'a> {
    pub address: Cow<'a, Address>,
}

#[derive(Serialize, Deserialize)]
pub struct GetBlockAtHeightParams {
    pub height: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct BlockSummary {
    pub height: u64,
    pub hash: Hash,
    pub previous: Hash,
    pub proposer: Address,
    pub timestamp: TimestampMillis,
    pub txs_count: usize,
    // Transactions included but rejected by the handler
    pub rejected_count: usize,
}

#[derive(Serialize, Deserialize)]
pub struct SubmitTransactionParams {
    pub data: String, // should be in hex format
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SubmitTransactionResult {
    pub hash: Hash,
    pub accepted: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct GetInfoResult {
    pub height: u64,
    pub top_block_hash: Hash,
    pub chain_id: String,
    pub evm_chain_id: u64,
    pub validator: Address,
    pub validators_count: usize,
    pub mempool_size: usize,
    pub version: String,
}

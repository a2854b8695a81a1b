// Local validator networks.
//
// A Network owns every node of one test, the shared genesis and one JSON-RPC
// client per node. Waiters work against anything implementing NodeRpc.

mod config;
mod harness;

/// Height waiters generic over [`NodeRpc`]
pub mod waiters;

pub use config::*;
pub use harness::{HarnessState, Network, ValidatorHandle, POLL_INTERVAL};

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use vela_common::{api::daemon::SubmitTransactionResult, crypto::Address, transaction::Transaction};

/// Node operations used by tests.
///
/// Implemented by the RPC-backed [`ValidatorHandle`] and by test mocks.
#[async_trait]
pub trait NodeRpc: Send + Sync {
    /// Height of the last committed block
    async fn get_height(&self) -> Result<u64>;

    async fn get_balance(&self, address: &Address) -> Result<u128>;

    async fn get_nonce(&self, address: &Address) -> Result<u64>;

    /// Hand a signed transaction to the node's mempool
    async fn submit_transaction(&self, tx: &Transaction) -> Result<SubmitTransactionResult>;
}

#[async_trait]
impl<T: NodeRpc + ?Sized> NodeRpc for &T {
    async fn get_height(&self) -> Result<u64> {
        (**self).get_height().await
    }

    async fn get_balance(&self, address: &Address) -> Result<u128> {
        (**self).get_balance(address).await
    }

    async fn get_nonce(&self, address: &Address) -> Result<u64> {
        (**self).get_nonce(address).await
    }

    async fn submit_transaction(&self, tx: &Transaction) -> Result<SubmitTransactionResult> {
        (**self).submit_transaction(tx).await
    }
}

#[async_trait]
impl<T: NodeRpc + ?Sized> NodeRpc for Arc<T> {
    async fn get_height(&self) -> Result<u64> {
        (**self).get_height().await
    }

    async fn get_balance(&self, address: &Address) -> Result<u128> {
        (**self).get_balance(address).await
    }

    async fn get_nonce(&self, address: &Address) -> Result<u64> {
        (**self).get_nonce(address).await
    }

    async fn submit_transaction(&self, tx: &Transaction) -> Result<SubmitTransactionResult> {
        (**self).submit_transaction(tx).await
    }
}

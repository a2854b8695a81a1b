use crate::core::{blockchain::Blockchain, error::BlockchainError};
use anyhow::Context as AnyContext;
use log::{debug, trace};
use serde_json::{json, Value};
use std::sync::Arc;
use vela_common::{
    api::daemon::{
        GetBalanceParams, GetBalanceResult, GetBlockAtHeightParams, GetNonceParams,
        SubmitTransactionParams, SubmitTransactionResult,
    },
    async_handler,
    config::VERSION,
    rpc::{parse_params, require_no_params, InternalRpcError, RPCHandler, TRANSACTION_REJECTED_CODE},
    serializer::Serializer,
    transaction::{Transaction, MAX_PAYLOAD_SIZE},
};

// Envelope overhead on top of the payload, x2 because of hex encoding
const MAX_TRANSACTION_HEX_SIZE: usize = (MAX_PAYLOAD_SIZE + 256) * 2;

pub fn register_methods(handler: &mut RPCHandler<Arc<Blockchain>>) {
    trace!("Registering RPC methods...");
    handler.register_method("get_version", async_handler!(version));
    handler.register_method("get_info", async_handler!(get_info));
    handler.register_method("get_height", async_handler!(get_height));
    handler.register_method("get_balance", async_handler!(get_balance));
    handler.register_method("get_nonce", async_handler!(get_nonce));
    handler.register_method("get_block_at_height", async_handler!(get_block_at_height));
    handler.register_method("submit_transaction", async_handler!(submit_transaction));
}

async fn version(_: Arc<Blockchain>, body: Value) -> Result<Value, InternalRpcError> {
    require_no_params(body)?;
    Ok(json!(VERSION))
}

async fn get_info(blockchain: Arc<Blockchain>, body: Value) -> Result<Value, InternalRpcError> {
    require_no_params(body)?;
    let info = blockchain
        .get_info()
        .context("Error while retrieving chain info")?;
    Ok(json!(info))
}

async fn get_height(blockchain: Arc<Blockchain>, body: Value) -> Result<Value, InternalRpcError> {
    require_no_params(body)?;
    let height = blockchain
        .get_height()
        .context("Error while retrieving height")?;
    Ok(json!(height))
}

async fn get_balance(blockchain: Arc<Blockchain>, body: Value) -> Result<Value, InternalRpcError> {
    let params: GetBalanceParams = parse_params(body)?;
    // Both reads under separate locks, a block may land in between
    let height = blockchain
        .get_height()
        .context("Error while retrieving height")?;
    let balance = blockchain
        .get_balance(&params.address)
        .context("Error while retrieving balance")?;
    Ok(json!(GetBalanceResult { balance, height }))
}

async fn get_nonce(blockchain: Arc<Blockchain>, body: Value) -> Result<Value, InternalRpcError> {
    let params: GetNonceParams = parse_params(body)?;
    let nonce = blockchain
        .get_nonce(&params.address)
        .context("Error while retrieving nonce")?;
    Ok(json!(nonce))
}

async fn get_block_at_height(
    blockchain: Arc<Blockchain>,
    body: Value,
) -> Result<Value, InternalRpcError> {
    let params: GetBlockAtHeightParams = parse_params(body)?;
    let summary = blockchain
        .get_block_summary(params.height)
        .with_context(|| format!("Error while retrieving block at height {}", params.height))?;
    Ok(json!(summary))
}

async fn submit_transaction(
    blockchain: Arc<Blockchain>,
    body: Value,
) -> Result<Value, InternalRpcError> {
    let params: SubmitTransactionParams = parse_params(body)?;
    if params.data.len() > MAX_TRANSACTION_HEX_SIZE {
        return Err(InternalRpcError::InvalidParams(
            "Transaction is larger than the maximum envelope size",
        ));
    }

    let transaction = Transaction::from_hex(&params.data)
        .map_err(|err| InternalRpcError::InvalidParamsAny(err.into()))?;

    let hash = match blockchain.add_tx_to_mempool(transaction) {
        Ok(hash) => hash,
        Err(err @ BlockchainError::NotInitialized) => return Err(anyhow::Error::from(err).into()),
        Err(err) => {
            if log::log_enabled!(log::Level::Debug) {
                debug!("Transaction rejected at admission: {}", err);
            }
            return Err(InternalRpcError::Custom(
                TRANSACTION_REJECTED_CODE,
                err.to_string(),
            ));
        }
    };

    Ok(json!(SubmitTransactionResult {
        hash,
        accepted: true
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::handler::EvmHandler;
    use serde_json::json;
    use vela_common::config::ChainConfig;

    fn handler() -> RPCHandler<Arc<Blockchain>> {
        let blockchain = Blockchain::new(ChainConfig::default(), Arc::new(EvmHandler::new()));
        let mut handler = RPCHandler::new(Arc::new(blockchain));
        register_methods(&mut handler);
        handler
    }

    #[test]
    fn test_methods_registered() {
        let handler = handler();
        for method in [
            "get_version",
            "get_info",
            "get_height",
            "get_balance",
            "get_nonce",
            "get_block_at_height",
            "submit_transaction",
        ] {
            assert!(handler.has_method(method), "missing {}", method);
        }
    }

    #[tokio::test]
    async fn test_queries_before_init_chain() {
        let handler = handler();
        let body = json!({"jsonrpc": "2.0", "id": 1, "method": "get_height"}).to_string();
        let err = handler.handle_request(body.as_bytes()).await.unwrap_err();
        assert_eq!(err.get_error().get_code(), -32004);
    }
}

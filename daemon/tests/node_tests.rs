use std::{sync::Arc, time::Duration};
use tokio::time::{sleep, timeout, Instant};
use vela_common::{
    api::daemon::{
        BlockSummary, GetBalanceParams, GetBlockAtHeightParams, GetInfoResult,
        SubmitTransactionParams, SubmitTransactionResult,
    },
    config::ChainConfig,
    rpc::{client::JsonRPCClient, TRANSACTION_REJECTED_CODE},
    serializer::Serializer,
    transaction::{contract_address, Transaction},
};
use vela_daemon::{
    config::NodeConfig,
    consensus::LocalConsensus,
    core::{
        handler::{EvmHandler, TransactionHandler, TxReceipt, TxRejection},
        state::LedgerState,
    },
    Node,
};
use vela_genesis::{GenesisBuilder, GenesisOutput};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

fn network(validators: usize) -> (GenesisOutput, Vec<Node>) {
    network_with_handler(validators, Arc::new(EvmHandler::new()))
}

fn network_with_handler(
    validators: usize,
    handler: Arc<dyn TransactionHandler>,
) -> (GenesisOutput, Vec<Node>) {
    let output = GenesisBuilder::new(ChainConfig::default())
        .with_seeded_validators(validators, 21)
        .build()
        .unwrap();
    let consensus = Arc::new(
        LocalConsensus::new(
            output
                .validators
                .iter()
                .map(|validator| validator.consensus_address())
                .collect(),
        )
        .unwrap(),
    );
    let bytes = output.state.to_json_bytes().unwrap();

    let nodes = output
        .validators
        .iter()
        .map(|identity| {
            let config = NodeConfig::default()
                .with_chain(output.chain.clone())
                .with_block_time(Duration::from_millis(50));
            let node = Node::new(
                config,
                identity.clone(),
                consensus.clone(),
                handler.clone(),
            );
            node.init_with_genesis(&output.chain.chain_id, &bytes).unwrap();
            node
        })
        .collect();
    (output, nodes)
}

async fn wait_for_height(node: &Node, target: u64) -> u64 {
    timeout(Duration::from_secs(10), async {
        loop {
            let height = node.get_height().unwrap();
            if height >= target {
                return height;
            }
            sleep(POLL_INTERVAL).await;
        }
    })
    .await
    .expect("Timeout waiting for height")
}

#[tokio::test(flavor = "multi_thread")]
async fn test_nodes_take_turns() {
    let (output, nodes) = network(3);
    for node in &nodes {
        node.start().await.unwrap();
    }

    for node in &nodes {
        wait_for_height(node, 4).await;
    }

    let blockchain = nodes[0].blockchain();
    for height in 1..=3u64 {
        let summary = blockchain.get_block_summary(height).unwrap();
        let expected = &output.validators[(height as usize - 1) % 3];
        assert_eq!(summary.proposer, expected.consensus_address());
    }
    // every node applied the same chain
    let reference = blockchain.get_block_summary(4).unwrap();
    for node in &nodes[1..] {
        assert_eq!(node.blockchain().get_block_summary(4).unwrap(), reference);
    }

    for node in &nodes {
        node.shutdown().await;
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rpc_surface() {
    let (output, nodes) = network(1);
    let node = &nodes[0];
    node.start().await.unwrap();
    wait_for_height(node, 1).await;

    let client = JsonRPCClient::new(node.rpc_endpoint().unwrap()).unwrap();
    let version: String = client.call("get_version").await.unwrap();
    assert!(!version.is_empty());

    let info: GetInfoResult = client.call("get_info").await.unwrap();
    assert_eq!(info.chain_id, output.chain.chain_id);
    assert_eq!(info.validator, output.validators[0].consensus_address());
    assert_eq!(info.validators_count, 1);

    let summary: BlockSummary = client
        .call_with("get_block_at_height", &GetBlockAtHeightParams { height: 1 })
        .await
        .unwrap();
    assert_eq!(summary.height, 1);

    // Balance is reported as a decimal string
    let raw: serde_json::Value = client
        .call_with(
            "get_balance",
            &GetBalanceParams {
                address: std::borrow::Cow::Owned(output.primary.address()),
            },
        )
        .await
        .unwrap();
    assert_eq!(raw["balance"], "99000000000000");

    let tx = output.primary.sign(Transaction::new_contract(
        output.chain.evm_chain_id,
        0,
        0,
        100_000,
        1,
        vec![0x60, 0x00],
    ));
    let result: SubmitTransactionResult = client
        .call_with(
            "submit_transaction",
            &SubmitTransactionParams { data: tx.to_hex() },
        )
        .await
        .unwrap();
    assert!(result.accepted);
    assert_eq!(result.hash, tx.hash());

    let contract = contract_address(&output.primary.address(), 0);
    let deadline = Instant::now() + Duration::from_secs(10);
    while !node.blockchain().with_state(|state| state.has_code(&contract)).unwrap() {
        assert!(Instant::now() < deadline, "contract never deployed");
        sleep(POLL_INTERVAL).await;
    }

    let err = client
        .call_with::<_, SubmitTransactionResult>(
            "submit_transaction",
            &SubmitTransactionParams {
                data: "00ff".to_string(),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.server_code(), Some(-32602));

    let wrong_chain = output.primary.sign(Transaction::new_contract(
        1,
        1,
        0,
        100_000,
        1,
        Vec::new(),
    ));
    let err = client
        .call_with::<_, SubmitTransactionResult>(
            "submit_transaction",
            &SubmitTransactionParams {
                data: wrong_chain.to_hex(),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.server_code(), Some(TRANSACTION_REJECTED_CODE as i64));

    node.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_shutdown_is_idempotent() {
    let (_, nodes) = network(1);
    let node = &nodes[0];
    node.start().await.unwrap();
    assert!(node.start().await.is_err());
    wait_for_height(node, 1).await;

    node.shutdown().await;
    let height = node.get_height().unwrap();
    node.shutdown().await;

    sleep(Duration::from_millis(200)).await;
    assert_eq!(node.get_height().unwrap(), height);
    assert!(node.start().await.is_err());
}

struct FaultyHandler;

impl TransactionHandler for FaultyHandler {
    fn submit(&self, _: &Transaction, _: &mut LedgerState) -> Result<TxReceipt, TxRejection> {
        panic!("handler fault")
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_handler_panic_resumes_on_shutdown() {
    let (output, mut nodes) = network_with_handler(1, Arc::new(FaultyHandler));
    let node = nodes.remove(0);
    node.start().await.unwrap();
    // Empty blocks never reach the handler
    wait_for_height(&node, 1).await;
    assert!(!node.producer_failed());

    let tx = output.primary.sign(Transaction::new_contract(
        output.chain.evm_chain_id,
        0,
        0,
        100_000,
        1,
        vec![1],
    ));
    node.submit_transaction(tx).unwrap();
    timeout(Duration::from_secs(10), async {
        while !node.producer_failed() {
            sleep(POLL_INTERVAL).await;
        }
    })
    .await
    .expect("block producer survived the handler panic");

    let err = tokio::spawn(async move { node.shutdown().await })
        .await
        .unwrap_err();
    assert!(err.is_panic());
    assert_eq!(err.into_panic().downcast_ref::<&str>(), Some(&"handler fault"));
}

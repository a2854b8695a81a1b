// Both fuzz drivers run as regular tests

use proptest::prelude::*;
use vela_common::{
    rpc::TRANSACTION_REJECTED_CODE, serializer::Serializer, transaction::Transaction,
};
use vela_testing_framework::prelude::*;

fn fast_network(validators: usize) -> NetworkRpcFuzzConfig {
    NetworkRpcFuzzConfig::default()
        .with_network(
            NetworkConfig::default()
                .with_validators(validators)
                .with_block_time(Duration::from_millis(50)),
        )
        .with_target_height(4)
        .with_liveness_timeout(Duration::from_secs(30))
}

fn arb_input() -> impl Strategy<Value = SynthesizerInput> {
    let payload = || proptest::collection::vec(any::<u8>(), 0..48);
    (
        (any::<i64>(), 0u64..200_000, -2i64..4, payload()),
        (any::<i64>(), 0u64..4, 0u64..200_000, -2i64..4, payload()),
        (any::<i64>(), 0u64..200_000, -2i64..4, payload()),
    )
        .prop_map(|(first, second, third)| SynthesizerInput {
            amount1: first.0,
            gas_limit1: first.1,
            gas_price1: first.2,
            input1: first.3,
            amount2: second.0,
            nonce2: second.1,
            gas_limit2: second.2,
            gas_price2: second.3,
            input2: second.4,
            amount3: third.0,
            gas_limit3: third.1,
            gas_price3: third.2,
            input3: third.3,
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_handler_cases_never_fail_setup(input in arb_input()) {
        let config = EvmHandlerFuzzConfig::default().with_key_source(KeySource::Derived);
        let report = run_evm_handler_case(&input, &config).unwrap();
        prop_assert_eq!(report.outcomes.len(), 3);

        // Same input, same key, same outcome
        let again = run_evm_handler_case(&input, &config).unwrap();
        prop_assert_eq!(report.sender, again.sender);
        prop_assert_eq!(report.outcomes, again.outcomes);
    }
}

#[test]
fn test_random_inputs_with_fresh_keys() {
    init_test_logging();
    let rng = TestRng::new_from_env_or_random();
    for _ in 0..8 {
        let input = SynthesizerInput::random(&rng);
        let report = run_evm_handler_case(&input, &EvmHandlerFuzzConfig::default()).unwrap();
        assert_eq!(report.outcomes.len(), 3);
    }
}

#[tokio::test]
async fn test_undecodable_input_is_discarded() {
    for data in [&[][..], &[0xff][..], &[2, 0, 0][..]] {
        let outcome = run_network_rpc_case(data, &NetworkRpcFuzzConfig::default())
            .await
            .unwrap();
        assert!(matches!(outcome, NetworkCaseOutcome::Discarded(_)));
    }
}

#[tokio::test]
async fn test_trailing_bytes_are_discarded() {
    let tx = TestIdentity::from_seed(1).sign(Transaction::new_contract(9000, 0, 0, 0, 0, vec![]));
    let mut data = tx.to_bytes();
    data.push(0);
    let outcome = run_network_rpc_case(&data, &NetworkRpcFuzzConfig::default())
        .await
        .unwrap();
    assert!(matches!(outcome, NetworkCaseOutcome::Discarded(_)));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_wrong_chain_submission_is_recorded() {
    init_test_logging();
    let tx = TestIdentity::random().sign(Transaction::new_contract(1, 0, 0, 60_000, 0, vec![1]));
    let outcome = run_network_rpc_case(&tx.to_bytes(), &fast_network(2))
        .await
        .unwrap();

    match outcome {
        NetworkCaseOutcome::Submitted {
            tx_hash,
            admission,
            height,
        } => {
            assert_eq!(tx_hash, tx.hash());
            assert!(matches!(
                admission,
                Admission::Rejected { code, .. } if code == TRANSACTION_REJECTED_CODE as i64
            ));
            assert!(height >= 4);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unfunded_sender_keeps_network_live() {
    init_test_logging();
    // Admitted to the mempool, rejected by the handler inside a block
    let tx = TestIdentity::random().sign(Transaction::new_contract(9000, 0, 5, 60_000, 1, vec![1]));
    let outcome = run_network_rpc_case(&tx.to_bytes(), &fast_network(3))
        .await
        .unwrap();

    match outcome {
        NetworkCaseOutcome::Submitted { admission, height, .. } => {
            assert_eq!(admission, Admission::Accepted(tx.hash()));
            assert!(height >= 4);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
}

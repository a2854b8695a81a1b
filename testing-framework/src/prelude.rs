// Commonly used imports for tests:
//
//     use vela_testing_framework::prelude::*;

pub use crate::{
    error::HarnessError,
    fuzz::{
        run_evm_handler_case, run_network_rpc_case, Admission, EvmHandlerFuzzConfig,
        HandlerCaseReport, NetworkCaseOutcome, NetworkRpcFuzzConfig,
    },
    invariants::{
        check_genesis_invariants, check_ledger, check_supply_conservation,
        check_validator_registry, HeightTracker, InvariantViolation,
    },
    network::{
        waiters::{wait_all_heights_equal, wait_for_min_height},
        HarnessState, Network, NetworkConfig, NodeRpc, ValidatorHandle,
    },
    orchestrator::TestRng,
    synthesizer::{synthesize, KeySource, SynthesizedBatch, SynthesizerInput},
    utilities::init_test_logging,
};

pub use std::time::Duration;
pub use vela_common::config::ChainConfig;
pub use vela_daemon::core::{
    handler::{SharedHandler, TransactionHandler, TxReceipt, TxRejection},
    state::LedgerState,
};
pub use vela_genesis::{TestIdentity, ValidatorIdentity};

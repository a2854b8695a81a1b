//! Fuzz target for transaction submission over JSON-RPC
//!
//! Inputs that decode as a transaction envelope are submitted to a fresh
//! local network, which must then keep producing blocks. Everything else is
//! discarded before any node starts.
//!
//! Run with: cargo +nightly fuzz run fuzz_network_rpc

#![no_main]

use libfuzzer_sys::fuzz_target;
use std::sync::OnceLock;
use tokio::runtime::Runtime;
use vela_testing_framework::fuzz::{run_network_rpc_case, NetworkCaseOutcome, NetworkRpcFuzzConfig};

fn runtime() -> &'static Runtime {
    static RUNTIME: OnceLock<Runtime> = OnceLock::new();
    RUNTIME.get_or_init(|| {
        tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .expect("failed to build tokio runtime")
    })
}

fuzz_target!(|data: &[u8]| {
    let config = NetworkRpcFuzzConfig::default();
    match runtime().block_on(run_network_rpc_case(data, &config)) {
        Ok(NetworkCaseOutcome::Discarded(_)) => {}
        Ok(NetworkCaseOutcome::Submitted { .. }) => {}
        Err(err) => panic!("network case failed: {}", err),
    }
});

// Fuzz drivers shared by the cargo-fuzz targets and regular tests.
//
// evm_handler runs three synthesized transactions straight through the
// handler of a throwaway ledger. network_rpc submits raw bytes to a live
// network over JSON-RPC and checks it keeps producing blocks.

pub mod evm_handler;
pub mod network_rpc;

pub use evm_handler::{
    run_evm_handler_case, EvmHandlerFuzzConfig, HandlerCaseReport, TxOutcome,
};
pub use network_rpc::{
    run_network_rpc_case, Admission, NetworkCaseOutcome, NetworkRpcFuzzConfig,
};

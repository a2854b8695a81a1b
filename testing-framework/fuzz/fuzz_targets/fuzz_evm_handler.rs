//! Fuzz target for the transaction handler
//!
//! Each input becomes a deploy plus two calls signed by the funded validator
//! account of a fresh ledger. Rejections are expected; a panic, a setup
//! failure or a broken ledger invariant is a finding.
//!
//! Run with: cargo +nightly fuzz run fuzz_evm_handler

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use vela_testing_framework::{
    fuzz::{run_evm_handler_case, EvmHandlerFuzzConfig},
    synthesizer::{KeySource, SynthesizerInput},
};

#[derive(Debug, Arbitrary)]
struct HandlerInput {
    amount1: i64,
    gas_limit1: u64,
    gas_price1: i64,
    input1: Vec<u8>,
    amount2: i64,
    nonce2: u64,
    gas_limit2: u64,
    gas_price2: i64,
    input2: Vec<u8>,
    amount3: i64,
    gas_limit3: u64,
    gas_price3: i64,
    input3: Vec<u8>,
}

impl From<HandlerInput> for SynthesizerInput {
    fn from(input: HandlerInput) -> Self {
        Self {
            amount1: input.amount1,
            gas_limit1: input.gas_limit1,
            gas_price1: input.gas_price1,
            input1: input.input1,
            amount2: input.amount2,
            nonce2: input.nonce2,
            gas_limit2: input.gas_limit2,
            gas_price2: input.gas_price2,
            input2: input.input2,
            amount3: input.amount3,
            gas_limit3: input.gas_limit3,
            gas_price3: input.gas_price3,
            input3: input.input3,
        }
    }
}

fuzz_target!(|input: HandlerInput| {
    let input = SynthesizerInput::from(input);
    // Keys derived from the input so every crash replays
    let config = EvmHandlerFuzzConfig::default().with_key_source(KeySource::Derived);
    if let Err(err) = run_evm_handler_case(&input, &config) {
        panic!("handler case failed: {}", err);
    }
});

//! Three-transaction batches for fuzzing the handler.
//!
//! A batch deploys a contract then calls it twice: once at an arbitrary
//! nonce and once at the nonce that follows the deployment. Inputs are never
//! validated, whatever the fuzzer produced reaches the handler.

use crate::orchestrator::TestRng;
use serde::{Deserialize, Serialize};
use vela_common::{
    config::ChainConfig,
    crypto::{hash, Address},
    serializer::Writer,
    transaction::{contract_address, Transaction},
};
use vela_genesis::TestIdentity;

/// Raw fuzz input of one batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SynthesizerInput {
    pub amount1: i64,
    pub gas_limit1: u64,
    pub gas_price1: i64,
    pub input1: Vec<u8>,
    pub amount2: i64,
    pub nonce2: u64,
    pub gas_limit2: u64,
    pub gas_price2: i64,
    pub input2: Vec<u8>,
    pub amount3: i64,
    pub gas_limit3: u64,
    pub gas_price3: i64,
    pub input3: Vec<u8>,
}

impl SynthesizerInput {
    /// Stable 64-bit digest of every field, used to derive keys
    pub fn fingerprint(&self) -> u64 {
        let mut writer = Writer::new();
        writer.write_i64(self.amount1);
        writer.write_u64(self.gas_limit1);
        writer.write_i64(self.gas_price1);
        writer.write_vec(&self.input1);
        writer.write_i64(self.amount2);
        writer.write_u64(self.nonce2);
        writer.write_u64(self.gas_limit2);
        writer.write_i64(self.gas_price2);
        writer.write_vec(&self.input2);
        writer.write_i64(self.amount3);
        writer.write_u64(self.gas_limit3);
        writer.write_i64(self.gas_price3);
        writer.write_vec(&self.input3);

        let digest = hash(writer.as_bytes());
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest.as_bytes()[..8]);
        u64::from_be_bytes(bytes)
    }

    /// Random input with small payloads, for smoke tests
    pub fn random(rng: &TestRng) -> Self {
        let payload = |rng: &TestRng| {
            let len = rng.gen_range(0..64usize);
            rng.bytes(len)
        };
        Self {
            amount1: rng.gen(),
            gas_limit1: rng.gen(),
            gas_price1: rng.gen(),
            input1: payload(rng),
            amount2: rng.gen(),
            nonce2: rng.gen_range(0..4),
            gas_limit2: rng.gen(),
            gas_price2: rng.gen(),
            input2: payload(rng),
            amount3: rng.gen(),
            gas_limit3: rng.gen(),
            gas_price3: rng.gen(),
            input3: payload(rng),
        }
    }
}

/// Where the sender key of a batch comes from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeySource {
    /// New random key on every case
    #[default]
    Fresh,
    /// Key seeded from [`SynthesizerInput::fingerprint`], same input same key
    Derived,
    /// Key from an explicit seed
    Seeded(u64),
}

impl KeySource {
    pub fn identity(&self, input: &SynthesizerInput) -> TestIdentity {
        match self {
            Self::Fresh => TestIdentity::random(),
            Self::Derived => TestIdentity::from_seed(input.fingerprint()),
            Self::Seeded(seed) => TestIdentity::from_seed(*seed),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedBatch {
    /// Deployment at nonce 0
    pub create: Transaction,
    /// Call to the deployed address at the fuzzed nonce
    pub call_at_nonce: Transaction,
    /// Call to the deployed address at nonce 1
    pub call_next: Transaction,
    /// Address the deployment produces when it succeeds
    pub contract_address: Address,
}

impl SynthesizedBatch {
    /// In submission order
    pub fn transactions(&self) -> [&Transaction; 3] {
        [&self.create, &self.call_at_nonce, &self.call_next]
    }
}

/// Build and sign the batch for `input`.
/// Deterministic for a given input, sender key and chain.
pub fn synthesize(
    input: &SynthesizerInput,
    sender: &TestIdentity,
    chain: &ChainConfig,
) -> SynthesizedBatch {
    let chain_id = chain.evm_chain_id;
    let contract = contract_address(&sender.address(), 0);

    let create = sender.sign(Transaction::new_contract(
        chain_id,
        0,
        input.amount1,
        input.gas_limit1,
        input.gas_price1,
        input.input1.clone(),
    ));
    let call_at_nonce = sender.sign(Transaction::new_call(
        chain_id,
        input.nonce2,
        contract,
        input.amount2,
        input.gas_limit2,
        input.gas_price2,
        input.input2.clone(),
    ));
    let call_next = sender.sign(Transaction::new_call(
        chain_id,
        1,
        contract,
        input.amount3,
        input.gas_limit3,
        input.gas_price3,
        input.input3.clone(),
    ));

    SynthesizedBatch {
        create,
        call_at_nonce,
        call_next,
        contract_address: contract,
    }
}

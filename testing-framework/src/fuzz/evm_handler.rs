use crate::{
    invariants::check_ledger,
    synthesizer::{synthesize, KeySource, SynthesizerInput},
    HarnessError,
};
use log::debug;
use vela_common::{
    config::{ChainConfig, DEFAULT_DENOM},
    crypto::{Address, Hash, KeyPair},
};
use vela_daemon::core::{
    blockchain::{Blockchain, InitChainRequest},
    handler::{SharedHandler, TxReceipt, TxRejection},
    state::Validator,
};
use vela_genesis::{
    modules::POWER_REDUCTION, GenesisBuilder, ValidatorIdentity, DEFAULT_FUNDING,
    DEFAULT_STAKE_PER_VALIDATOR,
};

const VALIDATOR_MONIKER: &str = "fuzz-validator";

#[derive(Debug, Clone)]
pub struct EvmHandlerFuzzConfig {
    pub chain: ChainConfig,
    pub denom: String,
    pub funding: u128,
    pub stake: u128,
    pub key_source: KeySource,
    pub handler: SharedHandler,
}

impl Default for EvmHandlerFuzzConfig {
    fn default() -> Self {
        Self {
            chain: ChainConfig::default(),
            denom: DEFAULT_DENOM.to_string(),
            funding: DEFAULT_FUNDING,
            stake: DEFAULT_STAKE_PER_VALIDATOR,
            key_source: KeySource::Fresh,
            handler: SharedHandler::default(),
        }
    }
}

impl EvmHandlerFuzzConfig {
    pub fn with_chain(mut self, chain: ChainConfig) -> Self {
        self.chain = chain;
        self
    }

    pub fn with_funding(mut self, funding: u128) -> Self {
        self.funding = funding;
        self
    }

    pub fn with_stake(mut self, stake: u128) -> Self {
        self.stake = stake;
        self
    }

    pub fn with_key_source(mut self, key_source: KeySource) -> Self {
        self.key_source = key_source;
        self
    }

    pub fn with_handler(mut self, handler: SharedHandler) -> Self {
        self.handler = handler;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutcome {
    pub hash: Hash,
    pub result: Result<TxReceipt, TxRejection>,
}

impl TxOutcome {
    pub fn is_accepted(&self) -> bool {
        self.result.is_ok()
    }
}

/// What happened to the three transactions of one case
#[derive(Debug, Clone)]
pub struct HandlerCaseReport {
    pub sender: Address,
    pub contract_address: Address,
    /// create, call at the fuzzed nonce, call at nonce 1
    pub outcomes: Vec<TxOutcome>,
}

impl HandlerCaseReport {
    pub fn accepted(&self) -> usize {
        self.outcomes.iter().filter(|outcome| outcome.is_accepted()).count()
    }

    pub fn rejections(&self) -> impl Iterator<Item = &TxRejection> {
        self.outcomes
            .iter()
            .filter_map(|outcome| outcome.result.as_ref().err())
    }
}

fn consensus_key(source: KeySource, input: &SynthesizerInput) -> KeyPair {
    match source {
        KeySource::Fresh => KeyPair::new(),
        // Offset so the consensus key never equals the sender key
        KeySource::Derived => KeyPair::from_seed(input.fingerprint().wrapping_add(1)),
        KeySource::Seeded(seed) => KeyPair::from_seed(seed.wrapping_add(1)),
    }
}

/// Run one fuzz case against a throwaway ledger.
///
/// The sender is both the funded account and the only validator. Handler
/// rejections are part of the report, only setup failures and broken
/// ledger invariants are errors.
pub fn run_evm_handler_case(
    input: &SynthesizerInput,
    config: &EvmHandlerFuzzConfig,
) -> Result<HandlerCaseReport, HarnessError> {
    let sender = config.key_source.identity(input);
    let validator = ValidatorIdentity::new(
        sender.clone(),
        consensus_key(config.key_source, input),
        VALIDATOR_MONIKER,
    );

    let genesis = GenesisBuilder::new(config.chain.clone())
        .with_denom(config.denom.clone())
        .with_primary_funding(config.funding)
        .with_stake_per_validator(config.stake)
        .with_primary(sender.clone())
        .with_validator(validator.clone())
        .build()
        .map_err(|err| HarnessError::setup("genesis", err))?;
    let genesis_bytes = genesis
        .state
        .to_json_bytes()
        .map_err(|err| HarnessError::setup("genesis", err))?;

    let blockchain = Blockchain::new(config.chain.clone(), config.handler.handler());
    blockchain
        .init_chain(InitChainRequest::new(
            config.chain.chain_id.clone(),
            genesis_bytes,
        ))
        .map_err(|err| HarnessError::setup("init chain", err))?;

    let record = Validator {
        operator_address: validator.operator_address(),
        consensus_address: validator.consensus_address(),
        consensus_pubkey: validator.consensus_key().public_key_compressed().to_vec(),
        tokens: config.stake,
        power: (config.stake / POWER_REDUCTION).min(u64::MAX as u128) as u64,
        moniker: VALIDATOR_MONIKER.to_string(),
    };
    blockchain
        .with_state_mut(|state| {
            state.register_account(sender.address(), None);
            // Registered twice on purpose, both must be no-ops after genesis
            state.set_validator_by_consensus_address(&record)?;
            state.set_validator_by_consensus_address(&record)?;
            state.set_validator(record)
        })
        .map_err(|err| HarnessError::setup("validator registration", err))?
        .map_err(|err| HarnessError::setup("validator registration", err))?;

    let batch = synthesize(input, &sender, &config.chain);
    let mut outcomes = Vec::with_capacity(3);
    for tx in batch.transactions() {
        let result = blockchain
            .execute_transaction(tx)
            .map_err(|err| HarnessError::setup("execute", err))?;
        if log::log_enabled!(log::Level::Debug) {
            match &result {
                Ok(receipt) => debug!("Fuzz tx {} accepted, fee {}", receipt.hash, receipt.fee),
                Err(rejection) => debug!("Fuzz tx {} rejected: {}", tx.hash(), rejection),
            }
        }
        outcomes.push(TxOutcome {
            hash: tx.hash(),
            result,
        });
    }

    blockchain
        .with_state(check_ledger)
        .map_err(|err| HarnessError::setup("ledger", err))??;

    Ok(HandlerCaseReport {
        sender: sender.address(),
        contract_address: batch.contract_address,
        outcomes,
    })
}

//! Typed state of each genesis module.
//!
//! Nodes decode these from the genesis document during chain initialization.

use serde::{Deserialize, Serialize};
use vela_common::crypto::{Address, Hash};

pub const AUTH_MODULE: &str = "auth";
pub const BANK_MODULE: &str = "bank";
pub const STAKING_MODULE: &str = "staking";
pub const EVM_MODULE: &str = "evm";

// Tokens per unit of consensus voting power
pub const POWER_REDUCTION: u128 = 1_000_000;

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct GenesisAccount {
    pub address: Address,
    pub bech32: String,
    pub nonce: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_hash: Option<Hash>,
    // Set for module accounts (fee collector, bonded pool)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthGenesis {
    pub accounts: Vec<GenesisAccount>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Coin {
    pub denom: String,
    #[serde(with = "vela_common::utils::amount_string")]
    pub amount: u128,
}

impl Coin {
    pub fn new(denom: impl Into<String>, amount: u128) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct BankBalance {
    pub address: Address,
    pub coins: Vec<Coin>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct BankParams {
    pub default_send_enabled: bool,
}

impl Default for BankParams {
    fn default() -> Self {
        Self {
            default_send_enabled: true,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DenomMetadata {
    pub base: String,
    pub display: String,
    pub exponent: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct BankGenesis {
    pub params: BankParams,
    pub balances: Vec<BankBalance>,
    pub supply: Vec<Coin>,
    #[serde(default)]
    pub denom_metadata: Vec<DenomMetadata>,
}

impl BankGenesis {
    pub fn balance_of(&self, address: &Address, denom: &str) -> u128 {
        self.balances
            .iter()
            .filter(|balance| balance.address == *address)
            .flat_map(|balance| balance.coins.iter())
            .filter(|coin| coin.denom == denom)
            .map(|coin| coin.amount)
            .sum()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct StakingParams {
    pub bond_denom: String,
    pub max_validators: u32,
    pub unbonding_time_secs: u64,
}

impl Default for StakingParams {
    fn default() -> Self {
        Self {
            bond_denom: vela_common::config::DEFAULT_DENOM.to_string(),
            max_validators: 100,
            unbonding_time_secs: 1_814_400,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct GenesisValidator {
    pub operator_address: Address,
    pub operator_bech32: String,
    pub consensus_address: Address,
    pub consensus_bech32: String,
    // Compressed secp256k1 public key, hex encoded
    pub consensus_pubkey: String,
    #[serde(with = "vela_common::utils::amount_string")]
    pub tokens: u128,
    pub power: u64,
    pub moniker: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct StakingGenesis {
    pub params: StakingParams,
    pub validators: Vec<GenesisValidator>,
    pub last_total_power: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct EvmParams {
    pub evm_denom: String,
    pub chain_id: u64,
    pub enable_create: bool,
    pub enable_call: bool,
}

impl Default for EvmParams {
    fn default() -> Self {
        Self {
            evm_denom: vela_common::config::DEFAULT_DENOM.to_string(),
            chain_id: vela_common::config::DEFAULT_EVM_CHAIN_ID,
            enable_create: true,
            enable_call: true,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct EvmContract {
    pub address: Address,
    // hex encoded bytecode
    pub code: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct EvmGenesis {
    pub params: EvmParams,
    #[serde(default)]
    pub contracts: Vec<EvmContract>,
}

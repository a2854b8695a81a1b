use crate::{
    modules::{BankGenesis, StakingGenesis, BANK_MODULE, STAKING_MODULE},
    GenesisError,
};
use indexmap::IndexMap;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{ser::PrettyFormatter, Value};
use vela_common::{config::BONDED_POOL_MODULE, crypto::Address};

/// Module name to serialized module state, in insertion order.
/// Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GenesisState(IndexMap<String, Value>);

impl GenesisState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_module<T: Serialize>(&mut self, name: &str, state: &T) -> Result<(), GenesisError> {
        let value = serde_json::to_value(state).map_err(|source| GenesisError::Serialization {
            module: name.to_string(),
            source,
        })?;
        self.0.insert(name.to_string(), value);
        Ok(())
    }

    pub fn module<T: DeserializeOwned>(&self, name: &str) -> Result<T, GenesisError> {
        let value = self
            .0
            .get(name)
            .ok_or_else(|| GenesisError::MissingModule(name.to_string()))?;
        T::deserialize(value).map_err(|source| GenesisError::Serialization {
            module: name.to_string(),
            source,
        })
    }

    pub fn modules(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    // Pretty JSON, one space indent
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, GenesisError> {
        let mut bytes = Vec::new();
        let mut serializer =
            serde_json::Serializer::with_formatter(&mut bytes, PrettyFormatter::with_indent(b" "));
        self.serialize(&mut serializer)
            .map_err(GenesisError::Document)?;
        Ok(bytes)
    }

    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self, GenesisError> {
        serde_json::from_slice(bytes).map_err(GenesisError::Document)
    }

    /// Declared total supply of `denom` in the bank module
    pub fn total_supply(&self, denom: &str) -> Result<u128, GenesisError> {
        let bank: BankGenesis = self.module(BANK_MODULE)?;
        Ok(bank
            .supply
            .iter()
            .filter(|coin| coin.denom == denom)
            .map(|coin| coin.amount)
            .sum())
    }

    /// Check the supply and staking invariants.
    ///
    /// Every declared supply coin must equal the sum of balances of that
    /// denom (module accounts included), every balance denom must be declared,
    /// every validator must have bonded tokens and the bonded pool must hold
    /// exactly the sum of those tokens.
    pub fn validate(&self) -> Result<(), GenesisError> {
        let bank: BankGenesis = self.module(BANK_MODULE)?;

        let mut sums: IndexMap<&str, u128> = IndexMap::new();
        for coin in bank.balances.iter().flat_map(|b| b.coins.iter()) {
            let sum = sums.entry(coin.denom.as_str()).or_default();
            *sum = sum
                .checked_add(coin.amount)
                .ok_or(GenesisError::Overflow("balances sum"))?;
        }

        for coin in &bank.supply {
            let actual = sums.shift_remove(coin.denom.as_str()).unwrap_or(0);
            if actual != coin.amount {
                return Err(GenesisError::SupplyMismatch {
                    denom: coin.denom.clone(),
                    declared: coin.amount,
                    actual,
                });
            }
        }

        // Balances in a denom that has no declared supply
        if let Some((denom, actual)) = sums.into_iter().find(|(_, amount)| *amount > 0) {
            return Err(GenesisError::SupplyMismatch {
                denom: denom.to_string(),
                declared: 0,
                actual,
            });
        }

        let staking: StakingGenesis = self.module(STAKING_MODULE)?;
        let mut staked: u128 = 0;
        for validator in &staking.validators {
            if validator.tokens == 0 {
                return Err(GenesisError::UnbondedValidator(validator.operator_address));
            }
            staked = staked
                .checked_add(validator.tokens)
                .ok_or(GenesisError::Overflow("bonded tokens"))?;
        }

        let pool = bank.balance_of(
            &Address::from_module_name(BONDED_POOL_MODULE),
            &staking.params.bond_denom,
        );
        if pool != staked {
            return Err(GenesisError::BondedPoolMismatch { pool, staked });
        }

        Ok(())
    }
}

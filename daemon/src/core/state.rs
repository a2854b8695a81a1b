//! In-memory ledger: accounts, contract code and the validator registry.

use super::error::BlockchainError;
use indexmap::IndexMap;
use log::debug;
use std::collections::HashMap;
use thiserror::Error;
use vela_common::{
    config::{ChainConfig, FEE_COLLECTOR_MODULE},
    crypto::{hash, Address, Hash},
};
use vela_genesis::{
    modules::{
        AuthGenesis, BankGenesis, EvmGenesis, StakingGenesis, AUTH_MODULE, BANK_MODULE,
        EVM_MODULE, STAKING_MODULE,
    },
    GenesisState,
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("account {address} has {balance} but {required} is required")]
    InsufficientBalance {
        address: Address,
        balance: u128,
        required: u128,
    },
    #[error("balance overflow for account {0}")]
    BalanceOverflow(Address),
    #[error("nonce overflow for account {0}")]
    NonceOverflow(Address),
    #[error("consensus address {consensus} is bound to operator {existing}, cannot bind it to {operator}")]
    ValidatorConflict {
        consensus: Address,
        existing: Address,
        operator: Address,
    },
    #[error("invalid genesis contract code for {0}")]
    InvalidContractCode(Address),
    #[error("invalid consensus public key for validator {0}")]
    InvalidConsensusKey(Address),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Account {
    pub balance: u128,
    pub nonce: u64,
    // Set once code is installed, marks a contract account
    pub code_hash: Option<Hash>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validator {
    pub operator_address: Address,
    pub consensus_address: Address,
    pub consensus_pubkey: Vec<u8>,
    pub tokens: u128,
    pub power: u64,
    pub moniker: String,
}

/// Ledger state of a single node.
///
/// Validators are indexed twice: the record keyed by operator address and a
/// consensus address to operator address binding. Both registrations are
/// idempotent, rebinding a consensus address to another operator fails.
#[derive(Debug, Clone)]
pub struct LedgerState {
    accounts: HashMap<Address, Account>,
    code: HashMap<Address, Vec<u8>>,
    validators: IndexMap<Address, Validator>,
    consensus_index: HashMap<Address, Address>,
    supply: u128,
    denom: String,
    fee_collector: Address,
    evm_chain_id: u64,
    block_gas_limit: u64,
}

impl LedgerState {
    pub fn new(chain: &ChainConfig, denom: impl Into<String>) -> Self {
        Self {
            accounts: HashMap::new(),
            code: HashMap::new(),
            validators: IndexMap::new(),
            consensus_index: HashMap::new(),
            supply: 0,
            denom: denom.into(),
            fee_collector: Address::from_module_name(FEE_COLLECTOR_MODULE),
            evm_chain_id: chain.evm_chain_id,
            block_gas_limit: chain.block_gas_limit,
        }
    }

    /// Decode the genesis modules into a fresh ledger.
    /// The EVM denom decides which bank coins become account balances.
    pub fn from_genesis(
        genesis: &GenesisState,
        chain: &ChainConfig,
    ) -> Result<Self, BlockchainError> {
        let evm: EvmGenesis = genesis.module(EVM_MODULE)?;
        let auth: AuthGenesis = genesis.module(AUTH_MODULE)?;
        let bank: BankGenesis = genesis.module(BANK_MODULE)?;
        let staking: StakingGenesis = genesis.module(STAKING_MODULE)?;

        let denom = evm.params.evm_denom.clone();
        let mut state = Self::new(chain, denom.clone());

        for account in auth.accounts {
            state.accounts.insert(
                account.address,
                Account {
                    balance: 0,
                    nonce: account.nonce,
                    code_hash: account.code_hash,
                },
            );
        }

        for balance in &bank.balances {
            for coin in balance.coins.iter().filter(|coin| coin.denom == denom) {
                state.credit(&balance.address, coin.amount)?;
            }
        }
        state.supply = bank
            .supply
            .iter()
            .filter(|coin| coin.denom == denom)
            .map(|coin| coin.amount)
            .sum();

        for contract in evm.contracts {
            let code = hex::decode(&contract.code)
                .map_err(|_| StateError::InvalidContractCode(contract.address))?;
            state.install_code(contract.address, code);
        }

        for validator in staking.validators {
            let consensus_pubkey = hex::decode(&validator.consensus_pubkey)
                .map_err(|_| StateError::InvalidConsensusKey(validator.operator_address))?;
            state.set_validator(Validator {
                operator_address: validator.operator_address,
                consensus_address: validator.consensus_address,
                consensus_pubkey,
                tokens: validator.tokens,
                power: validator.power,
                moniker: validator.moniker,
            })?;
        }

        if log::log_enabled!(log::Level::Debug) {
            debug!(
                "Loaded ledger with {} accounts, {} validators, supply {}{}",
                state.accounts.len(),
                state.validators.len(),
                state.supply,
                state.denom
            );
        }

        Ok(state)
    }

    pub fn denom(&self) -> &str {
        &self.denom
    }

    pub fn evm_chain_id(&self) -> u64 {
        self.evm_chain_id
    }

    pub fn block_gas_limit(&self) -> u64 {
        self.block_gas_limit
    }

    pub fn fee_collector(&self) -> Address {
        self.fee_collector
    }

    pub fn supply(&self) -> u128 {
        self.supply
    }

    pub fn account(&self, address: &Address) -> Option<&Account> {
        self.accounts.get(address)
    }

    pub fn accounts(&self) -> impl Iterator<Item = (&Address, &Account)> {
        self.accounts.iter()
    }

    pub fn balance(&self, address: &Address) -> u128 {
        self.accounts
            .get(address)
            .map(|account| account.balance)
            .unwrap_or(0)
    }

    pub fn nonce(&self, address: &Address) -> u64 {
        self.accounts
            .get(address)
            .map(|account| account.nonce)
            .unwrap_or(0)
    }

    pub fn code(&self, address: &Address) -> Option<&[u8]> {
        self.code.get(address).map(Vec::as_slice)
    }

    pub fn has_code(&self, address: &Address) -> bool {
        self.accounts
            .get(address)
            .is_some_and(|account| account.code_hash.is_some())
    }

    // Sum of every balance, None on overflow
    pub fn total_balances(&self) -> Option<u128> {
        self.accounts
            .values()
            .try_fold(0u128, |sum, account| sum.checked_add(account.balance))
    }

    /// Make sure `address` has an account, keeping its balance and nonce.
    pub fn register_account(&mut self, address: Address, code_hash: Option<Hash>) {
        let account = self.accounts.entry(address).or_default();
        if !self.code.contains_key(&address) {
            account.code_hash = code_hash;
        }
    }

    pub fn credit(&mut self, address: &Address, amount: u128) -> Result<(), StateError> {
        let account = self.accounts.entry(*address).or_default();
        account.balance = account
            .balance
            .checked_add(amount)
            .ok_or(StateError::BalanceOverflow(*address))?;
        Ok(())
    }

    pub fn debit(&mut self, address: &Address, amount: u128) -> Result<(), StateError> {
        let balance = self.balance(address);
        if balance < amount {
            return Err(StateError::InsufficientBalance {
                address: *address,
                balance,
                required: amount,
            });
        }
        if let Some(account) = self.accounts.get_mut(address) {
            account.balance = balance - amount;
        }
        Ok(())
    }

    /// Move `amount` between two accounts without changing the supply
    pub fn transfer(&mut self, from: &Address, to: &Address, amount: u128) -> Result<(), StateError> {
        self.debit(from, amount)?;
        if let Err(err) = self.credit(to, amount) {
            // Restore the sender, the amount was just taken from it
            if let Some(account) = self.accounts.get_mut(from) {
                account.balance += amount;
            }
            return Err(err);
        }
        Ok(())
    }

    pub fn increment_nonce(&mut self, address: &Address) -> Result<u64, StateError> {
        let account = self.accounts.entry(*address).or_default();
        account.nonce = account
            .nonce
            .checked_add(1)
            .ok_or(StateError::NonceOverflow(*address))?;
        Ok(account.nonce)
    }

    pub fn install_code(&mut self, address: Address, code: Vec<u8>) -> Hash {
        let code_hash = hash(&code);
        self.accounts.entry(address).or_default().code_hash = Some(code_hash);
        self.code.insert(address, code);
        code_hash
    }

    /// Bind a consensus address to its operator
    pub fn set_validator_by_consensus_address(
        &mut self,
        validator: &Validator,
    ) -> Result<(), StateError> {
        self.check_consensus_binding(validator)?;
        self.consensus_index
            .insert(validator.consensus_address, validator.operator_address);
        Ok(())
    }

    /// Store the validator record and its consensus binding
    pub fn set_validator(&mut self, validator: Validator) -> Result<(), StateError> {
        self.check_consensus_binding(&validator)?;
        if let Some(existing) = self.validators.get(&validator.operator_address) {
            if existing.consensus_address != validator.consensus_address {
                return Err(StateError::ValidatorConflict {
                    consensus: existing.consensus_address,
                    existing: existing.operator_address,
                    operator: validator.operator_address,
                });
            }
        }

        self.consensus_index
            .insert(validator.consensus_address, validator.operator_address);
        self.validators.insert(validator.operator_address, validator);
        Ok(())
    }

    fn check_consensus_binding(&self, validator: &Validator) -> Result<(), StateError> {
        match self.consensus_index.get(&validator.consensus_address) {
            Some(existing) if *existing != validator.operator_address => {
                Err(StateError::ValidatorConflict {
                    consensus: validator.consensus_address,
                    existing: *existing,
                    operator: validator.operator_address,
                })
            }
            _ => Ok(()),
        }
    }

    pub fn validator_by_operator(&self, operator: &Address) -> Option<&Validator> {
        self.validators.get(operator)
    }

    pub fn validator_by_consensus_address(&self, consensus: &Address) -> Option<&Validator> {
        self.consensus_index
            .get(consensus)
            .and_then(|operator| self.validators.get(operator))
    }

    // In registration order
    pub fn validators(&self) -> impl Iterator<Item = &Validator> {
        self.validators.values()
    }

    pub fn consensus_bindings(&self) -> impl Iterator<Item = (&Address, &Address)> {
        self.consensus_index.iter()
    }
}

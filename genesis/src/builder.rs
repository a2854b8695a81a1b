use crate::{
    identity::{TestIdentity, ValidatorIdentity},
    modules::*,
    GenesisError, GenesisState,
};
use log::{debug, info};
use vela_common::{
    config::{ChainConfig, BONDED_POOL_MODULE, DEFAULT_DENOM, FEE_COLLECTOR_MODULE},
    crypto::Address,
};

pub const DEFAULT_FUNDING: u128 = 100_000_000_000_000;
pub const DEFAULT_STAKE_PER_VALIDATOR: u128 = 1_000_000_000_000;

/// Output of [`GenesisBuilder::build`]: the state plus every identity used
/// to produce it. The identities hold secret keys.
#[derive(Debug, Clone)]
pub struct GenesisOutput {
    pub state: GenesisState,
    pub chain: ChainConfig,
    pub denom: String,
    pub primary: TestIdentity,
    pub validators: Vec<ValidatorIdentity>,
}

impl GenesisOutput {
    pub fn fee_collector(&self) -> Address {
        Address::from_module_name(FEE_COLLECTOR_MODULE)
    }

    pub fn bonded_pool(&self) -> Address {
        Address::from_module_name(BONDED_POOL_MODULE)
    }
}

/// Deterministic genesis construction.
///
/// Validator stakes are moved from the primary account into the bonded pool
/// module account, so the declared supply is always
/// `primary_funding + fee_collector_funding`.
pub struct GenesisBuilder {
    chain: ChainConfig,
    denom: String,
    primary_funding: u128,
    fee_collector_funding: u128,
    stake_per_validator: u128,
    primary: Option<TestIdentity>,
    validators: Vec<ValidatorIdentity>,
}

impl GenesisBuilder {
    pub fn new(chain: ChainConfig) -> Self {
        Self {
            chain,
            denom: DEFAULT_DENOM.to_string(),
            primary_funding: DEFAULT_FUNDING,
            fee_collector_funding: DEFAULT_FUNDING,
            stake_per_validator: DEFAULT_STAKE_PER_VALIDATOR,
            primary: None,
            validators: Vec::new(),
        }
    }

    pub fn with_denom(mut self, denom: impl Into<String>) -> Self {
        self.denom = denom.into();
        self
    }

    pub fn with_primary_funding(mut self, amount: u128) -> Self {
        self.primary_funding = amount;
        self
    }

    pub fn with_fee_collector_funding(mut self, amount: u128) -> Self {
        self.fee_collector_funding = amount;
        self
    }

    pub fn with_stake_per_validator(mut self, amount: u128) -> Self {
        self.stake_per_validator = amount;
        self
    }

    pub fn with_primary(mut self, identity: TestIdentity) -> Self {
        self.primary = Some(identity);
        self
    }

    pub fn with_validator(mut self, validator: ValidatorIdentity) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn with_generated_validators(mut self, count: usize) -> Self {
        let offset = self.validators.len();
        self.validators
            .extend((0..count).map(|i| ValidatorIdentity::random(format!("node{}", offset + i))));
        self
    }

    // Same seed, same validator keys
    pub fn with_seeded_validators(mut self, count: usize, seed: u64) -> Self {
        let offset = self.validators.len();
        self.validators
            .extend((offset..offset + count).map(|index| ValidatorIdentity::seeded(seed, index)));
        self
    }

    pub fn build(self) -> Result<GenesisOutput, GenesisError> {
        let total_stake = self
            .stake_per_validator
            .checked_mul(self.validators.len() as u128)
            .ok_or(GenesisError::Overflow("total stake"))?;
        if total_stake > self.primary_funding {
            return Err(GenesisError::InsufficientFunding {
                required: total_stake,
                available: self.primary_funding,
            });
        }
        let supply = self
            .primary_funding
            .checked_add(self.fee_collector_funding)
            .ok_or(GenesisError::Overflow("total supply"))?;

        let primary = self.primary.unwrap_or_else(TestIdentity::random);
        let prefixes = &self.chain.bech32;
        let fee_collector = Address::from_module_name(FEE_COLLECTOR_MODULE);
        let bonded_pool = Address::from_module_name(BONDED_POOL_MODULE);

        // auth: primary, validator operators, then module accounts
        let mut auth = AuthGenesis::default();
        auth.accounts.push(GenesisAccount {
            address: primary.address(),
            bech32: primary.bech32(&self.chain)?,
            ..Default::default()
        });
        for validator in &self.validators {
            let operator = validator.operator_address();
            if auth.accounts.iter().any(|account| account.address == operator) {
                continue;
            }
            auth.accounts.push(GenesisAccount {
                address: operator,
                bech32: operator.to_bech32(&prefixes.account)?,
                ..Default::default()
            });
        }
        for (name, address) in [
            (FEE_COLLECTOR_MODULE, fee_collector),
            (BONDED_POOL_MODULE, bonded_pool),
        ] {
            auth.accounts.push(GenesisAccount {
                address,
                bech32: address.to_bech32(&prefixes.account)?,
                module: Some(name.to_string()),
                ..Default::default()
            });
        }

        // bank
        let mut balances = vec![
            BankBalance {
                address: primary.address(),
                coins: vec![Coin::new(&self.denom, self.primary_funding - total_stake)],
            },
            BankBalance {
                address: fee_collector,
                coins: vec![Coin::new(&self.denom, self.fee_collector_funding)],
            },
        ];
        if total_stake > 0 {
            balances.push(BankBalance {
                address: bonded_pool,
                coins: vec![Coin::new(&self.denom, total_stake)],
            });
        }
        let bank = BankGenesis {
            params: BankParams::default(),
            balances,
            supply: vec![Coin::new(&self.denom, supply)],
            denom_metadata: vec![DenomMetadata {
                base: self.denom.clone(),
                display: self.denom.trim_start_matches('a').to_string(),
                exponent: 18,
            }],
        };

        // staking
        let power = (self.stake_per_validator / POWER_REDUCTION).min(u64::MAX as u128) as u64;
        let mut staking = StakingGenesis {
            params: StakingParams {
                bond_denom: self.denom.clone(),
                ..Default::default()
            },
            ..Default::default()
        };
        for validator in &self.validators {
            let operator = validator.operator_address();
            let consensus = validator.consensus_address();
            staking.validators.push(GenesisValidator {
                operator_address: operator,
                operator_bech32: operator.to_bech32(&prefixes.validator_operator)?,
                consensus_address: consensus,
                consensus_bech32: consensus.to_bech32(&prefixes.validator_consensus)?,
                consensus_pubkey: hex::encode(validator.consensus_key().public_key_compressed()),
                tokens: self.stake_per_validator,
                power,
                moniker: validator.moniker().to_string(),
            });
            staking.last_total_power = staking.last_total_power.saturating_add(power);
        }

        let evm = EvmGenesis {
            params: EvmParams {
                evm_denom: self.denom.clone(),
                chain_id: self.chain.evm_chain_id,
                ..Default::default()
            },
            contracts: Vec::new(),
        };

        let mut state = GenesisState::new();
        state.insert_module(AUTH_MODULE, &auth)?;
        state.insert_module(BANK_MODULE, &bank)?;
        state.insert_module(STAKING_MODULE, &staking)?;
        state.insert_module(EVM_MODULE, &evm)?;
        state.validate()?;

        if log::log_enabled!(log::Level::Info) {
            info!(
                "Built genesis for {} with {} validator(s), supply {}{}",
                self.chain.chain_id,
                self.validators.len(),
                supply,
                self.denom
            );
        }
        if log::log_enabled!(log::Level::Debug) {
            debug!("Primary account: {}", primary.address());
            for validator in &self.validators {
                debug!(
                    "Validator {}: operator {} consensus {}",
                    validator.moniker(),
                    validator.operator_address(),
                    validator.consensus_address()
                );
            }
        }

        Ok(GenesisOutput {
            state,
            chain: self.chain,
            denom: self.denom,
            primary,
            validators: self.validators,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vela_common::crypto::KeyPair;

    #[test]
    fn test_stake_moves_into_bonded_pool() {
        let output = GenesisBuilder::new(ChainConfig::default())
            .with_seeded_validators(2, 7)
            .build()
            .unwrap();

        let bank: BankGenesis = output.state.module(BANK_MODULE).unwrap();
        assert_eq!(
            bank.balance_of(&output.primary.address(), DEFAULT_DENOM),
            DEFAULT_FUNDING - 2 * DEFAULT_STAKE_PER_VALIDATOR
        );
        assert_eq!(
            bank.balance_of(&output.bonded_pool(), DEFAULT_DENOM),
            2 * DEFAULT_STAKE_PER_VALIDATOR
        );
        assert_eq!(
            bank.balance_of(&output.fee_collector(), DEFAULT_DENOM),
            DEFAULT_FUNDING
        );
    }

    #[test]
    fn test_operator_account_not_duplicated() {
        let primary = TestIdentity::from_seed(3);
        let validator = ValidatorIdentity::new(primary.clone(), KeyPair::from_seed(4), "solo");
        let output = GenesisBuilder::new(ChainConfig::default())
            .with_primary(primary.clone())
            .with_validator(validator)
            .build()
            .unwrap();

        let auth: AuthGenesis = output.state.module(AUTH_MODULE).unwrap();
        let matching = auth
            .accounts
            .iter()
            .filter(|account| account.address == primary.address())
            .count();
        assert_eq!(matching, 1);
        // primary + two module accounts
        assert_eq!(auth.accounts.len(), 3);
    }

    #[test]
    fn test_stake_exceeding_funding() {
        let err = GenesisBuilder::new(ChainConfig::default())
            .with_primary_funding(10)
            .with_stake_per_validator(6)
            .with_seeded_validators(2, 1)
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            GenesisError::InsufficientFunding {
                required: 12,
                available: 10
            }
        ));
    }

    #[test]
    fn test_supply_overflow() {
        let err = GenesisBuilder::new(ChainConfig::default())
            .with_primary_funding(u128::MAX)
            .with_fee_collector_funding(1)
            .build()
            .unwrap_err();
        assert!(matches!(err, GenesisError::Overflow(_)));
    }

    #[test]
    fn test_zero_stake_validator_rejected() {
        let err = GenesisBuilder::new(ChainConfig::default())
            .with_stake_per_validator(0)
            .with_seeded_validators(1, 9)
            .build()
            .unwrap_err();
        assert!(matches!(err, GenesisError::UnbondedValidator(_)));
    }
}

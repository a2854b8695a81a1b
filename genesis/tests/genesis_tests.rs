use proptest::prelude::*;
use vela_common::config::{ChainConfig, DEFAULT_DENOM};
use vela_genesis::{
    modules::{BankGenesis, Coin, StakingGenesis, BANK_MODULE, STAKING_MODULE},
    GenesisBuilder, GenesisError, GenesisState,
};

#[test]
fn test_default_funding_supply() {
    let output = GenesisBuilder::new(ChainConfig::default())
        .with_primary_funding(100_000_000_000_000)
        .with_fee_collector_funding(100_000_000_000_000)
        .with_seeded_validators(4, 1)
        .build()
        .unwrap();

    assert_eq!(
        output.state.total_supply(DEFAULT_DENOM).unwrap(),
        200_000_000_000_000
    );

    let bank: BankGenesis = output.state.module(BANK_MODULE).unwrap();
    let sum: u128 = bank
        .balances
        .iter()
        .flat_map(|b| b.coins.iter())
        .map(|c| c.amount)
        .sum();
    assert_eq!(sum, 200_000_000_000_000);
}

#[test]
fn test_staking_records_bech32() {
    let chain = ChainConfig::default();
    let output = GenesisBuilder::new(chain.clone())
        .with_seeded_validators(2, 11)
        .build()
        .unwrap();

    let staking: StakingGenesis = output.state.module(STAKING_MODULE).unwrap();
    assert_eq!(staking.validators.len(), 2);
    for (validator, identity) in staking.validators.iter().zip(&output.validators) {
        assert!(validator.operator_bech32.starts_with("velavaloper1"));
        assert!(validator.consensus_bech32.starts_with("velavalcons1"));
        assert_eq!(validator.consensus_address, identity.consensus_address());
        assert_eq!(validator.power, 1_000_000);
    }
    assert_eq!(staking.last_total_power, 2_000_000);
}

#[test]
fn test_json_document() {
    let output = GenesisBuilder::new(ChainConfig::default())
        .with_seeded_validators(1, 5)
        .build()
        .unwrap();

    let bytes = output.state.to_json_bytes().unwrap();
    let text = std::str::from_utf8(&bytes).unwrap();
    assert!(text.starts_with("{\n \"auth\""));

    let decoded = GenesisState::from_json_bytes(&bytes).unwrap();
    assert_eq!(decoded, output.state);
    let modules: Vec<&str> = decoded.modules().collect();
    assert_eq!(modules, vec!["auth", "bank", "staking", "evm"]);
}

#[test]
fn test_validate_detects_tampered_supply() {
    let output = GenesisBuilder::new(ChainConfig::default())
        .with_seeded_validators(1, 5)
        .build()
        .unwrap();

    let mut state = output.state.clone();
    let mut bank: BankGenesis = state.module(BANK_MODULE).unwrap();
    bank.supply = vec![Coin::new(DEFAULT_DENOM, 1)];
    state.insert_module(BANK_MODULE, &bank).unwrap();

    assert!(matches!(
        state.validate(),
        Err(GenesisError::SupplyMismatch { declared: 1, .. })
    ));
}

#[test]
fn test_validate_detects_undeclared_denom() {
    let output = GenesisBuilder::new(ChainConfig::default()).build().unwrap();

    let mut state = output.state.clone();
    let mut bank: BankGenesis = state.module(BANK_MODULE).unwrap();
    bank.balances[0].coins.push(Coin::new("uother", 5));
    state.insert_module(BANK_MODULE, &bank).unwrap();

    assert!(matches!(
        state.validate(),
        Err(GenesisError::SupplyMismatch { declared: 0, actual: 5, .. })
    ));
}

#[test]
fn test_validate_detects_pool_mismatch() {
    let output = GenesisBuilder::new(ChainConfig::default())
        .with_seeded_validators(2, 5)
        .build()
        .unwrap();

    let mut state = output.state.clone();
    let mut staking: StakingGenesis = state.module(STAKING_MODULE).unwrap();
    staking.validators.pop();
    state.insert_module(STAKING_MODULE, &staking).unwrap();

    assert!(matches!(
        state.validate(),
        Err(GenesisError::BondedPoolMismatch { .. })
    ));
}

#[test]
fn test_missing_module() {
    let state = GenesisState::new();
    assert!(matches!(
        state.validate(),
        Err(GenesisError::MissingModule(name)) if name == BANK_MODULE
    ));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_supply_is_funding_sum(
        primary in 0u128..1_000_000_000_000_000u128,
        fee in 0u128..1_000_000_000_000_000u128,
        validators in 0usize..5,
        stake in 1u128..1_000_000_000_000u128,
    ) {
        let result = GenesisBuilder::new(ChainConfig::default())
            .with_primary_funding(primary)
            .with_fee_collector_funding(fee)
            .with_stake_per_validator(stake)
            .with_seeded_validators(validators, 42)
            .build();

        if stake * validators as u128 > primary {
            let is_insufficient = matches!(result, Err(GenesisError::InsufficientFunding { .. }));
            prop_assert!(is_insufficient);
        } else {
            let output = result.unwrap();
            prop_assert_eq!(output.state.total_supply(DEFAULT_DENOM).unwrap(), primary + fee);
            prop_assert!(output.state.validate().is_ok());
        }
    }
}

//! Invariant checkers
//!
//! - Supply conservation: balances, module accounts included, sum to supply
//! - Validator registry: operator and consensus indexes agree
//! - Genesis: the document-level supply and staking rules
//! - Height monotonicity across observations

use thiserror::Error;
use vela_common::crypto::Address;
use vela_daemon::core::state::LedgerState;
use vela_genesis::GenesisState;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("balances sum to {balances:?} but supply is {supply}")]
    SupplyNotConserved {
        supply: u128,
        // None when the sum overflows
        balances: Option<u128>,
    },
    #[error("consensus address {consensus} is bound to {operator} which has no validator record")]
    DanglingConsensusBinding { consensus: Address, operator: Address },
    #[error("validator {operator} is not reachable through its consensus address {consensus}")]
    UnboundValidator { operator: Address, consensus: Address },
    #[error("invalid genesis: {0}")]
    Genesis(String),
    #[error("height went backwards from {previous} to {observed}")]
    HeightRegressed { previous: u64, observed: u64 },
}

pub fn check_supply_conservation(state: &LedgerState) -> Result<(), InvariantViolation> {
    let balances = state.total_balances();
    if balances != Some(state.supply()) {
        return Err(InvariantViolation::SupplyNotConserved {
            supply: state.supply(),
            balances,
        });
    }
    Ok(())
}

pub fn check_validator_registry(state: &LedgerState) -> Result<(), InvariantViolation> {
    for (consensus, operator) in state.consensus_bindings() {
        let bound = state
            .validator_by_operator(operator)
            .is_some_and(|validator| validator.consensus_address == *consensus);
        if !bound {
            return Err(InvariantViolation::DanglingConsensusBinding {
                consensus: *consensus,
                operator: *operator,
            });
        }
    }

    for validator in state.validators() {
        let reachable = state
            .validator_by_consensus_address(&validator.consensus_address)
            .is_some_and(|found| found.operator_address == validator.operator_address);
        if !reachable {
            return Err(InvariantViolation::UnboundValidator {
                operator: validator.operator_address,
                consensus: validator.consensus_address,
            });
        }
    }
    Ok(())
}

/// Every ledger level invariant
pub fn check_ledger(state: &LedgerState) -> Result<(), InvariantViolation> {
    check_supply_conservation(state)?;
    check_validator_registry(state)
}

pub fn check_genesis_invariants(genesis: &GenesisState) -> Result<(), InvariantViolation> {
    genesis
        .validate()
        .map_err(|err| InvariantViolation::Genesis(err.to_string()))
}

/// Asserts that successive height observations never decrease
#[derive(Debug, Default)]
pub struct HeightTracker {
    last: Option<u64>,
}

impl HeightTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, height: u64) -> Result<(), InvariantViolation> {
        if let Some(previous) = self.last {
            if height < previous {
                return Err(InvariantViolation::HeightRegressed {
                    previous,
                    observed: height,
                });
            }
        }
        self.last = Some(height);
        Ok(())
    }

    pub fn last(&self) -> Option<u64> {
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vela_common::config::ChainConfig;
    use vela_daemon::core::state::Validator;
    use vela_genesis::GenesisBuilder;

    fn ledger() -> LedgerState {
        let output = GenesisBuilder::new(ChainConfig::default())
            .with_seeded_validators(2, 5)
            .build()
            .unwrap();
        LedgerState::from_genesis(&output.state, &output.chain).unwrap()
    }

    #[test]
    fn test_genesis_ledger_holds() {
        let state = ledger();
        check_ledger(&state).unwrap();
    }

    #[test]
    fn test_supply_violation() {
        let mut state = ledger();
        state.credit(&Address::zero(), 1).unwrap();
        assert!(matches!(
            check_supply_conservation(&state),
            Err(InvariantViolation::SupplyNotConserved { .. })
        ));
    }

    #[test]
    fn test_dangling_binding() {
        let mut state = ledger();
        let validator = Validator {
            operator_address: Address::new([1; 20]),
            consensus_address: Address::new([2; 20]),
            consensus_pubkey: Vec::new(),
            tokens: 1,
            power: 0,
            moniker: "ghost".to_string(),
        };
        // Binding without the record
        state.set_validator_by_consensus_address(&validator).unwrap();
        assert!(matches!(
            check_validator_registry(&state),
            Err(InvariantViolation::DanglingConsensusBinding { .. })
        ));

        state.set_validator(validator).unwrap();
        check_validator_registry(&state).unwrap();
    }

    #[test]
    fn test_genesis_checked() {
        let output = GenesisBuilder::new(ChainConfig::default()).build().unwrap();
        check_genesis_invariants(&output.state).unwrap();
    }

    #[test]
    fn test_height_tracker() {
        let mut tracker = HeightTracker::new();
        tracker.observe(1).unwrap();
        tracker.observe(1).unwrap();
        tracker.observe(4).unwrap();
        assert_eq!(
            tracker.observe(3),
            Err(InvariantViolation::HeightRegressed {
                previous: 4,
                observed: 3
            })
        );
        assert_eq!(tracker.last(), Some(4));
    }
}

//! Transaction execution against the ledger.
//!
//! The handler does admission checks and fee, value and nonce bookkeeping.
//! Bytecode is stored but never interpreted.

use super::state::{LedgerState, StateError};
use log::trace;
use std::{
    fmt,
    sync::{Arc, OnceLock},
};
use thiserror::Error;
use vela_common::{
    config::{MAX_INIT_CODE_SIZE, TX_BASE_GAS, TX_CREATE_GAS, TX_DATA_NON_ZERO_GAS, TX_DATA_ZERO_GAS},
    crypto::{Address, Hash},
    transaction::{contract_address, Transaction},
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TxRejection {
    #[error("invalid or missing signature")]
    InvalidSignature,
    #[error("wrong chain id: expected {expected}, got {got}")]
    WrongChainId { expected: u64, got: u64 },
    #[error("negative value: {0}")]
    NegativeValue(i64),
    #[error("negative gas price: {0}")]
    NegativeGasPrice(i64),
    #[error("intrinsic gas too low: {limit} < {required}")]
    IntrinsicGasTooLow { required: u64, limit: u64 },
    #[error("gas limit {limit} exceeds block gas limit {block_limit}")]
    GasLimitExceedsBlock { limit: u64, block_limit: u64 },
    #[error("init code size {size} exceeds {max}")]
    CodeSizeExceeded { size: usize, max: usize },
    #[error("nonce too low: expected {expected}, got {got}")]
    NonceTooLow { expected: u64, got: u64 },
    #[error("nonce too high: expected {expected}, got {got}")]
    NonceTooHigh { expected: u64, got: u64 },
    #[error("insufficient funds: balance {balance}, cost {cost}")]
    InsufficientFunds { balance: u128, cost: u128 },
    #[error("contract already deployed at {0}")]
    ContractCollision(Address),
    #[error(transparent)]
    State(#[from] StateError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub hash: Hash,
    pub sender: Address,
    pub nonce: u64,
    // Set for contract creations
    pub contract_address: Option<Address>,
    pub gas_used: u64,
    pub fee: u128,
}

/// Executes one transaction against the ledger.
///
/// A rejection must leave the state untouched and no input may panic.
pub trait TransactionHandler: Send + Sync {
    fn submit(&self, tx: &Transaction, state: &mut LedgerState) -> Result<TxReceipt, TxRejection>;
}

/// Cloneable handle on the handler a ledger runs with.
/// Defaults to one process-wide [`EvmHandler`]; equality is identity.
#[derive(Clone)]
pub struct SharedHandler(Arc<dyn TransactionHandler>);

impl SharedHandler {
    pub fn new(handler: impl TransactionHandler + 'static) -> Self {
        Self(Arc::new(handler))
    }

    pub fn from_arc(handler: Arc<dyn TransactionHandler>) -> Self {
        Self(handler)
    }

    pub fn handler(&self) -> Arc<dyn TransactionHandler> {
        self.0.clone()
    }
}

impl Default for SharedHandler {
    fn default() -> Self {
        static EVM: OnceLock<SharedHandler> = OnceLock::new();
        EVM.get_or_init(|| SharedHandler::new(EvmHandler)).clone()
    }
}

impl PartialEq for SharedHandler {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for SharedHandler {}

impl fmt::Debug for SharedHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedHandler(..)")
    }
}

// 21000 + 32000 for creation + 4 per zero byte + 16 per non zero byte
pub fn intrinsic_gas(tx: &Transaction) -> u64 {
    let zeros = tx.payload.iter().filter(|byte| **byte == 0).count() as u64;
    let non_zeros = tx.payload.len() as u64 - zeros;

    let mut gas = TX_BASE_GAS;
    if tx.is_contract_creation() {
        gas += TX_CREATE_GAS;
    }
    gas.saturating_add(zeros.saturating_mul(TX_DATA_ZERO_GAS))
        .saturating_add(non_zeros.saturating_mul(TX_DATA_NON_ZERO_GAS))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EvmHandler;

impl EvmHandler {
    pub fn new() -> Self {
        Self
    }

    // Checks in order, nothing is mutated here
    fn verify(&self, tx: &Transaction, state: &LedgerState) -> Result<Checked, TxRejection> {
        let sender = tx
            .recover_sender()
            .map_err(|_| TxRejection::InvalidSignature)?;

        if tx.chain_id != state.evm_chain_id() {
            return Err(TxRejection::WrongChainId {
                expected: state.evm_chain_id(),
                got: tx.chain_id,
            });
        }

        let value = u128::try_from(tx.value).map_err(|_| TxRejection::NegativeValue(tx.value))?;
        let gas_price =
            u128::try_from(tx.gas_price).map_err(|_| TxRejection::NegativeGasPrice(tx.gas_price))?;

        let gas_used = intrinsic_gas(tx);
        if tx.gas_limit < gas_used {
            return Err(TxRejection::IntrinsicGasTooLow {
                required: gas_used,
                limit: tx.gas_limit,
            });
        }
        if tx.gas_limit > state.block_gas_limit() {
            return Err(TxRejection::GasLimitExceedsBlock {
                limit: tx.gas_limit,
                block_limit: state.block_gas_limit(),
            });
        }

        if tx.is_contract_creation() && tx.payload.len() > MAX_INIT_CODE_SIZE {
            return Err(TxRejection::CodeSizeExceeded {
                size: tx.payload.len(),
                max: MAX_INIT_CODE_SIZE,
            });
        }

        let expected = state.nonce(&sender);
        if tx.nonce < expected {
            return Err(TxRejection::NonceTooLow {
                expected,
                got: tx.nonce,
            });
        }
        if tx.nonce > expected {
            return Err(TxRejection::NonceTooHigh {
                expected,
                got: tx.nonce,
            });
        }

        let balance = state.balance(&sender);
        let cost = (tx.gas_limit as u128)
            .checked_mul(gas_price)
            .and_then(|gas_cost| gas_cost.checked_add(value));
        match cost {
            Some(cost) if cost <= balance => {}
            cost => {
                return Err(TxRejection::InsufficientFunds {
                    balance,
                    cost: cost.unwrap_or(u128::MAX),
                })
            }
        }

        let recipient = match tx.to {
            Some(to) => to,
            None => {
                let address = contract_address(&sender, tx.nonce);
                if state.has_code(&address) {
                    return Err(TxRejection::ContractCollision(address));
                }
                address
            }
        };

        Ok(Checked {
            sender,
            recipient,
            value,
            gas_used,
            // cannot overflow: gas_used <= gas_limit
            fee: gas_used as u128 * gas_price,
        })
    }
}

struct Checked {
    sender: Address,
    recipient: Address,
    value: u128,
    gas_used: u64,
    fee: u128,
}

impl TransactionHandler for EvmHandler {
    fn submit(&self, tx: &Transaction, state: &mut LedgerState) -> Result<TxReceipt, TxRejection> {
        let checked = self.verify(tx, state)?;

        // Work on a copy so a failure in the middle leaves the ledger as is
        let mut next = state.clone();
        let fee_collector = next.fee_collector();
        next.transfer(&checked.sender, &fee_collector, checked.fee)?;
        next.transfer(&checked.sender, &checked.recipient, checked.value)?;
        if tx.is_contract_creation() && !tx.payload.is_empty() {
            next.install_code(checked.recipient, tx.payload.clone());
        }
        next.increment_nonce(&checked.sender)?;
        *state = next;

        let receipt = TxReceipt {
            hash: tx.hash(),
            sender: checked.sender,
            nonce: tx.nonce,
            contract_address: tx.is_contract_creation().then_some(checked.recipient),
            gas_used: checked.gas_used,
            fee: checked.fee,
        };

        if log::log_enabled!(log::Level::Trace) {
            trace!(
                "Executed tx {} from {} (nonce {}, gas {})",
                receipt.hash,
                receipt.sender,
                receipt.nonce,
                receipt.gas_used
            );
        }

        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vela_common::{config::ChainConfig, crypto::KeyPair};

    const FUNDS: u128 = 1_000_000_000_000;

    fn setup() -> (LedgerState, KeyPair) {
        let key = KeyPair::from_seed(1);
        let mut state = LedgerState::new(&ChainConfig::default(), "avela");
        state.credit(&key.address(), FUNDS).unwrap();
        (state, key)
    }

    fn create(nonce: u64, value: i64, gas_price: i64, code: Vec<u8>) -> Transaction {
        Transaction::new_contract(9000, nonce, value, 100_000, gas_price, code)
    }

    #[test]
    fn test_intrinsic_gas() {
        let call = Transaction::new_call(9000, 0, Address::zero(), 0, 0, 0, vec![0, 1, 0, 2]);
        assert_eq!(intrinsic_gas(&call), 21_000 + 2 * 4 + 2 * 16);
        assert_eq!(intrinsic_gas(&create(0, 0, 0, Vec::new())), 53_000);
    }

    #[test]
    fn test_contract_creation() {
        let (mut state, key) = setup();
        let tx = create(0, 10, 2, vec![0x60, 0x80]).signed(&key);

        let receipt = EvmHandler.submit(&tx, &mut state).unwrap();
        let contract = contract_address(&key.address(), 0);
        assert_eq!(receipt.contract_address, Some(contract));
        assert_eq!(receipt.fee, receipt.gas_used as u128 * 2);
        assert_eq!(state.code(&contract), Some(&[0x60, 0x80][..]));
        assert_eq!(state.balance(&contract), 10);
        assert_eq!(state.balance(&state.fee_collector()), receipt.fee);
        assert_eq!(state.nonce(&key.address()), 1);
        assert_eq!(state.total_balances(), Some(FUNDS));
    }

    #[test]
    fn test_check_order() {
        let (mut state, key) = setup();

        let unsigned = create(0, 0, 0, Vec::new());
        assert_eq!(
            EvmHandler.submit(&unsigned, &mut state),
            Err(TxRejection::InvalidSignature)
        );

        let mut wrong_chain = create(0, -1, 0, Vec::new());
        wrong_chain.chain_id = 1;
        assert!(matches!(
            EvmHandler.submit(&wrong_chain.signed(&key), &mut state),
            Err(TxRejection::WrongChainId { expected: 9000, got: 1 })
        ));

        let negative = create(0, -1, -1, Vec::new()).signed(&key);
        assert_eq!(
            EvmHandler.submit(&negative, &mut state),
            Err(TxRejection::NegativeValue(-1))
        );

        let negative_price = create(0, 0, -1, Vec::new()).signed(&key);
        assert_eq!(
            EvmHandler.submit(&negative_price, &mut state),
            Err(TxRejection::NegativeGasPrice(-1))
        );

        let mut low_gas = create(7, 0, 0, Vec::new());
        low_gas.gas_limit = 0;
        assert!(matches!(
            EvmHandler.submit(&low_gas.signed(&key), &mut state),
            Err(TxRejection::IntrinsicGasTooLow { required: 53_000, limit: 0 })
        ));

        let mut too_much_gas = create(7, 0, 0, Vec::new());
        too_much_gas.gas_limit = u64::MAX;
        assert!(matches!(
            EvmHandler.submit(&too_much_gas.signed(&key), &mut state),
            Err(TxRejection::GasLimitExceedsBlock { .. })
        ));

        let mut big = create(7, 0, 0, vec![1; MAX_INIT_CODE_SIZE + 1]);
        big.gas_limit = 10_000_000;
        assert!(matches!(
            EvmHandler.submit(&big.signed(&key), &mut state),
            Err(TxRejection::CodeSizeExceeded { .. })
        ));

        let future = create(7, 0, 0, Vec::new()).signed(&key);
        assert_eq!(
            EvmHandler.submit(&future, &mut state),
            Err(TxRejection::NonceTooHigh { expected: 0, got: 7 })
        );

        let expensive = create(0, i64::MAX, 0, Vec::new()).signed(&key);
        assert!(matches!(
            EvmHandler.submit(&expensive, &mut state),
            Err(TxRejection::InsufficientFunds { .. })
        ));

        // nothing above touched the ledger
        assert_eq!(state.nonce(&key.address()), 0);
        assert_eq!(state.balance(&key.address()), FUNDS);
    }

    #[test]
    fn test_replay_rejected() {
        let (mut state, key) = setup();
        let tx = create(0, 0, 1, Vec::new()).signed(&key);
        EvmHandler.submit(&tx, &mut state).unwrap();
        assert_eq!(
            EvmHandler.submit(&tx, &mut state),
            Err(TxRejection::NonceTooLow { expected: 1, got: 0 })
        );
    }

    #[test]
    fn test_contract_collision() {
        let (mut state, key) = setup();
        state.install_code(contract_address(&key.address(), 0), vec![1]);
        let tx = create(0, 0, 0, vec![2]).signed(&key);
        assert!(matches!(
            EvmHandler.submit(&tx, &mut state),
            Err(TxRejection::ContractCollision(_))
        ));
    }

    #[test]
    fn test_call_moves_value() {
        let (mut state, key) = setup();
        let to = Address::new([5; 20]);
        let tx = Transaction::new_call(9000, 0, to, 25, 21_000, 0, Vec::new()).signed(&key);
        let receipt = EvmHandler.submit(&tx, &mut state).unwrap();
        assert_eq!(receipt.contract_address, None);
        assert_eq!(receipt.fee, 0);
        assert_eq!(state.balance(&to), 25);
        assert_eq!(state.balance(&key.address()), FUNDS - 25);
    }

    #[test]
    fn test_shared_handler_identity() {
        assert_eq!(SharedHandler::default(), SharedHandler::default());
        let custom = SharedHandler::new(EvmHandler);
        assert_ne!(custom, SharedHandler::default());
        assert_eq!(custom.clone(), custom);
    }
}

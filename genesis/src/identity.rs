use vela_common::{
    config::ChainConfig,
    crypto::{Address, CryptoError, KeyPair},
    transaction::Transaction,
};

// Mixed into seeds so a validator's consensus key differs from its operator key
const CONSENSUS_SEED_TWEAK: u64 = 0x636f_6e73_656e_7375;

/// Address plus signing capability of a test account.
///
/// Identities are handed out by the genesis builder and passed explicitly to
/// whatever needs to sign, they never live in shared state.
#[derive(Clone, Debug)]
pub struct TestIdentity {
    key: KeyPair,
    address: Address,
}

impl TestIdentity {
    pub fn new(key: KeyPair) -> Self {
        let address = key.address();
        Self { key, address }
    }

    pub fn random() -> Self {
        Self::new(KeyPair::new())
    }

    pub fn from_seed(seed: u64) -> Self {
        Self::new(KeyPair::from_seed(seed))
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn key(&self) -> &KeyPair {
        &self.key
    }

    pub fn bech32(&self, chain: &ChainConfig) -> Result<String, CryptoError> {
        self.address.to_bech32(&chain.bech32.account)
    }

    pub fn sign(&self, tx: Transaction) -> Transaction {
        tx.signed(&self.key)
    }
}

/// A validator: operator account plus a distinct consensus key
#[derive(Clone, Debug)]
pub struct ValidatorIdentity {
    operator: TestIdentity,
    consensus_key: KeyPair,
    moniker: String,
}

impl ValidatorIdentity {
    pub fn new(operator: TestIdentity, consensus_key: KeyPair, moniker: impl Into<String>) -> Self {
        Self {
            operator,
            consensus_key,
            moniker: moniker.into(),
        }
    }

    pub fn random(moniker: impl Into<String>) -> Self {
        Self::new(TestIdentity::random(), KeyPair::new(), moniker)
    }

    pub fn from_seed(seed: u64, moniker: impl Into<String>) -> Self {
        Self::new(
            TestIdentity::from_seed(seed),
            KeyPair::from_seed(seed ^ CONSENSUS_SEED_TWEAK),
            moniker,
        )
    }

    /// Validator `index` of a seeded set, named `node<index>`
    pub fn seeded(seed: u64, index: usize) -> Self {
        Self::from_seed(
            seed.wrapping_add(index as u64 + 1),
            format!("node{}", index),
        )
    }

    pub fn operator(&self) -> &TestIdentity {
        &self.operator
    }

    pub fn operator_address(&self) -> Address {
        self.operator.address()
    }

    pub fn consensus_key(&self) -> &KeyPair {
        &self.consensus_key
    }

    pub fn consensus_address(&self) -> Address {
        self.consensus_key.address()
    }

    pub fn moniker(&self) -> &str {
        &self.moniker
    }
}

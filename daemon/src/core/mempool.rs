use indexmap::IndexMap;
use std::sync::Arc;
use vela_common::{crypto::Hash, transaction::Transaction};

pub const DEFAULT_MEMPOOL_CAPACITY: usize = 10_000;

/// Pending transactions in arrival order.
///
/// Admission checks happen in the blockchain, the mempool only stores.
pub struct Mempool {
    txs: IndexMap<Hash, Arc<Transaction>>,
    capacity: usize,
}

impl Mempool {
    pub fn new(capacity: usize) -> Self {
        Self {
            txs: IndexMap::new(),
            capacity,
        }
    }

    pub fn size(&self) -> usize {
        self.txs.len()
    }

    pub fn is_full(&self) -> bool {
        self.txs.len() >= self.capacity
    }

    pub fn contains_tx(&self, hash: &Hash) -> bool {
        self.txs.contains_key(hash)
    }

    // Returns false if the transaction was already present
    pub fn add_tx(&mut self, hash: Hash, tx: Arc<Transaction>) -> bool {
        if self.txs.contains_key(&hash) {
            return false;
        }
        self.txs.insert(hash, tx);
        true
    }

    // Oldest first, transactions stay in the mempool until included
    pub fn select(&self, max: usize) -> Vec<Arc<Transaction>> {
        self.txs.values().take(max).cloned().collect()
    }

    pub fn remove_tx(&mut self, hash: &Hash) -> Option<Arc<Transaction>> {
        self.txs.shift_remove(hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(nonce: u64) -> Arc<Transaction> {
        Arc::new(Transaction::new_contract(9000, nonce, 0, 0, 0, Vec::new()))
    }

    #[test]
    fn test_selection_keeps_arrival_order() {
        let mut mempool = Mempool::new(3);
        for nonce in 0..3 {
            let tx = tx(nonce);
            assert!(mempool.add_tx(tx.hash(), tx));
        }
        assert!(mempool.is_full());

        let selected = mempool.select(2);
        assert_eq!(
            selected.iter().map(|tx| tx.nonce).collect::<Vec<_>>(),
            vec![0, 1]
        );

        let first = selected[0].hash();
        assert!(!mempool.add_tx(first, selected[0].clone()));
        assert!(mempool.remove_tx(&first).is_some());
        assert_eq!(mempool.select(5)[0].nonce, 1);
    }
}

//! In-process block log shared by every node of one local network.
//!
//! There is a single round per height: the proposer of height `h` is
//! `validators[(h - 1) % n]` and the first proposal at the next height wins.
//! Nodes follow the log and apply blocks in order.

use crate::core::block::Block;
use log::debug;
use parking_lot::RwLock;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{futures::Notified, Notify};
use vela_common::crypto::{Address, Hash};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConsensusError {
    #[error("validator set is empty")]
    NoValidators,
    #[error("stale proposal at height {height}, next height is {expected}")]
    StaleProposal { height: u64, expected: u64 },
    #[error("{got} is not the proposer of height {height}, expected {expected}")]
    WrongProposer {
        height: u64,
        expected: Address,
        got: Address,
    },
    #[error("proposal does not extend the top block {expected}")]
    UnknownParent { expected: Hash },
}

pub struct LocalConsensus {
    validators: Vec<Address>,
    blocks: RwLock<Vec<Arc<Block>>>,
    notify: Notify,
}

impl LocalConsensus {
    // Validators are consensus addresses in proposer order
    pub fn new(validators: Vec<Address>) -> Result<Self, ConsensusError> {
        if validators.is_empty() {
            return Err(ConsensusError::NoValidators);
        }
        Ok(Self {
            validators,
            blocks: RwLock::new(Vec::new()),
            notify: Notify::new(),
        })
    }

    pub fn validators(&self) -> &[Address] {
        &self.validators
    }

    pub fn proposer_for(&self, height: u64) -> Option<Address> {
        let index = height.checked_sub(1)? % self.validators.len() as u64;
        self.validators.get(index as usize).copied()
    }

    pub fn height(&self) -> u64 {
        self.blocks.read().len() as u64
    }

    pub fn block_at(&self, height: u64) -> Option<Arc<Block>> {
        let index = height.checked_sub(1)?;
        self.blocks.read().get(index as usize).cloned()
    }

    // Committed blocks above `height`, in order
    pub fn blocks_after(&self, height: u64) -> Vec<Arc<Block>> {
        let blocks = self.blocks.read();
        blocks
            .get(height as usize..)
            .map(<[Arc<Block>]>::to_vec)
            .unwrap_or_default()
    }

    /// Append a block if it is the next one and comes from the expected proposer.
    /// Every follower waiting on [`LocalConsensus::notified`] is woken up.
    pub fn propose(&self, block: Block) -> Result<Arc<Block>, ConsensusError> {
        let mut blocks = self.blocks.write();
        let expected = blocks.len() as u64 + 1;
        if block.height() != expected {
            return Err(ConsensusError::StaleProposal {
                height: block.height(),
                expected,
            });
        }

        let proposer = self
            .proposer_for(expected)
            .ok_or(ConsensusError::NoValidators)?;
        if block.header().proposer != proposer {
            return Err(ConsensusError::WrongProposer {
                height: expected,
                expected: proposer,
                got: block.header().proposer,
            });
        }

        if let Some(top) = blocks.last() {
            let top_hash = top.hash();
            if block.header().previous != top_hash {
                return Err(ConsensusError::UnknownParent { expected: top_hash });
            }
        }

        let block = Arc::new(block);
        blocks.push(block.clone());
        drop(blocks);

        if log::log_enabled!(log::Level::Debug) {
            debug!("Committed block {} at height {}", block.hash(), expected);
        }
        self.notify.notify_waiters();
        Ok(block)
    }

    /// Resolves on the next commit. Create it before checking the log to not
    /// miss a commit in between.
    pub fn notified(&self) -> Notified<'_> {
        self.notify.notified()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validators() -> Vec<Address> {
        (1..=3).map(|i| Address::new([i; 20])).collect()
    }

    #[test]
    fn test_round_robin_proposer() {
        let consensus = LocalConsensus::new(validators()).unwrap();
        assert_eq!(consensus.proposer_for(0), None);
        assert_eq!(consensus.proposer_for(1), Some(Address::new([1; 20])));
        assert_eq!(consensus.proposer_for(3), Some(Address::new([3; 20])));
        assert_eq!(consensus.proposer_for(4), Some(Address::new([1; 20])));
    }

    #[test]
    fn test_proposals() {
        let consensus = LocalConsensus::new(validators()).unwrap();
        let first = Block::new(1, Hash::zero(), Address::new([1; 20]), 0, Vec::new());
        let first = consensus.propose(first).unwrap();

        // second proposal at the same height loses
        let again = Block::new(1, Hash::zero(), Address::new([1; 20]), 1, Vec::new());
        assert_eq!(
            consensus.propose(again),
            Err(ConsensusError::StaleProposal {
                height: 1,
                expected: 2
            })
        );

        let wrong = Block::new(2, first.hash(), Address::new([3; 20]), 1, Vec::new());
        assert!(matches!(
            consensus.propose(wrong),
            Err(ConsensusError::WrongProposer { .. })
        ));

        let orphan = Block::new(2, Hash::zero(), Address::new([2; 20]), 1, Vec::new());
        assert!(matches!(
            consensus.propose(orphan),
            Err(ConsensusError::UnknownParent { .. })
        ));

        let second = Block::new(2, first.hash(), Address::new([2; 20]), 1, Vec::new());
        consensus.propose(second).unwrap();
        assert_eq!(consensus.height(), 2);
        assert_eq!(consensus.blocks_after(1).len(), 1);
        assert!(consensus.blocks_after(5).is_empty());
        assert_eq!(consensus.block_at(1), Some(first));
    }

    #[test]
    fn test_empty_validator_set() {
        assert!(matches!(
            LocalConsensus::new(Vec::new()),
            Err(ConsensusError::NoValidators)
        ));
    }

    #[tokio::test]
    async fn test_commit_wakes_followers() {
        let consensus = Arc::new(LocalConsensus::new(validators()).unwrap());
        let notified = consensus.notified();
        let block = Block::new(1, Hash::zero(), Address::new([1; 20]), 0, Vec::new());
        consensus.propose(block).unwrap();
        tokio::time::timeout(std::time::Duration::from_secs(1), notified)
            .await
            .unwrap();
    }
}

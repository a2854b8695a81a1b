use crate::invariants::InvariantViolation;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the harness and the fuzz drivers.
///
/// Transaction rejections are not errors: drivers record them in their
/// reports. Undecodable fuzz input is reported as a discarded case.
#[derive(Error, Debug)]
pub enum HarnessError {
    /// Building the genesis, the ledger or a client failed
    #[error("setup failed during {stage}: {source:#}")]
    Setup {
        /// What was being set up
        stage: &'static str,
        /// Underlying failure
        #[source]
        source: anyhow::Error,
    },
    /// The network did not come up
    #[error("network startup failed: {0:#}")]
    Startup(anyhow::Error),
    /// A bounded height wait expired
    #[error("timeout waiting for height {target}: last height {last_height} after {elapsed:?}")]
    Timeout {
        /// Requested height
        target: u64,
        /// Last minimum height observed before giving up
        last_height: u64,
        /// Time spent waiting
        elapsed: Duration,
    },
    /// The harness is tearing down or stopped
    #[error("harness stopped")]
    Stopped,
    /// The harness is still starting
    #[error("harness is not live yet")]
    NotLive,
    /// A node RPC call failed
    #[error("RPC error: {0:#}")]
    Rpc(anyhow::Error),
    /// The network stopped making progress
    #[error("liveness violated: expected height >= {expected}, observed {observed}")]
    Liveness {
        /// Height the network should have reached
        expected: u64,
        /// Height actually reported
        observed: u64,
    },
    /// A ledger, genesis or height invariant broke
    #[error("invariant violated: {0}")]
    Invariant(#[from] InvariantViolation),
}

impl HarnessError {
    pub(crate) fn setup(stage: &'static str, source: impl Into<anyhow::Error>) -> Self {
        Self::Setup {
            stage,
            source: source.into(),
        }
    }

    /// Whether the error comes from the harness being torn down
    pub fn is_stopped(&self) -> bool {
        matches!(self, Self::Stopped)
    }
}

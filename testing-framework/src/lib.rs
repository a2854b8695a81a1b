//! # Vela Testing Framework
//!
//! Brings up local validator networks and drives synthesized or raw
//! transactions through them.
//!
//! ## Overview
//!
//! - **network**: multi-node bring-up, height waits and teardown
//! - **synthesizer**: deterministic signed transaction batches
//! - **fuzz**: in-process handler driver and networked RPC driver
//! - **invariants**: ledger and genesis checks shared by tests
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use vela_testing_framework::prelude::*;
//!
//! # async fn run() -> Result<(), HarnessError> {
//! let network = Network::new(NetworkConfig::default().with_validators(2)).await?;
//! network.wait_for_height(3).await?;
//! network.cleanup().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Reproducing failures
//!
//! Random keys and test data come from [`orchestrator::TestRng`], which logs
//! its seed. Set `VELA_TEST_SEED` to replay a run.

/// Harness error taxonomy
pub mod error;

/// Transaction fuzz drivers
pub mod fuzz;

/// Ledger, validator registry and genesis invariant checkers
pub mod invariants;

/// Local validator network lifecycle
pub mod network;

/// Deterministic randomness for reproducible tests
pub mod orchestrator;

/// Three-transaction batch synthesis
pub mod synthesizer;

/// Test logging and small helpers
pub mod utilities;

/// Commonly used imports
pub mod prelude;

pub use error::HarnessError;

/// Framework version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

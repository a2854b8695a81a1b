//! Genesis construction for Vela test networks.
//!
//! [`GenesisBuilder`] produces a [`GenesisState`] whose bank supply matches
//! the sum of every balance and whose staking module only lists bonded
//! validators, together with the identities needed to sign against it.

mod builder;
mod error;
mod identity;
pub mod modules;
mod state;

pub use builder::{GenesisBuilder, GenesisOutput, DEFAULT_FUNDING, DEFAULT_STAKE_PER_VALIDATOR};
pub use error::GenesisError;
pub use identity::{TestIdentity, ValidatorIdentity};
pub use state::GenesisState;

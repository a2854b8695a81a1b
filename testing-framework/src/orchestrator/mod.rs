// Deterministic test infrastructure.

/// Seeded RNG with replayable seeds
pub mod rng;

pub use rng::{TestRng, SEED_ENV_VAR};

// Seeded RNG shared by a test.
//
// Every TestRng logs its seed so a failing run can be replayed with
// VELA_TEST_SEED=<seed>.

use log::info;
use parking_lot::Mutex;
use rand::{
    distributions::{uniform::SampleRange, uniform::SampleUniform, Distribution, Standard},
    rngs::StdRng,
    Rng, RngCore, SeedableRng,
};
use vela_common::crypto::KeyPair;

/// Environment variable overriding the seed of [`TestRng::new_from_env_or_random`]
pub const SEED_ENV_VAR: &str = "VELA_TEST_SEED";

/// Deterministic random source.
///
/// Interior mutability lets it be shared by reference across helpers
/// without threading `&mut` everywhere.
pub struct TestRng {
    seed: u64,
    rng: Mutex<StdRng>,
}

impl TestRng {
    /// Seed from `VELA_TEST_SEED` (decimal or `0x` hex) or pick a random one
    pub fn new_from_env_or_random() -> Self {
        let seed = std::env::var(SEED_ENV_VAR)
            .ok()
            .and_then(|value| parse_seed(&value))
            .unwrap_or_else(rand::random);
        let rng = Self::with_seed(seed);
        if log::log_enabled!(log::Level::Info) {
            info!(
                "TestRng seed: 0x{:016x} (replay with {}=0x{:016x})",
                seed, SEED_ENV_VAR, seed
            );
        }
        rng
    }

    /// Fixed seed, same sequence on every run
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Seed this generator was created with
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Random value of any type supported by `rand`
    pub fn gen<T>(&self) -> T
    where
        Standard: Distribution<T>,
    {
        self.rng.lock().gen()
    }

    /// Random value in `range`
    pub fn gen_range<T, R>(&self, range: R) -> T
    where
        T: SampleUniform,
        R: SampleRange<T>,
    {
        self.rng.lock().gen_range(range)
    }

    /// Fill `dest` with random bytes
    pub fn fill_bytes(&self, dest: &mut [u8]) {
        self.rng.lock().fill_bytes(dest)
    }

    /// Random byte vector of length `len`
    pub fn bytes(&self, len: usize) -> Vec<u8> {
        let mut bytes = vec![0u8; len];
        self.fill_bytes(&mut bytes);
        bytes
    }

    /// Signing key drawn from this generator
    pub fn keypair(&self) -> KeyPair {
        KeyPair::from_rng(&mut *self.rng.lock())
    }
}

fn parse_seed(value: &str) -> Option<u64> {
    let value = value.trim();
    match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_sequence() {
        let a = TestRng::with_seed(42);
        let b = TestRng::with_seed(42);
        let left: Vec<u64> = (0..10).map(|_| a.gen()).collect();
        let right: Vec<u64> = (0..10).map(|_| b.gen()).collect();
        assert_eq!(left, right);
        assert_eq!(a.keypair().address(), b.keypair().address());
    }

    #[test]
    fn test_gen_range_bounds() {
        let rng = TestRng::with_seed(7);
        for _ in 0..100 {
            let value: u64 = rng.gen_range(1..10);
            assert!((1..10).contains(&value));
        }
    }

    #[test]
    fn test_parse_seed() {
        assert_eq!(parse_seed("0xdeadbeef"), Some(0xdead_beef));
        assert_eq!(parse_seed(" 12345 "), Some(12345));
        assert_eq!(parse_seed("nope"), None);
    }
}

mod address;
pub mod bech32;
mod error;
mod hash;
mod key;

pub use address::{Address, ADDRESS_SIZE};
pub use error::CryptoError;
pub use hash::{hash, Hash, Hashable, HASH_SIZE};
pub use key::{KeyPair, Signature, SIGNATURE_SIZE};

use super::{Address, CryptoError, Hash};
use crate::serializer::{Reader, ReaderError, Serializer, Writer};
use libsecp256k1::{Message, PublicKey, RecoveryId, SecretKey};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::fmt;

// r (32) || s (32) || recovery id (1)
pub const SIGNATURE_SIZE: usize = 65;

/// secp256k1 key pair used for both account and consensus identities
#[derive(Clone)]
pub struct KeyPair {
    secret: SecretKey,
    public: PublicKey,
}

impl KeyPair {
    // Generate a fresh key from the thread RNG
    pub fn new() -> Self {
        Self::from_rng(&mut rand::thread_rng())
    }

    pub fn from_rng<R: Rng>(rng: &mut R) -> Self {
        let secret = SecretKey::random(rng);
        let public = PublicKey::from_secret_key(&secret);
        Self { secret, public }
    }

    // Same seed, same key
    pub fn from_seed(seed: u64) -> Self {
        Self::from_rng(&mut StdRng::seed_from_u64(seed))
    }

    pub fn from_secret_bytes(bytes: &[u8; 32]) -> Result<Self, CryptoError> {
        let secret = SecretKey::parse(bytes).map_err(|_| CryptoError::InvalidSecretKey)?;
        let public = PublicKey::from_secret_key(&secret);
        Ok(Self { secret, public })
    }

    pub fn address(&self) -> Address {
        Address::from_uncompressed_public_key(&self.public.serialize())
    }

    pub fn public_key_compressed(&self) -> [u8; 33] {
        self.public.serialize_compressed()
    }

    pub fn secret_bytes(&self) -> [u8; 32] {
        self.secret.serialize()
    }

    pub fn sign(&self, hash: &Hash) -> Signature {
        let message = Message::parse(hash.as_bytes());
        let (signature, recovery_id) = libsecp256k1::sign(&message, &self.secret);

        let mut bytes = [0u8; SIGNATURE_SIZE];
        bytes[..64].copy_from_slice(&signature.serialize());
        bytes[64] = recovery_id.serialize();
        Signature(bytes)
    }
}

impl Default for KeyPair {
    fn default() -> Self {
        Self::new()
    }
}

// Never print the secret part
impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("address", &self.address())
            .finish()
    }
}

/// Recoverable ECDSA signature
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature([u8; SIGNATURE_SIZE]);

impl Signature {
    pub const fn from_bytes(bytes: [u8; SIGNATURE_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SIGNATURE_SIZE] {
        &self.0
    }

    /// Recover the address that produced this signature over `hash`
    pub fn recover(&self, hash: &Hash) -> Result<Address, CryptoError> {
        let mut rs = [0u8; 64];
        rs.copy_from_slice(&self.0[..64]);

        let signature = libsecp256k1::Signature::parse_standard(&rs)
            .map_err(|_| CryptoError::InvalidSignature)?;
        let recovery_id =
            RecoveryId::parse(self.0[64]).map_err(|_| CryptoError::InvalidRecoveryId(self.0[64]))?;
        let message = Message::parse(hash.as_bytes());

        let public = libsecp256k1::recover(&message, &signature, &recovery_id)
            .map_err(|_| CryptoError::RecoveryFailed)?;
        Ok(Address::from_uncompressed_public_key(&public.serialize()))
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", hex::encode(self.0))
    }
}

impl Serializer for Signature {
    fn write(&self, writer: &mut Writer) {
        writer.write_bytes(&self.0);
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        Ok(Self(reader.read_bytes()?))
    }

    fn size(&self) -> usize {
        SIGNATURE_SIZE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::hash;

    #[test]
    fn test_sign_and_recover() {
        let key = KeyPair::new();
        let message = hash(b"block_id");
        let signature = key.sign(&message);
        assert_eq!(signature.recover(&message).unwrap(), key.address());

        // A different message recovers another (or no) address
        let other = hash(b"partset_header");
        assert_ne!(signature.recover(&other).ok(), Some(key.address()));
    }

    #[test]
    fn test_seeded_keys_are_deterministic() {
        assert_eq!(KeyPair::from_seed(7).address(), KeyPair::from_seed(7).address());
        assert_ne!(KeyPair::from_seed(7).address(), KeyPair::from_seed(8).address());
    }

    #[test]
    fn test_known_address() {
        // Private key 0x...01 maps to the generator point
        let mut secret = [0u8; 32];
        secret[31] = 1;
        let key = KeyPair::from_secret_bytes(&secret).unwrap();
        assert_eq!(
            key.address().to_string(),
            "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf"
        );
    }

    #[test]
    fn test_invalid_recovery_id() {
        let key = KeyPair::new();
        let message = hash(b"app");
        let mut bytes = *key.sign(&message).as_bytes();
        bytes[64] = 9;
        assert_eq!(
            Signature::from_bytes(bytes).recover(&message),
            Err(CryptoError::InvalidRecoveryId(9))
        );
    }

    #[test]
    fn test_zero_secret_rejected() {
        assert!(KeyPair::from_secret_bytes(&[0u8; 32]).is_err());
    }
}

//! Ed25519 signing and verification

use crate::types::{ContentHash, PeerKey};
use crate::{Error, Result};
use ed25519_dalek::{Signer, Verifier};
use rand::rngs::OsRng;

/// Ed25519 keypair of the local node
#[derive(Clone)]
pub struct Keypair {
    inner: ed25519_dalek::SigningKey,
}

impl Keypair {
    /// Generate a new random keypair
    pub fn generate() -> Self {
        let mut rng = OsRng;
        let inner = ed25519_dalek::SigningKey::generate(&mut rng);
        Self { inner }
    }

    /// Create keypair from secret key bytes
    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        let inner = ed25519_dalek::SigningKey::from_bytes(bytes);
        Self { inner }
    }

    /// Get the secret key bytes
    pub fn to_bytes(&self) -> [u8; 32] {
        self.inner.to_bytes()
    }

    /// Get the public key
    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            inner: self.inner.verifying_key(),
        }
    }

    /// Identity of this node in tag operations
    pub fn peer_key(&self) -> PeerKey {
        self.public_key().peer_key()
    }

    /// Sign a message
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.inner.sign(message).to_bytes()
    }
}

/// Ed25519 public key
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PublicKey {
    inner: ed25519_dalek::VerifyingKey,
}

impl PublicKey {
    /// Create public key from bytes
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self> {
        let inner = ed25519_dalek::VerifyingKey::from_bytes(bytes)
            .map_err(|e| Error::Crypto(format!("Invalid public key: {}", e)))?;
        Ok(Self { inner })
    }

    /// Get the public key bytes
    pub fn to_bytes(&self) -> [u8; 32] {
        self.inner.to_bytes()
    }

    pub fn peer_key(&self) -> PeerKey {
        PeerKey::new(self.to_bytes().to_vec())
    }

    /// Verify a signature
    pub fn verify(&self, message: &[u8], signature: &[u8; 64]) -> Result<()> {
        let sig = ed25519_dalek::Signature::from_bytes(signature);
        self.inner
            .verify(message, &sig)
            .map_err(|_| Error::InvalidSignature)
    }
}

/// Hash content using Blake3
pub fn hash_content(data: &[u8]) -> ContentHash {
    let hash = blake3::hash(data);
    ContentHash::new(hash.as_bytes().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypair_roundtrip() {
        let keypair = Keypair::generate();
        let restored = Keypair::from_bytes(&keypair.to_bytes());

        assert_eq!(keypair.peer_key(), restored.peer_key());
        assert_eq!(keypair.peer_key().as_bytes().len(), 32);
    }

    #[test]
    fn test_sign_verify() {
        let keypair = Keypair::generate();
        let message = b"infohash:music";

        let signature = keypair.sign(message);
        assert!(keypair.public_key().verify(message, &signature).is_ok());
    }

    #[test]
    fn test_invalid_signature() {
        let keypair1 = Keypair::generate();
        let keypair2 = Keypair::generate();
        let message = b"Test message";

        let signature = keypair1.sign(message);
        assert!(matches!(
            keypair2.public_key().verify(message, &signature),
            Err(Error::InvalidSignature)
        ));
    }

    #[test]
    fn test_content_hash() {
        let hash1 = hash_content(b"Some content to hash");
        let hash2 = hash_content(b"Some content to hash");
        assert_eq!(hash1, hash2);
        assert_eq!(hash1.as_bytes().len(), 32);

        assert_ne!(hash1, hash_content(b"Different content"));
    }
}

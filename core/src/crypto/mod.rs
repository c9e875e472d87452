//! Cryptographic primitives module
//!
//! This module provides:
//! - Ed25519 signing for locally originated operations
//! - Content hashing (Blake3)

pub mod signing;

pub use signing::{hash_content, Keypair, PublicKey};

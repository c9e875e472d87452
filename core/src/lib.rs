//! Tagdb Core Library
//!
//! Collaborative tag store for a peer-to-peer content client. Peers label
//! content items (torrent infohashes) with free-text tags, exchange signed
//! add/remove operations over gossip, and every node converges on the same
//! per-label vote counters regardless of delivery order or duplication.
//!
//! The store keeps one vote per (content, tag, peer); a newer logical clock
//! from the same peer replaces the older vote. Visibility of a tag is
//! derived from the counters and the local user's own decision.

pub mod config;
pub mod crdt;
pub mod crypto;
pub mod metrics;
pub mod network;
pub mod originator;
pub mod policy;
pub mod storage;
pub mod time;
pub mod types;
pub mod version;

pub use config::{GossipConfig, TagStoreConfig};
pub use crdt::{RejectionReason, TagOperation};
pub use originator::LocalTagger;
pub use policy::{ScoreRule, Visibility, VisibilityPolicy};
pub use storage::{LabelOperationInfo, LabelSnapshot, MergeOutcome, TagStore};
pub use types::*;

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Storage operation failed: {0}")]
    Storage(String),

    #[error("Serialization failed: {0}")]
    Serialization(String),

    #[error("Cryptographic operation failed: {0}")]
    Crypto(String),

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Schema version mismatch: expected {expected}, found {actual}")]
    SchemaMismatch { expected: u32, actual: u32 },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

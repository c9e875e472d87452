//! Tag operation value
//!
//! A `TagOperation` is one peer's labeling decision for one (content, tag)
//! pair. Operations are produced by the local originator or parsed by the
//! gossip transport and are never mutated once built.

use crate::crypto::signing::PublicKey;
use crate::types::{hex_bytes, ContentHash, OperationKind, PeerKey};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// A signed labeling decision issued by one peer
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct TagOperation {
    /// Content the tag is attached to or detached from
    pub content_hash: ContentHash,

    /// Free-text tag
    pub tag: String,

    /// Add or remove
    pub kind: OperationKind,

    /// Peer-scoped logical clock; only orders decisions of the same creator
    pub clock: u64,

    /// Public key of the issuing peer
    pub creator: PeerKey,

    /// Opaque signature, stored and forwarded as-is
    #[serde(with = "hex_bytes", default)]
    pub signature: Vec<u8>,
}

impl TagOperation {
    pub fn new(
        content_hash: ContentHash,
        tag: impl Into<String>,
        kind: OperationKind,
        clock: u64,
        creator: PeerKey,
    ) -> Self {
        Self {
            content_hash,
            tag: tag.into(),
            kind,
            clock,
            creator,
            signature: Vec::new(),
        }
    }

    /// Attach a signature, consuming the unsigned operation
    pub fn with_signature(mut self, signature: Vec<u8>) -> Self {
        self.signature = signature;
        self
    }

    /// Get the canonical bytes for signing
    ///
    /// CBOR array of every field except the signature itself.
    pub fn signing_bytes(&self) -> Vec<u8> {
        fn encode(
            op: &TagOperation,
            e: &mut minicbor::Encoder<Vec<u8>>,
        ) -> std::result::Result<(), minicbor::encode::Error<std::convert::Infallible>> {
            e.array(5)?
                .bytes(op.content_hash.as_bytes())?
                .str(&op.tag)?
                .encode(op.kind)?
                .u64(op.clock)?
                .bytes(op.creator.as_bytes())?;
            Ok(())
        }

        let mut encoder = minicbor::Encoder::new(Vec::new());
        encode(self, &mut encoder).expect("CBOR encoding should not fail");
        encoder.into_writer()
    }

    /// Verify the signature against the creator key
    ///
    /// The merge path never calls this; the transport verifies before
    /// handing operations over.
    pub fn verify_signature(&self) -> Result<()> {
        let key: [u8; 32] = self
            .creator
            .as_bytes()
            .try_into()
            .map_err(|_| Error::Crypto(format!(
                "Creator key must be 32 bytes, got {}",
                self.creator.as_bytes().len()
            )))?;
        let signature: [u8; 64] = self
            .signature
            .as_slice()
            .try_into()
            .map_err(|_| Error::InvalidSignature)?;

        PublicKey::from_bytes(&key)?.verify(&self.signing_bytes(), &signature)
    }
}

/// Persisted entity records
///
/// Every record is CBOR encoded and stored under one of the keys built in
/// `storage::keys`. Peer, content and tag records only anchor identity;
/// the label and label-operation records carry the merge state.

use crate::crdt::TagOperation;
use crate::types::{ContentHash, OperationKind, PeerKey};
use minicbor::{Decode, Encode};

/// A peer seen in at least one operation
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct PeerRecord {
    #[cbor(n(0), with = "minicbor::bytes")]
    pub public_key: Vec<u8>,

    /// First time this peer was referenced (ms)
    #[n(1)]
    pub added_at: u64,
}

/// A piece of content referenced by at least one operation
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct ContentRecord {
    #[cbor(n(0), with = "minicbor::bytes")]
    pub content_hash: Vec<u8>,

    #[n(1)]
    pub added_at: u64,
}

/// Normalized tag text
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct TagRecord {
    #[n(0)]
    pub name: String,

    #[n(1)]
    pub added_at: u64,
}

/// The local node's own clock
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Encode, Decode)]
pub struct LocalPeerRecord {
    #[n(0)]
    pub self_clock: u64,
}

/// (content, tag) pair with its aggregate support
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct LabelRecord {
    #[cbor(n(0), with = "minicbor::bytes")]
    pub content_hash: Vec<u8>,

    #[n(1)]
    pub tag: String,

    /// Peers whose current operation is ADD
    #[n(2)]
    pub added_count: u64,

    /// Peers whose current operation is REMOVE
    #[n(3)]
    pub removed_count: u64,

    /// The local user's own decision, authoritative for the local view
    #[n(4)]
    pub local_override: Option<OperationKind>,

    /// Creation order across all labels
    #[n(5)]
    pub created_seq: u64,
}

impl LabelRecord {
    pub fn new(content_hash: &ContentHash, tag: &str, created_seq: u64) -> Self {
        Self {
            content_hash: content_hash.as_bytes().to_vec(),
            tag: tag.to_string(),
            added_count: 0,
            removed_count: 0,
            local_override: None,
            created_seq,
        }
    }

    /// Count one more peer voting `kind`
    pub fn count(&mut self, kind: OperationKind) {
        match kind {
            OperationKind::Add => self.added_count += 1,
            OperationKind::Remove => self.removed_count += 1,
        }
    }

    /// Withdraw one peer's vote for `kind`
    pub fn uncount(&mut self, kind: OperationKind) {
        let counter = match kind {
            OperationKind::Add => &mut self.added_count,
            OperationKind::Remove => &mut self.removed_count,
        };
        debug_assert!(*counter > 0, "withdrawing a vote that was never counted");
        *counter = counter.saturating_sub(1);
    }

    pub fn content_hash(&self) -> ContentHash {
        ContentHash::new(self.content_hash.clone())
    }
}

/// Latest known operation of one peer for one label
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct LabelOpRecord {
    #[cbor(n(0), with = "minicbor::bytes")]
    pub content_hash: Vec<u8>,

    #[n(1)]
    pub tag: String,

    #[cbor(n(2), with = "minicbor::bytes")]
    pub peer_key: Vec<u8>,

    #[n(3)]
    pub kind: OperationKind,

    #[n(4)]
    pub clock: u64,

    #[cbor(n(5), with = "minicbor::bytes")]
    pub signature: Vec<u8>,

    /// Wall-clock time of the last applied update (ms), informational only
    #[n(6)]
    pub updated_at: u64,
}

impl LabelOpRecord {
    pub fn from_operation(op: &TagOperation, tag: &str, updated_at: u64) -> Self {
        Self {
            content_hash: op.content_hash.as_bytes().to_vec(),
            tag: tag.to_string(),
            peer_key: op.creator.as_bytes().to_vec(),
            kind: op.kind,
            clock: op.clock,
            signature: op.signature.clone(),
            updated_at,
        }
    }

    /// Replace the stored decision with a newer one from the same peer
    pub fn overwrite(&mut self, op: &TagOperation, updated_at: u64) {
        self.kind = op.kind;
        self.clock = op.clock;
        self.signature = op.signature.clone();
        self.updated_at = updated_at;
    }

    /// Rebuild the operation as it would be re-broadcast
    pub fn to_operation(&self) -> TagOperation {
        TagOperation::new(
            ContentHash::new(self.content_hash.clone()),
            self.tag.clone(),
            self.kind,
            self.clock,
            PeerKey::new(self.peer_key.clone()),
        )
        .with_signature(self.signature.clone())
    }
}

//! Local tag operations
//!
//! Turns a user action ("tag this torrent as music") into a signed
//! operation stamped with the local clock and merges it as a local one.

use crate::crdt::TagOperation;
use crate::crypto::Keypair;
use crate::storage::{MergeOutcome, TagStore};
use crate::types::{normalize_tag, ContentHash, OperationKind, PeerKey};
use crate::Result;
use std::sync::Arc;

/// Authors operations on behalf of the local user
pub struct LocalTagger {
    store: Arc<TagStore>,
    keypair: Keypair,
}

impl LocalTagger {
    pub fn new(store: Arc<TagStore>, keypair: Keypair) -> Self {
        Self { store, keypair }
    }

    pub fn peer_key(&self) -> PeerKey {
        self.keypair.peer_key()
    }

    pub fn store(&self) -> &Arc<TagStore> {
        &self.store
    }

    pub fn add_tag(&self, content: &ContentHash, tag: &str) -> Result<(TagOperation, MergeOutcome)> {
        self.issue(content, tag, OperationKind::Add)
    }

    pub fn remove_tag(&self, content: &ContentHash, tag: &str) -> Result<(TagOperation, MergeOutcome)> {
        self.issue(content, tag, OperationKind::Remove)
    }

    /// Sign and merge one local decision
    ///
    /// The clock is taken from the local counter but never below the
    /// stored clock of our own previous vote on the label, so a vote cast
    /// before a database restore still gets superseded. The floor is
    /// applied inside the counter's own transaction.
    pub fn issue(
        &self,
        content: &ContentHash,
        tag: &str,
        kind: OperationKind,
    ) -> Result<(TagOperation, MergeOutcome)> {
        let tag = normalize_tag(tag);
        let creator = self.peer_key();
        let previous = self.store.get_clock(content, &tag, &creator)?;
        let clock = self.store.next_local_clock_after(previous)?;

        let unsigned = TagOperation::new(content.clone(), tag, kind, clock, creator);
        let signature = self.keypair.sign(&unsigned.signing_bytes());
        let op = unsigned.with_signature(signature.to_vec());

        let outcome = self.store.apply_operation(&op, true)?;
        tracing::debug!(content = %content, tag = %op.tag, %kind, clock, "Issued local tag operation");
        Ok((op, outcome))
    }
}

/// Merge engine
///
/// Applies one tag operation to the store inside a single pessimistic
/// transaction. Each peer holds at most one vote per label; a newer clock
/// from the same peer moves that vote, an older or equal one is dropped.

use super::{get_for_update, keys, txn_put, LabelOpRecord, TagStore};
use crate::crdt::{validate, RejectionReason, TagOperation, ValidationResult};
use crate::types::normalize_tag;
use crate::{Error, Result};

/// Result of merging one operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// State changed
    Applied,
    /// Clock not newer than the stored one for this (label, peer); nothing changed
    Stale,
    /// Malformed operation; nothing written
    Rejected(RejectionReason),
}

impl MergeOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, MergeOutcome::Applied)
    }
}

impl TagStore {
    /// Merge a local or gossiped operation into the store
    ///
    /// `is_local` marks operations authored by this node; they also set the
    /// label's local override. Storage failures are returned as errors and
    /// leave the label untouched.
    pub fn apply_operation(&self, op: &TagOperation, is_local: bool) -> Result<MergeOutcome> {
        if let ValidationResult::Reject(reason) = validate(op) {
            self.metrics.record_rejected();
            tracing::warn!(
                content = %op.content_hash,
                peer = %op.creator,
                %reason,
                "Rejected tag operation"
            );
            return Ok(MergeOutcome::Rejected(reason));
        }

        let tag = normalize_tag(&op.tag);
        let now = self.now();
        let txn = self.db.transaction();

        self.get_or_create_peer(&txn, &op.creator)?;
        self.get_or_create_content(&txn, &op.content_hash)?;
        self.get_or_create_tag(&txn, &tag)?;
        let mut label = self.get_or_create_label(&txn, &op.content_hash, &tag)?;

        let op_key = keys::label_op(&op.content_hash, &tag, &op.creator);
        let existing = get_for_update(&txn, &op_key)?
            .map(|bytes| super::decode::<LabelOpRecord>(&bytes))
            .transpose()?;

        let record = match existing {
            None => {
                label.count(op.kind);
                LabelOpRecord::from_operation(op, &tag, now)
            }
            Some(record) if op.clock <= record.clock => {
                // Dropping the transaction rolls back and releases the locks
                drop(txn);
                self.metrics.record_stale();
                tracing::trace!(
                    content = %op.content_hash,
                    tag = %tag,
                    peer = %op.creator,
                    clock = op.clock,
                    stored_clock = record.clock,
                    "Ignored stale tag operation"
                );
                return Ok(MergeOutcome::Stale);
            }
            Some(mut record) => {
                label.uncount(record.kind);
                label.count(op.kind);
                record.overwrite(op, now);
                record
            }
        };

        if is_local {
            label.local_override = Some(op.kind);
        }

        txn_put(&txn, &op_key, &record)?;
        txn_put(&txn, &keys::label(&op.content_hash, &tag), &label)?;
        txn.commit()
            .map_err(|e| Error::Storage(format!("Failed to commit tag operation: {}", e)))?;

        self.metrics.record_applied();
        tracing::debug!(
            content = %op.content_hash,
            tag = %tag,
            peer = %op.creator,
            kind = %op.kind,
            clock = op.clock,
            is_local,
            added = label.added_count,
            removed = label.removed_count,
            "Applied tag operation"
        );

        Ok(MergeOutcome::Applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TagStoreConfig;
    use crate::types::{ContentHash, OperationKind, PeerKey};
    use tempfile::TempDir;

    fn open() -> (TempDir, TagStore) {
        let temp_dir = TempDir::new().unwrap();
        let store = TagStore::open(&TagStoreConfig::at(temp_dir.path())).unwrap();
        (temp_dir, store)
    }

    fn op(peer: &[u8], kind: OperationKind, clock: u64) -> TagOperation {
        TagOperation::new(
            ContentHash::new(b"infohash".to_vec()),
            "tag",
            kind,
            clock,
            PeerKey::new(peer.to_vec()),
        )
    }

    fn counters(store: &TagStore) -> (u64, u64) {
        let label = store
            .read_label(&ContentHash::new(b"infohash".to_vec()), "tag")
            .unwrap()
            .expect("label exists");
        (label.added_count, label.removed_count)
    }

    #[test]
    fn test_remote_add_tag_operation() {
        let (_dir, store) = open();

        assert_eq!(store.apply_operation(&op(b"peer1", OperationKind::Add, 1), false).unwrap(), MergeOutcome::Applied);
        // same operation
        assert_eq!(store.apply_operation(&op(b"peer1", OperationKind::Add, 1), false).unwrap(), MergeOutcome::Stale);
        // operation from the past
        assert_eq!(store.apply_operation(&op(b"peer1", OperationKind::Add, 0), false).unwrap(), MergeOutcome::Stale);
        // duplicate decision from the future only refreshes the record
        assert_eq!(store.apply_operation(&op(b"peer1", OperationKind::Add, 1000), false).unwrap(), MergeOutcome::Applied);
        assert_eq!(counters(&store), (1, 0));

        // changed decision from the future moves the vote
        store.apply_operation(&op(b"peer1", OperationKind::Remove, 1001), false).unwrap();
        assert_eq!(counters(&store), (0, 1));
    }

    #[test]
    fn test_remote_add_multiple_tag_operations() {
        let (_dir, store) = open();

        store.apply_operation(&op(b"peer1", OperationKind::Add, 1), false).unwrap();
        store.apply_operation(&op(b"peer2", OperationKind::Add, 1), false).unwrap();
        store.apply_operation(&op(b"peer3", OperationKind::Add, 1), false).unwrap();
        assert_eq!(counters(&store), (3, 0));

        store.apply_operation(&op(b"peer2", OperationKind::Remove, 2), false).unwrap();
        assert_eq!(counters(&store), (2, 1));

        store.apply_operation(&op(b"peer1", OperationKind::Remove, 2), false).unwrap();
        assert_eq!(counters(&store), (1, 2));

        store.apply_operation(&op(b"peer1", OperationKind::Add, 3), false).unwrap();
        assert_eq!(counters(&store), (2, 1));
    }

    #[test]
    fn test_local_operation_sets_override() {
        let (_dir, store) = open();
        let hash = ContentHash::new(b"infohash".to_vec());

        store.apply_operation(&op(b"me", OperationKind::Remove, 1), true).unwrap();
        let label = store.read_label(&hash, "tag").unwrap().unwrap();
        assert_eq!(label.local_override, Some(OperationKind::Remove));
        assert_eq!(label.removed_count, 1);

        // remote operations never touch the override
        store.apply_operation(&op(b"peer", OperationKind::Add, 1), false).unwrap();
        let label = store.read_label(&hash, "tag").unwrap().unwrap();
        assert_eq!(label.local_override, Some(OperationKind::Remove));
    }

    #[test]
    fn test_rejected_writes_nothing() {
        let (_dir, store) = open();

        let outcome = store.apply_operation(&op(b"", OperationKind::Add, 1), false).unwrap();
        assert_eq!(outcome, MergeOutcome::Rejected(RejectionReason::EmptyPeerKey));
        assert!(store
            .read_label(&ContentHash::new(b"infohash".to_vec()), "tag")
            .unwrap()
            .is_none());
        assert_eq!(store.metrics().snapshot().rejected, 1);
    }

    #[test]
    fn test_tag_is_normalized() {
        let (_dir, store) = open();
        let mut padded = op(b"peer1", OperationKind::Add, 1);
        padded.tag = "  tag ".to_string();

        store.apply_operation(&padded, false).unwrap();
        // same label, same peer, same clock
        assert_eq!(
            store.apply_operation(&op(b"peer1", OperationKind::Add, 1), false).unwrap(),
            MergeOutcome::Stale
        );
        assert_eq!(counters(&store), (1, 0));
    }

    #[test]
    fn test_storage_failure_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = TagStoreConfig::at(temp_dir.path());
        config.lock_timeout_ms = 50;
        let store = TagStore::open(&config).unwrap();
        let hash = ContentHash::new(b"infohash".to_vec());
        let late = PeerKey::new(b"peer2".to_vec());

        store.apply_operation(&op(b"peer1", OperationKind::Add, 1), false).unwrap();

        // another writer holds the label row past the lock timeout
        let blocker = store.db.transaction();
        get_for_update(&blocker, &keys::label(&hash, "tag")).unwrap();
        let result = store.apply_operation(&op(b"peer2", OperationKind::Add, 1), false);
        assert!(matches!(result, Err(Error::Storage(_))));
        drop(blocker);

        assert_eq!(counters(&store), (1, 0));
        assert_eq!(store.get_clock(&hash, "tag", &late).unwrap(), 0);
        assert!(store.db.get(keys::peer(&late)).unwrap().is_none());
        assert_eq!(store.metrics().snapshot().applied, 1);

        // the same operation goes through once the row is free
        assert!(store.apply_operation(&op(b"peer2", OperationKind::Add, 1), false).unwrap().is_applied());
        assert_eq!(counters(&store), (2, 0));
    }
}

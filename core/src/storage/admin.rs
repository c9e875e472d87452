//! Label maintenance
//!
//! Inspection and repair of single labels. Not used by the merge path.

use super::{decode, from_prefix, get_for_update, keys, scan_prefix, txn_put, LabelOpRecord, LabelRecord, TagStore};
use crate::crdt::TagOperation;
use crate::types::{normalize_tag, ContentHash};
use crate::{Error, Result};
use serde::Serialize;

/// Stored operation of one peer on a label
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelOperationInfo {
    pub operation: TagOperation,
    /// Wall-clock millis of the last merge that wrote this row
    pub updated_at_ms: u64,
}

impl TagStore {
    /// Every stored per-peer operation of a label
    pub fn label_operations(&self, content: &ContentHash, tag: &str) -> Result<Vec<LabelOperationInfo>> {
        let tag = normalize_tag(tag);
        let snapshot = self.db.snapshot();
        let prefix = keys::label_op_prefix(content, &tag);
        let rows = scan_prefix(snapshot.iterator(from_prefix(&prefix)), &prefix)?;

        rows.iter()
            .map(|(_, value)| {
                let record: LabelOpRecord = decode(value)?;
                Ok(LabelOperationInfo {
                    operation: record.to_operation(),
                    updated_at_ms: record.updated_at,
                })
            })
            .collect()
    }

    /// Drop every vote on a label and zero its counters
    ///
    /// Also clears the local override. Returns false if the label is unknown.
    /// Peers may re-add their votes on the next gossip round.
    pub fn reset_label(&self, content: &ContentHash, tag: &str) -> Result<bool> {
        let tag = normalize_tag(tag);
        let txn = self.db.transaction();
        let row = keys::label(content, &tag);

        let Some(bytes) = get_for_update(&txn, &row)? else {
            return Ok(false);
        };
        let mut label: LabelRecord = decode(&bytes)?;

        let prefix = keys::label_op_prefix(content, &tag);
        let rows = scan_prefix(txn.iterator(from_prefix(&prefix)), &prefix)?;
        for (key, _) in &rows {
            txn.delete(key)
                .map_err(|e| Error::Storage(format!("Failed to delete label operation: {}", e)))?;
        }

        label.added_count = 0;
        label.removed_count = 0;
        label.local_override = None;
        txn_put(&txn, &row, &label)?;
        txn.commit()
            .map_err(|e| Error::Storage(format!("Failed to commit label reset: {}", e)))?;

        tracing::info!(content = %content, tag = %tag, dropped = rows.len(), "Reset label");
        Ok(true)
    }

    /// Forget the local user's explicit decision on a label
    ///
    /// The local vote itself stays counted. Returns false if the label is
    /// unknown.
    pub fn clear_local_override(&self, content: &ContentHash, tag: &str) -> Result<bool> {
        let tag = normalize_tag(tag);
        let txn = self.db.transaction();
        let row = keys::label(content, &tag);

        let Some(bytes) = get_for_update(&txn, &row)? else {
            return Ok(false);
        };
        let mut label: LabelRecord = decode(&bytes)?;
        if label.local_override.take().is_none() {
            return Ok(true);
        }

        txn_put(&txn, &row, &label)?;
        txn.commit()
            .map_err(|e| Error::Storage(format!("Failed to commit override change: {}", e)))?;
        tracing::debug!(content = %content, tag = %tag, "Cleared local override");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TagStoreConfig;
    use crate::policy::Visibility;
    use crate::types::{OperationKind, PeerKey};
    use tempfile::TempDir;

    fn open() -> (TempDir, TagStore) {
        let dir = TempDir::new().unwrap();
        let store = TagStore::open(&TagStoreConfig::at(dir.path())).unwrap();
        (dir, store)
    }

    fn content() -> ContentHash {
        ContentHash::new(b"infohash".to_vec())
    }

    fn apply(store: &TagStore, peer: &[u8], kind: OperationKind, is_local: bool) {
        let op = TagOperation::new(content(), "music", kind, 1, PeerKey::new(peer.to_vec()));
        store.apply_operation(&op, is_local).unwrap();
    }

    #[test]
    fn test_label_operations_lists_each_peer_once() {
        let (_dir, store) = open();
        apply(&store, b"peer1", OperationKind::Add, false);
        apply(&store, b"peer2", OperationKind::Remove, false);

        let mut ops = store.label_operations(&content(), "music").unwrap();
        ops.sort_by(|a, b| a.operation.creator.as_bytes().cmp(b.operation.creator.as_bytes()));
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0].operation.kind, OperationKind::Add);
        assert_eq!(ops[1].operation.kind, OperationKind::Remove);

        assert!(store.label_operations(&content(), "other").unwrap().is_empty());
    }

    #[test]
    fn test_label_operations_do_not_leak_across_tags() {
        let (_dir, store) = open();
        apply(&store, b"peer1", OperationKind::Add, false);
        let op = TagOperation::new(content(), "musical", OperationKind::Add, 1, PeerKey::new(b"peer9".to_vec()));
        store.apply_operation(&op, false).unwrap();

        let ops = store.label_operations(&content(), "music").unwrap();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].operation.creator, PeerKey::new(b"peer1".to_vec()));
    }

    #[test]
    fn test_reset_label() {
        let (_dir, store) = open();
        apply(&store, b"peer1", OperationKind::Add, false);
        apply(&store, b"peer2", OperationKind::Add, false);
        apply(&store, b"me", OperationKind::Add, true);

        assert!(store.reset_label(&content(), "music").unwrap());

        let label = store.label(&content(), "music").unwrap().unwrap();
        assert_eq!((label.added_count, label.removed_count), (0, 0));
        assert_eq!(label.local_override, None);
        assert_eq!(label.visibility, Visibility::Hidden);
        assert!(store.label_operations(&content(), "music").unwrap().is_empty());

        // votes can come back after a reset
        apply(&store, b"peer1", OperationKind::Add, false);
        assert_eq!(store.label(&content(), "music").unwrap().unwrap().added_count, 1);

        assert!(!store.reset_label(&content(), "unknown").unwrap());
    }

    #[test]
    fn test_clear_local_override() {
        let (_dir, store) = open();
        apply(&store, b"me", OperationKind::Add, true);
        assert_eq!(
            store.label(&content(), "music").unwrap().unwrap().visibility,
            Visibility::Visible
        );

        assert!(store.clear_local_override(&content(), "music").unwrap());
        let label = store.label(&content(), "music").unwrap().unwrap();
        assert_eq!(label.local_override, None);
        assert_eq!(label.added_count, 1);
        assert_eq!(label.visibility, Visibility::Suggested);

        assert!(!store.clear_local_override(&content(), "unknown").unwrap());
    }
}

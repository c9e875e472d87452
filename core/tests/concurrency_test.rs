//! Concurrent merges against one shared store

use anyhow::Result;
use std::sync::Arc;
use std::thread;
use tagdb_core::{ContentHash, MergeOutcome, OperationKind, PeerKey, TagOperation, TagStore, TagStoreConfig};
use tempfile::TempDir;

const PEERS: usize = 8;
const ROUNDS: u64 = 25;

fn op(content: &[u8], tag: &str, peer: usize, clock: u64) -> TagOperation {
    let kind = if clock % 2 == 0 { OperationKind::Add } else { OperationKind::Remove };
    TagOperation::new(
        ContentHash::new(content.to_vec()),
        tag,
        kind,
        clock,
        PeerKey::new(format!("peer{}", peer).into_bytes()),
    )
}

#[test]
fn test_parallel_peers_on_one_label() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let store = Arc::new(TagStore::open(&TagStoreConfig::at(temp_dir.path()))?);

    thread::scope(|s| {
        for peer in 0..PEERS {
            let store = store.clone();
            s.spawn(move || {
                for clock in 1..=ROUNDS {
                    let outcome = store.apply_operation(&op(b"H1", "music", peer, clock), false).unwrap();
                    assert_eq!(outcome, MergeOutcome::Applied);
                }
            });
        }
    });

    // every peer ends on clock 25, an odd clock, so every vote is a remove
    let label = store.label(&ContentHash::new(b"H1".to_vec()), "music")?.expect("label exists");
    assert_eq!((label.added_count, label.removed_count), (0, PEERS as u64));
    assert_eq!(store.metrics().snapshot().applied, PEERS as u64 * ROUNDS);
    Ok(())
}

#[test]
fn test_duplicate_deliveries_race() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let store = Arc::new(TagStore::open(&TagStoreConfig::at(temp_dir.path()))?);
    let shared = op(b"H1", "music", 0, 2);

    let applied: usize = thread::scope(|s| {
        let handles: Vec<_> = (0..PEERS)
            .map(|_| {
                let store = store.clone();
                let shared = shared.clone();
                s.spawn(move || store.apply_operation(&shared, false).unwrap().is_applied())
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap() as usize)
            .sum()
    });

    assert_eq!(applied, 1);
    let label = store.label(&ContentHash::new(b"H1".to_vec()), "music")?.expect("label exists");
    assert_eq!((label.added_count, label.removed_count), (1, 0));
    Ok(())
}

#[test]
fn test_disjoint_labels_in_parallel() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let store = Arc::new(TagStore::open(&TagStoreConfig::at(temp_dir.path()))?);

    thread::scope(|s| {
        for worker in 0..PEERS {
            let store = store.clone();
            s.spawn(move || {
                let content = format!("content{}", worker).into_bytes();
                for peer in 0..4 {
                    store.apply_operation(&op(&content, "shared", peer, 2), false).unwrap();
                }
            });
        }
    });

    // all eight labels were created under contention for the same tag row
    let contents = store.contents_for("shared")?;
    assert_eq!(contents.len(), PEERS);
    Ok(())
}

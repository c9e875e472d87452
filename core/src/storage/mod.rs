//! Storage module
//!
//! Persistent tag database on a pessimistic RocksDB `TransactionDB`:
//! - entity records (peer, content, tag, label, label operation)
//! - the merge engine and local clock (write side)
//! - visibility queries and the gossip sampler (read side, snapshots)

pub mod admin;
pub mod clock;
pub mod gossip;
pub mod keys;
pub mod merge;
pub mod query;
pub mod records;
mod sequence;

use crate::config::TagStoreConfig;
use crate::metrics::MergeMetrics;
use crate::policy::VisibilityPolicy;
use crate::time::{SystemTimeSource, TimeSource};
use crate::types::{ContentHash, PeerKey};
use crate::version::{is_schema_compatible, SCHEMA_VERSION};
use crate::{Error, Result};
use minicbor::{Decode, Encode};
use rocksdb::{Direction, IteratorMode, Options, TransactionDB, TransactionDBOptions};
use std::path::{Path, PathBuf};
use sequence::LabelSequence;
use std::sync::Arc;

pub use admin::LabelOperationInfo;
pub use merge::MergeOutcome;
pub use query::LabelSnapshot;
pub use records::{LabelOpRecord, LabelRecord};

pub(crate) type Txn<'a> = rocksdb::Transaction<'a, TransactionDB>;

/// Collaborative tag database
///
/// Shared between the gossip transport and local actions behind an `Arc`;
/// every write is one transaction holding exclusive row locks on the
/// label and label-operation it touches.
pub struct TagStore {
    db: TransactionDB,
    path: PathBuf,
    policy: VisibilityPolicy,
    time: Arc<dyn TimeSource>,
    metrics: Arc<MergeMetrics>,
    label_seq: LabelSequence,
}

impl TagStore {
    /// Open or create a store using the system clock
    pub fn open(config: &TagStoreConfig) -> Result<Self> {
        Self::open_with_time(config, Arc::new(SystemTimeSource))
    }

    /// Open or create a store with an explicit wall-clock source
    pub fn open_with_time(config: &TagStoreConfig, time: Arc<dyn TimeSource>) -> Result<Self> {
        let path = config.storage_path.clone();
        std::fs::create_dir_all(&path)
            .map_err(|e| Error::Storage(format!("Failed to create {}: {}", path.display(), e)))?;

        let mut opts = Options::default();
        opts.create_if_missing(true);

        let mut txn_opts = TransactionDBOptions::default();
        txn_opts.set_txn_lock_timeout(config.lock_timeout_ms as i64);

        let db = TransactionDB::open(&opts, &txn_opts, &path)
            .map_err(|e| Error::Storage(format!("Failed to open database: {}", e)))?;

        let label_seq = LabelSequence::load(&db)?;
        let store = Self {
            db,
            path,
            policy: config.visibility,
            time,
            metrics: Arc::new(MergeMetrics::new()),
            label_seq,
        };
        store.check_schema()?;

        tracing::debug!(path = %store.path.display(), "Opened tag store");
        Ok(store)
    }

    /// Stamp a fresh database or refuse an incompatible one
    fn check_schema(&self) -> Result<()> {
        let stored = self
            .db
            .get(keys::SCHEMA_VERSION)
            .map_err(|e| Error::Storage(format!("Failed to read schema version: {}", e)))?;

        match stored {
            Some(bytes) => {
                let stored: u32 = decode(&bytes)?;
                if !is_schema_compatible(stored) {
                    return Err(Error::SchemaMismatch {
                        expected: SCHEMA_VERSION,
                        actual: stored,
                    });
                }
                Ok(())
            }
            None => self
                .db
                .put(keys::SCHEMA_VERSION, encode(&SCHEMA_VERSION)?)
                .map_err(|e| Error::Storage(format!("Failed to write schema version: {}", e))),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn policy(&self) -> VisibilityPolicy {
        self.policy
    }

    pub fn metrics(&self) -> &MergeMetrics {
        &self.metrics
    }

    /// Release the database handle
    pub fn shutdown(self) -> Result<()> {
        tracing::debug!(path = %self.path.display(), "Shutting down tag store");
        drop(self.db);
        Ok(())
    }

    pub(crate) fn now(&self) -> u64 {
        self.time.now_millis()
    }

    // Entity lookups inside a unit of work. Identity records never change
    // after creation, so a row lock is only taken when the record is missing.

    pub(crate) fn get_or_create_peer(&self, txn: &Txn<'_>, key: &PeerKey) -> Result<()> {
        let row = keys::peer(key);
        if txn_get(txn, &row)?.is_some() || get_for_update(txn, &row)?.is_some() {
            return Ok(());
        }
        let record = records::PeerRecord {
            public_key: key.as_bytes().to_vec(),
            added_at: self.now(),
        };
        txn_put(txn, &row, &record)?;
        tracing::trace!(peer = %key, "Created peer");
        Ok(())
    }

    pub(crate) fn get_or_create_content(&self, txn: &Txn<'_>, hash: &ContentHash) -> Result<()> {
        let row = keys::content(hash);
        if txn_get(txn, &row)?.is_some() || get_for_update(txn, &row)?.is_some() {
            return Ok(());
        }
        let record = records::ContentRecord {
            content_hash: hash.as_bytes().to_vec(),
            added_at: self.now(),
        };
        txn_put(txn, &row, &record)
    }

    pub(crate) fn get_or_create_tag(&self, txn: &Txn<'_>, name: &str) -> Result<()> {
        let row = keys::tag(name);
        if txn_get(txn, &row)?.is_some() || get_for_update(txn, &row)?.is_some() {
            return Ok(());
        }
        let record = records::TagRecord {
            name: name.to_string(),
            added_at: self.now(),
        };
        txn_put(txn, &row, &record)
    }

    /// Lock the label row, creating the label (and its tag index entry) if missing
    ///
    /// Only the label row is locked; unrelated labels are created in parallel.
    pub(crate) fn get_or_create_label(
        &self,
        txn: &Txn<'_>,
        hash: &ContentHash,
        tag: &str,
    ) -> Result<LabelRecord> {
        let row = keys::label(hash, tag);
        if let Some(bytes) = get_for_update(txn, &row)? {
            return decode(&bytes);
        }

        let seq = self.label_seq.allocate(&self.db)?;
        txn.put(keys::tag_label(tag, hash), b"")
            .map_err(|e| Error::Storage(format!("Failed to index label: {}", e)))?;

        tracing::trace!(content = %hash, tag, seq, "Created label");
        Ok(LabelRecord::new(hash, tag, seq))
    }

    /// Look up a label outside any transaction
    pub(crate) fn read_label(&self, hash: &ContentHash, tag: &str) -> Result<Option<LabelRecord>> {
        self.db
            .get(keys::label(hash, tag))
            .map_err(|e| Error::Storage(format!("Failed to read label: {}", e)))?
            .map(|bytes| decode(&bytes))
            .transpose()
    }
}

pub(crate) fn encode<T: Encode<()>>(value: &T) -> Result<Vec<u8>> {
    minicbor::to_vec(value)
        .map_err(|e| Error::Serialization(format!("Failed to encode record: {}", e)))
}

pub(crate) fn decode<'b, T: Decode<'b, ()>>(bytes: &'b [u8]) -> Result<T> {
    minicbor::decode(bytes)
        .map_err(|e| Error::Serialization(format!("Failed to decode record: {}", e)))
}

pub(crate) fn txn_get(txn: &Txn<'_>, key: &[u8]) -> Result<Option<Vec<u8>>> {
    txn.get(key)
        .map_err(|e| Error::Storage(format!("Failed to read row: {}", e)))
}

/// Read a row and hold an exclusive lock on it until commit or rollback
pub(crate) fn get_for_update(txn: &Txn<'_>, key: &[u8]) -> Result<Option<Vec<u8>>> {
    txn.get_for_update(key, true)
        .map_err(|e| Error::Storage(format!("Failed to lock row: {}", e)))
}

pub(crate) fn txn_put<T: Encode<()>>(txn: &Txn<'_>, key: &[u8], value: &T) -> Result<()> {
    txn.put(key, encode(value)?)
        .map_err(|e| Error::Storage(format!("Failed to write row: {}", e)))
}

/// Collect every `(key, value)` under `prefix`
///
/// Works on the database, a snapshot or a transaction; iteration stops at
/// the first key past the prefix.
pub(crate) fn scan_prefix<I>(iter: I, prefix: &[u8]) -> Result<Vec<(Box<[u8]>, Box<[u8]>)>>
where
    I: Iterator<Item = std::result::Result<(Box<[u8]>, Box<[u8]>), rocksdb::Error>>,
{
    let mut rows = Vec::new();
    for item in iter {
        let (key, value) = item.map_err(|e| Error::Storage(format!("Iterator error: {}", e)))?;
        if !key.starts_with(prefix) {
            break;
        }
        rows.push((key, value));
    }
    Ok(rows)
}

pub(crate) fn from_prefix(prefix: &[u8]) -> IteratorMode<'_> {
    IteratorMode::From(prefix, Direction::Forward)
}

//! Label creation order
//!
//! Sequence numbers are handed out from memory and reserved on disk in
//! blocks, so creating a label never takes a store-wide row lock. The
//! persisted value is an exclusive upper bound of every number handed out;
//! a crash leaves a gap, never a duplicate.

use super::{decode, encode, keys};
use crate::{Error, Result};
use rocksdb::TransactionDB;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

const RESERVE_BLOCK: u64 = 1024;

#[derive(Debug)]
pub(crate) struct LabelSequence {
    next: AtomicU64,
    reserved: AtomicU64,
    reserve_lock: Mutex<()>,
}

impl LabelSequence {
    /// Resume after the last reserved block
    pub(crate) fn load(db: &TransactionDB) -> Result<Self> {
        let reserved = match db
            .get(keys::LABEL_SEQ)
            .map_err(|e| Error::Storage(format!("Failed to read label sequence: {}", e)))?
        {
            Some(bytes) => decode::<u64>(&bytes)?,
            None => 0,
        };
        Ok(Self {
            next: AtomicU64::new(reserved),
            reserved: AtomicU64::new(reserved),
            reserve_lock: Mutex::new(()),
        })
    }

    pub(crate) fn allocate(&self, db: &TransactionDB) -> Result<u64> {
        let seq = self.next.fetch_add(1, Ordering::SeqCst);
        if seq < self.reserved.load(Ordering::SeqCst) {
            return Ok(seq);
        }

        let _guard = self
            .reserve_lock
            .lock()
            .map_err(|_| Error::Storage("Label sequence lock poisoned".into()))?;
        let reserved = self.reserved.load(Ordering::SeqCst);
        if seq >= reserved {
            let bound = reserved.max(seq + 1) + RESERVE_BLOCK;
            db.put(keys::LABEL_SEQ, encode(&bound)?)
                .map_err(|e| Error::Storage(format!("Failed to reserve label sequence: {}", e)))?;
            self.reserved.store(bound, Ordering::SeqCst);
            tracing::trace!(bound, "Reserved label sequence block");
        }
        Ok(seq)
    }
}

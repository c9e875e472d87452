//! Local logical clock
//!
//! The local peer stamps its own operations with a persisted counter so
//! clocks keep increasing across restarts.

use super::{decode, get_for_update, keys, txn_put, TagStore};
use super::records::{LabelOpRecord, LocalPeerRecord};
use crate::types::{normalize_tag, ContentHash, PeerKey};
use crate::{Error, Result};

impl TagStore {
    /// Increment and return the local clock (first value is 1)
    pub fn next_local_clock(&self) -> Result<u64> {
        self.next_local_clock_after(0)
    }

    /// Like `next_local_clock`, but the result is also above `floor`
    ///
    /// The counter jumps forward to the returned value, so concurrent
    /// callers passing the same floor still get distinct clocks.
    pub fn next_local_clock_after(&self, floor: u64) -> Result<u64> {
        let txn = self.db.transaction();
        let mut local = match get_for_update(&txn, keys::LOCAL_PEER)? {
            Some(bytes) => decode::<LocalPeerRecord>(&bytes)?,
            None => LocalPeerRecord::default(),
        };
        local.self_clock = local.self_clock.max(floor) + 1;
        txn_put(&txn, keys::LOCAL_PEER, &local)?;
        txn.commit()
            .map_err(|e| Error::Storage(format!("Failed to commit local clock: {}", e)))?;
        Ok(local.self_clock)
    }

    /// Last value handed out by `next_local_clock`, 0 before the first
    pub fn local_clock(&self) -> Result<u64> {
        let stored = self
            .db
            .get(keys::LOCAL_PEER)
            .map_err(|e| Error::Storage(format!("Failed to read local clock: {}", e)))?;
        match stored {
            Some(bytes) => Ok(decode::<LocalPeerRecord>(&bytes)?.self_clock),
            None => Ok(0),
        }
    }

    /// Clock of the stored operation of `peer` for (content, tag), 0 if none
    pub fn get_clock(&self, content: &ContentHash, tag: &str, peer: &PeerKey) -> Result<u64> {
        let key = keys::label_op(content, &normalize_tag(tag), peer);
        let stored = self
            .db
            .get(key)
            .map_err(|e| Error::Storage(format!("Failed to read label operation: {}", e)))?;

        match stored {
            Some(bytes) => Ok(decode::<LabelOpRecord>(&bytes)?.clock),
            None => Ok(0),
        }
    }
}

/// Gossip sampler
///
/// Picks stale label operations for re-broadcast. Selection is uniform over
/// every eligible row (reservoir sampling), so no row is starved behind
/// older ones. Nothing is marked as sent; repeats are harmless because the
/// merge is idempotent.

use super::{decode, from_prefix, keys, LabelOpRecord, TagStore};
use crate::crdt::TagOperation;
use crate::{Error, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use std::time::Duration;

impl TagStore {
    /// Up to `limit` random operations last applied at least `min_age` ago
    pub fn sample_for_gossip(&self, min_age: Duration, limit: usize) -> Result<Vec<TagOperation>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let cutoff = self.now().saturating_sub(min_age.as_millis() as u64);
        let snapshot = self.db.snapshot();
        let prefix = keys::all_label_ops();

        let mut rng = rand::thread_rng();
        let mut reservoir: Vec<LabelOpRecord> = Vec::with_capacity(limit);
        let mut eligible = 0usize;

        // Streamed row by row; memory stays bounded by `limit`
        for item in snapshot.iterator(from_prefix(prefix)) {
            let (key, value) = item.map_err(|e| Error::Storage(format!("Iterator error: {}", e)))?;
            if !key.starts_with(prefix) {
                break;
            }
            let record: LabelOpRecord = decode(&value)?;
            if record.updated_at > cutoff {
                continue;
            }
            eligible += 1;
            if reservoir.len() < limit {
                reservoir.push(record);
            } else {
                let slot = rng.gen_range(0..eligible);
                if slot < limit {
                    reservoir[slot] = record;
                }
            }
        }

        // Reservoir slots keep scan order for the first `limit` rows
        reservoir.shuffle(&mut rng);
        self.metrics.record_sampled(reservoir.len());
        tracing::trace!(eligible, sampled = reservoir.len(), "Sampled operations for gossip");

        Ok(reservoir.iter().map(LabelOpRecord::to_operation).collect())
    }
}

/// Periodic re-broadcast
///
/// Samples aged operations on a fixed interval and pushes each non-empty
/// batch into a channel. The task ends when the receiver goes away or the
/// handle is shut down or dropped.

use crate::config::GossipConfig;
use crate::crdt::TagOperation;
use crate::storage::TagStore;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Handle to a running re-broadcast task
pub struct RebroadcastHandle {
    stop_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl RebroadcastHandle {
    /// Stop the task and wait for it to exit
    pub async fn shutdown(mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Err(e) = (&mut self.task).await {
            tracing::warn!(error = %e, "Re-broadcast task ended abnormally");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Start sampling `store` every `config.interval()` into `sink`
///
/// The first sample is taken immediately.
pub fn spawn_rebroadcast(
    store: Arc<TagStore>,
    config: GossipConfig,
    sink: mpsc::Sender<Vec<TagOperation>>,
) -> RebroadcastHandle {
    let (stop_tx, mut stop_rx) = oneshot::channel();

    let task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(config.interval());
        tracing::debug!(interval = ?config.interval(), batch = config.batch_size, "Re-broadcast started");

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = &mut stop_rx => break,
                _ = sink.closed() => break,
            }

            let sampler = store.clone();
            let sampled = tokio::task::spawn_blocking(move || {
                sampler.sample_for_gossip(config.min_age(), config.batch_size)
            })
            .await;

            let batch = match sampled {
                Ok(Ok(batch)) => batch,
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, "Failed to sample operations for gossip");
                    continue;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Gossip sampler panicked");
                    continue;
                }
            };

            if batch.is_empty() {
                continue;
            }
            let metrics = store.metrics().snapshot();
            tracing::debug!(
                count = batch.len(),
                applied = metrics.applied,
                stale = metrics.stale,
                rejected = metrics.rejected,
                stale_ratio = metrics.stale_ratio(),
                "Re-broadcasting operations"
            );
            if sink.send(batch).await.is_err() {
                break;
            }
        }

        tracing::debug!("Re-broadcast stopped");
    });

    RebroadcastHandle {
        stop_tx: Some(stop_tx),
        task,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TagStoreConfig;
    use crate::types::{ContentHash, OperationKind, PeerKey};
    use std::time::Duration;
    use tempfile::TempDir;

    fn gossip() -> GossipConfig {
        GossipConfig {
            interval_secs: 1,
            min_age_secs: 0,
            batch_size: 10,
        }
    }

    fn store_with_one_op() -> (TempDir, Arc<TagStore>) {
        let dir = TempDir::new().unwrap();
        let store = TagStore::open(&TagStoreConfig::at(dir.path())).unwrap();
        let op = TagOperation::new(
            ContentHash::new(b"infohash".to_vec()),
            "music",
            OperationKind::Add,
            1,
            PeerKey::new(b"peer".to_vec()),
        );
        store.apply_operation(&op, false).unwrap();
        (dir, Arc::new(store))
    }

    #[tokio::test]
    async fn test_rebroadcast_emits_batches() {
        let (_dir, store) = store_with_one_op();
        let (tx, mut rx) = mpsc::channel(4);
        let handle = spawn_rebroadcast(store, gossip(), tx);

        let batch = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("batch in time")
            .expect("channel open");
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].tag, "music");

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_rebroadcast_stops_when_receiver_dropped() {
        let (_dir, store) = store_with_one_op();
        let (tx, rx) = mpsc::channel(4);
        let handle = spawn_rebroadcast(store, gossip(), tx);
        drop(rx);

        tokio::time::timeout(Duration::from_secs(5), async {
            while !handle.is_finished() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("task exits");
    }
}

//! Command handlers for the CLI

use crate::ui;
use crate::{Command, ContentArg};
use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;
use tagdb_core::crypto::hash_content;
use tagdb_core::metrics::MetricsSnapshot;
use tagdb_core::network::spawn_rebroadcast;
use tagdb_core::{
    ContentHash, GossipConfig, LocalTagger, MergeOutcome, TagOperation, TagStore, TagStoreConfig,
};
use tokio::sync::mpsc;

pub async fn run(tagger: &LocalTagger, config: &TagStoreConfig, command: Command) -> Result<()> {
    match command {
        Command::Add { tag, content } => cmd_vote(tagger, &content, &tag, true),
        Command::Remove { tag, content } => cmd_vote(tagger, &content, &tag, false),
        Command::Tags { content } => {
            let tags = tagger.store().tags_for(&resolve(&content)?)?;
            ui::print_list("tags", &tags);
            Ok(())
        }
        Command::Suggestions { content } => {
            let tags = tagger.store().suggestions_for(&resolve(&content)?)?;
            ui::print_list("suggestions", &tags);
            Ok(())
        }
        Command::Contents { tag } => {
            let contents: Vec<String> = tagger
                .store()
                .contents_for(&tag)?
                .iter()
                .map(ContentHash::to_hex)
                .collect();
            ui::print_list("contents", &contents);
            Ok(())
        }
        Command::Label { tag, content } => cmd_label(tagger, &resolve(&content)?, &tag),
        Command::Ingest { path, verify } => cmd_ingest(tagger, &path, verify),
        Command::Gossip { min_age, limit, watch } => {
            let mut gossip = config.gossip;
            if let Some(secs) = min_age {
                gossip.min_age_secs = secs;
            }
            if let Some(limit) = limit {
                gossip.batch_size = limit;
            }
            if watch {
                cmd_gossip_watch(tagger, gossip).await
            } else {
                let sample = tagger.store().sample_for_gossip(gossip.min_age(), gossip.batch_size)?;
                println!("{}", serde_json::to_string_pretty(&sample)?);
                Ok(())
            }
        }
        Command::Reset { tag, content, override_only } => {
            let content = resolve(&content)?;
            let found = if override_only {
                tagger.store().clear_local_override(&content, &tag)?
            } else {
                tagger.store().reset_label(&content, &tag)?
            };
            if found {
                ui::print_success(&format!("Reset {} on {}", tag, content.to_hex()));
            } else {
                ui::print_warning(&format!("No label {} on {}", tag, content.to_hex()));
            }
            Ok(())
        }
        Command::Clock { tag, hash } => cmd_clock(tagger, tag.as_deref(), hash.as_deref()),
        Command::Info => cmd_info(tagger),
    }
}

/// Content hash from `--file` or the hex argument
fn resolve(content: &ContentArg) -> Result<ContentHash> {
    if let Some(path) = &content.file {
        let data = std::fs::read(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        return Ok(hash_content(&data));
    }
    let hex = content.hash.as_deref().context("No content given")?;
    ContentHash::from_hex(hex).with_context(|| format!("Invalid content hash: {}", hex))
}

fn cmd_vote(tagger: &LocalTagger, content: &ContentArg, tag: &str, add: bool) -> Result<()> {
    let content = resolve(content)?;
    let (op, outcome) = if add {
        tagger.add_tag(&content, tag)?
    } else {
        tagger.remove_tag(&content, tag)?
    };

    match outcome {
        MergeOutcome::Applied => ui::print_success(&format!(
            "{} {} on {} (clock {})",
            op.kind,
            op.tag,
            content.to_hex(),
            op.clock
        )),
        MergeOutcome::Stale => ui::print_warning("Operation was already superseded"),
        MergeOutcome::Rejected(reason) => anyhow::bail!("Operation rejected: {}", reason),
    }
    Ok(())
}

fn cmd_label(tagger: &LocalTagger, content: &ContentHash, tag: &str) -> Result<()> {
    match tagger.store().label(content, tag)? {
        Some(label) => {
            let operations = tagger.store().label_operations(content, tag)?;
            ui::print_label(&label, &operations);
        }
        None => ui::print_info(&format!("No label {} on {}", tag, content.to_hex())),
    }
    Ok(())
}

/// What one ingest run did to the store
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IngestReport {
    pub merged: MetricsSnapshot,
    pub bad_signature: usize,
}

/// Merge remote operations the way the transport would
pub fn ingest_operations(store: &TagStore, operations: &[TagOperation], verify: bool) -> Result<IngestReport> {
    let before = store.metrics().snapshot();
    let mut bad_signature = 0;

    for op in operations {
        if verify {
            if let Err(e) = op.verify_signature() {
                tracing::warn!(peer = %op.creator, error = %e, "Dropping operation with bad signature");
                bad_signature += 1;
                continue;
            }
        }
        store.apply_operation(op, false)?;
    }

    Ok(IngestReport {
        merged: store.metrics().snapshot().since(&before),
        bad_signature,
    })
}

fn cmd_ingest(tagger: &LocalTagger, path: &Path, verify: bool) -> Result<()> {
    let data = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let operations: Vec<TagOperation> =
        serde_json::from_slice(&data).context("Failed to parse operations")?;

    let report = ingest_operations(tagger.store(), &operations, verify)?;

    ui::print_success(&format!("Ingested {} operations", operations.len()));
    println!("  {:<16} {}", "applied".bright_green(), report.merged.applied);
    println!("  {:<16} {}", "stale".bright_green(), report.merged.stale);
    println!("  {:<16} {}", "rejected".bright_green(), report.merged.rejected);
    println!("  {:<16} {:.1}%", "redundant".bright_green(), report.merged.stale_ratio() * 100.0);
    if verify {
        println!("  {:<16} {}", "bad signature".bright_green(), report.bad_signature);
    }
    Ok(())
}

async fn cmd_gossip_watch(tagger: &LocalTagger, gossip: GossipConfig) -> Result<()> {
    let (tx, mut rx) = mpsc::channel(16);
    let handle = spawn_rebroadcast(tagger.store().clone(), gossip, tx);
    ui::print_info(&format!(
        "Sampling every {:?}, press Ctrl+C to stop",
        gossip.interval()
    ));

    loop {
        tokio::select! {
            batch = rx.recv() => match batch {
                Some(batch) => println!("{}", serde_json::to_string(&batch)?),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    handle.shutdown().await;
    Ok(())
}

fn cmd_clock(tagger: &LocalTagger, tag: Option<&str>, hash: Option<&str>) -> Result<()> {
    match (tag, hash) {
        (Some(tag), Some(hash)) => {
            let content = ContentHash::from_hex(hash)
                .with_context(|| format!("Invalid content hash: {}", hash))?;
            let clock = tagger.store().get_clock(&content, tag, &tagger.peer_key())?;
            println!("{} {}", "Vote clock:".bright_green(), clock);
        }
        (Some(_), None) => anyhow::bail!("A content hash is required with a tag"),
        _ => {
            let clock = tagger.store().local_clock()?;
            println!("{} {}", "Local clock:".bright_green(), clock);
        }
    }
    Ok(())
}

fn cmd_info(tagger: &LocalTagger) -> Result<()> {
    let store = tagger.store();
    println!("{}", tagdb_core::version::version_string().bright_cyan().bold());
    println!("{} {}", "Build:".bright_green(), tagdb_core::version::BUILD_PROFILE);
    println!("{} {}", "Peer:".bright_green(), tagger.peer_key().to_hex());
    println!("{} {}", "Data:".bright_green(), store.path().display());

    let policy = store.policy();
    println!(
        "{} threshold {}, {:?}",
        "Visibility:".bright_green(),
        policy.show_threshold,
        policy.rule
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tagdb_core::crypto::Keypair;
    use tagdb_core::{OperationKind, PeerKey};
    use tempfile::TempDir;

    fn signed(keypair: &Keypair, tag: &str, kind: OperationKind, clock: u64) -> TagOperation {
        let op = TagOperation::new(ContentHash::new(b"H1".to_vec()), tag, kind, clock, keypair.peer_key());
        let signature = keypair.sign(&op.signing_bytes());
        op.with_signature(signature.to_vec())
    }

    #[test]
    fn test_ingest_reports_merge_outcomes() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let store = TagStore::open(&TagStoreConfig::at(temp_dir.path()))?;
        let peer = Keypair::generate();

        let first = signed(&peer, "music", OperationKind::Add, 1);
        let malformed =
            TagOperation::new(ContentHash::new(Vec::new()), "music", OperationKind::Add, 1, peer.peer_key());
        let operations = vec![first.clone(), first, malformed];

        let report = ingest_operations(&store, &operations, false)?;
        assert_eq!((report.merged.applied, report.merged.stale, report.merged.rejected), (1, 1, 1));
        assert_eq!(report.bad_signature, 0);

        // counts are per run, not since the store was opened
        let again = ingest_operations(&store, &operations[..1], false)?;
        assert_eq!((again.merged.applied, again.merged.stale), (0, 1));
        Ok(())
    }

    #[test]
    fn test_ingest_drops_bad_signatures() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let store = TagStore::open(&TagStoreConfig::at(temp_dir.path()))?;
        let peer = Keypair::generate();

        let mut forged = signed(&peer, "music", OperationKind::Add, 1);
        forged.tag = "video".to_string();
        let unsigned = TagOperation::new(
            ContentHash::new(b"H1".to_vec()),
            "music",
            OperationKind::Add,
            1,
            PeerKey::new(b"peer".to_vec()),
        );
        let operations = vec![signed(&peer, "music", OperationKind::Add, 1), forged, unsigned];

        let report = ingest_operations(&store, &operations, true)?;
        assert_eq!(report.merged.applied, 1);
        assert_eq!(report.bad_signature, 2);
        Ok(())
    }
}

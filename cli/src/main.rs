//! Tagdb CLI - command-line front end to a local tag store
//!
//! Usage:
//!   tagdb --account alice.key add music <infohash>
//!   tagdb --account alice.key tags --file ./album.torrent
//!   tagdb --account alice.key ingest ops.json

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tagdb_core::{LocalTagger, TagStore, TagStoreConfig};

mod account;
mod commands;
mod ui;

use account::AccountManager;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to account keypair file (will be created if it doesn't exist)
    #[arg(short, long, default_value = "tagdb.key")]
    account: PathBuf,

    /// Data directory (defaults to <account>-data)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

/// Content item given either as a hex hash or as a file to hash
#[derive(Args, Debug, Clone)]
pub struct ContentArg {
    /// Content hash (hex)
    #[arg(required_unless_present = "file", conflicts_with = "file")]
    pub hash: Option<String>,

    /// Hash this file with BLAKE3 instead
    #[arg(long)]
    pub file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Vote for a tag on a content item
    Add {
        tag: String,
        #[command(flatten)]
        content: ContentArg,
    },
    /// Vote against a tag on a content item
    Remove {
        tag: String,
        #[command(flatten)]
        content: ContentArg,
    },
    /// Visible tags of a content item
    Tags {
        #[command(flatten)]
        content: ContentArg,
    },
    /// Tags with partial support
    Suggestions {
        #[command(flatten)]
        content: ContentArg,
    },
    /// Content items carrying a visible tag
    Contents { tag: String },
    /// Counters, override and stored votes of one label
    Label {
        tag: String,
        #[command(flatten)]
        content: ContentArg,
    },
    /// Merge remote operations from a JSON file
    Ingest {
        path: PathBuf,
        /// Drop operations whose signature does not verify
        #[arg(long)]
        verify: bool,
    },
    /// Print a re-broadcast sample as JSON
    Gossip {
        /// Minimum age in seconds (config value if omitted)
        #[arg(long)]
        min_age: Option<u64>,
        /// Maximum operations (config value if omitted)
        #[arg(long)]
        limit: Option<usize>,
        /// Keep sampling on the configured interval until Ctrl+C
        #[arg(long)]
        watch: bool,
    },
    /// Drop every vote on a label
    Reset {
        tag: String,
        #[command(flatten)]
        content: ContentArg,
        /// Only forget the local decision
        #[arg(long)]
        override_only: bool,
    },
    /// Local clock and clock of our vote on a label
    Clock {
        tag: Option<String>,
        /// Content hash (hex), required with a tag
        #[arg(requires = "tag")]
        hash: Option<String>,
    },
    /// Version and store settings
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => TagStoreConfig::load(path)?,
        None => TagStoreConfig::default(),
    };
    config.storage_path = cli.data_dir.clone().unwrap_or_else(|| {
        let account_name = cli
            .account
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("tagdb");
        PathBuf::from(format!("{}-data", account_name))
    });

    let mut account_mgr = AccountManager::new(cli.account.clone());
    let keypair = account_mgr.load_or_create()?;
    tracing::debug!(account = account_mgr.username(), peer = %keypair.peer_key(), "Using account");

    let store = Arc::new(TagStore::open(&config)?);
    let tagger = LocalTagger::new(store.clone(), keypair);
    let result = commands::run(&tagger, &config, cli.command).await;

    drop(tagger);
    match Arc::try_unwrap(store) {
        Ok(store) => store.shutdown()?,
        Err(_) => tracing::warn!("Tag store still shared at exit"),
    }

    if let Err(e) = result {
        ui::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
    Ok(())
}

//! Account management - loading/creating the local signing key

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tagdb_core::crypto::Keypair;

#[derive(Debug, Serialize, Deserialize)]
struct AccountFile {
    /// Display name
    username: String,
    /// Ed25519 private key (32 bytes)
    #[serde(with = "serde_bytes")]
    private_key: Vec<u8>,
}

pub struct AccountManager {
    path: PathBuf,
    username: Option<String>,
}

impl AccountManager {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            username: None,
        }
    }

    pub fn username(&self) -> &str {
        self.username.as_deref().unwrap_or("unknown")
    }

    pub fn load_or_create(&mut self) -> Result<Keypair> {
        if self.path.exists() {
            self.load()
        } else {
            self.create()
        }
    }

    fn load(&mut self) -> Result<Keypair> {
        let data = fs::read(&self.path)
            .with_context(|| format!("Failed to read account file: {}", self.path.display()))?;

        let account: AccountFile =
            serde_json::from_slice(&data).context("Failed to parse account file")?;

        let key_bytes: [u8; 32] = account.private_key.as_slice().try_into().map_err(|_| {
            anyhow::anyhow!(
                "Invalid private key length: expected 32 bytes, got {}",
                account.private_key.len()
            )
        })?;

        self.username = Some(account.username);
        tracing::debug!(account = %self.path.display(), "Loaded account");
        Ok(Keypair::from_bytes(&key_bytes))
    }

    fn create(&mut self) -> Result<Keypair> {
        // Name the account after the key file
        let username = self
            .path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("user")
            .to_string();

        let keypair = Keypair::generate();
        let account = AccountFile {
            username: username.clone(),
            private_key: keypair.to_bytes().to_vec(),
        };
        let json = serde_json::to_string_pretty(&account)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, json)
            .with_context(|| format!("Failed to write account file: {}", self.path.display()))?;

        self.username = Some(username);
        eprintln!("Created new account {} at {}", self.username(), self.path.display());
        Ok(keypair)
    }
}

//! Tag store configuration
//!
//! Loaded from a JSON file by the CLI; every field has a default so a
//! partial file is enough.

use crate::policy::VisibilityPolicy;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Store configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagStoreConfig {
    /// Database directory
    pub storage_path: PathBuf,

    /// Visibility threshold and score rule
    pub visibility: VisibilityPolicy,

    /// How long a merge waits for a contended row lock before failing
    pub lock_timeout_ms: u64,

    /// Re-broadcast sampling
    pub gossip: GossipConfig,
}

impl Default for TagStoreConfig {
    fn default() -> Self {
        Self {
            storage_path: PathBuf::from("./tagdb-data"),
            visibility: VisibilityPolicy::default(),
            lock_timeout_ms: 5_000,
            gossip: GossipConfig::default(),
        }
    }
}

impl TagStoreConfig {
    /// Default configuration rooted at `storage_path`
    pub fn at(storage_path: impl Into<PathBuf>) -> Self {
        Self {
            storage_path: storage_path.into(),
            ..Default::default()
        }
    }

    /// Load configuration from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_slice(&data)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?;
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<()> {
        if self.visibility.show_threshold < 1 {
            return Err(Error::Config(format!(
                "show_threshold must be at least 1, got {}",
                self.visibility.show_threshold
            )));
        }
        if self.gossip.interval_secs == 0 {
            return Err(Error::Config("gossip.interval_secs must be positive".into()));
        }
        Ok(())
    }
}

/// Periodic re-broadcast settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GossipConfig {
    /// Seconds between two samples
    pub interval_secs: u64,
    /// Only operations applied at least this long ago are re-broadcast
    pub min_age_secs: u64,
    /// Maximum operations per sample
    pub batch_size: usize,
}

impl Default for GossipConfig {
    fn default() -> Self {
        Self {
            interval_secs: 5,
            min_age_secs: 60,
            batch_size: 10,
        }
    }
}

impl GossipConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn min_age(&self) -> Duration {
        Duration::from_secs(self.min_age_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::ScoreRule;
    use tempfile::TempDir;

    #[test]
    fn test_partial_file_uses_defaults() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("tagdb.json");
        std::fs::write(
            &path,
            r#"{ "storage_path": "/var/lib/tagdb", "visibility": { "rule": "added_only" } }"#,
        )?;

        let config = TagStoreConfig::load(&path)?;
        assert_eq!(config.storage_path, PathBuf::from("/var/lib/tagdb"));
        assert_eq!(config.visibility.rule, ScoreRule::AddedOnly);
        assert_eq!(config.visibility.show_threshold, 2);
        assert_eq!(config.gossip, GossipConfig::default());
        Ok(())
    }

    #[test]
    fn test_rejects_zero_threshold() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("tagdb.json");
        std::fs::write(&path, r#"{ "visibility": { "show_threshold": 0 } }"#)?;

        assert!(matches!(TagStoreConfig::load(&path), Err(Error::Config(_))));
        Ok(())
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            TagStoreConfig::load("/nonexistent/tagdb.json"),
            Err(Error::Config(_))
        ));
    }
}

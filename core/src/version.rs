//! Version information for tagdb
//!
//! This module provides version constants and on-disk compatibility checking.

/// Crate version (semver format)
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// On-disk schema version (incremented on record or key layout changes)
pub const SCHEMA_VERSION: u32 = 1;

/// Git commit hash (if available)
pub const GIT_HASH: Option<&str> = option_env!("GIT_HASH");

/// Build profile (debug/release)
pub const BUILD_PROFILE: &str = if cfg!(debug_assertions) {
    "debug"
} else {
    "release"
};

/// Full version string with metadata
pub fn version_string() -> String {
    let mut version = format!("tagdb v{} (schema {})", VERSION, SCHEMA_VERSION);

    if let Some(hash) = GIT_HASH {
        version.push_str(&format!(" ({})", &hash[..hash.len().min(8)]));
    }

    if BUILD_PROFILE == "debug" {
        version.push_str(" [debug]");
    }

    version
}

/// Check if a database written with `stored` schema can be opened
pub fn is_schema_compatible(stored: u32) -> bool {
    stored == SCHEMA_VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_compatibility() {
        assert!(is_schema_compatible(SCHEMA_VERSION));
        assert!(!is_schema_compatible(SCHEMA_VERSION + 1));
    }

    #[test]
    fn test_version_string() {
        let version_str = version_string();
        assert!(version_str.starts_with(&format!("tagdb v{}", VERSION)));
        assert!(version_str.contains("schema 1"));
    }
}

//! Visibility queries
//!
//! Read-only views over labels. Every query reads through one snapshot so
//! a label's counters and override are never observed half-updated.

use super::{decode, from_prefix, keys, scan_prefix, LabelRecord, TagStore};
use crate::policy::Visibility;
use crate::types::{normalize_tag, ContentHash, OperationKind};
use crate::{Error, Result};
use serde::Serialize;

/// Copy of a label as seen by the local user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelSnapshot {
    pub content_hash: ContentHash,
    pub tag: String,
    pub added_count: u64,
    pub removed_count: u64,
    pub local_override: Option<OperationKind>,
    pub score: i64,
    pub visibility: Visibility,
}

impl TagStore {
    fn snapshot_of(&self, label: LabelRecord) -> LabelSnapshot {
        let score = self.policy.score(label.added_count, label.removed_count);
        let visibility =
            self.policy
                .classify(label.added_count, label.removed_count, label.local_override);
        LabelSnapshot {
            content_hash: label.content_hash(),
            tag: label.tag,
            added_count: label.added_count,
            removed_count: label.removed_count,
            local_override: label.local_override,
            score,
            visibility,
        }
    }

    /// Labels of one content with the given visibility, most supported first
    fn labels_with(&self, content: &ContentHash, wanted: Visibility) -> Result<Vec<String>> {
        let snapshot = self.db.snapshot();
        let prefix = keys::label_prefix(content);
        let rows = scan_prefix(snapshot.iterator(from_prefix(&prefix)), &prefix)?;

        let mut matching = Vec::new();
        for (_, value) in rows {
            let label: LabelRecord = decode(&value)?;
            let visibility =
                self.policy
                    .classify(label.added_count, label.removed_count, label.local_override);
            if visibility == wanted {
                let score = self.policy.score(label.added_count, label.removed_count);
                matching.push((score, label.created_seq, label.tag));
            }
        }

        matching.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        Ok(matching.into_iter().map(|(_, _, tag)| tag).collect())
    }

    /// Visible tags of a content item, most supported first
    pub fn tags_for(&self, content: &ContentHash) -> Result<Vec<String>> {
        tracing::trace!(content = %content, "Get tags");
        self.labels_with(content, Visibility::Visible)
    }

    /// Tags with partial, below-threshold support
    pub fn suggestions_for(&self, content: &ContentHash) -> Result<Vec<String>> {
        tracing::trace!(content = %content, "Get suggestions");
        self.labels_with(content, Visibility::Suggested)
    }

    /// Content items on which `tag` is visible, oldest label first
    pub fn contents_for(&self, tag: &str) -> Result<Vec<ContentHash>> {
        let tag = normalize_tag(tag);
        let snapshot = self.db.snapshot();
        let prefix = keys::tag_label_prefix(&tag);
        let rows = scan_prefix(snapshot.iterator(from_prefix(&prefix)), &prefix)?;

        let mut matching = Vec::new();
        for (key, _) in rows {
            let Some(content) = keys::content_from_tag_label(&tag, &key) else {
                continue;
            };
            let stored = snapshot
                .get(keys::label(&content, &tag))
                .map_err(|e| Error::Storage(format!("Failed to read label: {}", e)))?;
            let Some(bytes) = stored else {
                continue;
            };
            let label: LabelRecord = decode(&bytes)?;
            let visibility =
                self.policy
                    .classify(label.added_count, label.removed_count, label.local_override);
            if visibility == Visibility::Visible {
                matching.push((label.created_seq, content));
            }
        }

        matching.sort_by_key(|(seq, _)| *seq);
        Ok(matching.into_iter().map(|(_, content)| content).collect())
    }

    /// Current state of one label, if it exists
    pub fn label(&self, content: &ContentHash, tag: &str) -> Result<Option<LabelSnapshot>> {
        Ok(self
            .read_label(content, &normalize_tag(tag))?
            .map(|label| self.snapshot_of(label)))
    }
}

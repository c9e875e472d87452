//! Scoring and visibility policy
//!
//! Turns a label's aggregate counters and local override into one of three
//! states. The local user's own decision always wins; otherwise the score
//! is compared against the show threshold.

use crate::types::OperationKind;
use serde::{Deserialize, Serialize};

/// Default number of net supporting peers needed to show a tag
pub const SHOW_THRESHOLD: i64 = 2;

/// How a label's support is computed from its counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreRule {
    /// `added_count - removed_count`
    #[default]
    NetScore,
    /// `added_count` alone; removals never offset additions
    AddedOnly,
}

/// What the local user sees for a label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Confirmed tag
    Visible,
    /// Partial support, shown as a low-confidence candidate
    Suggested,
    Hidden,
}

/// Threshold and score rule, configurable as one unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisibilityPolicy {
    pub show_threshold: i64,
    pub rule: ScoreRule,
}

impl Default for VisibilityPolicy {
    fn default() -> Self {
        Self {
            show_threshold: SHOW_THRESHOLD,
            rule: ScoreRule::NetScore,
        }
    }
}

impl VisibilityPolicy {
    pub fn score(&self, added_count: u64, removed_count: u64) -> i64 {
        let added = added_count as i64;
        match self.rule {
            ScoreRule::NetScore => added - removed_count as i64,
            ScoreRule::AddedOnly => added,
        }
    }

    /// Classify a label from its counters and override
    pub fn classify(
        &self,
        added_count: u64,
        removed_count: u64,
        local_override: Option<OperationKind>,
    ) -> Visibility {
        match local_override {
            Some(OperationKind::Add) => Visibility::Visible,
            Some(OperationKind::Remove) => Visibility::Hidden,
            None => {
                let score = self.score(added_count, removed_count);
                if score >= self.show_threshold {
                    Visibility::Visible
                } else if score > 0 {
                    Visibility::Suggested
                } else {
                    Visibility::Hidden
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_show_condition() {
        let policy = VisibilityPolicy::default();

        assert_eq!(policy.classify(0, 0, Some(OperationKind::Add)), Visibility::Visible);
        assert_eq!(policy.classify(2, 0, None), Visibility::Visible);
        assert_eq!(policy.classify(0, 0, None), Visibility::Hidden);
    }

    #[test]
    fn test_suggestion_band() {
        let policy = VisibilityPolicy::default();

        assert_eq!(policy.classify(1, 0, None), Visibility::Suggested);
        assert_eq!(policy.classify(2, 1, None), Visibility::Suggested);
        assert_eq!(policy.classify(2, 2, None), Visibility::Hidden);
        assert_eq!(policy.classify(2, 4, None), Visibility::Hidden);
    }

    #[test]
    fn test_override_ignores_score() {
        let policy = VisibilityPolicy::default();

        assert_eq!(policy.classify(10, 0, Some(OperationKind::Remove)), Visibility::Hidden);
        assert_eq!(policy.classify(0, 10, Some(OperationKind::Add)), Visibility::Visible);
    }

    #[test]
    fn test_added_only_rule() {
        let policy = VisibilityPolicy {
            show_threshold: 2,
            rule: ScoreRule::AddedOnly,
        };

        assert_eq!(policy.score(2, 5), 2);
        assert_eq!(policy.classify(2, 5, None), Visibility::Visible);
        assert_eq!(policy.classify(1, 0, None), Visibility::Suggested);
    }

    #[test]
    fn test_custom_threshold() {
        let policy = VisibilityPolicy {
            show_threshold: 3,
            ..Default::default()
        };

        assert_eq!(policy.classify(2, 0, None), Visibility::Suggested);
        assert_eq!(policy.classify(3, 0, None), Visibility::Visible);
    }
}

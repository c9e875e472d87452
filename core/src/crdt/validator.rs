//! Tag operation validation
//!
//! Structural checks run before the merge engine touches storage. Anything
//! rejected here leaves no trace in the database.

use crate::crdt::TagOperation;
use crate::types::normalize_tag;

/// Validation result for a tag operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    /// Operation is well-formed and can be merged
    Accept,
    /// Operation is malformed and must not be merged
    Reject(RejectionReason),
}

/// Reason why an operation was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RejectionReason {
    #[error("content hash is empty")]
    EmptyContentHash,

    #[error("tag text is empty")]
    EmptyTag,

    #[error("creator public key is empty")]
    EmptyPeerKey,
}

/// Validate the structure of an operation
pub fn validate(op: &TagOperation) -> ValidationResult {
    if op.content_hash.is_empty() {
        return ValidationResult::Reject(RejectionReason::EmptyContentHash);
    }

    if normalize_tag(&op.tag).is_empty() {
        return ValidationResult::Reject(RejectionReason::EmptyTag);
    }

    if op.creator.is_empty() {
        return ValidationResult::Reject(RejectionReason::EmptyPeerKey);
    }

    ValidationResult::Accept
}

//! Tag operations and their validation
//!
//! This module holds the replicated unit of the tag store:
//! - `TagOperation`, one peer's signed labeling decision
//! - structural validation run before any merge

pub mod ops;
pub mod validator;

pub use ops::TagOperation;
pub use validator::{validate, RejectionReason, ValidationResult};

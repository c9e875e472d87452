//! Networking module
//!
//! Transport-agnostic gossip plumbing. The node's transport owns a
//! receiver and forwards each batch to its peers; inbound operations are
//! handed straight to [`TagStore::apply_operation`](crate::storage::TagStore::apply_operation).

pub mod rebroadcast;

pub use rebroadcast::{spawn_rebroadcast, RebroadcastHandle};

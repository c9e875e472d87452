//! Key construction helpers
//!
//! Composite keys length-prefix every variable part (u32, big endian) so a
//! prefix scan over one content or one tag never bleeds into another.

use crate::types::{ContentHash, PeerKey};

const PEER: &[u8] = b"peer:";
const CONTENT: &[u8] = b"content:";
const TAG: &[u8] = b"tag:";
const LABEL: &[u8] = b"label:";
const TAG_LABEL: &[u8] = b"tag_label:";
const LABEL_OP: &[u8] = b"label_op:";

pub const LOCAL_PEER: &[u8] = b"meta:local_peer";
pub const LABEL_SEQ: &[u8] = b"meta:label_seq";
pub const SCHEMA_VERSION: &[u8] = b"meta:schema_version";

fn push_part(key: &mut Vec<u8>, part: &[u8]) {
    key.extend_from_slice(&(part.len() as u32).to_be_bytes());
    key.extend_from_slice(part);
}

pub fn peer(key: &PeerKey) -> Vec<u8> {
    [PEER, key.as_bytes()].concat()
}

pub fn content(hash: &ContentHash) -> Vec<u8> {
    [CONTENT, hash.as_bytes()].concat()
}

pub fn tag(name: &str) -> Vec<u8> {
    [TAG, name.as_bytes()].concat()
}

/// All labels of one content
pub fn label_prefix(hash: &ContentHash) -> Vec<u8> {
    let mut key = LABEL.to_vec();
    push_part(&mut key, hash.as_bytes());
    key
}

pub fn label(hash: &ContentHash, tag: &str) -> Vec<u8> {
    let mut key = label_prefix(hash);
    key.extend_from_slice(tag.as_bytes());
    key
}

/// Index entries of one tag, one per content
pub fn tag_label_prefix(tag: &str) -> Vec<u8> {
    let mut key = TAG_LABEL.to_vec();
    push_part(&mut key, tag.as_bytes());
    key
}

pub fn tag_label(tag: &str, hash: &ContentHash) -> Vec<u8> {
    let mut key = tag_label_prefix(tag);
    key.extend_from_slice(hash.as_bytes());
    key
}

/// Recover the content hash from a `tag_label` key
pub fn content_from_tag_label(tag: &str, key: &[u8]) -> Option<ContentHash> {
    let prefix_len = tag_label_prefix(tag).len();
    key.get(prefix_len..).map(ContentHash::from)
}

/// Every label operation in the store
pub fn all_label_ops() -> &'static [u8] {
    LABEL_OP
}

/// All label operations of one label
pub fn label_op_prefix(hash: &ContentHash, tag: &str) -> Vec<u8> {
    let mut key = LABEL_OP.to_vec();
    push_part(&mut key, hash.as_bytes());
    push_part(&mut key, tag.as_bytes());
    key
}

pub fn label_op(hash: &ContentHash, tag: &str, peer: &PeerKey) -> Vec<u8> {
    let mut key = label_op_prefix(hash, tag);
    key.extend_from_slice(peer.as_bytes());
    key
}

//! Content hashing for upload deduplication.

use sha2::{Digest, Sha256};

/// Compute the content hash of raw document bytes.
///
/// A pure function of the byte content only; together with the owner id it
/// forms the cache key for recognizing repeated uploads of identical content.
pub fn content_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

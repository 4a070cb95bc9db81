//! Content hashing for change detection.

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of file contents. Equal hashes mean equal bytes for
/// sync purposes.
pub fn content_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

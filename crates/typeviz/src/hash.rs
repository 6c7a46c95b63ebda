//! Content hashing for cache keys.
//!
//! Digests are SHA-256 rendered as lowercase hex, so they are stable across
//! runs, processes and platforms. Hashing is provided by the `content-hash`
//! feature; without it [`compute_hash`] returns `None` and callers skip
//! caching for that input.

use std::fmt;

/// Hex-encoded content digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentHash(String);

impl ContentHash {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compute the digest of `bytes`, or `None` when hashing is unavailable.
#[cfg(feature = "content-hash")]
pub fn compute_hash(bytes: impl AsRef<[u8]>) -> Option<ContentHash> {
    use sha2::{Digest, Sha256};

    Some(ContentHash(format!("{:x}", Sha256::digest(bytes.as_ref()))))
}

/// Compute the digest of `bytes`, or `None` when hashing is unavailable.
#[cfg(not(feature = "content-hash"))]
pub fn compute_hash(bytes: impl AsRef<[u8]>) -> Option<ContentHash> {
    let _ = bytes;
    None
}

//! Content digests for change detection.
//!
//! Compiled-interface artifacts are identified by SHA-256 of their bytes;
//! a module row stores the digest of the artifact it was last derived from.

use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

/// Compute the SHA-256 digest of a byte slice as lowercase hex
pub fn digest_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Compute the SHA-256 digest of a file's contents
///
/// # Returns
/// None if the file cannot be read; the change detector treats a missing
/// digest as "needs processing".
pub fn digest_file(path: &Path) -> Option<String> {
    fs::read(path).ok().map(|bytes| digest_bytes(&bytes))
}

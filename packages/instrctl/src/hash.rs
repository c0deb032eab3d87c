//! Content hashing helpers.

use sha2::{Digest, Sha256};

/// SHA-256 digest of the given bytes as a lowercase hex string.
pub fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

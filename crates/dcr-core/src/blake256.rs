//! BLAKE-256 (14 rounds), the hash function behind Decred transaction ids,
//! address checksums and `hash160`.
//!
//! Decred kept the original SHA-3 finalist rather than BLAKE2; the digest
//! comes from the RustCrypto `blake-hash` crate.

use blake_hash::{Blake256, Digest};

/// Digest length in bytes.
pub const DIGEST_LEN: usize = 32;

/// Compute the BLAKE-256 digest of `data`.
pub fn blake256(data: &[u8]) -> [u8; DIGEST_LEN] {
    let mut hasher = Blake256::new();
    hasher.update(data);
    let mut out = [0u8; DIGEST_LEN];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// `BLAKE256(BLAKE256(data))`.
pub fn double_blake256(data: &[u8]) -> [u8; DIGEST_LEN] {
    blake256(&blake256(data))
}

//! Random identifier generation: version IDs and temp-file suffixes.
//!
//! `spec.md` §4.2 requires version IDs drawn from a 128-bit cryptographically
//! random value, not wall time, to keep them globally unique within a
//! `(bucket, key)` pair without any shared counter.

use rand::RngCore;

/// 32 lowercase hex characters from 16 random bytes. Used as a
/// `VersionStore` version id.
#[must_use]
pub fn generate_version_id() -> String {
    random_hex(16)
}

/// A short random hex suffix for disambiguating concurrent sibling temp
/// files during atomic write.
#[must_use]
pub fn random_hex_suffix() -> String {
    random_hex(8)
}

fn random_hex(byte_len: usize) -> String {
    let mut bytes = vec![0u8; byte_len];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

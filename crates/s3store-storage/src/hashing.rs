//! MD5 ETag computation.
//!
//! S3 ETags for non-multipart objects are the lowercase hex MD5 digest of
//! the full payload (`spec.md` §3). MD5 is used here purely for wire
//! compatibility with S3 clients, never for anything security-sensitive.

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use md5::{Digest, Md5};

/// Lowercase hex MD5 of `payload`, suitable for use as an `ETag`.
#[must_use]
pub fn md5_hex(payload: &[u8]) -> String {
    hex::encode(Md5::digest(payload))
}

/// Base64-encoded MD5 of `payload`, matching the wire form of the
/// `Content-MD5` request header.
#[must_use]
pub fn md5_base64(payload: &[u8]) -> String {
    BASE64_STANDARD.encode(Md5::digest(payload))
}

/// The MD5 of an empty payload, used for delete markers (`spec.md` §3:
/// "if true, payload bytes are empty").
#[must_use]
pub fn empty_payload_md5_hex() -> String {
    md5_hex(b"")
}

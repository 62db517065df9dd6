//! Lowercase hex encode/decode and constant-time comparison.
//!
//! SigV4 signatures, payload hashes, and version IDs are all rendered as
//! lowercase hex. Comparisons of untrusted, attacker-influenced hex strings
//! (signatures) must not leak timing information about where the first
//! mismatched byte is, hence [`ct_eq_hex`] rather than `==`.

use subtle::ConstantTimeEq;

/// Encode bytes as a lowercase hex string.
#[must_use]
pub fn encode(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Decode a lowercase (or mixed-case) hex string into bytes.
///
/// # Errors
///
/// Returns `Err` if the input has odd length or contains non-hex characters.
pub fn decode(s: &str) -> Result<Vec<u8>, hex::FromHexError> {
    hex::decode(s)
}

/// Compare two hex strings in constant time with respect to their content.
///
/// Returns `false` immediately (non-constant-time) if the lengths differ,
/// since length is not secret for SigV4 signatures (both sides know the
/// expected digest size). Byte content is compared in constant time.
#[must_use]
pub fn ct_eq_hex(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Compare two raw byte buffers in constant time.
#[must_use]
pub fn ct_eq_bytes(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_round_trip_encode_decode() {
        let bytes = [0xDE, 0xAD, 0xBE, 0xEF];
        let encoded = encode(&bytes);
        assert_eq!(encoded, "deadbeef");
        assert_eq!(decode(&encoded).unwrap(), bytes.to_vec());
    }

    #[test]
    fn test_should_reject_odd_length_hex() {
        assert!(decode("abc").is_err());
    }

    #[test]
    fn test_ct_eq_hex_matches_equal_strings() {
        assert!(ct_eq_hex("deadbeef", "deadbeef"));
    }

    #[test]
    fn test_ct_eq_hex_rejects_mismatched_strings() {
        assert!(!ct_eq_hex("deadbeef", "deadbeee"));
    }

    #[test]
    fn test_ct_eq_hex_rejects_different_lengths() {
        assert!(!ct_eq_hex("dead", "deadbeef"));
    }

    #[test]
    fn test_ct_eq_bytes_matches_equal_slices() {
        assert!(ct_eq_bytes(b"abc", b"abc"));
        assert!(!ct_eq_bytes(b"abc", b"abd"));
        assert!(!ct_eq_bytes(b"abc", b"ab"));
    }
}

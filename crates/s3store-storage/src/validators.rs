//! Bucket-name, content-type, and `Content-MD5` validation (`spec.md` §4.7).

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;

use crate::error::StorageError;
use crate::hashing::md5_base64;

/// Validate an S3 bucket name: 3-63 chars, lowercase letters/digits/hyphens/
/// dots, no leading/trailing hyphen or dot, no adjacent dots, no `dot-`/
/// `-dot` runs, and not shaped like a dotted-quad IPv4 address.
///
/// # Errors
///
/// [`StorageError::InvalidBucketName`] describing which rule failed.
pub fn validate_bucket_name(name: &str) -> Result<(), StorageError> {
    if name.len() < 3 || name.len() > 63 {
        return Err(invalid("must be 3-63 characters"));
    }
    if !name.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'.') {
        return Err(invalid("must contain only lowercase letters, digits, hyphens, and dots"));
    }
    let first = name.as_bytes()[0];
    let last = name.as_bytes()[name.len() - 1];
    if first == b'-' || first == b'.' || last == b'-' || last == b'.' {
        return Err(invalid("must not start or end with a hyphen or dot"));
    }
    if name.contains("..") {
        return Err(invalid("must not contain adjacent dots"));
    }
    if name.contains(".-") || name.contains("-.") {
        return Err(invalid("must not contain a dot adjacent to a hyphen"));
    }
    if looks_like_ipv4(name) {
        return Err(invalid("must not be formatted as an IPv4 address"));
    }
    Ok(())
}

fn looks_like_ipv4(name: &str) -> bool {
    let parts: Vec<&str> = name.split('.').collect();
    if parts.len() != 4 {
        return false;
    }
    parts.iter().all(|p| !p.is_empty() && p.len() <= 3 && p.bytes().all(|b| b.is_ascii_digit()) && p.parse::<u16>().is_ok_and(|v| v <= 255))
}

fn invalid(reason: &str) -> StorageError {
    StorageError::InvalidBucketName(reason.to_owned())
}

/// Validate a `Content-Type` value: 1-255 printable ASCII bytes (no CR, LF,
/// tab, null, or extended bytes) that parse as `type/subtype[; params]*`
/// per RFC 6838.
///
/// # Errors
///
/// [`StorageError::InvalidContentType`] describing which rule failed.
pub fn validate_content_type(value: &str) -> Result<(), StorageError> {
    if value.is_empty() || value.len() > 255 {
        return Err(StorageError::InvalidContentType("must be 1-255 characters".to_owned()));
    }
    if !value.bytes().all(|b| (0x20..=0x7E).contains(&b)) {
        return Err(StorageError::InvalidContentType(
            "must contain only printable ASCII characters".to_owned(),
        ));
    }
    value
        .parse::<mime::Mime>()
        .map(|_| ())
        .map_err(|_| StorageError::InvalidContentType(format!("not a valid media type: {value}")))
}

/// Validate an optional `Content-MD5` header against `payload`.
///
/// `declared` is the raw header value, if present; a missing header is not
/// an error (`spec.md` §2 calls the check "optional").
///
/// # Errors
///
/// [`StorageError::InvalidContentMd5`] if `declared` isn't valid base64 or
/// doesn't decode to a 16-byte digest, [`StorageError::ContentMd5Mismatch`]
/// if it doesn't match the MD5 of `payload`.
pub fn validate_content_md5(declared: Option<&str>, payload: &[u8]) -> Result<(), StorageError> {
    let Some(declared) = declared else {
        return Ok(());
    };
    let decoded = BASE64_STANDARD
        .decode(declared)
        .map_err(|_| StorageError::InvalidContentMd5("not valid base64".to_owned()))?;
    if decoded.len() != 16 {
        return Err(StorageError::InvalidContentMd5("must decode to a 16-byte MD5 digest".to_owned()));
    }
    if md5_base64(payload) != declared {
        return Err(StorageError::ContentMd5Mismatch);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_accept_valid_bucket_name() {
        assert!(validate_bucket_name("my-bucket.2024").is_ok());
    }

    #[test]
    fn test_should_reject_too_short_bucket_name() {
        assert!(validate_bucket_name("ab").is_err());
    }

    #[test]
    fn test_should_reject_too_long_bucket_name() {
        assert!(validate_bucket_name(&"a".repeat(64)).is_err());
    }

    #[test]
    fn test_should_reject_uppercase_characters() {
        assert!(validate_bucket_name("MyBucket").is_err());
    }

    #[test]
    fn test_should_reject_leading_or_trailing_hyphen_or_dot() {
        assert!(validate_bucket_name("-bucket").is_err());
        assert!(validate_bucket_name("bucket-").is_err());
        assert!(validate_bucket_name(".bucket").is_err());
        assert!(validate_bucket_name("bucket.").is_err());
    }

    #[test]
    fn test_should_reject_adjacent_dots() {
        assert!(validate_bucket_name("my..bucket").is_err());
    }

    #[test]
    fn test_should_reject_dot_hyphen_adjacency() {
        assert!(validate_bucket_name("my.-bucket").is_err());
        assert!(validate_bucket_name("my-.bucket").is_err());
    }

    #[test]
    fn test_should_reject_ipv4_shaped_name() {
        assert!(validate_bucket_name("192.168.1.1").is_err());
    }

    #[test]
    fn test_should_accept_valid_content_type() {
        assert!(validate_content_type("text/plain; charset=utf-8").is_ok());
    }

    #[test]
    fn test_should_reject_content_type_with_control_characters() {
        assert!(validate_content_type("text/plain\r\n").is_err());
    }

    #[test]
    fn test_should_reject_malformed_content_type() {
        assert!(validate_content_type("not-a-mime-type").is_err());
    }

    #[test]
    fn test_should_reject_empty_content_type() {
        assert!(validate_content_type("").is_err());
    }

    #[test]
    fn test_should_accept_missing_content_md5() {
        assert!(validate_content_md5(None, b"Hi").is_ok());
    }

    #[test]
    fn test_should_accept_matching_content_md5() {
        assert!(validate_content_md5(Some("waUpj5Oeh+j5YqXt/CBpGA=="), b"Hi").is_ok());
    }

    #[test]
    fn test_should_reject_malformed_content_md5() {
        assert!(matches!(validate_content_md5(Some("not base64!!"), b"Hi"), Err(StorageError::InvalidContentMd5(_))));
    }

    #[test]
    fn test_should_reject_mismatched_content_md5() {
        assert!(matches!(
            validate_content_md5(Some("waUpj5Oeh+j5YqXt/CBpGA=="), b"Bye"),
            Err(StorageError::ContentMd5Mismatch)
        ));
    }
}

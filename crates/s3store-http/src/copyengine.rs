//! `x-amz-copy-source` resolution for `PUT {destBucket}/{destKey}` copy
//! requests (`spec.md` §4.6).

use percent_encoding::percent_decode_str;

use crate::error::DispatchError;

/// A copy source resolved from `x-amz-copy-source`: `/bucket/key`,
/// percent-decoded and split on the first remaining `/`. The header may or
/// may not carry the leading slash; both forms are accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopySource {
    pub bucket: String,
    pub key: String,
}

/// Parse an `x-amz-copy-source` header value.
///
/// # Errors
///
/// [`DispatchError::invalid_argument`] if the header has no `/` separator
/// after decoding, or either half is empty.
pub fn parse_copy_source(header: &str) -> Result<CopySource, DispatchError> {
    let decoded = percent_decode_str(header).decode_utf8_lossy().into_owned();
    let trimmed = decoded.trim_start_matches('/');
    let (bucket, key) = trimmed
        .split_once('/')
        .ok_or_else(|| DispatchError::invalid_argument("x-amz-copy-source must be of the form /bucket/key"))?;

    if bucket.is_empty() || key.is_empty() {
        return Err(DispatchError::invalid_argument("x-amz-copy-source must name a bucket and a key"));
    }

    Ok(CopySource { bucket: bucket.to_owned(), key: key.to_owned() })
}

/// Whether `x-amz-metadata-directive: REPLACE` was requested; any other
/// value (including absence) means "copy metadata from the source".
#[must_use]
pub fn is_replace_directive(header: Option<&str>) -> bool {
    header.is_some_and(|v| v.eq_ignore_ascii_case("REPLACE"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_parse_copy_source_with_leading_slash() {
        let source = parse_copy_source("/src-bucket/a/b.txt").unwrap();
        assert_eq!(source.bucket, "src-bucket");
        assert_eq!(source.key, "a/b.txt");
    }

    #[test]
    fn test_should_parse_copy_source_without_leading_slash() {
        let source = parse_copy_source("src-bucket/key").unwrap();
        assert_eq!(source.bucket, "src-bucket");
        assert_eq!(source.key, "key");
    }

    #[test]
    fn test_should_percent_decode_copy_source() {
        let source = parse_copy_source("/src-bucket/hello%20world.txt").unwrap();
        assert_eq!(source.key, "hello world.txt");
    }

    #[test]
    fn test_should_reject_copy_source_without_separator() {
        assert!(parse_copy_source("src-bucket").is_err());
    }

    #[test]
    fn test_should_reject_copy_source_with_empty_key() {
        assert!(parse_copy_source("/src-bucket/").is_err());
    }

    #[test]
    fn test_should_detect_replace_directive_case_insensitively() {
        assert!(is_replace_directive(Some("replace")));
        assert!(is_replace_directive(Some("REPLACE")));
        assert!(!is_replace_directive(Some("COPY")));
        assert!(!is_replace_directive(None));
    }
}

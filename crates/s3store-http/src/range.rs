//! `Range: bytes=...` parsing for object GET (`spec.md` §4.6).
//!
//! Only a single `bytes=` range is supported; multi-range requests and any
//! other unit are treated as "no range" (a full read), matching the
//! fallback the spec calls for rather than returning `416`.

use std::ops::RangeInclusive;

/// Parse a `Range` header value into an inclusive byte range against a
/// known object `size`. Returns `None` when the header is absent, uses a
/// unit other than `bytes`, names more than one range, or is otherwise
/// invalid — callers fall back to a full read in every such case.
#[must_use]
pub fn parse_range(header: &str, size: u64) -> Option<RangeInclusive<u64>> {
    let spec = header.strip_prefix("bytes=")?;
    if spec.contains(',') {
        return None;
    }
    let (start, end) = spec.split_once('-')?;

    if start.is_empty() {
        // Suffix range: bytes=-n, the last n bytes.
        let suffix_len: u64 = end.parse().ok()?;
        if suffix_len == 0 || size == 0 {
            return None;
        }
        let suffix_len = suffix_len.min(size);
        return Some((size - suffix_len)..=(size - 1));
    }

    let start: u64 = start.parse().ok()?;
    if start >= size {
        return None;
    }
    if end.is_empty() {
        return Some(start..=(size - 1));
    }
    let end: u64 = end.parse().ok()?;
    if end < start {
        return None;
    }
    Some(start..=end.min(size - 1))
}

/// Format the `Content-Range` response header for a resolved range.
#[must_use]
pub fn content_range_header(range: &RangeInclusive<u64>, size: u64) -> String {
    format!("bytes {}-{}/{size}", range.start(), range.end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_parse_bounded_range() {
        assert_eq!(parse_range("bytes=2-5", 10), Some(2..=5));
    }

    #[test]
    fn test_should_clamp_end_to_size_minus_one() {
        assert_eq!(parse_range("bytes=2-100", 10), Some(2..=9));
    }

    #[test]
    fn test_should_parse_open_ended_range() {
        assert_eq!(parse_range("bytes=5-", 10), Some(5..=9));
    }

    #[test]
    fn test_should_parse_suffix_range() {
        assert_eq!(parse_range("bytes=-3", 10), Some(7..=9));
    }

    #[test]
    fn test_should_clamp_suffix_longer_than_object() {
        assert_eq!(parse_range("bytes=-100", 10), Some(0..=9));
    }

    #[test]
    fn test_should_reject_start_beyond_size() {
        assert_eq!(parse_range("bytes=20-25", 10), None);
    }

    #[test]
    fn test_should_reject_multi_range_spec() {
        assert_eq!(parse_range("bytes=0-1,3-4", 10), None);
    }

    #[test]
    fn test_should_reject_non_bytes_unit() {
        assert_eq!(parse_range("items=0-1", 10), None);
    }

    #[test]
    fn test_should_reject_inverted_range() {
        assert_eq!(parse_range("bytes=5-2", 10), None);
    }

    #[test]
    fn test_should_format_content_range_header() {
        assert_eq!(content_range_header(&(2..=5), 10), "bytes 2-5/10");
    }
}

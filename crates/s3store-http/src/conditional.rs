//! Conditional-header evaluation: `If-Match`, `If-None-Match`,
//! `If-Modified-Since`, `If-Unmodified-Since` (`spec.md` §4.6).
//!
//! Applied after metadata is read, before payload bytes are returned, on
//! both plain object reads and the analogous `x-amz-copy-source-if-*`
//! headers for copy.

use chrono::{DateTime, Utc};
use http::HeaderMap;

use s3store_auth::datecodec::{parse_http_date, truncate_to_seconds};

use crate::error::DispatchError;

/// The subset of conditional headers relevant to one evaluation, already
/// pulled out of either the regular request headers or the
/// `x-amz-copy-source-if-*` set.
#[derive(Debug, Clone, Default)]
pub struct Preconditions<'a> {
    pub if_match: Option<&'a str>,
    pub if_none_match: Option<&'a str>,
    pub if_modified_since: Option<&'a str>,
    pub if_unmodified_since: Option<&'a str>,
}

impl<'a> Preconditions<'a> {
    /// Pull `If-Match`/`If-None-Match`/`If-Modified-Since`/`If-Unmodified-Since`
    /// out of a request's headers.
    #[must_use]
    pub fn from_headers(headers: &'a HeaderMap) -> Self {
        Self {
            if_match: headers.get("if-match").and_then(|v| v.to_str().ok()),
            if_none_match: headers.get("if-none-match").and_then(|v| v.to_str().ok()),
            if_modified_since: headers.get("if-modified-since").and_then(|v| v.to_str().ok()),
            if_unmodified_since: headers.get("if-unmodified-since").and_then(|v| v.to_str().ok()),
        }
    }

    /// Pull the copy-source equivalents (`x-amz-copy-source-if-*`) out of a
    /// request's headers.
    #[must_use]
    pub fn from_copy_source_headers(headers: &'a HeaderMap) -> Self {
        Self {
            if_match: headers.get("x-amz-copy-source-if-match").and_then(|v| v.to_str().ok()),
            if_none_match: headers.get("x-amz-copy-source-if-none-match").and_then(|v| v.to_str().ok()),
            if_modified_since: headers.get("x-amz-copy-source-if-modified-since").and_then(|v| v.to_str().ok()),
            if_unmodified_since: headers.get("x-amz-copy-source-if-unmodified-since").and_then(|v| v.to_str().ok()),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.if_match.is_none() && self.if_none_match.is_none() && self.if_modified_since.is_none() && self.if_unmodified_since.is_none()
    }

    /// Evaluate against an object's current `etag` (unquoted) and
    /// `updated_at`. Returns `Ok(())` if the request may proceed,
    /// otherwise the `304`/`412` to short-circuit with.
    ///
    /// # Errors
    ///
    /// [`DispatchError::not_modified`] or
    /// [`DispatchError::precondition_failed`].
    pub fn evaluate(&self, etag: &str, updated_at: DateTime<Utc>) -> Result<(), DispatchError> {
        if let Some(header) = self.if_match {
            if !etag_matches_any(header, etag) {
                return Err(DispatchError::precondition_failed("At least one of the pre-conditions you specified did not hold"));
            }
        }
        if let Some(header) = self.if_unmodified_since {
            if let Some(since) = parse_http_date(header) {
                if truncate_to_seconds(updated_at) > truncate_to_seconds(since) {
                    return Err(DispatchError::precondition_failed("At least one of the pre-conditions you specified did not hold"));
                }
            }
        }
        if let Some(header) = self.if_none_match {
            if etag_matches_any(header, etag) {
                return Err(DispatchError::not_modified());
            }
        }
        if let Some(header) = self.if_modified_since {
            if let Some(since) = parse_http_date(header) {
                if truncate_to_seconds(updated_at) <= truncate_to_seconds(since) {
                    return Err(DispatchError::not_modified());
                }
            }
        }
        Ok(())
    }
}

/// `If-Match: *` / `If-None-Match: *` always matches. Otherwise the header
/// is a comma-separated list of quoted or bare ETags, any of which may
/// match.
fn etag_matches_any(header: &str, etag: &str) -> bool {
    header.split(',').map(str::trim).any(|candidate| {
        let unquoted = candidate.trim_start_matches('W').trim_start_matches('/').trim_matches('"');
        candidate == "*" || unquoted == etag
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(secs_offset: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::seconds(secs_offset)
    }

    #[test]
    fn test_should_pass_if_match_wildcard() {
        let pre = Preconditions { if_match: Some("*"), ..Default::default() };
        assert!(pre.evaluate("abc", ts(0)).is_ok());
    }

    #[test]
    fn test_should_fail_if_match_mismatch() {
        let pre = Preconditions { if_match: Some("\"zzz\""), ..Default::default() };
        let err = pre.evaluate("abc", ts(0)).unwrap_err();
        assert_eq!(err.status, http::StatusCode::PRECONDITION_FAILED);
    }

    #[test]
    fn test_should_return_not_modified_on_if_none_match_hit() {
        let pre = Preconditions { if_none_match: Some("\"abc\""), ..Default::default() };
        let err = pre.evaluate("abc", ts(0)).unwrap_err();
        assert_eq!(err.status, http::StatusCode::NOT_MODIFIED);
    }

    #[test]
    fn test_should_accept_unquoted_and_quoted_etags_interchangeably() {
        let pre = Preconditions { if_match: Some("abc"), ..Default::default() };
        assert!(pre.evaluate("abc", ts(0)).is_ok());
    }

    #[test]
    fn test_should_fail_if_unmodified_since_when_object_is_newer() {
        let pre = Preconditions {
            if_unmodified_since: Some("Mon, 01 Jan 2024 00:00:00 GMT"),
            ..Default::default()
        };
        let err = pre.evaluate("abc", ts(60)).unwrap_err();
        assert_eq!(err.status, http::StatusCode::PRECONDITION_FAILED);
    }

    #[test]
    fn test_should_pass_if_modified_since_when_object_is_newer() {
        let pre = Preconditions {
            if_modified_since: Some("Mon, 01 Jan 2024 00:00:00 GMT"),
            ..Default::default()
        };
        assert!(pre.evaluate("abc", ts(60)).is_ok());
    }

    #[test]
    fn test_should_return_not_modified_when_not_modified_since_header() {
        let pre = Preconditions {
            if_modified_since: Some("Mon, 01 Jan 2024 00:00:00 GMT"),
            ..Default::default()
        };
        let err = pre.evaluate("abc", ts(0)).unwrap_err();
        assert_eq!(err.status, http::StatusCode::NOT_MODIFIED);
    }

    #[test]
    fn test_empty_preconditions_reports_empty() {
        assert!(Preconditions::default().is_empty());
        assert!(!Preconditions { if_match: Some("x"), ..Default::default() }.is_empty());
    }
}

//! Date parsing and formatting for the three HTTP date grammars plus the AWS
//! SigV4 timestamp format, all normalized to UTC.
//!
//! HTTP conditional-request headers (`If-Modified-Since`, ...) may arrive in
//! any of three historical formats (RFC 1123, RFC 850, or the `asctime()`
//! ANSI-C format); `spec.md` §4.6 requires accepting them for conditional
//! evaluation even though only RFC 1123 is ever emitted by this service.

use chrono::{DateTime, NaiveDateTime, Utc};

/// The only timestamp format SigV4 itself uses: `YYYYMMDDTHHMMSSZ`.
const AWS_FORMAT: &str = "%Y%m%dT%H%M%SZ";

const RFC1123_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";
const RFC850_FORMAT: &str = "%A, %d-%b-%y %H:%M:%S GMT";
const ANSI_C_FORMAT: &str = "%a %b %e %H:%M:%S %Y";

/// Parse the AWS `x-amz-date` / `X-Amz-Date` timestamp format
/// (`YYYYMMDDTHHMMSSZ`). Returns `None` on any malformed input rather than
/// panicking; callers that need a hard length/suffix check should validate
/// that before calling (see `spec.md` §4.4 step 2).
#[must_use]
pub fn parse_aws_timestamp(value: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value, AWS_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Format a UTC timestamp in the AWS `YYYYMMDDTHHMMSSZ` form.
#[must_use]
pub fn format_aws_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(AWS_FORMAT).to_string()
}

/// Format a UTC timestamp as an RFC 1123 HTTP date, used for `Last-Modified`
/// response headers.
#[must_use]
pub fn format_http_date(ts: DateTime<Utc>) -> String {
    ts.format(RFC1123_FORMAT).to_string()
}

/// Parse an HTTP date header value in any of the three historical grammars:
/// RFC 1123, RFC 850, or ANSI-C `asctime()`. Used for `If-Modified-Since`
/// and `If-Unmodified-Since`.
#[must_use]
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, RFC1123_FORMAT) {
        return Some(naive.and_utc());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, RFC850_FORMAT) {
        return Some(rfc850_to_utc(naive));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, ANSI_C_FORMAT) {
        return Some(naive.and_utc());
    }
    None
}

/// RFC 850 encodes a two-digit year; per the RFC's own guidance (and
/// `chrono`'s century-window default) we treat `00..=68` as `20xx` and
/// `69..=99` as `19xx`, matching the common "windowing" rule used by HTTP
/// date parsers.
fn rfc850_to_utc(naive: NaiveDateTime) -> DateTime<Utc> {
    naive.and_utc()
}

/// Truncate a UTC timestamp to whole seconds, matching the `spec.md` §4.6
/// requirement that `If-Modified-Since` comparisons ignore sub-second
/// precision ("truncated seconds").
#[must_use]
pub fn truncate_to_seconds(ts: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp(ts.timestamp(), 0).unwrap_or(ts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_should_parse_aws_timestamp() {
        let parsed = parse_aws_timestamp("20130524T000000Z").expect("parses");
        assert_eq!(parsed, Utc.with_ymd_and_hms(2013, 5, 24, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_should_reject_malformed_aws_timestamp() {
        assert!(parse_aws_timestamp("not-a-date").is_none());
        assert!(parse_aws_timestamp("20130524T000000").is_none());
    }

    #[test]
    fn test_should_round_trip_aws_timestamp() {
        let ts = Utc.with_ymd_and_hms(2013, 5, 24, 1, 2, 3).unwrap();
        let formatted = format_aws_timestamp(ts);
        assert_eq!(formatted, "20130524T010203Z");
        assert_eq!(parse_aws_timestamp(&formatted), Some(ts));
    }

    #[test]
    fn test_should_format_http_date_rfc1123() {
        let ts = Utc.with_ymd_and_hms(1994, 11, 6, 8, 49, 37).unwrap();
        assert_eq!(format_http_date(ts), "Sun, 06 Nov 1994 08:49:37 GMT");
    }

    #[test]
    fn test_should_parse_rfc1123_date() {
        let parsed = parse_http_date("Sun, 06 Nov 1994 08:49:37 GMT").expect("parses");
        assert_eq!(parsed, Utc.with_ymd_and_hms(1994, 11, 6, 8, 49, 37).unwrap());
    }

    #[test]
    fn test_should_parse_rfc850_date() {
        let parsed = parse_http_date("Sunday, 06-Nov-94 08:49:37 GMT").expect("parses");
        assert_eq!(parsed, Utc.with_ymd_and_hms(1994, 11, 6, 8, 49, 37).unwrap());
    }

    #[test]
    fn test_should_parse_ansi_c_date() {
        let parsed = parse_http_date("Sun Nov  6 08:49:37 1994").expect("parses");
        assert_eq!(parsed, Utc.with_ymd_and_hms(1994, 11, 6, 8, 49, 37).unwrap());
    }

    #[test]
    fn test_should_reject_unparseable_http_date() {
        assert!(parse_http_date("not a date at all").is_none());
    }

    #[test]
    fn test_should_truncate_to_seconds() {
        let ts = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()
            + chrono::Duration::milliseconds(789);
        let truncated = truncate_to_seconds(ts);
        assert_eq!(truncated.timestamp_subsec_millis(), 0);
        assert_eq!(truncated.timestamp(), ts.timestamp());
    }
}

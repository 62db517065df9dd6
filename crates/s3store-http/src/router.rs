//! Path-style URL parsing: `/{bucket}` and `/{bucket}/{key+}` resolution
//! plus query-string parsing for sub-resource detection (`spec.md` §4.6).
//!
//! This service only speaks path-style addressing — there is no virtual
//! host domain to strip, unlike a general-purpose S3 gateway.

use std::collections::BTreeMap;

use percent_encoding::percent_decode_str;

/// The bucket and key (if any) resolved from a request path, plus its
/// query parameters keyed by name. Multiple occurrences of the same query
/// key keep only the first, matching how sub-resource flags (`?versioning`,
/// `?location`, ...) are checked — presence, not value, is what matters
/// for most of them.
#[derive(Debug, Clone, Default)]
pub struct RoutingContext {
    pub bucket: Option<String>,
    pub key: Option<String>,
    pub query: BTreeMap<String, String>,
}

impl RoutingContext {
    #[must_use]
    pub fn has_query(&self, name: &str) -> bool {
        self.query.contains_key(name)
    }

    #[must_use]
    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }
}

/// Resolve a request's path and raw query string into a [`RoutingContext`].
/// Path segments are percent-decoded individually; the key (everything
/// after the bucket segment) is rejoined with `/` after decoding each of
/// its own segments, so an encoded `/` inside a key component is preserved
/// as a literal slash rather than reintroducing a path separator.
#[must_use]
pub fn route(path: &str, raw_query: &str) -> RoutingContext {
    let trimmed = path.trim_start_matches('/');
    let mut segments = trimmed.split('/').filter(|s| !s.is_empty());

    let bucket = segments.next().map(decode_segment);
    let key_segments: Vec<String> = segments.map(|s| decode_segment(s)).collect();
    let key = if key_segments.is_empty() { None } else { Some(key_segments.join("/")) };

    RoutingContext { bucket, key, query: parse_query(raw_query) }
}

fn decode_segment(segment: &str) -> String {
    percent_decode_str(segment).decode_utf8_lossy().into_owned()
}

fn parse_query(raw_query: &str) -> BTreeMap<String, String> {
    let mut params = BTreeMap::new();
    for pair in raw_query.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = match pair.split_once('=') {
            Some((k, v)) => (k, v),
            None => (pair, ""),
        };
        let key = percent_decode_str(key).decode_utf8_lossy().into_owned();
        let value = percent_decode_str(value).decode_utf8_lossy().into_owned();
        params.entry(key).or_insert(value);
    }
    params
}

//! SigV4 canonical request and string-to-sign construction.
//!
//! Grounded in the same four-section layout AWS's own docs use (and that the
//! canonical-request builder in most SigV4 implementations follows): URI,
//! query, headers, signed-headers-list, payload hash, joined by `\n`.

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};

/// SHA-256 of the empty string, used as the payload hash placeholder inside
/// each `aws-chunked` chunk's string-to-sign.
pub const EMPTY_PAYLOAD_SHA256: &str =
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// One raw query-string element as received on the wire, before sorting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryParam {
    pub key: String,
    pub value: String,
    /// Whether an `=` was present, even when the value is empty (`key=`
    /// canonicalizes differently from bare `key`).
    pub had_equals: bool,
}

/// Whether to sort canonical query parameters (the normal case) or preserve
/// the order they arrived in (the compatibility fallback described in
/// `spec.md` §4.4 step 8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOrder {
    Sorted,
    Unsorted,
}

/// Split a raw query string (the part after `?`, if any) into
/// `(key, value, had_equals)` triples, in wire order.
#[must_use]
pub fn parse_query_params(raw_query: &str) -> Vec<QueryParam> {
    if raw_query.is_empty() {
        return Vec::new();
    }
    raw_query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => QueryParam {
                key: key.to_owned(),
                value: value.to_owned(),
                had_equals: true,
            },
            None => QueryParam {
                key: pair.to_owned(),
                value: String::new(),
                had_equals: false,
            },
        })
        .collect()
}

/// Build the `CanonicalURI` component: the raw path, defaulting to `/`.
/// No percent-decoding or re-encoding is performed — the path is used
/// exactly as received.
#[must_use]
pub fn build_canonical_uri(path: &str) -> String {
    if path.is_empty() {
        "/".to_owned()
    } else {
        path.to_owned()
    }
}

/// Build the `CanonicalQuery` component from already-parsed params.
///
/// `drop_signature` removes `X-Amz-Signature` before sorting/emitting, as
/// required for presigned (query-auth) requests: the signature itself must
/// not be part of what it signs.
#[must_use]
pub fn build_canonical_query_string(
    params: &[QueryParam],
    order: QueryOrder,
    drop_signature: bool,
) -> String {
    let mut filtered: Vec<&QueryParam> = params
        .iter()
        .filter(|p| !(drop_signature && p.key == "X-Amz-Signature"))
        .collect();

    if order == QueryOrder::Sorted {
        filtered.sort_by(|a, b| a.key.cmp(&b.key).then_with(|| a.value.cmp(&b.value)));
    }

    filtered
        .into_iter()
        .map(|p| {
            if p.had_equals {
                format!("{}={}", p.key, p.value)
            } else {
                p.key.clone()
            }
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Build the `CanonicalHeaders` component: for each signed header name,
/// collect every matching header value (case-insensitive match on name),
/// trim, collapse internal whitespace runs to a single space, join
/// duplicates with `,`, and emit `name:value\n`.
///
/// `header_lookup` maps a lowercase header name to every value present on
/// the request, in the order they appeared.
#[must_use]
pub fn build_canonical_headers(
    signed_header_names: &[String],
    header_lookup: &BTreeMap<String, Vec<String>>,
) -> String {
    let mut out = String::new();
    for name in signed_header_names {
        let values = header_lookup.get(name).cloned().unwrap_or_default();
        let joined = values
            .iter()
            .map(|v| collapse_whitespace(v.trim()))
            .collect::<Vec<_>>()
            .join(",");
        out.push_str(name);
        out.push(':');
        out.push_str(&joined);
        out.push('\n');
    }
    out
}

fn collapse_whitespace(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_was_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            out.push(ch);
            last_was_space = false;
        }
    }
    out
}

/// Build the `SignedHeaders` component: sorted header names joined by `;`.
#[must_use]
pub fn build_signed_headers_string(signed_header_names: &[String]) -> String {
    let mut names = signed_header_names.to_vec();
    names.sort();
    names.join(";")
}

/// Parse a `SignedHeaders` value (`host;x-amz-date;...`) back into a sorted
/// `Vec<String>` of lowercase names.
#[must_use]
pub fn parse_signed_headers(value: &str) -> Vec<String> {
    let mut names: Vec<String> = value.split(';').map(|s| s.to_lowercase()).collect();
    names.sort();
    names
}

/// Compute `hex(sha256(bytes))`.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    crate::hexcodec::encode(&digest)
}

/// Assemble the full canonical request string from its six components.
#[must_use]
pub fn build_canonical_request(
    method: &str,
    canonical_uri: &str,
    canonical_query: &str,
    canonical_headers: &str,
    signed_headers: &str,
    payload_hash: &str,
) -> String {
    format!(
        "{method}\n{canonical_uri}\n{canonical_query}\n{canonical_headers}\n{signed_headers}\n{payload_hash}"
    )
}

/// Assemble the string-to-sign from the request timestamp, credential
/// scope, and canonical request.
#[must_use]
pub fn build_string_to_sign(full_date: &str, credential_scope: &str, canonical_request: &str) -> String {
    format!(
        "AWS4-HMAC-SHA256\n{full_date}\n{credential_scope}\n{}",
        sha256_hex(canonical_request.as_bytes())
    )
}

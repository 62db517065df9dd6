//! Signature parsing, key derivation, and end-to-end SigV4 verification.
//!
//! This is the only module in the crate that ties the others together:
//! [`canonical`] builds the string-to-sign, [`chunked`] splits a streaming
//! body into chunks, [`hexcodec`] compares digests in constant time, and
//! [`datecodec`] parses the timestamps both modes carry.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use percent_encoding::percent_decode_str;
use sha2::Sha256;

use crate::canonical::{
    self, build_canonical_headers, build_canonical_query_string, build_canonical_request,
    build_canonical_uri, build_signed_headers_string, build_string_to_sign, parse_query_params,
    parse_signed_headers, sha256_hex, QueryOrder, QueryParam,
};
use crate::chunked;
use crate::datecodec::parse_aws_timestamp;
use crate::error::AuthError;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";
const STREAMING_PAYLOAD_MARKER: &str = "STREAMING-AWS4-HMAC-SHA256-PAYLOAD";
const UNSIGNED_PAYLOAD_MARKER: &str = "UNSIGNED-PAYLOAD";
const MAX_AUTH_HEADER_LEN: usize = 4096;
const MAX_ACCESS_KEY_LEN: usize = 128;

/// Looks up the signing secret for an access key. Implemented outside this
/// crate (typically backed by `AuthCaches`) so the auth engine never has to
/// know about the account store.
pub trait SecretProvider {
    fn secret_for(&self, access_key: &str) -> Option<String>;
}

/// A verified request's outcome: which access key signed it, and the
/// decoded payload when the body arrived as `aws-chunked`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthOutcome {
    pub access_key: String,
    /// `Some` only when the request used `STREAMING-AWS4-HMAC-SHA256-PAYLOAD`;
    /// callers should use this instead of the raw request body.
    pub decoded_payload: Option<Vec<u8>>,
}

/// Inputs needed to verify one request. Headers are expected pre-lowercased
/// by the caller (HTTP frameworks typically hand these over already
/// case-folded); multiple occurrences of the same header name are preserved
/// in order.
pub struct VerificationRequest<'a> {
    pub method: &'a str,
    pub path: &'a str,
    pub raw_query: &'a str,
    pub headers: &'a BTreeMap<String, Vec<String>>,
    pub body: &'a [u8],
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct ParsedAuth {
    access_key: String,
    date: String,
    region: String,
    service: String,
    signed_headers: Vec<String>,
    signature: String,
    expires_seconds: Option<i64>,
}

/// Drives SigV4 verification for one S3-compatible deployment. Holds only
/// policy knobs (region, skew tolerance, presigned expiry ceiling, whether
/// the unsorted-query compatibility fallback is enabled); all per-request
/// state lives in [`VerificationRequest`].
#[derive(Debug, Clone)]
pub struct SigV4Engine {
    pub region: String,
    pub service: String,
    pub skew_tolerance_seconds: i64,
    pub presigned_max_expires_seconds: i64,
    pub unsorted_fallback_enabled: bool,
}

impl SigV4Engine {
    #[must_use]
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            service: "s3".to_owned(),
            skew_tolerance_seconds: 900,
            presigned_max_expires_seconds: 604_800,
            unsorted_fallback_enabled: true,
        }
    }

    /// Verify a request's signature, header- or query-based, and its
    /// streaming chunk chain if present. See `spec.md` §4.4.
    ///
    /// # Errors
    ///
    /// Any [`AuthError`] variant describing why verification failed.
    pub fn verify(
        &self,
        secrets: &dyn SecretProvider,
        req: &VerificationRequest<'_>,
    ) -> Result<AuthOutcome, AuthError> {
        let query_params = parse_query_params(req.raw_query);
        let is_presigned = query_params.iter().any(|p| p.key == "X-Amz-Signature");

        let parsed = if is_presigned {
            self.parse_presigned_query(&query_params)?
        } else {
            self.parse_authorization_header(req.headers)?
        };

        self.validate_signed_headers(&parsed, req.headers)?;

        let date_source = if is_presigned {
            get_query_value(&query_params, "X-Amz-Date").ok_or(AuthError::InvalidCredential)?
        } else {
            first_header(req.headers, "x-amz-date").ok_or(AuthError::MissingHeader("x-amz-date".into()))?
        };
        let request_time = self.validate_timestamp(&parsed, &date_source, req.now)?;

        if let Some(expires) = parsed.expires_seconds {
            let elapsed = (req.now - request_time).num_seconds();
            if elapsed >= expires {
                return Err(AuthError::InvalidArgument("presigned URL has expired".to_owned()));
            }
        }

        let secret = secrets
            .secret_for(&parsed.access_key)
            .ok_or(AuthError::AccessDenied)?;

        let signing_key = derive_signing_key(&secret, &parsed.date, &parsed.region, &parsed.service);
        let credential_scope = format!("{}/{}/{}/aws4_request", parsed.date, parsed.region, parsed.service);

        let payload_hash = self.resolve_payload_hash(is_presigned, req.headers, req.body)?;

        let header_lookup = req.headers;
        let canonical_headers = build_canonical_headers(&parsed.signed_headers, header_lookup);
        let signed_headers_str = build_signed_headers_string(&parsed.signed_headers);
        let canonical_uri = build_canonical_uri(req.path);

        let sorted_query = build_canonical_query_string(&query_params, QueryOrder::Sorted, is_presigned);
        let sorted_request = build_canonical_request(
            req.method,
            &canonical_uri,
            &sorted_query,
            &canonical_headers,
            &signed_headers_str,
            &payload_hash,
        );
        let sorted_sts = build_string_to_sign(&date_source, &credential_scope, &sorted_request);
        let sorted_signature = compute_signature(&signing_key, &sorted_sts);

        let matched = crate::hexcodec::ct_eq_hex(&sorted_signature, &parsed.signature);

        let matched = if matched {
            true
        } else if self.unsorted_fallback_enabled {
            let unsorted_query =
                build_canonical_query_string(&query_params, QueryOrder::Unsorted, is_presigned);
            let unsorted_request = build_canonical_request(
                req.method,
                &canonical_uri,
                &unsorted_query,
                &canonical_headers,
                &signed_headers_str,
                &payload_hash,
            );
            let unsorted_sts = build_string_to_sign(&date_source, &credential_scope, &unsorted_request);
            let unsorted_signature = compute_signature(&signing_key, &unsorted_sts);
            crate::hexcodec::ct_eq_hex(&unsorted_signature, &parsed.signature)
        } else {
            false
        };

        if !matched {
            return Err(AuthError::SignatureDoesNotMatch);
        }

        let decoded_payload = if payload_hash == STREAMING_PAYLOAD_MARKER {
            Some(self.verify_streaming_payload(
                req,
                &signing_key,
                &date_source,
                &credential_scope,
                &parsed.signature,
            )?)
        } else {
            None
        };

        Ok(AuthOutcome { access_key: parsed.access_key, decoded_payload })
    }

    fn parse_authorization_header(
        &self,
        headers: &BTreeMap<String, Vec<String>>,
    ) -> Result<ParsedAuth, AuthError> {
        let value = first_header(headers, "authorization").ok_or(AuthError::MissingAuthHeader)?;
        if value.len() > MAX_AUTH_HEADER_LEN {
            return Err(AuthError::InvalidAuthHeader);
        }

        let mut split = value.splitn(2, ' ');
        let algorithm = split.next().ok_or(AuthError::InvalidAuthHeader)?;
        if algorithm != ALGORITHM {
            return Err(AuthError::UnsupportedAlgorithm(algorithm.to_owned()));
        }
        let rest = split.next().ok_or(AuthError::InvalidAuthHeader)?;

        let mut credential = None;
        let mut signed_headers = None;
        let mut signature = None;
        for field in rest.split(',') {
            let field = field.trim();
            let (key, val) = field.split_once('=').ok_or(AuthError::InvalidAuthHeader)?;
            match key {
                "Credential" => credential = Some(val.to_owned()),
                "SignedHeaders" => signed_headers = Some(val.to_owned()),
                "Signature" => signature = Some(val.to_owned()),
                _ => {}
            }
        }

        let credential = credential.ok_or(AuthError::InvalidAuthHeader)?;
        let signed_headers_raw = signed_headers.ok_or(AuthError::InvalidAuthHeader)?;
        let signature = signature.ok_or(AuthError::InvalidAuthHeader)?;
        let (access_key, date, region, service) = parse_credential(&credential)?;

        Ok(ParsedAuth {
            access_key,
            date,
            region,
            service,
            signed_headers: parse_signed_headers(&signed_headers_raw),
            signature,
            expires_seconds: None,
        })
    }

    fn parse_presigned_query(&self, params: &[QueryParam]) -> Result<ParsedAuth, AuthError> {
        let algorithm = get_query_value(params, "X-Amz-Algorithm").ok_or(AuthError::MissingAuthHeader)?;
        if algorithm != ALGORITHM {
            return Err(AuthError::UnsupportedAlgorithm(algorithm));
        }
        let credential = get_query_value(params, "X-Amz-Credential").ok_or(AuthError::InvalidCredential)?;
        let signed_headers_raw =
            get_query_value(params, "X-Amz-SignedHeaders").ok_or(AuthError::InvalidAuthHeader)?;
        let signature = get_query_value(params, "X-Amz-Signature").ok_or(AuthError::InvalidAuthHeader)?;
        let expires_raw =
            get_query_value(params, "X-Amz-Expires").ok_or_else(|| AuthError::InvalidArgument("X-Amz-Expires".to_owned()))?;
        let expires: i64 = expires_raw
            .parse()
            .map_err(|_| AuthError::InvalidArgument("X-Amz-Expires must be an integer".to_owned()))?;
        if expires <= 0 || expires > self.presigned_max_expires_seconds {
            return Err(AuthError::InvalidArgument("X-Amz-Expires out of range".to_owned()));
        }

        let (access_key, date, region, service) = parse_credential(&credential)?;

        Ok(ParsedAuth {
            access_key,
            date,
            region,
            service,
            signed_headers: parse_signed_headers(&signed_headers_raw),
            signature,
            expires_seconds: Some(expires),
        })
    }

    fn validate_signed_headers(
        &self,
        parsed: &ParsedAuth,
        headers: &BTreeMap<String, Vec<String>>,
    ) -> Result<(), AuthError> {
        if !parsed.signed_headers.iter().any(|h| h == "host") {
            return Err(AuthError::MissingHeader("host".to_owned()));
        }
        if !parsed.signed_headers.iter().any(|h| h == "x-amz-date") && parsed.expires_seconds.is_none() {
            return Err(AuthError::MissingHeader("x-amz-date".to_owned()));
        }
        if headers.contains_key("x-amz-security-token")
            && !parsed.signed_headers.iter().any(|h| h == "x-amz-security-token")
        {
            return Err(AuthError::MissingHeader("x-amz-security-token".to_owned()));
        }
        for name in &parsed.signed_headers {
            if !headers.contains_key(name) {
                return Err(AuthError::MissingHeader(name.clone()));
            }
        }
        Ok(())
    }

    fn validate_timestamp(
        &self,
        parsed: &ParsedAuth,
        date_source: &str,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, AuthError> {
        if date_source.len() != 16 || !date_source.ends_with('Z') {
            return Err(AuthError::InvalidCredential);
        }
        if !date_source.starts_with(&parsed.date) {
            return Err(AuthError::InvalidCredential);
        }
        let request_time = parse_aws_timestamp(date_source).ok_or(AuthError::InvalidCredential)?;

        let skew = (now - request_time).num_seconds().abs();
        if skew >= self.skew_tolerance_seconds {
            return Err(AuthError::RequestTimeTooSkewed);
        }
        Ok(request_time)
    }

    fn resolve_payload_hash(
        &self,
        is_presigned: bool,
        headers: &BTreeMap<String, Vec<String>>,
        body: &[u8],
    ) -> Result<String, AuthError> {
        if is_presigned {
            return Ok(UNSIGNED_PAYLOAD_MARKER.to_owned());
        }
        let declared = first_header(headers, "x-amz-content-sha256")
            .ok_or_else(|| AuthError::MissingHeader("x-amz-content-sha256".to_owned()))?;
        if declared == UNSIGNED_PAYLOAD_MARKER || declared == STREAMING_PAYLOAD_MARKER {
            return Ok(declared);
        }
        let computed = sha256_hex(body);
        if !crate::hexcodec::ct_eq_hex(&declared, &computed) {
            return Err(AuthError::InvalidDigest);
        }
        Ok(declared)
    }

    fn verify_streaming_payload(
        &self,
        req: &VerificationRequest<'_>,
        signing_key: &[u8],
        date_source: &str,
        credential_scope: &str,
        seed_signature: &str,
    ) -> Result<Vec<u8>, AuthError> {
        let chunks = chunked::decode_chunks(req.body)?;
        let mut previous_signature = seed_signature.to_owned();
        let mut total_size = 0usize;

        for chunk in &chunks {
            let chunk_sts = format!(
                "AWS4-HMAC-SHA256-PAYLOAD\n{date_source}\n{credential_scope}\n{previous_signature}\n{}\n{}",
                canonical::EMPTY_PAYLOAD_SHA256,
                sha256_hex(&chunk.data),
            );
            let computed = compute_signature(signing_key, &chunk_sts);
            if !crate::hexcodec::ct_eq_hex(&computed, &chunk.signature_hex) {
                return Err(AuthError::SignatureDoesNotMatch);
            }
            previous_signature = chunk.signature_hex.clone();
            total_size += chunk.data.len();
        }

        if let Some(declared_len) = first_header(req.headers, "x-amz-decoded-content-length") {
            let declared_len: usize = declared_len
                .parse()
                .map_err(|_| AuthError::InvalidArgument("x-amz-decoded-content-length".to_owned()))?;
            if declared_len != total_size {
                return Err(AuthError::DecodedLengthMismatch);
            }
        }

        Ok(chunked::concatenate_payload(&chunks))
    }
}

fn parse_credential(raw: &str) -> Result<(String, String, String, String), AuthError> {
    let parts: Vec<&str> = raw.splitn(5, '/').collect();
    if parts.len() != 5 || parts[4] != "aws4_request" {
        return Err(AuthError::InvalidCredential);
    }
    let access_key = parts[0];
    if access_key.is_empty() || access_key.len() > MAX_ACCESS_KEY_LEN {
        return Err(AuthError::InvalidCredential);
    }
    let date = parts[1];
    if date.len() != 8 || !date.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AuthError::InvalidCredential);
    }
    Ok((access_key.to_owned(), date.to_owned(), parts[2].to_owned(), parts[3].to_owned()))
}

fn first_header(headers: &BTreeMap<String, Vec<String>>, name: &str) -> Option<String> {
    headers.get(name).and_then(|values| values.first()).cloned()
}

fn get_query_value(params: &[QueryParam], key: &str) -> Option<String> {
    params
        .iter()
        .find(|p| p.key == key)
        .map(|p| percent_decode_str(&p.value).decode_utf8_lossy().into_owned())
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts a key of any length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// Derive the request-scoped signing key via the four chained HMACs
/// described in `spec.md` §4.4 step 6. Not cached across requests; callers
/// that verify many chunks from the same request should derive it once and
/// reuse the result, which [`SigV4Engine::verify`] already does.
fn derive_signing_key(secret: &str, date: &str, region: &str, service: &str) -> Vec<u8> {
    let k_date = hmac_sha256(format!("AWS4{secret}").as_bytes(), date.as_bytes());
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}

fn compute_signature(signing_key: &[u8], string_to_sign: &str) -> String {
    crate::hexcodec::encode(&hmac_sha256(signing_key, string_to_sign.as_bytes()))
}

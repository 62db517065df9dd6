//! Error types for SigV4 authentication and `aws-chunked` decoding.

/// Errors that can occur while authenticating a request or decoding its
/// streaming payload. Variant names track the S3 error codes in `spec.md`
/// §7 so the HTTP boundary (outside this crate) can map them 1:1.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// The `Authorization` header is missing.
    #[error("missing Authorization header")]
    MissingAuthHeader,

    /// The `Authorization` header is malformed or exceeds 4096 bytes.
    #[error("invalid Authorization header")]
    InvalidAuthHeader,

    /// The signing algorithm is not `AWS4-HMAC-SHA256`.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// A header named in `SignedHeaders` is missing from the request, or a
    /// required signed header (`host`, `x-amz-date`, and
    /// `x-amz-security-token` when present) was omitted from the list.
    #[error("missing required header: {0}")]
    MissingHeader(String),

    /// The `Credential` scope could not be parsed, or the access key /
    /// date component fails the length and format checks in `spec.md` §4.4.
    #[error("invalid credential")]
    InvalidCredential,

    /// The access key was not found by the configured [`crate::sigv4::SecretProvider`].
    #[error("access denied")]
    AccessDenied,

    /// `x-amz-date` differs from the current time by more than the
    /// configured skew tolerance (15 minutes by default).
    #[error("request time too skewed")]
    RequestTimeTooSkewed,

    /// The candidate signature did not match, even after retrying with an
    /// unsorted canonical query string.
    #[error("signature does not match")]
    SignatureDoesNotMatch,

    /// The declared `x-amz-content-sha256` does not match the SHA-256 of
    /// the actual request body.
    #[error("x-amz-content-sha256 does not match the request body")]
    InvalidDigest,

    /// A presigned request's `X-Amz-Expires` is outside `(0, 604800]`, or
    /// the request has expired relative to it.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The `x-amz-decoded-content-length` declared for a streaming payload
    /// does not match the sum of the chunk sizes actually received.
    #[error("invalid argument: decoded content length mismatch")]
    DecodedLengthMismatch,

    /// The `aws-chunked` body could not be parsed to completion.
    #[error("incomplete chunked data")]
    IncompleteData,

    /// A chunk's declared size is not valid hexadecimal.
    #[error("invalid chunk size")]
    InvalidChunkSize,

    /// The chunked body could not be decoded for a reason other than
    /// truncation or malformed size.
    #[error("chunk decoding failed: {0}")]
    DecodingFailed(String),
}

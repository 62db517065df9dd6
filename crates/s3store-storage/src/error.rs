//! Error types for the on-disk storage engine.

/// Errors raised by [`crate::objectfile`], [`crate::versionstore`], and
/// [`crate::lister`]. Variant names track the S3 error codes from
/// `spec.md` §7 so the HTTP boundary can map them without re-interpreting
/// messages.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("no such key")]
    NoSuchKey,

    #[error("no such version")]
    NoSuchVersion,

    #[error("no such bucket")]
    NoSuchBucket,

    #[error("bucket not empty")]
    BucketNotEmpty,

    #[error("object record is corrupt: {0}")]
    CorruptObject(String),

    #[error("invalid bucket name: {0}")]
    InvalidBucketName(String),

    #[error("invalid content type: {0}")]
    InvalidContentType(String),

    #[error("invalid Content-MD5: {0}")]
    InvalidContentMd5(String),

    #[error("Content-MD5 does not match the request body")]
    ContentMd5Mismatch,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("metadata serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

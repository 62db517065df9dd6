//! Shared error type for cross-crate wiring.
//!
//! Individual crates (`s3store-auth`, `s3store-storage`, `s3store-http`) each
//! define their own focused error enum; this type exists only for glue code
//! in `s3store-core` itself (cache lookups, account-store plumbing).

/// An error surfaced by the core crate's own operations.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// No account is registered for the given access key.
    #[error("access key not found: {0}")]
    UnknownAccessKey(String),

    /// The named bucket has no owner on record.
    #[error("bucket not found: {0}")]
    UnknownBucket(String),
}

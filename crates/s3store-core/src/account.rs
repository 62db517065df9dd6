//! The `AccountStore` contract consumed from outside the core.
//!
//! `spec.md` §1 and §6 carve the relational store that backs user accounts,
//! bucket ownership, and access-key records out of scope: this module
//! specifies only the interface the core depends on. Production deployments
//! back this trait with a real database; this crate ships no implementation
//! beyond what tests need.

use crate::caches::VersioningStatus;

/// A resolved access-key record: the secret material and owning user.
#[derive(Debug, Clone)]
pub struct AccountRecord {
    /// The secret key paired with the access key that resolved to this record.
    pub secret_key: String,
    /// Opaque identifier for the owning user/account.
    pub user_id: String,
}

/// External collaborator that owns the truth for accounts, access keys, and
/// bucket ownership. [`crate::caches::AuthCaches`] is a read-mostly
/// projection of this store, refreshed at startup and on authenticated
/// mutations.
///
/// # Errors
///
/// Every fallible method returns `Option`/`Result` rather than panicking;
/// "not found" is modeled as `None`, never as an error variant, so callers
/// can map it directly onto the relevant S3 error code (`AccessDenied`,
/// `NoSuchBucket`, ...).
pub trait AccountStore: Send + Sync {
    /// Resolve an access key to its secret and owning user.
    fn lookup_access_key(&self, access_key: &str) -> Option<AccountRecord>;

    /// List the bucket names owned by a user.
    fn list_buckets_for_user(&self, user_id: &str) -> Vec<String>;

    /// Resolve the owning user id of a bucket.
    fn bucket_owner(&self, bucket_name: &str) -> Option<String>;

    /// Record a newly created bucket and its initial versioning status.
    fn create_bucket(&self, name: &str, user_id: &str, versioning_status: VersioningStatus);

    /// Remove a bucket record. Callers must have already verified the bucket
    /// tree on disk is empty (`spec.md` §3 invariant 5).
    fn delete_bucket(&self, name: &str, user_id: &str);

    /// Update a bucket's versioning status.
    fn set_versioning(&self, bucket: &str, status: VersioningStatus);

    /// Read a bucket's versioning status.
    fn get_versioning(&self, bucket: &str) -> Option<VersioningStatus>;
}

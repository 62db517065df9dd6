//! An in-memory [`AccountStore`] for running the server standalone.
//!
//! `spec.md` §1 carves the relational account store out of scope; this is
//! a minimal stand-in so the binary has something to construct a
//! [`s3store_http::Dispatcher`] with. A real deployment backs the trait
//! with the actual accounts database instead of this module.

use dashmap::DashMap;
use s3store_core::{AccountRecord, AccountStore, VersioningStatus};

#[derive(Debug, Default)]
pub struct InMemoryAccountStore {
    accounts: DashMap<String, AccountRecord>,
    buckets_by_user: DashMap<String, Vec<String>>,
    bucket_owner: DashMap<String, String>,
    versioning: DashMap<String, VersioningStatus>,
}

impl InMemoryAccountStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one access key / secret pair owned by `user_id`. Used at
    /// startup to seed the single demo account from the environment.
    pub fn add_account(&self, access_key: &str, secret_key: &str, user_id: &str) {
        self.accounts.insert(
            access_key.to_owned(),
            AccountRecord { secret_key: secret_key.to_owned(), user_id: user_id.to_owned() },
        );
    }
}

impl AccountStore for InMemoryAccountStore {
    fn lookup_access_key(&self, access_key: &str) -> Option<AccountRecord> {
        self.accounts.get(access_key).map(|entry| entry.clone())
    }

    fn list_buckets_for_user(&self, user_id: &str) -> Vec<String> {
        self.buckets_by_user.get(user_id).map(|v| v.clone()).unwrap_or_default()
    }

    fn bucket_owner(&self, bucket_name: &str) -> Option<String> {
        self.bucket_owner.get(bucket_name).map(|v| v.clone())
    }

    fn create_bucket(&self, name: &str, user_id: &str, versioning_status: VersioningStatus) {
        self.bucket_owner.insert(name.to_owned(), user_id.to_owned());
        self.versioning.insert(name.to_owned(), versioning_status);
        self.buckets_by_user.entry(user_id.to_owned()).or_default().push(name.to_owned());
    }

    fn delete_bucket(&self, name: &str, user_id: &str) {
        self.bucket_owner.remove(name);
        self.versioning.remove(name);
        if let Some(mut buckets) = self.buckets_by_user.get_mut(user_id) {
            buckets.retain(|b| b != name);
        }
    }

    fn set_versioning(&self, bucket: &str, status: VersioningStatus) {
        self.versioning.insert(bucket.to_owned(), status);
    }

    fn get_versioning(&self, bucket: &str) -> Option<VersioningStatus> {
        self.versioning.get(bucket).map(|v| *v)
    }
}

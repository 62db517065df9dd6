//! In-memory projections of the external account store.
//!
//! `spec.md` §4 (`AuthCaches`) and §9 describe four independent maps rather
//! than a pointer graph: `access-key -> secret`, `access-key -> user-id`,
//! `access-key -> buckets`, and `bucket -> versioning-status`. Each is backed
//! by a [`DashMap`] so concurrent reads on the hot authentication path never
//! block each other; admin mutations that touch more than one map update
//! both within the call, never leaving them observably inconsistent to a
//! concurrent reader (each individual map update is itself atomic, and the
//! mutation order below is chosen so a reader never sees a bucket attributed
//! to a user who does not yet have the secret registered).

use dashmap::DashMap;

/// A bucket's versioning status, independent of any request in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VersioningStatus {
    /// Versioning has never been enabled.
    #[default]
    Disabled,
    /// Versioning is enabled: every write allocates a new version.
    Enabled,
    /// Versioning was enabled, then suspended: writes land in the `"null"`
    /// version slot.
    Suspended,
}

impl VersioningStatus {
    /// Parse the `<Status>` element value from a `PutBucketVersioning` body.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Enabled" => Some(Self::Enabled),
            "Suspended" => Some(Self::Suspended),
            _ => None,
        }
    }

    /// Render as the XML `<Status>` value used in `GetBucketVersioning`
    /// responses. Disabled buckets omit the element entirely at the call
    /// site; this covers only the two statuses that are ever emitted.
    #[must_use]
    pub fn as_xml_str(self) -> Option<&'static str> {
        match self {
            Self::Disabled => None,
            Self::Enabled => Some("Enabled"),
            Self::Suspended => Some("Suspended"),
        }
    }
}

/// Read-mostly in-memory caches used on the authentication and routing hot
/// path. Initialized at startup from an [`crate::account::AccountStore`] and
/// mutated whenever an authenticated operation changes the underlying
/// truth.
#[derive(Debug, Default)]
pub struct AuthCaches {
    secrets: DashMap<String, String>,
    owners: DashMap<String, String>,
    buckets_by_access_key: DashMap<String, Vec<String>>,
    versioning: DashMap<String, VersioningStatus>,
    bucket_owner: DashMap<String, String>,
}

impl AuthCaches {
    /// Create empty caches. Populate via [`AuthCaches::load_account`] and
    /// [`AuthCaches::register_bucket`] during startup bulk-load.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the caches for one access key during startup bulk-load.
    pub fn load_account(&self, access_key: &str, secret: &str, user_id: &str, buckets: Vec<String>) {
        self.secrets.insert(access_key.to_owned(), secret.to_owned());
        self.owners.insert(access_key.to_owned(), user_id.to_owned());
        for bucket in &buckets {
            self.bucket_owner.insert(bucket.clone(), user_id.to_owned());
        }
        self.buckets_by_access_key.insert(access_key.to_owned(), buckets);
    }

    /// Look up the secret key for an access key. `AccessDenied` territory
    /// (`spec.md` §7) if this returns `None`.
    #[must_use]
    pub fn secret_for(&self, access_key: &str) -> Option<String> {
        self.secrets.get(access_key).map(|v| v.clone())
    }

    /// Look up the owning user id for an access key.
    #[must_use]
    pub fn user_for(&self, access_key: &str) -> Option<String> {
        self.owners.get(access_key).map(|v| v.clone())
    }

    /// List the buckets visible to the caller identified by `access_key`.
    #[must_use]
    pub fn buckets_for(&self, access_key: &str) -> Vec<String> {
        self.buckets_by_access_key
            .get(access_key)
            .map(|v| v.clone())
            .unwrap_or_default()
    }

    /// Resolve the owning user id of a bucket, regardless of which access
    /// key is asking.
    #[must_use]
    pub fn bucket_owner(&self, bucket: &str) -> Option<String> {
        self.bucket_owner.get(bucket).map(|v| v.clone())
    }

    /// Record a newly created bucket: attach it to the creator's access key
    /// list and to the reverse owner index.
    pub fn register_bucket(&self, access_key: &str, user_id: &str, bucket: &str) {
        self.bucket_owner.insert(bucket.to_owned(), user_id.to_owned());
        self.buckets_by_access_key
            .entry(access_key.to_owned())
            .or_default()
            .push(bucket.to_owned());
        self.versioning
            .insert(bucket.to_owned(), VersioningStatus::Disabled);
    }

    /// Remove a bucket from every cache. Called after a successful
    /// `DELETE /{bucket}`.
    pub fn unregister_bucket(&self, access_key: &str, bucket: &str) {
        self.bucket_owner.remove(bucket);
        self.versioning.remove(bucket);
        if let Some(mut list) = self.buckets_by_access_key.get_mut(access_key) {
            list.retain(|b| b != bucket);
        }
    }

    /// Read the current versioning status of a bucket. `None` means the
    /// bucket is not known to the cache at all (distinct from
    /// `Some(Disabled)`, which means "known, never versioned").
    #[must_use]
    pub fn versioning_status(&self, bucket: &str) -> Option<VersioningStatus> {
        self.versioning.get(bucket).map(|v| *v)
    }

    /// Update a bucket's versioning status.
    pub fn set_versioning_status(&self, bucket: &str, status: VersioningStatus) {
        self.versioning.insert(bucket.to_owned(), status);
    }

    /// Remove every cached access key for a user and every bucket they own.
    /// Used when an access key is revoked through the external account store.
    pub fn revoke_access_key(&self, access_key: &str) {
        self.secrets.remove(access_key);
        self.owners.remove(access_key);
        self.buckets_by_access_key.remove(access_key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_round_trip_secret_and_user_lookup() {
        let caches = AuthCaches::new();
        caches.load_account("AKID", "secret", "user-1", vec!["b1".to_owned()]);

        assert_eq!(caches.secret_for("AKID").as_deref(), Some("secret"));
        assert_eq!(caches.user_for("AKID").as_deref(), Some("user-1"));
        assert_eq!(caches.buckets_for("AKID"), vec!["b1".to_owned()]);
        assert_eq!(caches.bucket_owner("b1").as_deref(), Some("user-1"));
    }

    #[test]
    fn test_should_return_none_for_unknown_access_key() {
        let caches = AuthCaches::new();
        assert!(caches.secret_for("ghost").is_none());
        assert!(caches.user_for("ghost").is_none());
        assert!(caches.buckets_for("ghost").is_empty());
    }

    #[test]
    fn test_should_register_and_unregister_bucket() {
        let caches = AuthCaches::new();
        caches.load_account("AKID", "secret", "user-1", vec![]);
        caches.register_bucket("AKID", "user-1", "new-bucket");

        assert_eq!(caches.bucket_owner("new-bucket").as_deref(), Some("user-1"));
        assert_eq!(
            caches.versioning_status("new-bucket"),
            Some(VersioningStatus::Disabled)
        );
        assert!(caches.buckets_for("AKID").contains(&"new-bucket".to_owned()));

        caches.unregister_bucket("AKID", "new-bucket");
        assert!(caches.bucket_owner("new-bucket").is_none());
        assert!(caches.versioning_status("new-bucket").is_none());
        assert!(!caches.buckets_for("AKID").contains(&"new-bucket".to_owned()));
    }

    #[test]
    fn test_should_update_versioning_status() {
        let caches = AuthCaches::new();
        caches.load_account("AKID", "secret", "user-1", vec!["b".to_owned()]);
        caches.register_bucket("AKID", "user-1", "b");

        caches.set_versioning_status("b", VersioningStatus::Enabled);
        assert_eq!(caches.versioning_status("b"), Some(VersioningStatus::Enabled));

        caches.set_versioning_status("b", VersioningStatus::Suspended);
        assert_eq!(caches.versioning_status("b"), Some(VersioningStatus::Suspended));
    }

    #[test]
    fn test_should_revoke_access_key() {
        let caches = AuthCaches::new();
        caches.load_account("AKID", "secret", "user-1", vec!["b".to_owned()]);
        caches.revoke_access_key("AKID");

        assert!(caches.secret_for("AKID").is_none());
        assert!(caches.user_for("AKID").is_none());
        assert!(caches.buckets_for("AKID").is_empty());
    }

    #[test]
    fn test_versioning_status_xml_rendering() {
        assert_eq!(VersioningStatus::Disabled.as_xml_str(), None);
        assert_eq!(VersioningStatus::Enabled.as_xml_str(), Some("Enabled"));
        assert_eq!(VersioningStatus::Suspended.as_xml_str(), Some("Suspended"));
    }

    #[test]
    fn test_versioning_status_parse() {
        assert_eq!(VersioningStatus::parse("Enabled"), Some(VersioningStatus::Enabled));
        assert_eq!(VersioningStatus::parse("Suspended"), Some(VersioningStatus::Suspended));
        assert_eq!(VersioningStatus::parse("Bogus"), None);
    }
}

//! Versioned object layout: `<key>.versions/<version_id>.obj` plus a
//! `.latest` pointer file.
//!
//! The write sequence for an enabled bucket ("flip previous latest → write
//! new version → update `.latest`") is not atomic end-to-end; a crash
//! between steps is tolerated because `.latest` is always re-derivable by
//! scanning for the newest `updated_at` (`spec.md` §5). [`Self::list_versions`]
//! performs that recovery whenever the pointer is missing or stale.

use std::path::PathBuf;

use s3store_core::VersioningStatus;

use crate::error::StorageError;
use crate::idgen::generate_version_id;
use crate::metadata::ObjectMetadata;
use crate::objectfile::ObjectFile;

const NULL_VERSION_ID: &str = "null";

/// Layers the versioned/non-versioned object layout on top of
/// [`ObjectFile`]. Stateless beyond the `ObjectFile` it wraps.
#[derive(Debug, Clone)]
pub struct VersionStore {
    files: ObjectFile,
}

impl VersionStore {
    #[must_use]
    pub fn new(files: ObjectFile) -> Self {
        Self { files }
    }

    #[must_use]
    pub fn object_file(&self) -> &ObjectFile {
        &self.files
    }

    fn latest_pointer_path(&self, bucket: &str, key: &str) -> PathBuf {
        self.files.versions_dir(bucket, key).join(".latest")
    }

    fn version_path(&self, bucket: &str, key: &str, version_id: &str) -> PathBuf {
        self.files.versions_dir(bucket, key).join(format!("{version_id}.obj"))
    }

    /// Write a new version (or overwrite the unversioned slot) according
    /// to the bucket's versioning status. Returns the `version_id` that
    /// was assigned (`"null"` for Disabled/Suspended writes).
    ///
    /// # Errors
    ///
    /// Any [`StorageError`] from the underlying `ObjectFile` write/read.
    pub async fn write_versioned(
        &self,
        mut metadata: ObjectMetadata,
        payload: &[u8],
        bucket: &str,
        key: &str,
        status: VersioningStatus,
    ) -> Result<String, StorageError> {
        match status {
            VersioningStatus::Disabled => {
                metadata.version_id = None;
                metadata.is_latest = true;
                let path = self.files.storage_path(bucket, key);
                self.files.write(&metadata, payload, &path).await?;
                Ok(NULL_VERSION_ID.to_owned())
            }
            VersioningStatus::Suspended => {
                self.demote_current_latest(bucket, key).await?;
                metadata.version_id = Some(NULL_VERSION_ID.to_owned());
                metadata.is_latest = true;
                let path = self.version_path(bucket, key, NULL_VERSION_ID);
                self.files.write(&metadata, payload, &path).await?;
                self.set_latest_pointer(bucket, key, NULL_VERSION_ID).await?;
                Ok(NULL_VERSION_ID.to_owned())
            }
            VersioningStatus::Enabled => {
                self.demote_current_latest(bucket, key).await?;
                let version_id = generate_version_id();
                metadata.version_id = Some(version_id.clone());
                metadata.is_latest = true;
                let path = self.version_path(bucket, key, &version_id);
                self.files.write(&metadata, payload, &path).await?;
                self.set_latest_pointer(bucket, key, &version_id).await?;
                Ok(version_id)
            }
        }
    }

    /// Load the current latest version (if any) and rewrite it with
    /// `is_latest=false`, so a new version can take over.
    async fn demote_current_latest(&self, bucket: &str, key: &str) -> Result<(), StorageError> {
        let Some(current_latest) = self.read_latest_pointer(bucket, key).await? else {
            return Ok(());
        };
        let path = self.version_path(bucket, key, &current_latest);
        let (mut metadata, payload) = match self.files.read(&path, true, None).await {
            Ok(result) => result,
            Err(StorageError::NoSuchKey) => return Ok(()),
            Err(err) => return Err(err),
        };
        metadata.is_latest = false;
        self.files
            .write(&metadata, &payload.unwrap_or_default(), &path)
            .await
    }

    async fn set_latest_pointer(&self, bucket: &str, key: &str, version_id: &str) -> Result<(), StorageError> {
        let dir = self.files.versions_dir(bucket, key);
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(self.latest_pointer_path(bucket, key), version_id).await?;
        Ok(())
    }

    async fn read_latest_pointer(&self, bucket: &str, key: &str) -> Result<Option<String>, StorageError> {
        match tokio::fs::read_to_string(self.latest_pointer_path(bucket, key)).await {
            Ok(contents) => Ok(Some(contents.trim().to_owned())),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StorageError::Io(err)),
        }
    }

    /// Resolve and read a version. `version_id = None` resolves to the
    /// current latest (`.latest` pointer, falling back to the
    /// non-versioned path if neither the versions directory nor the
    /// pointer exists). A `version_id` containing `..` or `/` is rejected
    /// before touching the filesystem.
    ///
    /// # Errors
    ///
    /// [`StorageError::NoSuchVersion`] for an invalid or missing explicit
    /// version id; [`StorageError::NoSuchKey`] if nothing is found at all.
    pub async fn read_version(
        &self,
        bucket: &str,
        key: &str,
        version_id: Option<&str>,
        load_payload: bool,
    ) -> Result<(ObjectMetadata, Option<Vec<u8>>), StorageError> {
        match version_id {
            Some(version_id) => {
                if version_id.contains("..") || version_id.contains('/') {
                    return Err(StorageError::NoSuchVersion);
                }
                let path = self.version_path(bucket, key, version_id);
                match self.files.read(&path, load_payload, None).await {
                    Err(StorageError::NoSuchKey) => Err(StorageError::NoSuchVersion),
                    other => other,
                }
            }
            None => {
                if let Some(latest) = self.read_latest_pointer(bucket, key).await? {
                    let path = self.version_path(bucket, key, &latest);
                    return self.files.read(&path, load_payload, None).await;
                }
                let non_versioned_path = self.files.storage_path(bucket, key);
                self.files.read(&non_versioned_path, load_payload, None).await
            }
        }
    }

    /// List every stored version of a key (descending by `updated_at`),
    /// including the non-versioned file if present. Recovers `.latest`
    /// on the fly per `spec.md` §5 rather than trusting a stale pointer.
    ///
    /// # Errors
    ///
    /// Any [`StorageError`] surfaced while reading version metadata.
    pub async fn list_versions(&self, bucket: &str, key: &str) -> Result<Vec<ObjectMetadata>, StorageError> {
        let mut versions = self.read_all_version_metadata(bucket, key).await?;

        let non_versioned_path = self.files.storage_path(bucket, key);
        if let Ok((metadata, _)) = self.files.read(&non_versioned_path, false, None).await {
            versions.push(metadata);
        }

        versions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(versions)
    }

    async fn read_all_version_metadata(&self, bucket: &str, key: &str) -> Result<Vec<ObjectMetadata>, StorageError> {
        let dir = self.files.versions_dir(bucket, key);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(StorageError::Io(err)),
        };

        let mut versions = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("obj") {
                continue;
            }
            let (metadata, _) = self.files.read(&path, false, None).await?;
            versions.push(metadata);
        }
        Ok(versions)
    }

    /// Recompute and rewrite the `.latest` pointer from scratch by
    /// scanning every version's `updated_at`. Used by listing and by
    /// crash recovery; the pointer is removed if no versions remain.
    ///
    /// # Errors
    ///
    /// Any [`StorageError`] surfaced while reading version metadata.
    pub async fn recover_latest_pointer(&self, bucket: &str, key: &str) -> Result<Option<String>, StorageError> {
        let versions = self.read_all_version_metadata(bucket, key).await?;
        let newest = versions.into_iter().max_by_key(|m| m.updated_at);
        match newest {
            Some(metadata) => {
                let version_id = metadata.version_id.unwrap_or_else(|| NULL_VERSION_ID.to_owned());
                self.set_latest_pointer(bucket, key, &version_id).await?;
                Ok(Some(version_id))
            }
            None => {
                let pointer = self.latest_pointer_path(bucket, key);
                let _ = tokio::fs::remove_file(&pointer).await;
                Ok(None)
            }
        }
    }

    /// Write a zero-payload delete marker as the new latest version.
    ///
    /// # Errors
    ///
    /// Any [`StorageError`] from the underlying write.
    pub async fn create_delete_marker(
        &self,
        bucket: &str,
        key: &str,
        bucket_name: &str,
        content_type: &str,
    ) -> Result<String, StorageError> {
        self.demote_current_latest(bucket, key).await?;
        let version_id = generate_version_id();
        let metadata = ObjectMetadata {
            bucket_name: bucket_name.to_owned(),
            key: key.to_owned(),
            size: 0,
            content_type: content_type.to_owned(),
            etag: crate::hashing::empty_payload_md5_hex(),
            metadata: Default::default(),
            updated_at: chrono::Utc::now(),
            version_id: Some(version_id.clone()),
            is_latest: true,
            is_delete_marker: true,
        };
        let path = self.version_path(bucket, key, &version_id);
        self.files.write(&metadata, &[], &path).await?;
        self.set_latest_pointer(bucket, key, &version_id).await?;
        Ok(version_id)
    }

    /// Delete exactly the named version. If it was the current latest,
    /// re-derive `.latest` from the remaining versions.
    ///
    /// # Errors
    ///
    /// [`StorageError::NoSuchVersion`] if the file is absent.
    pub async fn delete_version(&self, bucket: &str, key: &str, version_id: &str) -> Result<(), StorageError> {
        if version_id.contains("..") || version_id.contains('/') {
            return Err(StorageError::NoSuchVersion);
        }
        let path = self.version_path(bucket, key, version_id);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Err(StorageError::NoSuchVersion),
            Err(err) => return Err(StorageError::Io(err)),
        }

        let current_latest = self.read_latest_pointer(bucket, key).await?;
        if current_latest.as_deref() == Some(version_id) {
            self.recover_latest_pointer(bucket, key).await?;
        }
        Ok(())
    }

    /// Whether a `.versions` directory exists for this key at all — used
    /// to distinguish "never versioned" from "versioned, pointer absent".
    pub async fn has_versions_directory(&self, bucket: &str, key: &str) -> bool {
        tokio::fs::metadata(self.files.versions_dir(bucket, key)).await.is_ok()
    }
}

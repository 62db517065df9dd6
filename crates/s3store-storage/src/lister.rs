//! Prefix + delimiter + marker object listing with merged pagination.
//!
//! The core algorithm (`spec.md` §4.1) is a merge of two independently
//! sorted streams — object keys and common prefixes — under one combined
//! `max_keys` budget, with a single `next_marker` naming whichever stream
//! produced the last emitted entry. [`Lister::merge_listing`] implements
//! exactly that and is kept free of filesystem access so it can be tested
//! against hand-built key sets; the `collect_*` methods do the walking.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::error::StorageError;
use crate::metadata::ObjectMetadata;
use crate::objectfile::ObjectFile;
use crate::versionstore::VersionStore;

/// One listed object: enough to render an S3 `<Contents>` entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectSummary {
    pub key: String,
    pub size: u64,
    pub etag: String,
    pub updated_at: DateTime<Utc>,
    pub version_id: Option<String>,
}

/// Every stored version of one key, used by `ListObjectVersions`.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionGroup {
    pub key: String,
    pub versions: Vec<ObjectMetadata>,
}

/// Result of one listing call, ready to hand to the XML layer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListResult {
    pub objects: Vec<ObjectSummary>,
    pub common_prefixes: Vec<String>,
    pub is_truncated: bool,
    pub next_marker: Option<String>,
}

/// Walks a bucket's object tree and merges it into a paginated listing.
#[derive(Debug, Clone)]
pub struct Lister {
    files: ObjectFile,
    versions: VersionStore,
}

impl Lister {
    #[must_use]
    pub fn new(files: ObjectFile, versions: VersionStore) -> Self {
        Self { files, versions }
    }

    /// List objects in `bucket`. `versioned` selects whether keys are
    /// resolved through the `.versions`/`.latest` layout (skipping keys
    /// whose current version is a delete marker) or read directly as
    /// `<key>.obj` files.
    ///
    /// # Errors
    ///
    /// Any [`StorageError`] surfaced while walking the bucket directory.
    pub async fn list(
        &self,
        bucket: &str,
        prefix: Option<&str>,
        delimiter: Option<char>,
        marker: Option<&str>,
        max_keys: usize,
        versioned: bool,
    ) -> Result<ListResult, StorageError> {
        let entries = if versioned {
            self.collect_versioned_current(bucket).await?
        } else {
            self.collect_non_versioned(bucket).await?
        };
        Ok(Self::merge_listing(entries, prefix, delimiter, marker, max_keys))
    }

    /// The pure merge algorithm: filter by prefix/marker, split into
    /// object keys and common prefixes by `delimiter`, sort both streams,
    /// and interleave them in lexicographic order under one `max_keys`
    /// budget.
    #[must_use]
    pub fn merge_listing(
        entries: Vec<ObjectSummary>,
        prefix: Option<&str>,
        delimiter: Option<char>,
        marker: Option<&str>,
        max_keys: usize,
    ) -> ListResult {
        let prefix = prefix.unwrap_or("");
        let marker = marker.unwrap_or("");

        let mut objects = Vec::new();
        let mut common_prefixes: BTreeSet<String> = BTreeSet::new();

        for entry in entries {
            if !entry.key.starts_with(prefix) {
                continue;
            }
            if entry.key.as_str() <= marker {
                continue;
            }

            if let Some(delimiter) = delimiter {
                let remainder = &entry.key[prefix.len()..];
                if let Some(pos) = remainder.find(delimiter) {
                    let grouped = format!("{prefix}{}{delimiter}", &remainder[..pos]);
                    common_prefixes.insert(grouped);
                    continue;
                }
            }

            objects.push(entry);
        }

        objects.sort_by(|a, b| a.key.cmp(&b.key));
        let mut prefixes: Vec<String> = common_prefixes.into_iter().collect();
        prefixes.sort();

        Self::merge_sorted_streams(objects, prefixes, max_keys)
    }

    fn merge_sorted_streams(
        mut objects: Vec<ObjectSummary>,
        mut prefixes: Vec<String>,
        max_keys: usize,
    ) -> ListResult {
        objects.reverse();
        prefixes.reverse();

        let mut result = ListResult::default();
        let mut last_emitted: Option<String> = None;

        while result.objects.len() + result.common_prefixes.len() < max_keys {
            let next_is_object = match (objects.last(), prefixes.last()) {
                (Some(obj), Some(px)) => obj.key.as_str() <= px.as_str(),
                (Some(_), None) => true,
                (None, Some(_)) => false,
                (None, None) => break,
            };

            if next_is_object {
                let obj = objects.pop().expect("checked Some above");
                last_emitted = Some(obj.key.clone());
                result.objects.push(obj);
            } else {
                let px = prefixes.pop().expect("checked Some above");
                last_emitted = Some(px.clone());
                result.common_prefixes.push(px);
            }
        }

        if !objects.is_empty() || !prefixes.is_empty() {
            result.is_truncated = true;
            result.next_marker = last_emitted;
        }

        result
    }

    async fn collect_non_versioned(&self, bucket: &str) -> Result<Vec<ObjectSummary>, StorageError> {
        let root = self.files.bucket_root(bucket);
        let mut entries = Vec::new();
        let mut stack = vec![root.clone()];

        while let Some(dir) = stack.pop() {
            let mut read_dir = match tokio::fs::read_dir(&dir).await {
                Ok(read_dir) => read_dir,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
                Err(err) => return Err(StorageError::Io(err)),
            };
            while let Some(entry) = read_dir.next_entry().await? {
                let path = entry.path();
                let file_type = entry.file_type().await?;
                if file_type.is_dir() {
                    if is_versions_dir(&path) {
                        continue;
                    }
                    stack.push(path);
                } else if path.extension().and_then(|e| e.to_str()) == Some("obj") {
                    let (metadata, _) = self.files.read(&path, false, None).await?;
                    let key = path_to_key(&root, &path);
                    entries.push(ObjectSummary {
                        key,
                        size: metadata.size,
                        etag: metadata.etag,
                        updated_at: metadata.updated_at,
                        version_id: None,
                    });
                }
            }
        }

        Ok(entries)
    }

    async fn collect_versioned_current(&self, bucket: &str) -> Result<Vec<ObjectSummary>, StorageError> {
        let root = self.files.bucket_root(bucket);
        let mut entries = Vec::new();
        let mut stack = vec![root.clone()];

        while let Some(dir) = stack.pop() {
            let mut read_dir = match tokio::fs::read_dir(&dir).await {
                Ok(read_dir) => read_dir,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
                Err(err) => return Err(StorageError::Io(err)),
            };
            while let Some(entry) = read_dir.next_entry().await? {
                let path = entry.path();
                let file_type = entry.file_type().await?;
                if !file_type.is_dir() {
                    continue;
                }
                if is_versions_dir(&path) {
                    let key = path_to_key(&root, &path);
                    if let Some(summary) = self.resolve_current_version(bucket, &key).await? {
                        entries.push(summary);
                    }
                } else {
                    stack.push(path);
                }
            }
        }

        Ok(entries)
    }

    /// Every stored version of every key in a bucket, sorted by key
    /// ascending. Each group's versions are sorted newest-first, tied
    /// versions broken by descending `version_id` (`spec.md` §9: the
    /// format itself leaves identical-timestamp ordering undefined). Keys
    /// that were never versioned yield a single-entry group with
    /// `version_id: None`.
    ///
    /// # Errors
    ///
    /// Any [`StorageError`] surfaced while walking the bucket or reading
    /// version metadata.
    pub async fn list_all_versions(&self, bucket: &str) -> Result<Vec<VersionGroup>, StorageError> {
        let root = self.files.bucket_root(bucket);
        let mut groups = Vec::new();
        let mut stack = vec![root.clone()];

        while let Some(dir) = stack.pop() {
            let mut read_dir = match tokio::fs::read_dir(&dir).await {
                Ok(read_dir) => read_dir,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
                Err(err) => return Err(StorageError::Io(err)),
            };
            while let Some(entry) = read_dir.next_entry().await? {
                let path = entry.path();
                let file_type = entry.file_type().await?;
                if file_type.is_dir() {
                    if is_versions_dir(&path) {
                        let key = path_to_key(&root, &path);
                        let mut versions = self.versions.list_versions(bucket, &key).await?;
                        versions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| b.version_id.cmp(&a.version_id)));
                        groups.push(VersionGroup { key, versions });
                    } else {
                        stack.push(path);
                    }
                } else if path.extension().and_then(|e| e.to_str()) == Some("obj") {
                    let (metadata, _) = self.files.read(&path, false, None).await?;
                    let key = path_to_key(&root, &path);
                    groups.push(VersionGroup { key, versions: vec![metadata] });
                }
            }
        }

        groups.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(groups)
    }

    async fn resolve_current_version(&self, bucket: &str, key: &str) -> Result<Option<ObjectSummary>, StorageError> {
        let (metadata, _) = match self.versions.read_version(bucket, key, None, false).await {
            Ok(result) => result,
            Err(StorageError::NoSuchKey | StorageError::NoSuchVersion) => return Ok(None),
            Err(err) => return Err(err),
        };
        if metadata.is_delete_marker {
            return Ok(None);
        }
        Ok(Some(ObjectSummary {
            key: key.to_owned(),
            size: metadata.size,
            etag: metadata.etag,
            updated_at: metadata.updated_at,
            version_id: metadata.version_id,
        }))
    }
}

fn is_versions_dir(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("versions")
}

/// Strip `root` and the trailing `.obj`/`.versions` extension from a path
/// to recover the logical object key, normalizing path separators to `/`.
fn path_to_key(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let without_ext = relative.with_extension("");
    without_ext.to_string_lossy().replace(std::path::MAIN_SEPARATOR, "/")
}

//! Single-file object records: `[u32 len][metadata JSON][payload]`.
//!
//! Every write lands through a sibling temp file and an atomic rename so
//! readers never observe a torn file (`spec.md` §5). Path construction
//! (`storage_path`) is the only place key/bucket strings turn into
//! filesystem paths; every other module goes through it rather than
//! building paths itself.

use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

use crate::error::StorageError;
use crate::metadata::ObjectMetadata;

const LENGTH_PREFIX_BYTES: usize = 4;

const BUCKET_ENCODE_SET: &AsciiSet = &CONTROLS.add(b'/').add(b'%').add(b' ');

/// Filesystem access to the object-record format, rooted at one storage
/// directory. Stateless beyond that root; safe to share across tasks.
#[derive(Debug, Clone)]
pub struct ObjectFile {
    storage_root: PathBuf,
}

impl ObjectFile {
    #[must_use]
    pub fn new(storage_root: impl Into<PathBuf>) -> Self {
        Self { storage_root: storage_root.into() }
    }

    /// The canonical on-disk path for a non-versioned object. Versioned
    /// layouts are built on top of this by [`crate::versionstore`].
    #[must_use]
    pub fn storage_path(&self, bucket: &str, key: &str) -> PathBuf {
        let encoded_bucket = utf8_percent_encode(bucket, BUCKET_ENCODE_SET).to_string();
        let sanitized_key = sanitize_key(key);
        self.storage_root
            .join("buckets")
            .join(encoded_bucket)
            .join(format!("{sanitized_key}.obj"))
    }

    /// The bucket's root directory, used by [`Self::has_any_object`] and
    /// bucket-delete checks.
    #[must_use]
    pub fn bucket_root(&self, bucket: &str) -> PathBuf {
        let encoded_bucket = utf8_percent_encode(bucket, BUCKET_ENCODE_SET).to_string();
        self.storage_root.join("buckets").join(encoded_bucket)
    }

    /// The versions directory for a key, used by [`crate::versionstore::VersionStore`].
    #[must_use]
    pub fn versions_dir(&self, bucket: &str, key: &str) -> PathBuf {
        let encoded_bucket = utf8_percent_encode(bucket, BUCKET_ENCODE_SET).to_string();
        let sanitized_key = sanitize_key(key);
        self.storage_root
            .join("buckets")
            .join(encoded_bucket)
            .join(format!("{sanitized_key}.versions"))
    }

    /// Serialize `metadata` and `payload` into the record format and write
    /// them atomically to `path`, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// [`StorageError::Io`] on any filesystem failure, or
    /// [`StorageError::Serialization`] if `metadata` cannot be encoded.
    pub async fn write(&self, metadata: &ObjectMetadata, payload: &[u8], path: &Path) -> Result<(), StorageError> {
        let metadata_json = serde_json::to_vec(metadata)?;
        let mut record = Vec::with_capacity(LENGTH_PREFIX_BYTES + metadata_json.len() + payload.len());
        record.extend_from_slice(&(metadata_json.len() as u32).to_be_bytes());
        record.extend_from_slice(&metadata_json);
        record.extend_from_slice(payload);

        let parent = path.parent().ok_or_else(|| {
            StorageError::CorruptObject("object path has no parent directory".to_owned())
        })?;
        tokio::fs::create_dir_all(parent).await?;

        let temp_path = sibling_temp_path(path);
        {
            let mut temp_file = tokio::fs::File::create(&temp_path).await?;
            temp_file.write_all(&record).await?;
            temp_file.sync_all().await?;
        }
        if let Err(err) = tokio::fs::rename(&temp_path, path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(StorageError::Io(err));
        }
        Ok(())
    }

    /// Read a record back. When `load_payload` is `false`, only the
    /// metadata is read. `range` (inclusive byte offsets into the payload)
    /// limits how much of the payload is read from disk.
    ///
    /// # Errors
    ///
    /// [`StorageError::NoSuchKey`] if `path` doesn't exist,
    /// [`StorageError::CorruptObject`] if the record is malformed.
    pub async fn read(
        &self,
        path: &Path,
        load_payload: bool,
        range: Option<RangeInclusive<u64>>,
    ) -> Result<(ObjectMetadata, Option<Vec<u8>>), StorageError> {
        let mut file = tokio::fs::File::open(path).await.map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                StorageError::NoSuchKey
            } else {
                StorageError::Io(err)
            }
        })?;

        let file_len = file.metadata().await?.len();
        if file_len < LENGTH_PREFIX_BYTES as u64 {
            return Err(StorageError::CorruptObject("file shorter than length prefix".to_owned()));
        }

        let mut len_buf = [0u8; LENGTH_PREFIX_BYTES];
        file.read_exact(&mut len_buf).await?;
        let metadata_len = u32::from_be_bytes(len_buf) as u64;

        if metadata_len > file_len - LENGTH_PREFIX_BYTES as u64 {
            return Err(StorageError::CorruptObject("metadata length exceeds file size".to_owned()));
        }

        let mut metadata_buf = vec![0u8; metadata_len as usize];
        file.read_exact(&mut metadata_buf).await?;
        let metadata: ObjectMetadata = serde_json::from_slice(&metadata_buf)
            .map_err(|err| StorageError::CorruptObject(format!("invalid metadata JSON: {err}")))?;

        let payload_offset = LENGTH_PREFIX_BYTES as u64 + metadata_len;
        let payload_len = file_len - payload_offset;
        if payload_len != metadata.size {
            return Err(StorageError::CorruptObject(format!(
                "declared size {} does not match payload bytes {}",
                metadata.size, payload_len
            )));
        }

        if !load_payload {
            return Ok((metadata, None));
        }

        let payload = match range {
            Some(range) => {
                let start = *range.start();
                let end = *range.end();
                if start > end || end >= payload_len {
                    return Err(StorageError::CorruptObject("range outside payload bounds".to_owned()));
                }
                let read_len = (end - start + 1) as usize;
                file.seek(std::io::SeekFrom::Start(payload_offset + start)).await?;
                let mut buf = vec![0u8; read_len];
                file.read_exact(&mut buf).await?;
                buf
            }
            None => {
                let mut buf = Vec::with_capacity(payload_len as usize);
                file.read_to_end(&mut buf).await?;
                buf
            }
        };

        Ok((metadata, Some(payload)))
    }

    /// Whether a non-versioned object file exists at `bucket`/`key`.
    pub async fn key_exists(&self, bucket: &str, key: &str) -> bool {
        tokio::fs::metadata(self.storage_path(bucket, key)).await.is_ok()
    }

    /// Whether any `.obj` file exists anywhere under a bucket's root,
    /// versioned or not. Used to block deleting a non-empty bucket.
    pub async fn has_any_object(&self, bucket: &str) -> Result<bool, StorageError> {
        let root = self.bucket_root(bucket);
        if tokio::fs::metadata(&root).await.is_err() {
            return Ok(false);
        }
        Ok(find_first_obj_file(&root).await?.is_some())
    }

    /// Remove a single non-versioned object file. Idempotent: missing
    /// files are not an error.
    pub async fn delete(&self, bucket: &str, key: &str) -> Result<(), StorageError> {
        let path = self.storage_path(bucket, key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StorageError::Io(err)),
        }
    }

    /// Recursively remove every file whose sanitized key starts with
    /// `prefix` under a bucket (used by bucket-delete cleanup helpers and
    /// tests; object listing itself never deletes).
    pub async fn delete_prefix(&self, bucket: &str, prefix: &str) -> Result<(), StorageError> {
        let root = self.bucket_root(bucket);
        let sanitized_prefix = sanitize_key(prefix);
        let mut stack = vec![root];
        while let Some(dir) = stack.pop() {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
                Err(err) => return Err(StorageError::Io(err)),
            };
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                let file_type = entry.file_type().await?;
                if file_type.is_dir() {
                    stack.push(path);
                } else if path.to_string_lossy().contains(&sanitized_prefix) {
                    tokio::fs::remove_file(&path).await?;
                }
            }
        }
        Ok(())
    }
}

/// Replace every occurrence of `".."` with the empty string on every
/// `/`-delimited path segment, per `spec.md` §4.1. Applied repeatedly per
/// segment so `"...."` (two overlapping `".."`) is fully stripped.
fn sanitize_key(key: &str) -> String {
    key.split('/')
        .map(strip_parent_refs)
        .collect::<Vec<_>>()
        .join("/")
}

fn strip_parent_refs(segment: &str) -> String {
    let mut current = segment.to_owned();
    loop {
        let stripped = current.replace("..", "");
        if stripped == current {
            return stripped;
        }
        current = stripped;
    }
}

fn sibling_temp_path(path: &Path) -> PathBuf {
    let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("object");
    let random_suffix = crate::idgen::random_hex_suffix();
    path.with_file_name(format!(".{file_name}.{random_suffix}.tmp"))
}

fn find_first_obj_file(root: &Path) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Option<PathBuf>, StorageError>> + Send + '_>> {
    Box::pin(async move {
        let mut entries = match tokio::fs::read_dir(root).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(StorageError::Io(err)),
        };
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let file_type = entry.file_type().await?;
            if file_type.is_dir() {
                if let Some(found) = find_first_obj_file(&path).await? {
                    return Ok(Some(found));
                }
            } else if path.extension().and_then(|e| e.to_str()) == Some("obj") {
                return Ok(Some(path));
            }
        }
        Ok(None)
    })
}

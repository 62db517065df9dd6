//! On-disk object storage engine for S3Store.
//!
//! Everything here is synchronous-in-spirit async: each operation is a
//! self-contained sequence of filesystem calls with no cross-request
//! locking (`spec.md` §5). Callers (the HTTP dispatcher) own any
//! per-request ordering.
//!
//! # Modules
//!
//! - [`objectfile`] — the `[len][metadata][payload]` record format and
//!   atomic write
//! - [`versionstore`] — versioned layout, `.latest` pointer, delete markers
//! - [`lister`] — prefix/delimiter/marker listing with merged pagination
//! - [`validators`] — bucket-name and content-type validation
//! - [`hashing`] — MD5 ETag computation
//! - [`idgen`] — version-id and temp-file-suffix generation
//! - [`metadata`] — the `ObjectMetadata` JSON record
//! - [`error`] — [`error::StorageError`]

pub mod error;
pub mod hashing;
pub mod idgen;
pub mod lister;
pub mod metadata;
pub mod objectfile;
pub mod validators;
pub mod versionstore;

pub use error::StorageError;
pub use lister::{ListResult, Lister, ObjectSummary, VersionGroup};
pub use metadata::ObjectMetadata;
pub use objectfile::ObjectFile;
pub use versionstore::VersionStore;

//! Core types, configuration, and in-memory caches shared by every S3Store crate.
//!
//! This crate has no HTTP or filesystem dependency. It defines:
//!
//! - [`config`] — environment-driven service configuration
//! - [`account`] — the [`account::AccountStore`] trait consumed from outside the
//!   core (backed in production by a relational store; see `spec.md` §6)
//! - [`caches`] — [`caches::AuthCaches`], the read-mostly in-memory projections
//!   used on the hot authentication path
//! - [`error`] — the shared [`error::CoreError`] type
//!
//! # Modules

pub mod account;
pub mod caches;
pub mod config;
pub mod error;

pub use account::{AccountRecord, AccountStore};
pub use caches::{AuthCaches, VersioningStatus};
pub use config::S3StoreConfig;
pub use error::CoreError;

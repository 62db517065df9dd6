//! S3 REST dispatch: path-style routing, SigV4-gated request handling,
//! conditional headers, range reads, copy semantics, and XML error shaping
//! (`spec.md` §4.6).
//!
//! This crate has no opinion on how bytes arrive over the wire — it takes
//! an [`http::Request`] with a fully-buffered [`bytes::Bytes`] body (the
//! `aws-chunked` decoding already resolved by [`s3store_auth`]) and returns
//! an [`http::Response`]. Wiring an actual HTTP server around
//! [`dispatch::Dispatcher`] is left to the binary crate.
//!
//! # Modules
//!
//! - [`dispatch`] — [`dispatch::Dispatcher`], the `handle()` entry point
//! - [`router`] — path/query parsing into a [`router::RoutingContext`]
//! - [`conditional`] — `If-*` precondition evaluation
//! - [`range`] — `Range: bytes=...` parsing
//! - [`copyengine`] — `x-amz-copy-source` resolution
//! - [`requestid`] — `x-amz-request-id`/`x-amz-id-2` generation
//! - [`error`] — [`error::DispatchError`], the XML error boundary

pub mod conditional;
pub mod copyengine;
pub mod dispatch;
pub mod error;
pub mod range;
pub mod requestid;
pub mod router;

pub use dispatch::Dispatcher;
pub use error::DispatchError;
pub use router::RoutingContext;

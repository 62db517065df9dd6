//! AWS Signature Version 4 request authentication for S3Store.
//!
//! This crate verifies the signature on incoming HTTP requests against an
//! S3-compatible server: header-based (`Authorization`) and query/presigned
//! authentication, including the `aws-chunked` streaming payload variant.
//! It has no filesystem or HTTP-framework dependency — callers pass in
//! [`http::request::Parts`] plus whatever body bytes/hash are relevant and
//! get back a verdict.
//!
//! # Modules
//!
//! - [`hexcodec`] — lowercase hex encode/decode and constant-time compare
//! - [`datecodec`] — HTTP-date and AWS timestamp parsing/formatting in UTC
//! - [`canonical`] — SigV4 canonical request + string-to-sign construction
//! - [`chunked`] — `aws-chunked` body decoding
//! - [`sigv4`] — signature parsing, key derivation, and verification
//! - [`error`] — [`error::AuthError`]

pub mod canonical;
pub mod chunked;
pub mod datecodec;
pub mod error;
pub mod hexcodec;
pub mod sigv4;

pub use error::AuthError;
pub use sigv4::{AuthOutcome, SecretProvider, SigV4Engine};

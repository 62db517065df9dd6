//! XML response and error-body shaping for S3Store's REST surface.
//!
//! Every serializer here emits the S3 RestXml conventions: an XML
//! declaration, the `http://s3.amazonaws.com/doc/2006-03-01/` namespace on
//! the root element, lowercase booleans, and millisecond-precision ISO 8601
//! timestamps. This crate has no filesystem or HTTP-framework dependency —
//! it only turns plain Rust values into XML bytes and back.
//!
//! # Modules
//!
//! - [`error`] — [`error::error_to_xml`] and [`error::XmlError`]
//! - [`listing`] — `ListBucketResult`, `ListVersionsResult`, `ListAllMyBucketsResult`
//! - [`bucketconfig`] — `VersioningConfiguration`, `LocationConstraint`
//! - [`copyresult`] — `CopyObjectResult`

pub mod bucketconfig;
pub mod copyresult;
pub mod error;
pub mod listing;

pub use error::{error_to_xml, XmlError};
pub use listing::S3_NAMESPACE;

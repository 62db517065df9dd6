//! Mapping from lower-layer errors to S3 error codes, HTTP status, and the
//! XML error boundary (`spec.md` §7).

use http::StatusCode;
use s3store_auth::AuthError;
use s3store_storage::StorageError;

/// Every error the dispatcher can return to a caller, tagged with the S3
/// error code and HTTP status it renders to. This is the one place the
/// taxonomy in `spec.md` §7 is assembled; everything upstream returns a
/// typed error from its own crate and gets converted here, once, at the
/// boundary.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{code}: {message}")]
pub struct DispatchError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl DispatchError {
    #[must_use]
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self { status, code, message: message.into() }
    }

    #[must_use]
    pub fn not_modified() -> Self {
        Self::new(StatusCode::NOT_MODIFIED, "NotModified", "The object was not modified")
    }

    #[must_use]
    pub fn precondition_failed(detail: &str) -> Self {
        Self::new(StatusCode::PRECONDITION_FAILED, "PreconditionFailed", detail.to_owned())
    }

    #[must_use]
    pub fn invalid_argument(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "InvalidArgument", detail.into())
    }

    #[must_use]
    pub fn access_denied() -> Self {
        Self::new(StatusCode::FORBIDDEN, "AccessDenied", "Access Denied")
    }

    #[must_use]
    pub fn invalid_digest(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "InvalidDigest", detail.into())
    }

    #[must_use]
    pub fn bad_digest() -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BadDigest", "The Content-MD5 you specified did not match what we received")
    }

    #[must_use]
    pub fn no_such_bucket() -> Self {
        Self::new(StatusCode::NOT_FOUND, "NoSuchBucket", "The specified bucket does not exist")
    }

    #[must_use]
    pub fn no_such_bucket_policy() -> Self {
        Self::new(StatusCode::NOT_FOUND, "NoSuchBucketPolicy", "The bucket policy does not exist")
    }

    #[must_use]
    pub fn bucket_already_exists() -> Self {
        Self::new(StatusCode::CONFLICT, "BucketAlreadyExists", "The requested bucket name is not available")
    }

    #[must_use]
    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "InternalError", detail.into())
    }
}

impl From<AuthError> for DispatchError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::AccessDenied => Self::access_denied(),
            AuthError::RequestTimeTooSkewed => {
                Self::new(StatusCode::BAD_REQUEST, "RequestTimeTooSkewed", "The difference between the request time and the current time is too large")
            }
            AuthError::UnsupportedAlgorithm(alg) => {
                Self::new(StatusCode::BAD_REQUEST, "UnsupportedAlgorithm", format!("unsupported signing algorithm: {alg}"))
            }
            AuthError::SignatureDoesNotMatch => {
                Self::new(StatusCode::BAD_REQUEST, "SignatureDoesNotMatch", "The request signature we calculated does not match the signature you provided")
            }
            AuthError::InvalidDigest => Self::invalid_digest(err.to_string()),
            AuthError::MissingAuthHeader
            | AuthError::InvalidAuthHeader
            | AuthError::MissingHeader(_)
            | AuthError::InvalidCredential
            | AuthError::InvalidArgument(_)
            | AuthError::DecodedLengthMismatch
            | AuthError::IncompleteData
            | AuthError::InvalidChunkSize
            | AuthError::DecodingFailed(_) => Self::invalid_argument(err.to_string()),
        }
    }
}

impl From<StorageError> for DispatchError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NoSuchKey => Self::new(StatusCode::NOT_FOUND, "NoSuchKey", "The specified key does not exist"),
            StorageError::NoSuchVersion => Self::new(StatusCode::NOT_FOUND, "NoSuchVersion", "The specified version does not exist"),
            StorageError::NoSuchBucket => Self::no_such_bucket(),
            StorageError::BucketNotEmpty => Self::new(StatusCode::CONFLICT, "BucketNotEmpty", "The bucket you tried to delete is not empty"),
            StorageError::InvalidBucketName(detail) => Self::new(StatusCode::BAD_REQUEST, "InvalidBucketName", detail),
            StorageError::InvalidContentType(detail) => Self::invalid_argument(detail),
            StorageError::InvalidContentMd5(detail) => Self::invalid_digest(detail),
            StorageError::ContentMd5Mismatch => Self::bad_digest(),
            StorageError::CorruptObject(detail) => {
                tracing::error!(detail = %detail, "corrupt object record");
                Self::internal("internal error")
            }
            StorageError::Io(source) => {
                tracing::error!(error = %source, "storage I/O failure");
                Self::internal("internal error")
            }
            StorageError::Serialization(source) => {
                tracing::error!(error = %source, "metadata serialization failure");
                Self::internal("internal error")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_map_no_such_key_to_404() {
        let err: DispatchError = StorageError::NoSuchKey.into();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.code, "NoSuchKey");
    }

    #[test]
    fn test_should_map_signature_mismatch_to_400() {
        let err: DispatchError = AuthError::SignatureDoesNotMatch.into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.code, "SignatureDoesNotMatch");
    }

    #[test]
    fn test_should_hide_io_error_detail_behind_internal_error() {
        let source = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire, /secret/path leaked");
        let err: DispatchError = StorageError::Io(source).into();
        assert_eq!(err.code, "InternalError");
        assert!(!err.message.contains("secret"));
    }

    #[test]
    fn test_should_map_access_denied() {
        let err: DispatchError = AuthError::AccessDenied.into();
        assert_eq!(err.status, StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_should_map_content_sha256_mismatch_to_invalid_digest() {
        let err: DispatchError = AuthError::InvalidDigest.into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.code, "InvalidDigest");
    }

    #[test]
    fn test_should_map_malformed_content_md5_to_invalid_digest() {
        let err: DispatchError = StorageError::InvalidContentMd5("not valid base64".to_owned()).into();
        assert_eq!(err.code, "InvalidDigest");
    }

    #[test]
    fn test_should_map_content_md5_mismatch_to_bad_digest() {
        let err: DispatchError = StorageError::ContentMd5Mismatch.into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.code, "BadDigest");
    }
}

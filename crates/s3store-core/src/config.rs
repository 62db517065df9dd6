//! Service-wide configuration.
//!
//! Configuration is driven by environment variables, matching the convention
//! of the rest of this service family: a `Default` baseline overridden field
//! by field by whatever is set in the process environment.

use serde::{Deserialize, Serialize};

/// Configuration for the S3Store core: storage root, skew tolerance, and the
/// compatibility toggles called out in `spec.md` §9.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct S3StoreConfig {
    /// Bind address for the HTTP gateway (consumed by the server binary only).
    pub gateway_listen: String,

    /// Filesystem root under which `buckets/<bucket>/...` is rooted.
    pub storage_root: String,

    /// Default AWS region reported by this node (e.g. in `LocationConstraint`).
    pub default_region: String,

    /// Log level filter string (e.g. `"info"`, `"debug"`), used when
    /// `RUST_LOG` is not set.
    pub log_level: String,

    /// Maximum accepted clock skew for SigV4 date validation, in seconds.
    /// `spec.md` §4.4 fixes this at 15 minutes; kept configurable for tests.
    pub request_time_skew_seconds: i64,

    /// Upper bound accepted for `X-Amz-Expires` on presigned requests.
    /// `spec.md` §4.4 fixes this at 604800 seconds (7 days).
    pub presigned_max_expires_seconds: i64,

    /// Whether the unsorted-canonical-query compatibility fallback
    /// (`spec.md` §4.4 step 8, flagged in §9) is enabled. Operators who do
    /// not need to support the client that motivated it can narrow the
    /// accepted signature set by disabling it.
    pub unsorted_query_fallback_enabled: bool,
}

impl Default for S3StoreConfig {
    fn default() -> Self {
        Self {
            gateway_listen: "0.0.0.0:4566".to_owned(),
            storage_root: "/var/lib/s3store".to_owned(),
            default_region: "us-east-1".to_owned(),
            log_level: "info".to_owned(),
            request_time_skew_seconds: 15 * 60,
            presigned_max_expires_seconds: 7 * 24 * 60 * 60,
            unsorted_query_fallback_enabled: true,
        }
    }
}

impl S3StoreConfig {
    /// Load configuration from environment variables, falling back to
    /// [`S3StoreConfig::default`] for anything unset.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `GATEWAY_LISTEN` | `0.0.0.0:4566` |
    /// | `STORAGE_ROOT` | `/var/lib/s3store` |
    /// | `DEFAULT_REGION` | `us-east-1` |
    /// | `LOG_LEVEL` | `info` |
    /// | `REQUEST_TIME_SKEW_SECONDS` | `900` |
    /// | `PRESIGNED_MAX_EXPIRES_SECONDS` | `604800` |
    /// | `UNSORTED_QUERY_FALLBACK_ENABLED` | `true` |
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("GATEWAY_LISTEN") {
            config.gateway_listen = v;
        }
        if let Ok(v) = std::env::var("STORAGE_ROOT") {
            config.storage_root = v;
        }
        if let Ok(v) = std::env::var("DEFAULT_REGION") {
            config.default_region = v;
        }
        if let Ok(v) = std::env::var("LOG_LEVEL") {
            config.log_level = v;
        }
        if let Ok(v) = std::env::var("REQUEST_TIME_SKEW_SECONDS") {
            if let Ok(n) = v.parse::<i64>() {
                config.request_time_skew_seconds = n;
            }
        }
        if let Ok(v) = std::env::var("PRESIGNED_MAX_EXPIRES_SECONDS") {
            if let Ok(n) = v.parse::<i64>() {
                config.presigned_max_expires_seconds = n;
            }
        }
        if let Ok(v) = std::env::var("UNSORTED_QUERY_FALLBACK_ENABLED") {
            config.unsorted_query_fallback_enabled = parse_bool(&v);
        }

        config
    }
}

fn parse_bool(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_create_default_config() {
        let config = S3StoreConfig::default();
        assert_eq!(config.gateway_listen, "0.0.0.0:4566");
        assert_eq!(config.request_time_skew_seconds, 900);
        assert_eq!(config.presigned_max_expires_seconds, 604_800);
        assert!(config.unsorted_query_fallback_enabled);
    }

    #[test]
    fn test_should_serialize_to_camel_case_json() {
        let json = serde_json::to_string(&S3StoreConfig::default()).expect("serializes");
        assert!(json.contains("storageRoot"));
        assert!(json.contains("requestTimeSkewSeconds"));
    }

    #[test]
    fn test_should_parse_bool_values() {
        assert!(parse_bool("1"));
        assert!(parse_bool("true"));
        assert!(parse_bool("TRUE"));
        assert!(!parse_bool("0"));
        assert!(!parse_bool(""));
    }
}

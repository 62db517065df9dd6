//! The JSON metadata record embedded in every object file.
//!
//! Field names are camelCase on the wire (`spec.md` §6) even though the
//! rest of the crate is snake_case Rust — this is the one place the two
//! conventions meet.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One stored object version's metadata, exactly as it sits in the first
/// `metadata_length` bytes of an object file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectMetadata {
    #[serde(rename = "bucketName")]
    pub bucket_name: String,
    pub key: String,
    pub size: u64,
    #[serde(rename = "contentType")]
    pub content_type: String,
    pub etag: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    #[serde(rename = "updatedAt", with = "updated_at_codec")]
    pub updated_at: DateTime<Utc>,
    #[serde(rename = "versionId", default, skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,
    #[serde(rename = "isLatest", default)]
    pub is_latest: bool,
    #[serde(rename = "isDeleteMarker", default)]
    pub is_delete_marker: bool,
}

impl ObjectMetadata {
    /// The default content type assigned when a `PUT` carries no
    /// `Content-Type` header.
    pub const DEFAULT_CONTENT_TYPE: &'static str = "application/octet-stream";

    #[must_use]
    pub fn is_versioned(&self) -> bool {
        self.version_id.is_some()
    }
}

/// Serialize/deserialize `updated_at` as ISO 8601 with exactly millisecond
/// precision, UTC (`spec.md` §6), rather than chrono's default
/// nanosecond-precision RFC 3339 rendering.
mod updated_at_codec {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> ObjectMetadata {
        ObjectMetadata {
            bucket_name: "my-bucket".to_owned(),
            key: "path/to/key.txt".to_owned(),
            size: 4,
            content_type: ObjectMetadata::DEFAULT_CONTENT_TYPE.to_owned(),
            etag: "9e107d9d372bb6826bd81d3542a419d6".to_owned(),
            metadata: BTreeMap::new(),
            updated_at: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
            version_id: None,
            is_latest: false,
            is_delete_marker: false,
        }
    }

    #[test]
    fn test_should_round_trip_json_with_camel_case_fields() {
        let metadata = sample();
        let json = serde_json::to_string(&metadata).expect("serializes");
        assert!(json.contains("\"bucketName\""));
        assert!(json.contains("\"contentType\""));
        assert!(json.contains("\"updatedAt\""));
        assert!(!json.contains("versionId"));

        let parsed: ObjectMetadata = serde_json::from_str(&json).expect("deserializes");
        assert_eq!(parsed, metadata);
    }

    #[test]
    fn test_should_serialize_updated_at_with_millisecond_precision() {
        let metadata = sample();
        let json = serde_json::to_value(&metadata).unwrap();
        let rendered = json["updatedAt"].as_str().unwrap();
        assert_eq!(rendered, "2024-01-02T03:04:05.000Z");
    }

    #[test]
    fn test_should_default_missing_optional_fields_on_deserialize() {
        let json = r#"{
            "bucketName": "b",
            "key": "k",
            "size": 0,
            "contentType": "application/octet-stream",
            "etag": "d41d8cd98f00b204e9800998ecf8427e",
            "updatedAt": "2024-01-02T03:04:05.000Z"
        }"#;
        let parsed: ObjectMetadata = serde_json::from_str(json).expect("deserializes");
        assert!(parsed.metadata.is_empty());
        assert_eq!(parsed.version_id, None);
        assert!(!parsed.is_latest);
        assert!(!parsed.is_delete_marker);
    }

    #[test]
    fn test_is_versioned_reflects_version_id_presence() {
        let mut metadata = sample();
        assert!(!metadata.is_versioned());
        metadata.version_id = Some("null".to_owned());
        assert!(metadata.is_versioned());
    }
}

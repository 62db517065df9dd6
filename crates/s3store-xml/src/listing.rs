//! `ListObjects`, `ListObjectVersions`, and `ListBuckets` XML response
//! bodies.

use std::io::{self, Write};

use chrono::{DateTime, SecondsFormat, Utc};
use quick_xml::events::{BytesDecl, BytesText, Event};
use quick_xml::Writer;

use crate::error::XmlError;

/// The S3 XML namespace every listing/config response carries.
pub const S3_NAMESPACE: &str = "http://s3.amazonaws.com/doc/2006-03-01/";

/// One `<Contents>` entry in a `ListBucketResult`.
#[derive(Debug, Clone, PartialEq)]
pub struct ListBucketContent {
    pub key: String,
    pub last_modified: DateTime<Utc>,
    pub etag: String,
    pub size: u64,
}

/// Inputs for a v1 or v2 `GET /{bucket}` listing response. `continuation_token`,
/// `next_continuation_token`, and `key_count` are only emitted for v2.
#[derive(Debug, Clone, Default)]
pub struct ListBucketResult {
    pub name: String,
    pub prefix: String,
    pub marker: Option<String>,
    pub next_marker: Option<String>,
    pub continuation_token: Option<String>,
    pub next_continuation_token: Option<String>,
    pub max_keys: u32,
    pub delimiter: Option<String>,
    pub is_truncated: bool,
    pub contents: Vec<ListBucketContent>,
    pub common_prefixes: Vec<String>,
}

/// Serialize a v1 `ListBucketResult` (`Marker`/`NextMarker`).
///
/// # Errors
///
/// [`XmlError`] if the underlying writer fails.
pub fn list_bucket_result_v1(result: &ListBucketResult) -> Result<Vec<u8>, XmlError> {
    write_document("ListBucketResult", |w| {
        write_text(w, "Name", &result.name)?;
        write_text(w, "Prefix", &result.prefix)?;
        write_text(w, "Marker", result.marker.as_deref().unwrap_or(""))?;
        if let Some(next_marker) = &result.next_marker {
            write_text(w, "NextMarker", next_marker)?;
        }
        write_text(w, "MaxKeys", &result.max_keys.to_string())?;
        if let Some(delimiter) = &result.delimiter {
            write_text(w, "Delimiter", delimiter)?;
        }
        write_text(w, "IsTruncated", bool_str(result.is_truncated))?;
        write_contents(w, &result.contents)?;
        write_common_prefixes(w, &result.common_prefixes)?;
        Ok(())
    })
}

/// Serialize a v2 `ListBucketResult` (`ContinuationToken`/`KeyCount`).
///
/// # Errors
///
/// [`XmlError`] if the underlying writer fails.
pub fn list_bucket_result_v2(result: &ListBucketResult) -> Result<Vec<u8>, XmlError> {
    write_document("ListBucketResult", |w| {
        write_text(w, "Name", &result.name)?;
        write_text(w, "Prefix", &result.prefix)?;
        write_text(w, "KeyCount", &result.contents.len().to_string())?;
        write_text(w, "MaxKeys", &result.max_keys.to_string())?;
        if let Some(delimiter) = &result.delimiter {
            write_text(w, "Delimiter", delimiter)?;
        }
        write_text(w, "IsTruncated", bool_str(result.is_truncated))?;
        if let Some(token) = &result.continuation_token {
            write_text(w, "ContinuationToken", token)?;
        }
        if let Some(token) = &result.next_continuation_token {
            write_text(w, "NextContinuationToken", token)?;
        }
        write_contents(w, &result.contents)?;
        write_common_prefixes(w, &result.common_prefixes)?;
        Ok(())
    })
}

fn write_contents<W: Write>(w: &mut Writer<W>, contents: &[ListBucketContent]) -> io::Result<()> {
    for entry in contents {
        w.create_element("Contents").write_inner_content(|w| {
            write_text(w, "Key", &entry.key)?;
            write_text(w, "LastModified", &format_timestamp(entry.last_modified))?;
            write_text(w, "ETag", &format!("\"{}\"", entry.etag))?;
            write_text(w, "Size", &entry.size.to_string())?;
            Ok(())
        })?;
    }
    Ok(())
}

fn write_common_prefixes<W: Write>(w: &mut Writer<W>, prefixes: &[String]) -> io::Result<()> {
    for prefix in prefixes {
        w.create_element("CommonPrefixes")
            .write_inner_content(|w| write_text(w, "Prefix", prefix))?;
    }
    Ok(())
}

/// One entry in a `ListVersionsResult`: either a `<Version>` or a
/// `<DeleteMarker>` element, distinguished by `is_delete_marker`.
#[derive(Debug, Clone, PartialEq)]
pub struct ListVersionEntry {
    pub key: String,
    pub version_id: String,
    pub is_latest: bool,
    pub last_modified: DateTime<Utc>,
    pub etag: Option<String>,
    pub size: Option<u64>,
    pub is_delete_marker: bool,
}

/// Inputs for `GET /{bucket}?versions`.
#[derive(Debug, Clone, Default)]
pub struct ListVersionsResult {
    pub name: String,
    pub prefix: String,
    pub key_marker: Option<String>,
    pub next_key_marker: Option<String>,
    pub max_keys: u32,
    pub delimiter: Option<String>,
    pub is_truncated: bool,
    pub entries: Vec<ListVersionEntry>,
    pub common_prefixes: Vec<String>,
}

/// Serialize a `ListVersionsResult`.
///
/// # Errors
///
/// [`XmlError`] if the underlying writer fails.
pub fn list_versions_result(result: &ListVersionsResult) -> Result<Vec<u8>, XmlError> {
    write_document("ListVersionsResult", |w| {
        write_text(w, "Name", &result.name)?;
        write_text(w, "Prefix", &result.prefix)?;
        write_text(w, "KeyMarker", result.key_marker.as_deref().unwrap_or(""))?;
        if let Some(next) = &result.next_key_marker {
            write_text(w, "NextKeyMarker", next)?;
        }
        write_text(w, "MaxKeys", &result.max_keys.to_string())?;
        if let Some(delimiter) = &result.delimiter {
            write_text(w, "Delimiter", delimiter)?;
        }
        write_text(w, "IsTruncated", bool_str(result.is_truncated))?;
        for entry in &result.entries {
            let tag = if entry.is_delete_marker { "DeleteMarker" } else { "Version" };
            w.create_element(tag).write_inner_content(|w| {
                write_text(w, "Key", &entry.key)?;
                write_text(w, "VersionId", &entry.version_id)?;
                write_text(w, "IsLatest", bool_str(entry.is_latest))?;
                write_text(w, "LastModified", &format_timestamp(entry.last_modified))?;
                if let Some(etag) = &entry.etag {
                    write_text(w, "ETag", &format!("\"{etag}\""))?;
                }
                if let Some(size) = entry.size {
                    write_text(w, "Size", &size.to_string())?;
                }
                Ok(())
            })?;
        }
        write_common_prefixes(w, &result.common_prefixes)?;
        Ok(())
    })
}

/// One bucket in a `ListAllMyBucketsResult`.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketEntry {
    pub name: String,
    pub creation_date: DateTime<Utc>,
}

/// Serialize `GET /` (list caller-owned buckets).
///
/// # Errors
///
/// [`XmlError`] if the underlying writer fails.
pub fn list_all_my_buckets_result(owner_id: &str, buckets: &[BucketEntry]) -> Result<Vec<u8>, XmlError> {
    write_document("ListAllMyBucketsResult", |w| {
        w.create_element("Owner").write_inner_content(|w| write_text(w, "ID", owner_id))?;
        w.create_element("Buckets").write_inner_content(|w| {
            for bucket in buckets {
                w.create_element("Bucket").write_inner_content(|w| {
                    write_text(w, "Name", &bucket.name)?;
                    write_text(w, "CreationDate", &format_timestamp(bucket.creation_date))?;
                    Ok(())
                })?;
            }
            Ok(())
        })?;
        Ok(())
    })
}

fn write_document<F>(root_element: &str, body: F) -> Result<Vec<u8>, XmlError>
where
    F: FnOnce(&mut Writer<&mut Vec<u8>>) -> io::Result<()>,
{
    let mut buf = Vec::with_capacity(512);
    let mut writer = Writer::new(&mut buf);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer
        .create_element(root_element)
        .with_attribute(("xmlns", S3_NAMESPACE))
        .write_inner_content(body)?;
    Ok(buf)
}

fn write_text<W: Write>(writer: &mut Writer<W>, tag: &str, text: &str) -> io::Result<()> {
    writer.create_element(tag).write_text_content(BytesText::new(text))?;
    Ok(())
}

fn bool_str(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

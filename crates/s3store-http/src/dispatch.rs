//! The S3 request dispatcher: ties routing, authentication, conditional
//! evaluation, and the storage engine together into one `handle` entry
//! point (`spec.md` §4.6).

use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use http::{HeaderMap, HeaderValue, Method, Request, Response, StatusCode};

use s3store_auth::datecodec::format_http_date;
use s3store_auth::{SecretProvider, SigV4Engine, VerificationRequest};
use s3store_core::{AccountStore, AuthCaches, S3StoreConfig, VersioningStatus};
use s3store_storage::{Lister, ObjectFile, ObjectMetadata, StorageError, VersionStore};
use s3store_xml::bucketconfig::{location_constraint, parse_versioning_configuration, versioning_configuration};
use s3store_xml::copyresult::copy_object_result;
use s3store_xml::error_to_xml;
use s3store_xml::listing::{
    list_all_my_buckets_result, list_bucket_result_v1, list_bucket_result_v2, list_versions_result, BucketEntry,
    ListBucketContent, ListBucketResult, ListVersionEntry, ListVersionsResult,
};

use crate::conditional::Preconditions;
use crate::copyengine::{self, CopySource};
use crate::error::DispatchError;
use crate::range;
use crate::requestid::{generate_amz_id2, generate_request_id};
use crate::router::{self, RoutingContext};

const DEFAULT_MAX_KEYS: usize = 1000;

/// Adapts [`AuthCaches`] to the [`SecretProvider`] trait the auth crate
/// depends on, without the core crate needing to know about SigV4 at all.
struct CacheSecretProvider<'a>(&'a AuthCaches);

impl SecretProvider for CacheSecretProvider<'_> {
    fn secret_for(&self, access_key: &str) -> Option<String> {
        self.0.secret_for(access_key)
    }
}

/// Everything the dispatcher needs to serve one S3-compatible node: the
/// auth engine and its caches, the storage engine, and the external
/// account store for mutations that must outlive the process.
pub struct Dispatcher<A: AccountStore> {
    pub config: S3StoreConfig,
    pub caches: Arc<AuthCaches>,
    pub sigv4: SigV4Engine,
    pub account_store: Arc<A>,
    pub files: ObjectFile,
    pub versions: VersionStore,
    pub lister: Lister,
}

impl<A: AccountStore> Dispatcher<A> {
    #[must_use]
    pub fn new(config: S3StoreConfig, caches: Arc<AuthCaches>, sigv4: SigV4Engine, account_store: Arc<A>) -> Self {
        let files = ObjectFile::new(config.storage_root.clone());
        let versions = VersionStore::new(files.clone());
        let lister = Lister::new(files.clone(), versions.clone());
        Self { config, caches, sigv4, account_store, files, versions, lister }
    }

    /// Handle one HTTP request end to end, never panicking: every error
    /// path renders the XML error body exactly once, at this boundary
    /// (`spec.md` §7).
    pub async fn handle(&self, req: Request<Bytes>) -> Response<Bytes> {
        let request_id = generate_request_id();
        let resource = req.uri().path().to_owned();
        match self.handle_inner(req, &request_id).await {
            Ok(response) => response,
            Err(err) => self.error_response(&err, &request_id, Some(&resource)),
        }
    }

    async fn handle_inner(&self, req: Request<Bytes>, request_id: &str) -> Result<Response<Bytes>, DispatchError> {
        let (parts, body) = req.into_parts();
        let ctx = router::route(parts.uri.path(), parts.uri.query().unwrap_or(""));

        let headers = lowercase_headers(&parts.headers);
        let verification = VerificationRequest {
            method: parts.method.as_str(),
            path: parts.uri.path(),
            raw_query: parts.uri.query().unwrap_or(""),
            headers: &headers,
            body: &body,
            now: Utc::now(),
        };
        let secrets = CacheSecretProvider(&self.caches);
        let outcome = self.sigv4.verify(&secrets, &verification)?;
        let user_id = self.caches.user_for(&outcome.access_key).ok_or_else(DispatchError::access_denied)?;
        let payload = outcome.decoded_payload.unwrap_or_else(|| body.to_vec());

        match (&parts.method, ctx.bucket.as_deref(), ctx.key.as_deref()) {
            (&Method::GET, None, None) => self.list_buckets(&outcome.access_key, request_id),
            (&Method::GET, Some(bucket), None) => self.get_bucket(bucket, &user_id, &ctx, request_id).await,
            (&Method::PUT, Some(bucket), None) => self.put_bucket(bucket, &outcome.access_key, &user_id, &ctx, &payload, request_id).await,
            (&Method::DELETE, Some(bucket), None) => self.delete_bucket(bucket, &outcome.access_key, &user_id, request_id).await,
            (&Method::HEAD, Some(bucket), None) => self.head_bucket(bucket, &user_id, request_id).await,
            (&Method::GET, Some(bucket), Some(key)) => self.get_object(bucket, key, &user_id, &ctx, &parts.headers, request_id).await,
            (&Method::HEAD, Some(bucket), Some(key)) => self.head_object(bucket, key, &user_id, &ctx, &parts.headers, request_id).await,
            (&Method::PUT, Some(bucket), Some(key)) => self.put_object(bucket, key, &user_id, &parts.headers, &payload, request_id).await,
            (&Method::DELETE, Some(bucket), Some(key)) => self.delete_object(bucket, key, &user_id, &ctx, request_id).await,
            _ => Err(DispatchError::new(StatusCode::METHOD_NOT_ALLOWED, "MethodNotAllowed", "unsupported operation")),
        }
    }

    fn require_bucket_owned_by(&self, bucket: &str, user_id: &str) -> Result<(), DispatchError> {
        match self.caches.bucket_owner(bucket) {
            None => Err(DispatchError::no_such_bucket()),
            Some(owner) if owner != user_id => Err(DispatchError::access_denied()),
            Some(_) => Ok(()),
        }
    }

    fn versioned(&self, bucket: &str) -> bool {
        self.caches.versioning_status(bucket).unwrap_or_default() != VersioningStatus::Disabled
    }

    // ---- bucket-level operations ----

    fn list_buckets(&self, access_key: &str, request_id: &str) -> Result<Response<Bytes>, DispatchError> {
        let owner_id = self.caches.user_for(access_key).unwrap_or_default();
        let buckets = self.caches.buckets_for(access_key);
        let entries: Vec<BucketEntry> = buckets
            .into_iter()
            .map(|name| BucketEntry { name, creation_date: Utc::now() })
            .collect();
        let body = list_all_my_buckets_result(&owner_id, &entries).map_err(|err| DispatchError::internal(err.to_string()))?;
        Ok(xml_response(StatusCode::OK, body, request_id))
    }

    async fn get_bucket(&self, bucket: &str, user_id: &str, ctx: &RoutingContext, request_id: &str) -> Result<Response<Bytes>, DispatchError> {
        self.require_bucket_owned_by(bucket, user_id)?;

        if ctx.has_query("location") {
            let body = location_constraint(&self.config.default_region).map_err(|err| DispatchError::internal(err.to_string()))?;
            return Ok(xml_response(StatusCode::OK, body, request_id));
        }
        if ctx.has_query("policy") {
            return Err(DispatchError::no_such_bucket_policy());
        }
        if ctx.has_query("versioning") {
            let status = self.caches.versioning_status(bucket).unwrap_or_default();
            let body = versioning_configuration(status.as_xml_str()).map_err(|err| DispatchError::internal(err.to_string()))?;
            return Ok(xml_response(StatusCode::OK, body, request_id));
        }
        if ctx.has_query("versions") {
            return self.list_object_versions(bucket, ctx, request_id).await;
        }
        self.list_objects(bucket, ctx, request_id).await
    }

    async fn list_objects(&self, bucket: &str, ctx: &RoutingContext, request_id: &str) -> Result<Response<Bytes>, DispatchError> {
        let prefix = ctx.query_value("prefix").unwrap_or("");
        let delimiter = ctx.query_value("delimiter").filter(|d| d.chars().count() == 1).map(|d| d.chars().next().unwrap());
        let max_keys = ctx
            .query_value("max-keys")
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|&v| v > 0)
            .unwrap_or(DEFAULT_MAX_KEYS);
        let is_v2 = ctx.query_value("list-type") == Some("2");
        let marker = if is_v2 {
            ctx.query_value("continuation-token").or_else(|| ctx.query_value("start-after"))
        } else {
            ctx.query_value("marker")
        };

        let result = self
            .lister
            .list(bucket, Some(prefix), delimiter, marker, max_keys, self.versioned(bucket))
            .await?;

        let contents: Vec<ListBucketContent> = result
            .objects
            .iter()
            .map(|o| ListBucketContent { key: o.key.clone(), last_modified: o.updated_at, etag: o.etag.clone(), size: o.size })
            .collect();

        let mut listing = ListBucketResult {
            name: bucket.to_owned(),
            prefix: prefix.to_owned(),
            max_keys: max_keys as u32,
            delimiter: delimiter.map(String::from),
            is_truncated: result.is_truncated,
            contents,
            common_prefixes: result.common_prefixes,
            ..Default::default()
        };

        let body = if is_v2 {
            listing.continuation_token = ctx.query_value("continuation-token").map(String::from);
            listing.next_continuation_token = if result.is_truncated { result.next_marker.clone() } else { None };
            list_bucket_result_v2(&listing)
        } else {
            listing.marker = marker.map(String::from);
            listing.next_marker = if result.is_truncated { result.next_marker.clone() } else { None };
            list_bucket_result_v1(&listing)
        }
        .map_err(|err| DispatchError::internal(err.to_string()))?;

        Ok(xml_response(StatusCode::OK, body, request_id))
    }

    async fn list_object_versions(&self, bucket: &str, ctx: &RoutingContext, request_id: &str) -> Result<Response<Bytes>, DispatchError> {
        let prefix = ctx.query_value("prefix").unwrap_or("");
        let delimiter = ctx.query_value("delimiter").filter(|d| d.chars().count() == 1).map(|d| d.chars().next().unwrap());
        let key_marker = ctx.query_value("key-marker").unwrap_or("");
        let max_keys = ctx
            .query_value("max-keys")
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|&v| v > 0)
            .unwrap_or(DEFAULT_MAX_KEYS);

        let groups = self.lister.list_all_versions(bucket).await?;
        let (entries, common_prefixes, is_truncated, next_marker) =
            merge_version_groups(groups, prefix, delimiter, key_marker, max_keys);

        let result = ListVersionsResult {
            name: bucket.to_owned(),
            prefix: prefix.to_owned(),
            key_marker: (!key_marker.is_empty()).then(|| key_marker.to_owned()),
            next_key_marker: next_marker,
            max_keys: max_keys as u32,
            delimiter: delimiter.map(String::from),
            is_truncated,
            entries,
            common_prefixes,
        };
        let body = list_versions_result(&result).map_err(|err| DispatchError::internal(err.to_string()))?;
        Ok(xml_response(StatusCode::OK, body, request_id))
    }

    async fn put_bucket(
        &self,
        bucket: &str,
        access_key: &str,
        user_id: &str,
        ctx: &RoutingContext,
        payload: &[u8],
        request_id: &str,
    ) -> Result<Response<Bytes>, DispatchError> {
        if ctx.has_query("versioning") {
            self.require_bucket_owned_by(bucket, user_id)?;
            let raw_status = parse_versioning_configuration(payload).map_err(|err| DispatchError::invalid_argument(err.to_string()))?;
            let status = VersioningStatus::parse(&raw_status)
                .ok_or_else(|| DispatchError::invalid_argument(format!("unsupported versioning status: {raw_status}")))?;
            self.caches.set_versioning_status(bucket, status);
            self.account_store.set_versioning(bucket, status);
            return Ok(empty_response(StatusCode::OK, request_id));
        }

        s3store_storage::validators::validate_bucket_name(bucket)?;
        if self.caches.bucket_owner(bucket).is_some() {
            return Err(DispatchError::bucket_already_exists());
        }
        self.account_store.create_bucket(bucket, user_id, VersioningStatus::Disabled);
        self.caches.register_bucket(access_key, user_id, bucket);
        Ok(empty_response(StatusCode::OK, request_id))
    }

    async fn delete_bucket(&self, bucket: &str, access_key: &str, user_id: &str, request_id: &str) -> Result<Response<Bytes>, DispatchError> {
        self.require_bucket_owned_by(bucket, user_id)?;
        if self.files.has_any_object(bucket).await? {
            return Err(DispatchError::new(StatusCode::CONFLICT, "BucketNotEmpty", "The bucket you tried to delete is not empty"));
        }
        self.account_store.delete_bucket(bucket, user_id);
        self.caches.unregister_bucket(access_key, bucket);
        Ok(empty_response(StatusCode::NO_CONTENT, request_id))
    }

    async fn head_bucket(&self, bucket: &str, user_id: &str, request_id: &str) -> Result<Response<Bytes>, DispatchError> {
        self.require_bucket_owned_by(bucket, user_id)?;
        Ok(empty_response(StatusCode::OK, request_id))
    }

    // ---- object-level operations ----

    async fn read_object_metadata(&self, bucket: &str, key: &str, version_id: Option<&str>) -> Result<ObjectMetadata, DispatchError> {
        let (metadata, _) = if self.versioned(bucket) {
            self.versions.read_version(bucket, key, version_id, false).await?
        } else {
            if version_id.is_some() {
                return Err(StorageError::NoSuchVersion.into());
            }
            self.files.read(&self.files.storage_path(bucket, key), false, None).await?
        };
        if metadata.is_delete_marker {
            return Err(StorageError::NoSuchKey.into());
        }
        Ok(metadata)
    }

    async fn read_object_full(
        &self,
        bucket: &str,
        key: &str,
        version_id: Option<&str>,
        range: Option<std::ops::RangeInclusive<u64>>,
    ) -> Result<(ObjectMetadata, Vec<u8>), DispatchError> {
        if self.versioned(bucket) {
            let (metadata, payload) = self.versions.read_version(bucket, key, version_id, true).await?;
            let full = payload.unwrap_or_default();
            let sliced = match &range {
                Some(r) => full.get(*r.start() as usize..=*r.end() as usize).map(<[u8]>::to_vec).unwrap_or(full),
                None => full,
            };
            Ok((metadata, sliced))
        } else {
            let (metadata, payload) = self.files.read(&self.files.storage_path(bucket, key), true, range).await?;
            Ok((metadata, payload.unwrap_or_default()))
        }
    }

    async fn get_object(
        &self,
        bucket: &str,
        key: &str,
        user_id: &str,
        ctx: &RoutingContext,
        headers: &HeaderMap,
        request_id: &str,
    ) -> Result<Response<Bytes>, DispatchError> {
        self.require_bucket_owned_by(bucket, user_id)?;
        let version_id = ctx.query_value("versionId");
        let metadata = self.read_object_metadata(bucket, key, version_id).await?;
        Preconditions::from_headers(headers).evaluate(&metadata.etag, metadata.updated_at)?;

        let range = headers
            .get(http::header::RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| range::parse_range(v, metadata.size));

        let (metadata, payload) = self.read_object_full(bucket, key, version_id, range.clone()).await?;

        let mut builder = Response::builder();
        let status = if range.is_some() { StatusCode::PARTIAL_CONTENT } else { StatusCode::OK };
        builder = builder.status(status);
        builder = builder.header(http::header::ETAG, format!("\"{}\"", metadata.etag));
        builder = builder.header(http::header::LAST_MODIFIED, format_http_date(metadata.updated_at));
        builder = builder.header(http::header::ACCEPT_RANGES, "bytes");
        builder = builder.header(http::header::CONTENT_TYPE, metadata.content_type.clone());
        builder = builder.header(http::header::CONTENT_LENGTH, payload.len().to_string());
        if let Some(r) = &range {
            builder = builder.header(http::header::CONTENT_RANGE, range::content_range_header(r, metadata.size));
        }
        if let Some(version_id) = &metadata.version_id {
            builder = builder.header("x-amz-version-id", version_id.as_str());
        }
        builder = with_standard_headers(builder, request_id);
        builder
            .body(Bytes::from(payload))
            .map_err(|err| DispatchError::internal(err.to_string()))
    }

    async fn head_object(
        &self,
        bucket: &str,
        key: &str,
        user_id: &str,
        ctx: &RoutingContext,
        headers: &HeaderMap,
        request_id: &str,
    ) -> Result<Response<Bytes>, DispatchError> {
        self.require_bucket_owned_by(bucket, user_id)?;
        let version_id = ctx.query_value("versionId");
        let metadata = self.read_object_metadata(bucket, key, version_id).await?;
        Preconditions::from_headers(headers).evaluate(&metadata.etag, metadata.updated_at)?;

        let mut builder = Response::builder().status(StatusCode::OK);
        builder = builder.header(http::header::ETAG, format!("\"{}\"", metadata.etag));
        builder = builder.header(http::header::LAST_MODIFIED, format_http_date(metadata.updated_at));
        builder = builder.header(http::header::ACCEPT_RANGES, "bytes");
        builder = builder.header(http::header::CONTENT_TYPE, metadata.content_type.clone());
        builder = builder.header(http::header::CONTENT_LENGTH, metadata.size.to_string());
        if let Some(version_id) = &metadata.version_id {
            builder = builder.header("x-amz-version-id", version_id.as_str());
        }
        builder = with_standard_headers(builder, request_id);
        builder.body(Bytes::new()).map_err(|err| DispatchError::internal(err.to_string()))
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        user_id: &str,
        headers: &HeaderMap,
        payload: &[u8],
        request_id: &str,
    ) -> Result<Response<Bytes>, DispatchError> {
        self.require_bucket_owned_by(bucket, user_id)?;

        if let Some(copy_source) = headers.get("x-amz-copy-source").and_then(|v| v.to_str().ok()) {
            return self.copy_object(bucket, key, user_id, copy_source, headers, request_id).await;
        }

        let content_type = headers
            .get(http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(ObjectMetadata::DEFAULT_CONTENT_TYPE);
        s3store_storage::validators::validate_content_type(content_type)?;

        let declared_md5 = headers.get("content-md5").and_then(|v| v.to_str().ok());
        s3store_storage::validators::validate_content_md5(declared_md5, payload)?;

        let metadata = ObjectMetadata {
            bucket_name: bucket.to_owned(),
            key: key.to_owned(),
            size: payload.len() as u64,
            content_type: content_type.to_owned(),
            etag: s3store_storage::hashing::md5_hex(payload),
            metadata: user_metadata_headers(headers),
            updated_at: Utc::now(),
            version_id: None,
            is_latest: true,
            is_delete_marker: false,
        };
        let etag = metadata.etag.clone();
        let status = self.caches.versioning_status(bucket).unwrap_or_default();
        let version_id = self.versions.write_versioned(metadata, payload, bucket, key, status).await?;

        let mut builder = Response::builder().status(StatusCode::OK);
        builder = builder.header(http::header::ETAG, format!("\"{etag}\""));
        if status != VersioningStatus::Disabled {
            builder = builder.header("x-amz-version-id", version_id.as_str());
        }
        builder = with_standard_headers(builder, request_id);
        builder.body(Bytes::new()).map_err(|err| DispatchError::internal(err.to_string()))
    }

    async fn copy_object(
        &self,
        dest_bucket: &str,
        dest_key: &str,
        user_id: &str,
        copy_source_header: &str,
        headers: &HeaderMap,
        request_id: &str,
    ) -> Result<Response<Bytes>, DispatchError> {
        let (CopySource { bucket: src_bucket, key: src_key }, src_version_id) = parse_copy_source_with_version(copy_source_header)?;
        self.require_bucket_owned_by(&src_bucket, user_id)?;

        let src_metadata = self.read_object_metadata(&src_bucket, &src_key, src_version_id.as_deref()).await?;
        Preconditions::from_copy_source_headers(headers).evaluate(&src_metadata.etag, src_metadata.updated_at)?;

        let (_, src_payload) = self.read_object_full(&src_bucket, &src_key, src_version_id.as_deref(), None).await?;

        let replace = copyengine::is_replace_directive(headers.get("x-amz-metadata-directive").and_then(|v| v.to_str().ok()));
        let (content_type, user_metadata) = if replace {
            let content_type = headers
                .get(http::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or(ObjectMetadata::DEFAULT_CONTENT_TYPE)
                .to_owned();
            (content_type, user_metadata_headers(headers))
        } else {
            (src_metadata.content_type.clone(), src_metadata.metadata.clone())
        };
        s3store_storage::validators::validate_content_type(&content_type)?;

        let now = Utc::now();
        let metadata = ObjectMetadata {
            bucket_name: dest_bucket.to_owned(),
            key: dest_key.to_owned(),
            size: src_payload.len() as u64,
            content_type,
            etag: s3store_storage::hashing::md5_hex(&src_payload),
            metadata: user_metadata,
            updated_at: now,
            version_id: None,
            is_latest: true,
            is_delete_marker: false,
        };
        let etag = metadata.etag.clone();
        let status = self.caches.versioning_status(dest_bucket).unwrap_or_default();
        let version_id = self.versions.write_versioned(metadata, &src_payload, dest_bucket, dest_key, status).await?;

        let body = copy_object_result(&etag, now).map_err(|err| DispatchError::internal(err.to_string()))?;
        let mut response = xml_response(StatusCode::OK, body, request_id);
        if status != VersioningStatus::Disabled {
            response
                .headers_mut()
                .insert("x-amz-version-id", HeaderValue::from_str(&version_id).map_err(|err| DispatchError::internal(err.to_string()))?);
        }
        Ok(response)
    }

    async fn delete_object(&self, bucket: &str, key: &str, user_id: &str, ctx: &RoutingContext, request_id: &str) -> Result<Response<Bytes>, DispatchError> {
        self.require_bucket_owned_by(bucket, user_id)?;
        let status = self.caches.versioning_status(bucket).unwrap_or_default();
        let version_id_query = ctx.query_value("versionId");

        let mut builder = Response::builder().status(StatusCode::NO_CONTENT);

        match status {
            VersioningStatus::Disabled => {
                self.files.delete(bucket, key).await?;
            }
            _ => match version_id_query {
                Some(version_id) => {
                    match self.versions.delete_version(bucket, key, version_id).await {
                        Ok(()) | Err(StorageError::NoSuchVersion) => {}
                        Err(err) => return Err(err.into()),
                    }
                    builder = builder.header("x-amz-version-id", version_id);
                }
                None => {
                    let new_version_id = self
                        .versions
                        .create_delete_marker(bucket, key, bucket, ObjectMetadata::DEFAULT_CONTENT_TYPE)
                        .await?;
                    builder = builder.header("x-amz-version-id", new_version_id);
                    builder = builder.header("x-amz-delete-marker", "true");
                }
            },
        }

        builder = with_standard_headers(builder, request_id);
        builder.body(Bytes::new()).map_err(|err| DispatchError::internal(err.to_string()))
    }

    fn error_response(&self, err: &DispatchError, request_id: &str, resource: Option<&str>) -> Response<Bytes> {
        let body = error_to_xml(err.code, &err.message, resource, request_id);
        xml_response(err.status, body, request_id)
    }
}

fn fallback_response(status: StatusCode) -> Response<Bytes> {
    Response::builder().status(status).body(Bytes::new()).expect("status-only response never fails to build")
}

fn lowercase_headers(headers: &HeaderMap) -> BTreeMap<String, Vec<String>> {
    let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in headers {
        if let Ok(value) = value.to_str() {
            map.entry(name.as_str().to_ascii_lowercase()).or_default().push(value.to_owned());
        }
    }
    map
}

fn user_metadata_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut metadata = BTreeMap::new();
    for (name, value) in headers {
        if let Some(suffix) = name.as_str().strip_prefix("x-amz-meta-") {
            if let Ok(value) = value.to_str() {
                metadata.insert(suffix.to_owned(), value.to_owned());
            }
        }
    }
    metadata
}

fn parse_copy_source_with_version(header: &str) -> Result<(CopySource, Option<String>), DispatchError> {
    let (path_part, query_part) = header.split_once('?').unwrap_or((header, ""));
    let source = copyengine::parse_copy_source(path_part)?;
    let version_id = query_part
        .split('&')
        .find_map(|pair| pair.strip_prefix("versionId=").map(str::to_owned));
    Ok((source, version_id))
}

fn xml_response(status: StatusCode, body: Vec<u8>, request_id: &str) -> Response<Bytes> {
    let mut builder = Response::builder().status(status).header(http::header::CONTENT_TYPE, "application/xml");
    builder = with_standard_headers(builder, request_id);
    builder.body(Bytes::from(body)).unwrap_or_else(|_| fallback_response(status))
}

fn empty_response(status: StatusCode, request_id: &str) -> Response<Bytes> {
    let builder = with_standard_headers(Response::builder().status(status), request_id);
    builder.body(Bytes::new()).unwrap_or_else(|_| fallback_response(status))
}

fn with_standard_headers(builder: http::response::Builder, request_id: &str) -> http::response::Builder {
    builder
        .header("x-amz-request-id", request_id)
        .header("x-amz-id-2", generate_amz_id2(request_id))
}

/// Merge per-key version groups with prefix/delimiter/marker filtering and
/// a combined `max_keys` budget, generalizing
/// [`s3store_storage::Lister::merge_listing`] to the case where each key
/// contributes more than one listing entry.
#[allow(clippy::type_complexity)]
fn merge_version_groups(
    groups: Vec<s3store_storage::VersionGroup>,
    prefix: &str,
    delimiter: Option<char>,
    key_marker: &str,
    max_keys: usize,
) -> (Vec<ListVersionEntry>, Vec<String>, bool, Option<String>) {
    let mut filtered: Vec<s3store_storage::VersionGroup> = groups
        .into_iter()
        .filter(|g| g.key.starts_with(prefix) && g.key.as_str() > key_marker)
        .collect();
    filtered.sort_by(|a, b| a.key.cmp(&b.key));

    let mut common_prefixes: std::collections::BTreeSet<String> = std::collections::BTreeSet::new();
    let mut kept_groups = Vec::new();
    for group in filtered {
        if let Some(delimiter) = delimiter {
            let remainder = &group.key[prefix.len()..];
            if let Some(pos) = remainder.find(delimiter) {
                common_prefixes.insert(format!("{prefix}{}{delimiter}", &remainder[..pos]));
                continue;
            }
        }
        kept_groups.push(group);
    }
    let mut prefixes: Vec<String> = common_prefixes.into_iter().collect();
    prefixes.sort();

    let mut group_iter = kept_groups.into_iter().peekable();
    let mut prefix_iter = prefixes.into_iter().peekable();
    let mut entries = Vec::new();
    let mut used_prefixes = Vec::new();
    let mut count = 0usize;
    let mut truncated = false;
    let mut last_emitted: Option<String> = None;

    'outer: while count < max_keys {
        let take_group = match (group_iter.peek(), prefix_iter.peek()) {
            (Some(g), Some(p)) => g.key.as_str() <= p.as_str(),
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => break,
        };

        if take_group {
            let group = group_iter.next().expect("peeked Some");
            for (index, version) in group.versions.iter().enumerate() {
                if count >= max_keys {
                    truncated = true;
                    break 'outer;
                }
                entries.push(ListVersionEntry {
                    key: group.key.clone(),
                    version_id: version.version_id.clone().unwrap_or_else(|| "null".to_owned()),
                    is_latest: index == 0,
                    last_modified: version.updated_at,
                    etag: (!version.is_delete_marker).then(|| version.etag.clone()),
                    size: (!version.is_delete_marker).then_some(version.size),
                    is_delete_marker: version.is_delete_marker,
                });
                count += 1;
            }
            last_emitted = Some(group.key);
        } else {
            let prefix_entry = prefix_iter.next().expect("peeked Some");
            used_prefixes.push(prefix_entry.clone());
            last_emitted = Some(prefix_entry);
            count += 1;
        }
    }

    if group_iter.peek().is_some() || prefix_iter.peek().is_some() {
        truncated = true;
    }

    (entries, used_prefixes, truncated, truncated.then(|| last_emitted).flatten())
}

#[cfg(test)]
mod tests {
    use super::*;
    use s3store_storage::VersionGroup;

    fn metadata(version_id: Option<&str>, is_delete_marker: bool) -> ObjectMetadata {
        ObjectMetadata {
            bucket_name: "b".to_owned(),
            key: "k".to_owned(),
            size: 1,
            content_type: ObjectMetadata::DEFAULT_CONTENT_TYPE.to_owned(),
            etag: "etag".to_owned(),
            metadata: Default::default(),
            updated_at: Utc::now(),
            version_id: version_id.map(String::from),
            is_latest: true,
            is_delete_marker,
        }
    }

    #[test]
    fn test_should_mark_only_first_version_as_latest() {
        let groups = vec![VersionGroup {
            key: "x".to_owned(),
            versions: vec![metadata(Some("v2"), false), metadata(Some("v1"), false)],
        }];
        let (entries, _, _, _) = merge_version_groups(groups, "", None, "", 100);
        assert!(entries[0].is_latest);
        assert!(!entries[1].is_latest);
    }

    #[test]
    fn test_should_group_versioned_keys_by_delimiter() {
        let groups = vec![
            VersionGroup { key: "a/b".to_owned(), versions: vec![metadata(Some("v1"), false)] },
            VersionGroup { key: "c".to_owned(), versions: vec![metadata(Some("v1"), false)] },
        ];
        let (entries, prefixes, _, _) = merge_version_groups(groups, "", Some('/'), "", 100);
        assert_eq!(prefixes, vec!["a/".to_owned()]);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].key, "c");
    }

    #[test]
    fn test_should_omit_etag_and_size_for_delete_markers() {
        let groups = vec![VersionGroup { key: "x".to_owned(), versions: vec![metadata(Some("v1"), true)] }];
        let (entries, _, _, _) = merge_version_groups(groups, "", None, "", 100);
        assert_eq!(entries[0].etag, None);
        assert_eq!(entries[0].size, None);
        assert!(entries[0].is_delete_marker);
    }

    #[test]
    fn test_should_paginate_and_report_truncation() {
        let groups = vec![
            VersionGroup { key: "a".to_owned(), versions: vec![metadata(Some("v1"), false)] },
            VersionGroup { key: "b".to_owned(), versions: vec![metadata(Some("v1"), false)] },
        ];
        let (entries, _, truncated, next_marker) = merge_version_groups(groups, "", None, "", 1);
        assert_eq!(entries.len(), 1);
        assert!(truncated);
        assert_eq!(next_marker, Some("a".to_owned()));
    }

    #[test]
    fn test_should_parse_copy_source_with_version_query() {
        let (source, version) = parse_copy_source_with_version("/src/key?versionId=abc123").unwrap();
        assert_eq!(source.bucket, "src");
        assert_eq!(source.key, "key");
        assert_eq!(version.as_deref(), Some("abc123"));
    }

    #[test]
    fn test_should_parse_copy_source_without_version_query() {
        let (source, version) = parse_copy_source_with_version("/src/key").unwrap();
        assert_eq!(source.bucket, "src");
        assert_eq!(version, None);
    }
}

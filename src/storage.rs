//! Object-storage REST client.
//!
//! Two operations back the whole service: listing the bucket and uploading
//! bytes to it, both authorized with a bearer token from the JWT bearer
//! flow. The [`ObjectStore`] trait is the seam between the HTTP handlers
//! and the real storage API so tests can run against an in-memory store.
//!
//! Requests are stateless by design: every call loads the credential and
//! performs a fresh token exchange, so concurrent requests never share
//! mutable state.

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;
use tracing::{debug, info};

use crate::credentials::CredentialChain;
use crate::error::{ServiceError, StorageError};
use crate::token::TokenExchanger;

/// Public host for object downloads.
pub const PUBLIC_STORAGE_HOST: &str = "https://storage.googleapis.com";

/// Files above this size go directly from the client to storage via a
/// direct-upload grant, bypassing the application server. Chosen
/// conservatively below the 500 MB platform cap.
pub const DIRECT_UPLOAD_THRESHOLD: u64 = 100 * 1024 * 1024;

// =============================================================================
// Wire types
// =============================================================================

/// A raw storage object as returned by the listing and upload endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageObject {
    /// Object key within the bucket (unique)
    pub name: String,

    /// MIME type as recorded by storage
    #[serde(rename = "contentType", default)]
    pub content_type: Option<String>,

    /// RFC 3339 creation timestamp
    #[serde(rename = "timeCreated", default)]
    pub time_created: Option<String>,

    /// Custom `x-goog-meta-*` metadata
    #[serde(default)]
    pub metadata: Option<HashMap<String, String>>,
}

impl StorageObject {
    /// Construct an object by hand (mock stores and tests).
    pub fn new(name: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content_type: Some(content_type.into()),
            time_created: None,
            metadata: None,
        }
    }

    /// Builder-style creation timestamp.
    pub fn with_time_created(mut self, time_created: impl Into<String>) -> Self {
        self.time_created = Some(time_created.into());
        self
    }

    /// Builder-style metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Deserialize)]
struct ListObjectsResponse {
    #[serde(default)]
    items: Vec<StorageObject>,
}

/// Custom metadata attached to every uploaded object.
#[derive(Debug, Clone)]
pub struct UploadMetadata {
    /// Display name of the uploading guest
    pub uploaded_by: String,

    /// RFC 3339 upload timestamp
    pub uploaded_at: String,

    /// The file name as it existed on the guest's device
    pub original_name: String,
}

/// Authorization for a client-driven upload straight to storage.
///
/// Holds everything the client needs to PUT the bytes itself: the media
/// upload URL for the reserved object key and a bearer token to present.
#[derive(Debug, Clone)]
pub struct DirectUploadGrant {
    /// Media-upload endpoint for the object key
    pub upload_url: String,

    /// Bearer token authorizing the upload
    pub access_token: String,
}

// =============================================================================
// ObjectStore trait
// =============================================================================

/// The storage operations the HTTP handlers depend on.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List every object in the bucket. An empty bucket yields an empty
    /// vec, not an error.
    async fn list_objects(&self) -> Result<Vec<StorageObject>, ServiceError>;

    /// Upload raw bytes under `key` and return the created object's
    /// metadata.
    async fn put_object(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
        meta: &UploadMetadata,
    ) -> Result<StorageObject, ServiceError>;

    /// Authorize a direct client upload for `key`.
    async fn direct_upload_grant(&self, key: &str) -> Result<DirectUploadGrant, ServiceError>;

    /// Public download URL for an object key.
    fn public_url(&self, key: &str) -> String;
}

// =============================================================================
// GCS implementation
// =============================================================================

/// Object store backed by the Google Cloud Storage JSON/media REST API.
pub struct GcsStore {
    bucket: String,
    api_base: String,
    credentials: CredentialChain,
    exchanger: TokenExchanger,
    http: reqwest::Client,
}

impl GcsStore {
    /// Create a store for `bucket` using the given credential chain.
    pub fn new(bucket: impl Into<String>, credentials: CredentialChain) -> Self {
        let http = reqwest::Client::new();
        Self {
            bucket: bucket.into(),
            api_base: PUBLIC_STORAGE_HOST.to_string(),
            credentials,
            exchanger: TokenExchanger::new(http.clone()),
            http,
        }
    }

    /// Point the store at a custom API endpoint (emulators, tests).
    pub fn with_endpoints(
        mut self,
        api_base: impl Into<String>,
        token_url: impl Into<String>,
    ) -> Self {
        self.api_base = api_base.into();
        self.exchanger = TokenExchanger::with_token_url(self.http.clone(), token_url);
        self
    }

    /// Bucket this store operates on.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    fn list_url(&self) -> String {
        format!("{}/storage/v1/b/{}/o", self.api_base, self.bucket)
    }

    fn upload_url(&self, key: &str) -> String {
        format!(
            "{}/upload/storage/v1/b/{}/o?uploadType=media&name={}",
            self.api_base,
            self.bucket,
            urlencoding::encode(key)
        )
    }

    /// Fresh credential load + token exchange. One per storage call.
    async fn bearer_token(&self) -> Result<String, ServiceError> {
        let credential = self.credentials.resolve()?;
        let token = self.exchanger.exchange(&credential).await?;
        Ok(token.value)
    }
}

#[async_trait]
impl ObjectStore for GcsStore {
    async fn list_objects(&self) -> Result<Vec<StorageObject>, ServiceError> {
        let token = self.bearer_token().await?;

        let response = self
            .http
            .get(self.list_url())
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| StorageError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StorageError::List {
                status: status.as_u16(),
                status_text: status
                    .canonical_reason()
                    .unwrap_or("unknown status")
                    .to_string(),
            }
            .into());
        }

        let body: ListObjectsResponse = response
            .json()
            .await
            .map_err(|e| StorageError::Transport(e.to_string()))?;

        debug!(bucket = %self.bucket, count = body.items.len(), "listed objects");
        Ok(body.items)
    }

    async fn put_object(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
        meta: &UploadMetadata,
    ) -> Result<StorageObject, ServiceError> {
        let token = self.bearer_token().await?;

        let response = self
            .http
            .post(self.upload_url(key))
            .bearer_auth(&token)
            .header(http::header::CONTENT_TYPE, content_type)
            .header("x-goog-meta-uploaded-by", &meta.uploaded_by)
            .header("x-goog-meta-uploaded-at", &meta.uploaded_at)
            .header("x-goog-meta-original-name", &meta.original_name)
            .body(data)
            .send()
            .await
            .map_err(|e| StorageError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            // Keep the response body for diagnostics; storage error bodies
            // say which precondition failed.
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Upload {
                status: status.as_u16(),
                status_text: status
                    .canonical_reason()
                    .unwrap_or("unknown status")
                    .to_string(),
                body,
            }
            .into());
        }

        let object: StorageObject = response
            .json()
            .await
            .map_err(|e| StorageError::Transport(e.to_string()))?;

        info!(bucket = %self.bucket, key = %object.name, "uploaded object");
        Ok(object)
    }

    async fn direct_upload_grant(&self, key: &str) -> Result<DirectUploadGrant, ServiceError> {
        let access_token = self.bearer_token().await?;
        Ok(DirectUploadGrant {
            upload_url: self.upload_url(key),
            access_token,
        })
    }

    fn public_url(&self, key: &str) -> String {
        public_object_url(&self.bucket, key)
    }
}

/// Public download URL for an object, independent of any store instance.
pub fn public_object_url(bucket: &str, key: &str) -> String {
    format!("{}/{}/{}", PUBLIC_STORAGE_HOST, bucket, key)
}

// =============================================================================
// Tests
// =============================================================================

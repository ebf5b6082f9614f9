//! Test utilities for integration tests.
//!
//! Provides an in-memory [`ObjectStore`] implementation so the full router
//! can be exercised without a cloud bucket, plus helpers for building
//! multipart request bodies by hand.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use wedsnap::error::{ConfigError, ServiceError};
use wedsnap::storage::{
    public_object_url, DirectUploadGrant, ObjectStore, StorageObject, UploadMetadata,
};

// =============================================================================
// Mock Object Store
// =============================================================================

/// An in-memory object store that serves pre-configured objects and
/// records uploads.
pub struct MockObjectStore {
    bucket: String,
    seed: Vec<StorageObject>,
    uploads: Arc<RwLock<Vec<(String, Bytes, String, UploadMetadata)>>>,
    uploaded_objects: Arc<RwLock<Vec<StorageObject>>>,
    list_count: Arc<AtomicUsize>,
    /// When set, every operation fails as if the credential were broken.
    failure: Option<String>,
}

impl MockObjectStore {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            seed: Vec::new(),
            uploads: Arc::new(RwLock::new(Vec::new())),
            uploaded_objects: Arc::new(RwLock::new(Vec::new())),
            list_count: Arc::new(AtomicUsize::new(0)),
            failure: None,
        }
    }

    pub fn with_object(mut self, object: StorageObject) -> Self {
        self.seed.push(object);
        self
    }

    /// Make every operation fail with a credential configuration error.
    pub fn failing(bucket: impl Into<String>, message: impl Into<String>) -> Self {
        let mut store = Self::new(bucket);
        store.failure = Some(message.into());
        store
    }

    /// Handles for inspecting the store after the router consumed it.
    pub fn tracking(&self) -> StoreTracking {
        StoreTracking {
            uploads: Arc::clone(&self.uploads),
            list_count: Arc::clone(&self.list_count),
        }
    }

    /// Errors are not clonable, so a failing store manufactures a fresh
    /// one per call.
    fn fail(&self) -> Option<ServiceError> {
        self.failure
            .as_ref()
            .map(|msg| ConfigError::InvalidCredentialJson(msg.clone()).into())
    }
}

/// Shared handles into a [`MockObjectStore`], usable after the store has
/// been moved into the router.
pub struct StoreTracking {
    uploads: Arc<RwLock<Vec<(String, Bytes, String, UploadMetadata)>>>,
    list_count: Arc<AtomicUsize>,
}

impl StoreTracking {
    pub async fn uploads(&self) -> Vec<(String, Bytes, String, UploadMetadata)> {
        self.uploads.read().await.clone()
    }

    pub fn list_count(&self) -> usize {
        self.list_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStore for MockObjectStore {
    async fn list_objects(&self) -> Result<Vec<StorageObject>, ServiceError> {
        self.list_count.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.fail() {
            return Err(err);
        }
        let mut objects = self.seed.clone();
        objects.extend(self.uploaded_objects.read().await.iter().cloned());
        Ok(objects)
    }

    async fn put_object(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
        meta: &UploadMetadata,
    ) -> Result<StorageObject, ServiceError> {
        if let Some(err) = self.fail() {
            return Err(err);
        }

        self.uploads.write().await.push((
            key.to_string(),
            data,
            content_type.to_string(),
            meta.clone(),
        ));

        let object = StorageObject::new(key, content_type)
            .with_time_created(&meta.uploaded_at)
            .with_metadata("uploaded-by", &meta.uploaded_by)
            .with_metadata("uploaded-at", &meta.uploaded_at)
            .with_metadata("original-name", &meta.original_name);
        self.uploaded_objects.write().await.push(object.clone());
        Ok(object)
    }

    async fn direct_upload_grant(&self, key: &str) -> Result<DirectUploadGrant, ServiceError> {
        if let Some(err) = self.fail() {
            return Err(err);
        }
        Ok(DirectUploadGrant {
            upload_url: format!(
                "https://storage.example/upload/storage/v1/b/{}/o?uploadType=media&name={}",
                self.bucket, key
            ),
            access_token: "mock-access-token".to_string(),
        })
    }

    fn public_url(&self, key: &str) -> String {
        public_object_url(&self.bucket, key)
    }
}

// =============================================================================
// Fixture Objects
// =============================================================================

/// A bucket object as the listing endpoint would return it.
pub fn media_object(name: &str, content_type: &str, created: &str) -> StorageObject {
    StorageObject::new(name, content_type).with_time_created(created)
}

/// A media object carrying the uploader metadata written by the service.
pub fn media_object_with_uploader(
    name: &str,
    content_type: &str,
    created: &str,
    uploaded_by: &str,
    original_name: &str,
) -> StorageObject {
    media_object(name, content_type, created)
        .with_metadata("uploaded-by", uploaded_by)
        .with_metadata("original-name", original_name)
}

// =============================================================================
// Multipart Request Building
// =============================================================================

/// Boundary used by [`multipart_body`].
pub const TEST_BOUNDARY: &str = "wedsnap-test-boundary";

/// Build a multipart/form-data body with a file part and a userName part.
pub fn multipart_body(file_name: &str, content_type: &str, data: &[u8], user_name: &str) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{TEST_BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
             Content-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(
        format!(
            "\r\n--{TEST_BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"userName\"\r\n\r\n\
             {user_name}\r\n\
             --{TEST_BOUNDARY}--\r\n"
        )
        .as_bytes(),
    );
    body
}

/// Build a multipart body containing only a userName part and no file.
pub fn multipart_body_without_file(user_name: &str) -> Vec<u8> {
    format!(
        "--{TEST_BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"userName\"\r\n\r\n\
         {user_name}\r\n\
         --{TEST_BOUNDARY}--\r\n"
    )
    .into_bytes()
}

//! HTTP request handlers for the gallery API.
//!
//! # Endpoints
//!
//! - `GET|POST /api/photos` - List the shared gallery
//! - `POST /api/upload-cloud` - Upload a file through the server
//! - `POST /api/upload-signed-url` - Authorize a direct-to-storage upload
//! - `GET /health` - Health check endpoint
//!
//! Gallery responses carry an exhaustive set of no-cache headers: guests
//! refresh the page seconds after uploading, and any cache layer between
//! them and the bucket makes a fresh photo look lost.

use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::error::ServiceError;
use crate::media::{format_file_size, media_records, storage_object_key, MediaRecord};
use crate::storage::{ObjectStore, UploadMetadata};

// =============================================================================
// Application State
// =============================================================================

/// Shared application state passed to all handlers via Axum's State
/// extractor. Requests are otherwise fully independent: no token cache, no
/// shared mutable state.
pub struct AppState<S: ObjectStore> {
    /// The object store backing the gallery
    pub store: Arc<S>,

    /// Bucket name, used to derive public URLs for upload responses
    pub bucket: String,

    /// Upload size ceiling for the server-side upload route
    pub max_upload_bytes: u64,
}

impl<S: ObjectStore> AppState<S> {
    /// Create a new application state.
    pub fn new(store: S, bucket: impl Into<String>, max_upload_bytes: u64) -> Self {
        Self {
            store: Arc::new(store),
            bucket: bucket.into(),
            max_upload_bytes,
        }
    }
}

impl<S: ObjectStore> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            bucket: self.bucket.clone(),
            max_upload_bytes: self.max_upload_bytes,
        }
    }
}

// =============================================================================
// Request / Response Types
// =============================================================================

/// Body of `POST /api/upload-signed-url`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedUrlRequest {
    /// File name on the guest's device
    pub file_name: String,

    /// Declared MIME type
    pub file_type: String,

    /// Declared size in bytes (informational; the client validates size
    /// before calling)
    #[serde(default)]
    pub file_size: u64,

    /// Uploading guest's display name
    #[serde(default)]
    pub user_name: Option<String>,
}

/// Response from the gallery listing endpoint.
#[derive(Debug, Serialize)]
pub struct PhotosResponse {
    /// All media records, newest first
    pub photos: Vec<MediaRecord>,

    /// Server time in epoch milliseconds, for cache busting
    pub timestamp: i64,

    /// Marker that this payload came straight from storage
    #[serde(rename = "_fresh")]
    pub fresh: bool,
}

/// Response from the server-side upload endpoint.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,

    /// The record for the uploaded file
    pub photo: MediaRecord,

    /// Storage object key of the uploaded file
    #[serde(rename = "fileId")]
    pub file_id: String,
}

/// Response from the signed-URL endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedUrlResponse {
    pub success: bool,

    /// Pre-authorized upload URL for the reserved object key
    pub signed_url: String,

    /// Bearer token the client presents on the direct upload
    pub access_token: String,

    /// The record the file will have once uploaded
    pub photo: MediaRecord,

    pub file_id: String,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}

#[derive(Debug, Serialize)]
struct PhotosErrorBody {
    error: String,
}

#[derive(Debug, Serialize)]
struct UploadErrorBody {
    success: bool,
    error: String,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Wrapper for gallery listing errors.
///
/// Everything in the credential -> token -> storage pipeline is a server
/// fault: the response is always 500 with an `{error}` envelope, and the
/// message distinguishes misconfiguration from a storage failure.
pub struct PhotosError(pub ServiceError);

impl From<ServiceError> for PhotosError {
    fn from(err: ServiceError) -> Self {
        PhotosError(err)
    }
}

impl IntoResponse for PhotosError {
    fn into_response(self) -> Response {
        let message = match &self.0 {
            ServiceError::Config(_) => "Storage service not properly configured",
            _ => "Failed to fetch photos",
        };

        error!(
            status = StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
            "Error fetching photos: {}", self.0
        );

        let mut headers = HeaderMap::new();
        headers.insert(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-cache, no-store, must-revalidate"),
        );

        (
            StatusCode::INTERNAL_SERVER_ERROR,
            headers,
            Json(PhotosErrorBody {
                error: message.to_string(),
            }),
        )
            .into_response()
    }
}

/// Failure modes of the upload endpoints.
pub enum UploadFailure {
    /// The multipart form contained no file part
    NoFile,

    /// The file exceeds the configured server-side ceiling
    TooLarge { size: u64, max: u64 },

    /// The multipart body could not be read
    Multipart(String),

    /// Credential, token, or storage pipeline failure
    Service(ServiceError),
}

impl From<ServiceError> for UploadFailure {
    fn from(err: ServiceError) -> Self {
        UploadFailure::Service(err)
    }
}

impl IntoResponse for UploadFailure {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            UploadFailure::NoFile => (StatusCode::BAD_REQUEST, "No file provided".to_string()),

            UploadFailure::TooLarge { size, max } => (
                StatusCode::PAYLOAD_TOO_LARGE,
                format!(
                    "File is too large: {} (maximum {})",
                    format_file_size(*size),
                    format_file_size(*max)
                ),
            ),

            UploadFailure::Multipart(message) => (
                StatusCode::BAD_REQUEST,
                format!("Invalid upload request: {}", message),
            ),

            UploadFailure::Service(ServiceError::Config(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Storage service not properly configured".to_string(),
            ),

            UploadFailure::Service(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
        };

        if status.is_server_error() {
            if let UploadFailure::Service(err) = &self {
                error!(status = status.as_u16(), "Upload error: {}", err);
            } else {
                error!(status = status.as_u16(), "Upload error: {}", message);
            }
        } else {
            warn!(status = status.as_u16(), "Upload rejected: {}", message);
        }

        (
            status,
            Json(UploadErrorBody {
                success: false,
                error: message,
            }),
        )
            .into_response()
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle gallery listing requests.
///
/// # Endpoint
///
/// `GET|POST /api/photos`
///
/// # Response
///
/// `200 OK` with `{photos, timestamp, _fresh}` where `photos` is every
/// image and video in the bucket, newest first. An empty bucket yields
/// `{"photos": []}`, not an error. Sent with the full no-cache header set.
///
/// # Errors
///
/// - `500 Internal Server Error`: misconfiguration or storage failure
pub async fn photos_handler<S: ObjectStore>(
    State(state): State<AppState<S>>,
) -> Result<Response, PhotosError> {
    let objects = state.store.list_objects().await?;
    let photos = media_records(objects, &state.bucket);

    info!(count = photos.len(), "found photos and videos");

    let now = Utc::now();
    let body = PhotosResponse {
        photos,
        timestamp: now.timestamp_millis(),
        fresh: true,
    };

    Ok((StatusCode::OK, no_cache_headers(now.timestamp_millis()), Json(body)).into_response())
}

/// Handle server-side upload requests.
///
/// # Endpoint
///
/// `POST /api/upload-cloud` (multipart form: `file`, `userName`)
///
/// # Response
///
/// `200 OK` with `{success, photo, fileId}`.
///
/// # Errors
///
/// - `400 Bad Request`: no file part in the form
/// - `413 Payload Too Large`: file exceeds the configured ceiling
/// - `500 Internal Server Error`: misconfiguration or storage failure
pub async fn upload_cloud_handler<S: ObjectStore>(
    State(state): State<AppState<S>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, UploadFailure> {
    let mut file: Option<(String, String, Bytes)> = None;
    let mut user_name = String::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| UploadFailure::Multipart(e.to_string()))?
    {
        match field.name() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| UploadFailure::Multipart(e.to_string()))?;
                file = Some((file_name, content_type, data));
            }
            Some("userName") => {
                user_name = field
                    .text()
                    .await
                    .map_err(|e| UploadFailure::Multipart(e.to_string()))?;
            }
            _ => {}
        }
    }

    let (file_name, content_type, data) = file.ok_or(UploadFailure::NoFile)?;

    let size = data.len() as u64;
    if size > state.max_upload_bytes {
        return Err(UploadFailure::TooLarge {
            size,
            max: state.max_upload_bytes,
        });
    }

    debug!(file = %file_name, size, user = %user_name, "upload request received");

    let now = Utc::now();
    let key = storage_object_key(now.timestamp_millis(), &user_name, &file_name);
    let meta = UploadMetadata {
        uploaded_by: user_name.clone(),
        uploaded_at: now.to_rfc3339(),
        original_name: file_name.clone(),
    };

    state
        .store
        .put_object(&key, data, &content_type, &meta)
        .await?;

    let photo = MediaRecord::for_upload(
        &state.bucket,
        &key,
        &file_name,
        &content_type,
        &user_name,
        &now.to_rfc3339(),
    );

    info!(key = %key, "file uploaded");

    Ok(Json(UploadResponse {
        success: true,
        photo,
        file_id: key,
    }))
}

/// Handle direct-upload authorization requests.
///
/// # Endpoint
///
/// `POST /api/upload-signed-url` (JSON: `fileName`, `fileType`,
/// `fileSize`, `userName`)
///
/// # Response
///
/// `200 OK` with `{success, signedUrl, accessToken, photo, fileId}`. The
/// client then uploads the bytes itself, bypassing this server entirely.
///
/// # Errors
///
/// - `500 Internal Server Error`: misconfiguration or token failure
pub async fn signed_url_handler<S: ObjectStore>(
    State(state): State<AppState<S>>,
    Json(request): Json<SignedUrlRequest>,
) -> Result<Json<SignedUrlResponse>, UploadFailure> {
    let user_name = request.user_name.unwrap_or_default();

    debug!(
        file = %request.file_name,
        size = request.file_size,
        user = %user_name,
        "signed URL request received"
    );

    let now = Utc::now();
    let key = storage_object_key(now.timestamp_millis(), &user_name, &request.file_name);

    let grant = state.store.direct_upload_grant(&key).await?;

    let uploaded_by = if user_name.is_empty() {
        "Anonymous"
    } else {
        &user_name
    };
    let photo = MediaRecord::for_upload(
        &state.bucket,
        &key,
        &request.file_name,
        &request.file_type,
        uploaded_by,
        &now.to_rfc3339(),
    );

    Ok(Json(SignedUrlResponse {
        success: true,
        signed_url: grant.upload_url,
        access_token: grant.access_token,
        photo,
        file_id: key,
    }))
}

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// =============================================================================
// Cache-busting headers
// =============================================================================

/// The full no-cache header set for gallery responses.
///
/// Belt and braces: browser caches, proxies, and the CDN layers of the
/// usual hosting platforms each honor a different subset of these.
fn no_cache_headers(now_millis: i64) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-store, no-cache, must-revalidate, proxy-revalidate, max-age=0"),
    );
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(header::EXPIRES, HeaderValue::from_static("-1"));
    headers.insert("surrogate-control", HeaderValue::from_static("no-store"));
    headers.insert("cdn-cache-control", HeaderValue::from_static("no-store"));
    headers.insert(
        "cloudflare-cdn-cache-control",
        HeaderValue::from_static("no-store"),
    );
    headers.insert(
        "vercel-cdn-cache-control",
        HeaderValue::from_static("no-store"),
    );
    headers.insert(header::VARY, HeaderValue::from_static("*"));
    headers.insert("access-control-max-age", HeaderValue::from_static("0"));

    let last_modified = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();
    if let Ok(value) = HeaderValue::from_str(&last_modified) {
        headers.insert(header::LAST_MODIFIED, value);
    }
    if let Ok(value) = HeaderValue::from_str(&format!("\"{}\"", now_millis)) {
        headers.insert(header::ETAG, value);
    }

    headers
}

// =============================================================================
// Tests
// =============================================================================

//! Client-side upload helpers.
//!
//! Two paths to get a file into the bucket:
//!
//! - **Via the server** ([`upload_via_server`]): one multipart POST to
//!   `/api/upload-cloud`. Simple, but bounded by the platform's request
//!   size and time limits.
//! - **Direct to storage** ([`upload_direct`]): ask
//!   `/api/upload-signed-url` for a pre-authorized upload URL plus bearer
//!   token, then stream the bytes straight to storage. Used for large
//!   files; reports fractional progress through a callback as chunks go
//!   out.
//!
//! [`upload`] picks between the two automatically: anything above the
//! direct-upload threshold bypasses the server so its request ceiling
//! never rejects a large video.
//!
//! Both validate the file locally first, so an oversized or unsupported
//! file is rejected without any network call. Neither exposes an abort
//! handle: dropping the returned future cancels the in-flight request.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::error::ValidationError;
use crate::media::{validate_upload, MediaRecord, DEFAULT_UPLOADER_NAME};
use crate::storage::DIRECT_UPLOAD_THRESHOLD;

/// Timeout for a direct-to-storage upload (large videos on slow links).
pub const DIRECT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(20 * 60);

/// Chunk size for the progress-reporting upload stream.
const PROGRESS_CHUNK_SIZE: usize = 256 * 1024;

/// Errors surfaced to the uploading client.
#[derive(Debug, Error)]
pub enum UploadClientError {
    /// The file failed local validation; no request was made
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Reading the file from disk failed or timed out
    #[error("Failed to read file: {0}")]
    Read(String),

    /// The request could not be sent or the response not read
    #[error("Upload failed: {0}")]
    Transport(String),

    /// The server or storage endpoint rejected the upload
    #[error("Upload rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
}

#[derive(Debug, Deserialize)]
struct ServerUploadResponse {
    success: bool,
    photo: Option<MediaRecord>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignedUrlGrantResponse {
    success: bool,
    signed_url: Option<String>,
    access_token: Option<String>,
    photo: Option<MediaRecord>,
    error: Option<String>,
}

/// Default the uploader name when the guest left it blank.
fn display_name(user_name: &str) -> &str {
    if user_name.trim().is_empty() {
        DEFAULT_UPLOADER_NAME
    } else {
        user_name
    }
}

// =============================================================================
// File reading
// =============================================================================

/// Read a file fully into memory, failing after `timeout` instead of
/// hanging on a stalled filesystem.
pub async fn read_file_with_timeout(
    path: &Path,
    timeout: Duration,
) -> Result<Bytes, UploadClientError> {
    let read = tokio::fs::read(path);
    match tokio::time::timeout(timeout, read).await {
        Ok(Ok(data)) => Ok(Bytes::from(data)),
        Ok(Err(e)) => Err(UploadClientError::Read(e.to_string())),
        Err(_) => Err(UploadClientError::Read(format!(
            "timed out after {}s reading {}",
            timeout.as_secs(),
            path.display()
        ))),
    }
}

// =============================================================================
// Size-based dispatch
// =============================================================================

/// Whether a file of `size` bytes should skip the server route.
fn prefers_direct_upload(size: u64) -> bool {
    size > DIRECT_UPLOAD_THRESHOLD
}

/// Upload a file by whichever path suits its size.
///
/// Files above [`DIRECT_UPLOAD_THRESHOLD`] stream straight to storage via
/// [`upload_direct`]; everything else posts through the server via
/// [`upload_via_server`]. The server path reports progress once, on
/// completion.
pub async fn upload(
    http: &reqwest::Client,
    base_url: &str,
    file_name: &str,
    content_type: &str,
    data: Bytes,
    user_name: &str,
    on_progress: impl Fn(f64) + Send + Sync + 'static,
) -> Result<MediaRecord, UploadClientError> {
    if prefers_direct_upload(data.len() as u64) {
        debug!(file = %file_name, size = data.len(), "large file, uploading direct");
        upload_direct(
            http,
            base_url,
            file_name,
            content_type,
            data,
            user_name,
            on_progress,
        )
        .await
    } else {
        let record =
            upload_via_server(http, base_url, file_name, content_type, data, user_name).await?;
        on_progress(1.0);
        Ok(record)
    }
}

// =============================================================================
// Upload via the application server
// =============================================================================

/// Upload through `/api/upload-cloud`.
pub async fn upload_via_server(
    http: &reqwest::Client,
    base_url: &str,
    file_name: &str,
    content_type: &str,
    data: Bytes,
    user_name: &str,
) -> Result<MediaRecord, UploadClientError> {
    validate_upload(content_type, data.len() as u64)?;
    let user_name = display_name(user_name);

    let part = reqwest::multipart::Part::bytes(data.to_vec())
        .file_name(file_name.to_string())
        .mime_str(content_type)
        .map_err(|e| UploadClientError::Transport(e.to_string()))?;
    let form = reqwest::multipart::Form::new()
        .part("file", part)
        .text("userName", user_name.to_string());

    let response = http
        .post(format!("{}/api/upload-cloud", base_url.trim_end_matches('/')))
        .multipart(form)
        .send()
        .await
        .map_err(|e| UploadClientError::Transport(e.to_string()))?;

    let status = response.status();
    let body: ServerUploadResponse = response
        .json()
        .await
        .map_err(|e| UploadClientError::Transport(e.to_string()))?;

    if !status.is_success() || !body.success {
        return Err(UploadClientError::Rejected {
            status: status.as_u16(),
            message: body.error.unwrap_or_else(|| "Upload failed".to_string()),
        });
    }

    body.photo.ok_or_else(|| {
        UploadClientError::Transport("upload response had no photo record".to_string())
    })
}

// =============================================================================
// Direct-to-storage upload
// =============================================================================

/// Upload straight to storage using a grant from `/api/upload-signed-url`.
///
/// `on_progress` receives the fraction of bytes handed to the transport,
/// in `0.0..=1.0`, once per chunk.
pub async fn upload_direct(
    http: &reqwest::Client,
    base_url: &str,
    file_name: &str,
    content_type: &str,
    data: Bytes,
    user_name: &str,
    on_progress: impl Fn(f64) + Send + Sync + 'static,
) -> Result<MediaRecord, UploadClientError> {
    validate_upload(content_type, data.len() as u64)?;
    let user_name = display_name(user_name).to_string();

    debug!(file = %file_name, size = data.len(), "requesting direct upload grant");

    // Step 1: get the pre-authorized upload URL and token.
    let grant_response = http
        .post(format!(
            "{}/api/upload-signed-url",
            base_url.trim_end_matches('/')
        ))
        .json(&serde_json::json!({
            "fileName": file_name,
            "fileType": content_type,
            "fileSize": data.len(),
            "userName": user_name,
        }))
        .send()
        .await
        .map_err(|e| UploadClientError::Transport(e.to_string()))?;

    let status = grant_response.status();
    let grant: SignedUrlGrantResponse = grant_response
        .json()
        .await
        .map_err(|e| UploadClientError::Transport(e.to_string()))?;

    if !status.is_success() || !grant.success {
        return Err(UploadClientError::Rejected {
            status: status.as_u16(),
            message: grant
                .error
                .unwrap_or_else(|| "Failed to get signed URL".to_string()),
        });
    }

    let (signed_url, access_token, photo) = match (grant.signed_url, grant.access_token, grant.photo)
    {
        (Some(url), Some(token), Some(photo)) => (url, token, photo),
        _ => {
            return Err(UploadClientError::Transport(
                "signed URL response was incomplete".to_string(),
            ))
        }
    };

    // Step 2: stream the bytes to storage, reporting progress per chunk.
    let total = data.len() as f64;
    let body = progress_body(data, move |sent| {
        on_progress((sent as f64 / total).min(1.0));
    });

    let upload_response = http
        .post(&signed_url)
        .bearer_auth(access_token)
        .header(http::header::CONTENT_TYPE, content_type)
        .header("x-goog-meta-uploaded-by", &user_name)
        .header("x-goog-meta-uploaded-at", Utc::now().to_rfc3339())
        .header("x-goog-meta-original-name", file_name)
        .timeout(DIRECT_UPLOAD_TIMEOUT)
        .body(body)
        .send()
        .await
        .map_err(|e| UploadClientError::Transport(e.to_string()))?;

    let status = upload_response.status();
    if !status.is_success() {
        return Err(UploadClientError::Rejected {
            status: status.as_u16(),
            message: upload_response.text().await.unwrap_or_default(),
        });
    }

    info!(file = %file_name, "direct upload complete");
    Ok(photo)
}

/// Wrap `data` in a chunked request body that invokes `observe` with the
/// cumulative byte count as each chunk is pulled by the transport.
fn progress_body(data: Bytes, observe: impl Fn(u64) + Send + Sync + 'static) -> reqwest::Body {
    let sent = Arc::new(AtomicU64::new(0));
    let chunks: Vec<Bytes> = data
        .chunks(PROGRESS_CHUNK_SIZE)
        .map(Bytes::copy_from_slice)
        .collect();

    let stream = futures::stream::iter(chunks.into_iter().map(move |chunk| {
        let total_sent = sent.fetch_add(chunk.len() as u64, Ordering::Relaxed) + chunk.len() as u64;
        observe(total_sent);
        Ok::<Bytes, std::io::Error>(chunk)
    }));

    reqwest::Body::wrap_stream(stream)
}

// =============================================================================
// Tests
// =============================================================================

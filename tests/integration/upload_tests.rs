//! Upload endpoint integration tests.
//!
//! Tests verify:
//! - Server-side multipart uploads end to end
//! - Rejection of empty and oversized uploads
//! - Object key derivation from timestamp, user name, and file name
//! - Signed-URL grants for direct-to-storage uploads

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use wedsnap::{create_router, RouterConfig};

use super::test_utils::{
    multipart_body, multipart_body_without_file, MockObjectStore, TEST_BOUNDARY,
};

const BUCKET: &str = "wedding-media";

fn upload_request(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/upload-cloud")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={TEST_BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

// =============================================================================
// Server-side Upload
// =============================================================================

#[tokio::test]
async fn test_upload_success() {
    let store = MockObjectStore::new(BUCKET);
    let tracking = store.tracking();
    let router = create_router(store, BUCKET, RouterConfig::new().with_tracing(false));

    let body = multipart_body("IMG_1.jpg", "image/jpeg", b"fake jpeg bytes", "Ana Petrova");
    let response = router.oneshot(upload_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["success"], true);

    // The object key embeds the sanitized user name and the file name.
    let file_id = body["fileId"].as_str().unwrap();
    assert!(file_id.ends_with("_Ana_Petrova_IMG_1.jpg"), "key: {file_id}");
    let millis: i64 = file_id.split('_').next().unwrap().parse().unwrap();
    assert!(millis > 0);

    // The returned record points at the object's public URL.
    assert_eq!(body["photo"]["name"], "IMG_1.jpg");
    assert_eq!(body["photo"]["uploadedBy"], "Ana Petrova");
    assert_eq!(
        body["photo"]["url"],
        format!("https://storage.googleapis.com/{BUCKET}/{file_id}")
    );

    // The bytes and metadata reached storage.
    let uploads = tracking.uploads().await;
    assert_eq!(uploads.len(), 1);
    let (key, data, content_type, meta) = &uploads[0];
    assert_eq!(key, file_id);
    assert_eq!(data.as_ref(), b"fake jpeg bytes");
    assert_eq!(content_type, "image/jpeg");
    assert_eq!(meta.uploaded_by, "Ana Petrova");
    assert_eq!(meta.original_name, "IMG_1.jpg");
}

#[tokio::test]
async fn test_uploaded_file_appears_in_gallery() {
    let store = MockObjectStore::new(BUCKET);
    let router = create_router(store, BUCKET, RouterConfig::new().with_tracing(false));

    let body = multipart_body("party.mp4", "video/mp4", b"fake video", "Ben");
    let response = router
        .clone()
        .oneshot(upload_request(body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let listing = router
        .oneshot(
            Request::builder()
                .uri("/api/photos")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = json_body(listing).await;
    let photos = body["photos"].as_array().unwrap();
    assert_eq!(photos.len(), 1);
    assert_eq!(photos[0]["name"], "party.mp4");
    assert_eq!(photos[0]["uploadedBy"], "Ben");
}

#[tokio::test]
async fn test_upload_without_file_is_rejected() {
    let store = MockObjectStore::new(BUCKET);
    let router = create_router(store, BUCKET, RouterConfig::new().with_tracing(false));

    let body = multipart_body_without_file("Ana");
    let response = router.oneshot(upload_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "No file provided");
}

#[tokio::test]
async fn test_upload_over_ceiling_is_rejected() {
    let store = MockObjectStore::new(BUCKET);
    let tracking = store.tracking();

    // Shrink the ceiling so the test does not need a 100 MB body.
    let config = RouterConfig::new()
        .with_tracing(false)
        .with_max_upload_bytes(1024);
    let router = create_router(store, BUCKET, config);

    let body = multipart_body("big.jpg", "image/jpeg", &vec![0u8; 2048], "Ana");
    let response = router.oneshot(upload_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let body = json_body(response).await;
    assert_eq!(body["success"], false);

    // Nothing reached storage.
    assert!(tracking.uploads().await.is_empty());
}

#[tokio::test]
async fn test_upload_with_broken_credentials_returns_500() {
    let store = MockObjectStore::failing(BUCKET, "missing field `private_key`");
    let router = create_router(store, BUCKET, RouterConfig::new().with_tracing(false));

    let body = multipart_body("IMG_1.jpg", "image/jpeg", b"bytes", "Ana");
    let response = router.oneshot(upload_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Storage service not properly configured");
}

#[tokio::test]
async fn test_upload_anonymous_user_gets_placeholder_key() {
    let store = MockObjectStore::new(BUCKET);
    let router = create_router(store, BUCKET, RouterConfig::new().with_tracing(false));

    let body = multipart_body("IMG_1.jpg", "image/jpeg", b"bytes", "");
    let response = router.oneshot(upload_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let file_id = body["fileId"].as_str().unwrap();
    assert!(file_id.contains("_Anonymous_"), "key: {file_id}");
}

// =============================================================================
// Signed-URL Grants
// =============================================================================

fn signed_url_request(body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/upload-signed-url")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_signed_url_grant_success() {
    let store = MockObjectStore::new(BUCKET);
    let router = create_router(store, BUCKET, RouterConfig::new().with_tracing(false));

    let response = router
        .oneshot(signed_url_request(serde_json::json!({
            "fileName": "wedding.mp4",
            "fileType": "video/mp4",
            "fileSize": 200 * 1024 * 1024,
            "userName": "Ana Petrova",
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["success"], true);

    let file_id = body["fileId"].as_str().unwrap();
    assert!(file_id.ends_with("_Ana_Petrova_wedding.mp4"), "key: {file_id}");

    // The grant targets the reserved key and carries a bearer token.
    let signed_url = body["signedUrl"].as_str().unwrap();
    assert!(signed_url.contains("uploadType=media"));
    assert!(signed_url.contains(file_id));
    assert_eq!(body["accessToken"], "mock-access-token");

    // The record is built before any bytes move.
    assert_eq!(body["photo"]["name"], "wedding.mp4");
    assert_eq!(body["photo"]["uploadedBy"], "Ana Petrova");
    assert_eq!(body["photo"]["needsThumbnail"], true);
}

#[tokio::test]
async fn test_signed_url_defaults_anonymous_uploader() {
    let store = MockObjectStore::new(BUCKET);
    let router = create_router(store, BUCKET, RouterConfig::new().with_tracing(false));

    let response = router
        .oneshot(signed_url_request(serde_json::json!({
            "fileName": "IMG_2.jpg",
            "fileType": "image/jpeg",
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["photo"]["uploadedBy"], "Anonymous");
    assert!(body["fileId"].as_str().unwrap().contains("_Anonymous_"));
}

#[tokio::test]
async fn test_signed_url_with_broken_credentials_returns_500() {
    let store = MockObjectStore::failing(BUCKET, "missing field `private_key`");
    let router = create_router(store, BUCKET, RouterConfig::new().with_tracing(false));

    let response = router
        .oneshot(signed_url_request(serde_json::json!({
            "fileName": "a.jpg",
            "fileType": "image/jpeg",
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert_eq!(body["success"], false);
}

//! # Wedsnap
//!
//! A guest photo and video sharing service for weddings: guests upload
//! media from their phones and browse a shared gallery, backed by a cloud
//! storage bucket the couple owns.
//!
//! ## Features
//!
//! - **Shared gallery**: every image and video in the bucket, newest
//!   first, served with aggressive cache busting
//! - **Two upload paths**: small files go through the server, large files
//!   stream directly to storage via a pre-authorized URL
//! - **Self-contained auth**: service-account JWT bearer token exchange
//!   with no cloud SDK dependency
//!
//! ## Architecture
//!
//! ```text
//! Guest devices (gallery / uploader)
//!        |
//!        v
//! HTTP API (axum): /api/photos, /api/upload-cloud, /api/upload-signed-url
//!        |
//!        v
//! ObjectStore trait -> GcsStore (REST + bearer tokens)
//!        |
//!        v
//! CredentialChain -> TokenExchanger (RS256 JWT grant)
//! ```

pub mod config;
pub mod credentials;
pub mod error;
pub mod gallery;
pub mod media;
pub mod server;
pub mod storage;
pub mod token;
pub mod uploader;

pub use config::Config;
pub use credentials::{CredentialChain, CredentialSource, ServiceCredential};
pub use error::{
    ConfigError, CredentialError, ServiceError, StorageError, TokenError, ValidationError,
};
pub use gallery::{paginate, GalleryState, MediaStore, Page, PAGE_SIZE};
pub use media::{media_records, validate_upload, MediaRecord};
pub use server::{create_router, AppState, RouterConfig};
pub use storage::{GcsStore, ObjectStore, StorageObject, UploadMetadata};
pub use token::{BearerToken, TokenExchanger};

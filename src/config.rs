//! Configuration management.
//!
//! Supports command-line arguments via clap, environment variables with a
//! `WEDSNAP_` prefix, and sensible defaults for everything optional.
//!
//! # Environment Variables
//!
//! - `WEDSNAP_HOST` - Server bind address (default: 0.0.0.0)
//! - `WEDSNAP_PORT` - Server port (default: 3000)
//! - `WEDSNAP_PROJECT_ID` - Cloud project identifier (required)
//! - `WEDSNAP_BUCKET` - Storage bucket name (required)
//! - `WEDSNAP_CREDENTIALS` - Inline service-account JSON (deployed envs)
//! - `WEDSNAP_KEY_FILE` - Path to a service-account key file (local dev)
//! - `WEDSNAP_MAX_UPLOAD_BYTES` - Server-side upload ceiling (default 100MB)
//! - `WEDSNAP_CORS_ORIGINS` - Allowed CORS origins (comma-separated)
//!
//! Credentials fall back from inline JSON to the key file to the default
//! key file in the working directory; see [`crate::credentials`].

use std::path::PathBuf;

use clap::Parser;

use crate::credentials::CredentialChain;
use crate::storage::DIRECT_UPLOAD_THRESHOLD;

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;

/// Platform hard cap on a single request body (500 MB).
pub const PLATFORM_UPLOAD_CAP: u64 = 500 * 1024 * 1024;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Wedsnap - a guest photo and video sharing service.
///
/// Serves a shared wedding gallery backed by cloud object storage: guests
/// upload from their phones, everyone browses the result.
#[derive(Parser, Debug, Clone)]
#[command(name = "wedsnap")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "WEDSNAP_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "WEDSNAP_PORT")]
    pub port: u16,

    // =========================================================================
    // Storage Configuration
    // =========================================================================
    /// Cloud project identifier.
    #[arg(long, env = "WEDSNAP_PROJECT_ID")]
    pub project_id: String,

    /// Storage bucket holding the shared media.
    #[arg(long, env = "WEDSNAP_BUCKET")]
    pub bucket: String,

    /// Custom storage API endpoint (emulators, testing).
    #[arg(long, env = "WEDSNAP_STORAGE_ENDPOINT")]
    pub storage_endpoint: Option<String>,

    // =========================================================================
    // Credential Configuration
    // =========================================================================
    /// Inline service-account JSON credential.
    ///
    /// Takes precedence over --key-file. Intended for deployed
    /// environments where the credential lives in a secret manager.
    #[arg(long, env = "WEDSNAP_CREDENTIALS", hide_env_values = true)]
    pub credentials_json: Option<String>,

    /// Path to a service-account key file.
    ///
    /// Checked after --credentials-json. When neither is set, the default
    /// key file in the working directory is used.
    #[arg(long, env = "WEDSNAP_KEY_FILE")]
    pub key_file: Option<PathBuf>,

    // =========================================================================
    // Upload Configuration
    // =========================================================================
    /// Maximum upload size accepted by the server route, in bytes.
    ///
    /// Larger files should use the signed-URL direct upload path.
    #[arg(long, default_value_t = DIRECT_UPLOAD_THRESHOLD, env = "WEDSNAP_MAX_UPLOAD_BYTES")]
    pub max_upload_bytes: u64,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "WEDSNAP_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl Config {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.project_id.is_empty() {
            return Err(
                "Cloud project identifier is required. Set --project-id or WEDSNAP_PROJECT_ID"
                    .to_string(),
            );
        }

        if self.bucket.is_empty() {
            return Err("Storage bucket name is required. Set --bucket or WEDSNAP_BUCKET".to_string());
        }

        if self.max_upload_bytes == 0 {
            return Err("max_upload_bytes must be greater than 0".to_string());
        }
        if self.max_upload_bytes > PLATFORM_UPLOAD_CAP {
            return Err(format!(
                "max_upload_bytes must not exceed the platform cap of {} bytes",
                PLATFORM_UPLOAD_CAP
            ));
        }

        if let Some(ref json) = self.credentials_json {
            if json.trim().is_empty() {
                return Err("Inline credentials JSON is set but empty".to_string());
            }
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Build the credential source chain from this configuration.
    pub fn credential_chain(&self) -> CredentialChain {
        CredentialChain::new(self.credentials_json.clone(), self.key_file.clone())
    }
}

// =============================================================================
// Tests
// =============================================================================

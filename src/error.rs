use thiserror::Error;

/// Errors caused by missing or malformed deployment configuration.
///
/// These are not recoverable at request time and surface as HTTP 500.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// No credential source is available (no inline JSON, no key file)
    #[error("No service-account credential source is configured")]
    NoCredentialSource,

    /// A credential source was present but could not be parsed
    #[error("Invalid service-account credential JSON: {0}")]
    InvalidCredentialJson(String),

    /// A configured key file could not be read
    #[error("Failed to read credential key file {path}: {message}")]
    KeyFileRead { path: String, message: String },
}

/// Errors caused by malformed key material or a failed signature.
#[derive(Debug, Clone, Error)]
pub enum CredentialError {
    /// The private key PEM could not be parsed as PKCS8
    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    /// The RSA signature operation failed
    #[error("JWT signing failed: {0}")]
    Signing(String),
}

/// Errors from the OAuth token endpoint.
#[derive(Debug, Clone, Error)]
pub enum TokenError {
    /// The token endpoint rejected the signed assertion
    #[error("Failed to get access token: {status_text}")]
    Exchange { status: u16, status_text: String },

    /// The exchange request could not be sent or read
    #[error("Token endpoint connection error: {0}")]
    Transport(String),

    /// The endpoint answered 2xx but the body had no usable access token
    #[error("Malformed token response: {0}")]
    MalformedResponse(String),
}

/// Errors from the object-storage REST API.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// The object-listing endpoint returned non-2xx
    #[error("Failed to list objects: {status_text}")]
    List { status: u16, status_text: String },

    /// The upload endpoint returned non-2xx; `body` is the raw response
    /// text kept for diagnostics
    #[error("Upload failed: {status_text}: {body}")]
    Upload {
        status: u16,
        status_text: String,
        body: String,
    },

    /// Network or connection error talking to storage
    #[error("Storage connection error: {0}")]
    Transport(String),
}

/// Client-side file rejection. Raised before any network call is made.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// File type is neither an allowed image nor an allowed video type
    #[error("Unsupported file type: {mime_type}. Only images (JPEG, PNG, WebP, HEIC) and videos (MP4, MOV, AVI) are allowed")]
    UnsupportedType { mime_type: String },

    /// Image exceeds the image size ceiling
    #[error("Image is too large: {size} bytes (maximum {max} bytes for images)")]
    ImageTooLarge { size: u64, max: u64 },

    /// Video exceeds the video size ceiling
    #[error("Video is too large: {size} bytes (maximum {max} bytes for videos)")]
    VideoTooLarge { size: u64, max: u64 },
}

/// Umbrella error for a request that walked the credential -> token ->
/// storage pipeline. Every variant maps to HTTP 500; nothing is retried.
#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

//! Media records and the listing transform.
//!
//! A [`MediaRecord`] is the client-facing shape of one uploaded photo or
//! video. The transform from raw storage objects is pure: filter to media
//! content types, derive URLs and thumbnail state, read uploader metadata,
//! sort newest first. It also owns the object-key recipe for uploads and
//! the client-side file validation rules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::storage::{public_object_url, StorageObject};

/// Display name used when a guest leaves the name field blank.
pub const DEFAULT_UPLOADER_NAME: &str = "Anonymous Guest";

/// Size ceiling for images (50 MB).
pub const MAX_IMAGE_SIZE: u64 = 50 * 1024 * 1024;

/// Size ceiling for videos (500 MB, enough for 4K phone footage; also the
/// platform's hard request cap).
pub const MAX_VIDEO_SIZE: u64 = 500 * 1024 * 1024;

const ALLOWED_IMAGE_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/webp",
    "image/heic",
    "image/heif",
];

const ALLOWED_VIDEO_TYPES: &[&str] = &[
    "video/mp4",
    "video/mov",
    "video/avi",
    "video/quicktime",
    "video/x-msvideo",
];

// =============================================================================
// MediaRecord
// =============================================================================

/// One photo or video in the shared gallery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRecord {
    /// Storage object key (unique)
    pub id: String,

    /// Original file name for display
    pub name: String,

    /// MIME type as recorded by storage
    pub mime_type: String,

    /// RFC 3339 creation timestamp; the gallery sorts on this, descending
    pub created_time: String,

    /// Public download URL
    pub url: String,

    /// Thumbnail URL; `None` for videos until the client derives one
    pub thumbnail_url: Option<String>,

    /// Display name of the uploading guest
    pub uploaded_by: String,

    /// Whether the client still needs to generate a thumbnail (videos)
    pub needs_thumbnail: bool,
}

impl MediaRecord {
    /// Build the record for a freshly uploaded file.
    ///
    /// Used by the upload handlers, which know the file's details locally
    /// and do not need to re-read them from storage.
    pub fn for_upload(
        bucket: &str,
        key: &str,
        file_name: &str,
        mime_type: &str,
        uploaded_by: &str,
        created_time: &str,
    ) -> Self {
        let url = public_object_url(bucket, key);
        let is_video = mime_type.starts_with("video/");
        Self {
            id: key.to_string(),
            name: file_name.to_string(),
            mime_type: mime_type.to_string(),
            created_time: created_time.to_string(),
            url: url.clone(),
            thumbnail_url: if is_video { None } else { Some(url) },
            uploaded_by: uploaded_by.to_string(),
            needs_thumbnail: is_video,
        }
    }

    /// Whether this record is a video.
    pub fn is_video(&self) -> bool {
        self.mime_type.starts_with("video/")
    }
}

// =============================================================================
// Listing transform
// =============================================================================

/// Transform a raw object listing into gallery records.
///
/// Objects whose content type is neither `image/*` nor `video/*` are
/// dropped. The output is sorted by creation time descending; ties keep
/// their listing order.
pub fn media_records(objects: Vec<StorageObject>, bucket: &str) -> Vec<MediaRecord> {
    let mut records: Vec<MediaRecord> = objects
        .into_iter()
        .filter_map(|object| media_record(object, bucket))
        .collect();

    sort_newest_first(&mut records);
    records
}

fn media_record(object: StorageObject, bucket: &str) -> Option<MediaRecord> {
    let content_type = object.content_type.unwrap_or_default();
    if !content_type.starts_with("image/") && !content_type.starts_with("video/") {
        return None;
    }

    let url = public_object_url(bucket, &object.name);
    let is_video = content_type.starts_with("video/");
    let metadata = object.metadata.unwrap_or_default();

    Some(MediaRecord {
        name: metadata
            .get("original-name")
            .cloned()
            .unwrap_or_else(|| object.name.clone()),
        uploaded_by: metadata
            .get("uploaded-by")
            .cloned()
            .unwrap_or_else(|| "Unknown".to_string()),
        id: object.name,
        mime_type: content_type,
        created_time: object.time_created.unwrap_or_default(),
        url: url.clone(),
        thumbnail_url: if is_video { None } else { Some(url) },
        needs_thumbnail: is_video,
    })
}

/// Stable sort by creation time, newest first.
///
/// A record with a missing or unparseable `created_time` sorts last
/// (oldest). The service always writes `timeCreated`, so this only
/// affects objects placed in the bucket by other tools.
pub fn sort_newest_first(records: &mut [MediaRecord]) {
    records.sort_by(|a, b| parse_created(&b.created_time).cmp(&parse_created(&a.created_time)));
}

fn parse_created(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

// =============================================================================
// Object keys
// =============================================================================

/// Build the storage object key for an upload:
/// `{epoch_millis}_{sanitized_user}_{file_name}`.
///
/// The millisecond timestamp prefix guarantees key uniqueness.
pub fn storage_object_key(epoch_millis: i64, user_name: &str, file_name: &str) -> String {
    format!(
        "{}_{}_{}",
        epoch_millis,
        sanitize_user_name(user_name),
        file_name
    )
}

/// Replace every non-alphanumeric character with `_`; an empty name
/// becomes `Anonymous`.
pub fn sanitize_user_name(user_name: &str) -> String {
    if user_name.is_empty() {
        return "Anonymous".to_string();
    }
    user_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

// =============================================================================
// Client-side validation
// =============================================================================

/// Validate a file before any network call.
///
/// Type is checked first, then size against the per-type ceiling.
pub fn validate_upload(mime_type: &str, size: u64) -> Result<(), ValidationError> {
    let lowered = mime_type.to_lowercase();
    let is_image = ALLOWED_IMAGE_TYPES.contains(&lowered.as_str());
    let is_video = ALLOWED_VIDEO_TYPES.contains(&lowered.as_str());

    if !is_image && !is_video {
        return Err(ValidationError::UnsupportedType {
            mime_type: mime_type.to_string(),
        });
    }

    if is_image && size > MAX_IMAGE_SIZE {
        return Err(ValidationError::ImageTooLarge {
            size,
            max: MAX_IMAGE_SIZE,
        });
    }

    if is_video && size > MAX_VIDEO_SIZE {
        return Err(ValidationError::VideoTooLarge {
            size,
            max: MAX_VIDEO_SIZE,
        });
    }

    Ok(())
}

/// Human-readable file size ("1.5 MB").
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    const UNITS: &[&str] = &["Bytes", "KB", "MB", "GB"];
    let exponent = ((bytes as f64).ln() / 1024_f64.ln()).floor() as usize;
    let exponent = exponent.min(UNITS.len() - 1);
    let value = bytes as f64 / 1024_f64.powi(exponent as i32);
    format!("{} {}", (value * 100.0).round() / 100.0, UNITS[exponent])
}

// =============================================================================
// Tests
// =============================================================================

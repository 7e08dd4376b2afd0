/**
 * Upload Routes
 * Authenticated image uploads stored under the upload directory
 */
use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

use crate::error::ApiError;
use crate::routes::auth::AdminSession;

/// Largest accepted image.
pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

/// Where uploads land on disk and the URL prefix they are served under.
#[derive(Debug, Clone)]
pub struct UploadSettings {
    pub dir: PathBuf,
    pub public_path: String,
    pub max_bytes: usize,
}

impl UploadSettings {
    pub fn from_env() -> Self {
        Self {
            dir: std::env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("uploads")),
            public_path: std::env::var("UPLOAD_PUBLIC_PATH")
                .unwrap_or_else(|_| "/uploads".to_string()),
            max_bytes: MAX_FILE_SIZE,
        }
    }

    fn public_url(&self, filename: &str) -> String {
        format!("{}/{}", self.public_path.trim_end_matches('/'), filename)
    }
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("No file provided")]
    NoFile,

    #[error("Unsupported file type. Allowed: JPEG, PNG, WebP, GIF.")]
    UnsupportedType,

    #[error("File too large. Maximum size is {} MB.", .0 / (1024 * 1024))]
    TooLarge(usize),

    #[error("Empty file")]
    Empty,

    #[error("File content does not match an allowed image type.")]
    ContentMismatch,

    #[error("Invalid multipart data")]
    Malformed,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl UploadError {
    pub fn status(&self) -> StatusCode {
        match self {
            UploadError::TooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            UploadError::NoFile
            | UploadError::UnsupportedType
            | UploadError::Empty
            | UploadError::ContentMismatch
            | UploadError::Malformed => StatusCode::BAD_REQUEST,
            UploadError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn from_multipart(err: MultipartError, max_bytes: usize) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            UploadError::TooLarge(max_bytes)
        } else {
            tracing::debug!(error = %err.body_text(), "multipart error");
            UploadError::Malformed
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub url: String,
    pub filename: String,
    pub size: usize,
    pub mime_type: String,
}

fn detect_image_type(bytes: &[u8]) -> Option<&'static str> {
    if bytes.len() < 4 {
        return None;
    }
    match bytes {
        // JPEG: FF D8 FF
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        // PNG: 89 50 4E 47
        [0x89, 0x50, 0x4E, 0x47, ..] => Some("image/png"),
        // GIF: 47 49 46 38
        [0x47, 0x49, 0x46, 0x38, ..] => Some("image/gif"),
        // WebP: RIFF ... WEBP
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => Some("image/webp"),
        _ => None,
    }
}

fn extension_for(mime: &str) -> &'static str {
    match mime {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        _ => "bin",
    }
}

/// POST /api/upload
///
/// Reads the `file` field chunk by chunk and stops as soon as the limit is
/// crossed, so nothing oversized or non-image ever reaches the disk.
pub async fn upload_image(
    _session: AdminSession,
    State(settings): State<UploadSettings>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    let limit = settings.max_bytes;
    let mut field = loop {
        match multipart
            .next_field()
            .await
            .map_err(|e| UploadError::from_multipart(e, limit))?
        {
            Some(field) if field.name() == Some("file") => break field,
            Some(_) => continue,
            None => return Err(UploadError::NoFile.into()),
        }
    };

    let declared = field.content_type().unwrap_or_default().to_ascii_lowercase();
    if !declared.starts_with("image/") {
        return Err(UploadError::UnsupportedType.into());
    }

    let mut bytes: Vec<u8> = Vec::new();
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| UploadError::from_multipart(e, limit))?
    {
        if bytes.len() + chunk.len() > limit {
            tracing::warn!(limit, "upload aborted: file too large");
            return Err(UploadError::TooLarge(limit).into());
        }
        bytes.extend_from_slice(&chunk);
    }

    if bytes.is_empty() {
        return Err(UploadError::Empty.into());
    }
    let mime_type = detect_image_type(&bytes).ok_or(UploadError::ContentMismatch)?;

    tokio::fs::create_dir_all(&settings.dir)
        .await
        .map_err(UploadError::from)?;

    let filename = format!("{}.{}", Uuid::new_v4(), extension_for(mime_type));
    store_file(&settings.dir, &filename, &bytes).await?;

    tracing::info!(filename = %filename, size = bytes.len(), mime = mime_type, "image uploaded");

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            url: settings.public_url(&filename),
            filename,
            size: bytes.len(),
            mime_type: mime_type.to_string(),
        }),
    ))
}

/// Writes to `<filename>.part` and renames into place. The partial file is
/// removed whenever either step fails.
async fn store_file(dir: &Path, filename: &str, bytes: &[u8]) -> Result<(), UploadError> {
    let final_path = dir.join(filename);
    let partial_path = dir.join(format!("{}.part", filename));

    let result = match tokio::fs::write(&partial_path, bytes).await {
        Ok(()) => tokio::fs::rename(&partial_path, &final_path).await,
        Err(e) => Err(e),
    };
    if let Err(e) = result {
        let _ = tokio::fs::remove_file(&partial_path).await;
        return Err(UploadError::from(e));
    }
    Ok(())
}

pub mod transcribe;
pub mod upload;

use crate::audio::{self, AudioUpload};
use crate::{AppError, Result};
use axum::extract::Multipart;
use axum::Json;
use serde_json::{json, Value};

/// Multipart field names accepted for the audio file.
pub const AUDIO_FIELDS: &[&str] = &["audio", "file"];

pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "app": "voicenote-backend"
    }))
}

/// Parsed relay form: the audio file plus optional text fields.
#[derive(Debug)]
pub struct AudioForm {
    pub upload: AudioUpload,
    pub engine: Option<String>,
}

/// Read the audio form from a multipart body.
///
/// The media type is checked before any bytes are read, and the size limit
/// is enforced chunk by chunk so an oversized file is never fully buffered.
pub async fn read_audio_form(
    multipart: &mut Multipart,
    max_bytes: u64,
    max_mb: u64,
) -> Result<AudioForm> {
    let mut upload: Option<AudioUpload> = None;
    let mut engine: Option<String> = None;

    while let Some(mut field) = multipart.next_field().await.map_err(|e| {
        tracing::error!("Failed to read multipart field: {}", e);
        AppError::Validation(format!("Failed to read form field: {}", e))
    })? {
        let name = field.name().unwrap_or("").to_string();
        tracing::debug!("Processing field: {}", name);

        if AUDIO_FIELDS.contains(&name.as_str()) {
            // An untouched file input posts an empty filename and no bytes.
            if field.file_name() == Some("") {
                continue;
            }

            let file_name = field.file_name().unwrap_or("").to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();

            if !audio::is_audio_media_type(&content_type) {
                return Err(AppError::UnsupportedMediaType(content_type));
            }

            let mut data = Vec::new();
            while let Some(chunk) = field.chunk().await.map_err(|e| {
                AppError::Validation(format!("Failed to read audio file: {}", e))
            })? {
                if (data.len() + chunk.len()) as u64 > max_bytes {
                    tracing::warn!("Rejecting {}: exceeds {}MB", file_name, max_mb);
                    return Err(AppError::FileTooLarge(max_mb));
                }
                data.extend_from_slice(&chunk);
            }

            if data.is_empty() {
                return Err(AppError::Validation("Audio file is empty".to_string()));
            }

            upload = Some(AudioUpload {
                file_name,
                content_type,
                data,
            });
        } else if name == "engine" {
            let value = field.text().await.map_err(|e| {
                AppError::Validation(format!("Failed to read engine field: {}", e))
            })?;
            engine = Some(value).filter(|s| !s.is_empty());
        }
    }

    let upload =
        upload.ok_or_else(|| AppError::Validation("No audio file provided".to_string()))?;

    Ok(AudioForm { upload, engine })
}

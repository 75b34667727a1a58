//! Storage-only upload: validate an audio file and persist it locally.

use crate::models::UploadResponse;
use crate::{storage, AppState, Result};
use axum::{
    extract::{Multipart, State},
    Json,
};
use std::sync::Arc;

use super::read_audio_form;

/// POST /api/upload
pub async fn upload_audio(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    tracing::info!("Received audio upload");

    let form = read_audio_form(
        &mut multipart,
        state.config.storage_max_file_size_bytes(),
        state.config.storage_max_file_size_mb,
    )
    .await?;
    let upload = form.upload;

    let stored = storage::save_upload(
        &state.config.upload_dir,
        &upload.file_name,
        &upload.content_type,
        &upload.data,
    )
    .await?;

    Ok(Json(UploadResponse {
        success: true,
        file_url: storage::public_url(&state.config.public_upload_path, &stored.file_name),
        file_name: stored.file_name,
    }))
}

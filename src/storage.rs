use crate::{audio, AppError, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};

/// A file written to local upload storage.
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub file_name: String,
    pub path: PathBuf,
}

/// Build the public URL under which a stored file is served.
pub fn public_url(public_prefix: &str, file_name: &str) -> String {
    format!("{}/{}", public_prefix.trim_end_matches('/'), file_name)
}

/// Persist an upload under a timestamp-derived name.
///
/// The extension comes from the original filename, else the media type.
pub async fn save_upload(
    upload_dir: &Path,
    original_filename: &str,
    content_type: &str,
    data: &[u8],
) -> Result<StoredFile> {
    let ext = audio::resolve_extension(original_filename, content_type);
    let file_name = audio::timestamp_file_name(Utc::now(), &ext);
    let path = upload_dir.join(&file_name);

    tokio::fs::create_dir_all(upload_dir)
        .await
        .map_err(|e| AppError::Storage(format!("Failed to create upload dir: {}", e)))?;

    tokio::fs::write(&path, data)
        .await
        .map_err(|e| AppError::Storage(format!("Failed to write {:?}: {}", path, e)))?;

    tracing::info!("Stored upload {:?} ({} bytes)", path, data.len());

    Ok(StoredFile { file_name, path })
}

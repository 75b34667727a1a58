//! Audio file helpers: media type checks, extension inference and naming of
//! persisted uploads.

use chrono::{DateTime, SecondsFormat, Utc};
use std::path::Path;

/// Media type prefix every accepted upload must declare.
pub const AUDIO_MEDIA_PREFIX: &str = "audio/";

/// Extension used when neither the filename nor the media type yields one.
/// Browser recorders produce WebM/Opus by default.
pub const FALLBACK_EXTENSION: &str = "webm";

/// An audio file received from a client, fully buffered.
#[derive(Debug, Clone)]
pub struct AudioUpload {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Check if a declared media type is an audio type.
pub fn is_audio_media_type(content_type: &str) -> bool {
    content_type
        .trim()
        .to_ascii_lowercase()
        .starts_with(AUDIO_MEDIA_PREFIX)
}

/// Lowercased extension of a filename, if it has one.
pub fn extract_ext(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| e.to_ascii_lowercase())
}

/// Infer a file extension from an audio media type.
///
/// Parameters such as `;codecs=opus` are ignored. A few types are mapped by
/// hand because the generic table picks unusual first entries for them.
pub fn extension_for_media_type(content_type: &str) -> Option<String> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    let preferred = match essence.as_str() {
        "audio/mpeg" | "audio/mp3" => Some("mp3"),
        "audio/wav" | "audio/x-wav" | "audio/wave" => Some("wav"),
        "audio/webm" => Some("webm"),
        "audio/ogg" => Some("ogg"),
        "audio/mp4" | "audio/x-m4a" | "audio/m4a" => Some("m4a"),
        "audio/flac" | "audio/x-flac" => Some("flac"),
        _ => None,
    };
    if let Some(ext) = preferred {
        return Some(ext.to_string());
    }

    mime_guess::get_mime_extensions_str(&essence)
        .and_then(|exts| exts.first())
        .map(|ext| ext.to_string())
}

/// Pick the extension for a stored file: the original one, else one inferred
/// from the media type, else [`FALLBACK_EXTENSION`].
pub fn resolve_extension(filename: &str, content_type: &str) -> String {
    extract_ext(filename)
        .or_else(|| extension_for_media_type(content_type))
        .unwrap_or_else(|| FALLBACK_EXTENSION.to_string())
}

/// Name a stored file after a timestamp: RFC 3339 with milliseconds, `:` and
/// `.` replaced by `-`, e.g. `2024-05-01T10-20-30-123Z.webm`.
pub fn timestamp_file_name(now: DateTime<Utc>, ext: &str) -> String {
    let stamp = now
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    format!("{}.{}", stamp, ext)
}

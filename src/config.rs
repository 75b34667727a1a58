use serde::Deserialize;
use std::path::PathBuf;

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,

    // Local storage for the plain upload route
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,
    #[serde(default = "default_public_upload_path")]
    pub public_upload_path: String,

    #[serde(default = "default_storage_max_file_size")]
    pub storage_max_file_size_mb: u64,

    #[serde(default = "default_transcribe_max_file_size")]
    pub transcribe_max_file_size_mb: u64,

    // External transcription service
    #[serde(default = "default_transcription_url")]
    pub transcription_url: String,
    #[serde(default = "default_transcription_timeout")]
    pub transcription_timeout_secs: u64,

    // Comma separated; "*" or unset allows any origin
    pub allowed_origins: Option<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("./public/uploads")
}

fn default_public_upload_path() -> String {
    "/uploads".to_string()
}

fn default_storage_max_file_size() -> u64 {
    10
}

fn default_transcribe_max_file_size() -> u64 {
    25
}

fn default_transcription_url() -> String {
    "http://localhost:8000/transcribe".to_string()
}

fn default_transcription_timeout() -> u64 {
    120
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            upload_dir: default_upload_dir(),
            public_upload_path: default_public_upload_path(),
            storage_max_file_size_mb: default_storage_max_file_size(),
            transcribe_max_file_size_mb: default_transcribe_max_file_size(),
            transcription_url: default_transcription_url(),
            transcription_timeout_secs: default_transcription_timeout(),
            allowed_origins: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::from_env()
    }

    pub fn storage_max_file_size_bytes(&self) -> u64 {
        self.storage_max_file_size_mb * 1024 * 1024
    }

    pub fn transcribe_max_file_size_bytes(&self) -> u64 {
        self.transcribe_max_file_size_mb * 1024 * 1024
    }

    pub fn max_request_body_bytes(&self) -> usize {
        // Allow some overhead for multipart boundaries/headers.
        let largest = self
            .storage_max_file_size_mb
            .max(self.transcribe_max_file_size_mb);
        ((largest + 1) * 1024 * 1024) as usize
    }

    /// URL of the engine status document, a sibling of the transcription endpoint.
    pub fn engines_status_url(&self) -> String {
        match self.transcription_url.rfind('/') {
            Some(idx) if idx > "https://".len() => {
                format!("{}/engines/status", &self.transcription_url[..idx])
            }
            _ => format!(
                "{}/engines/status",
                self.transcription_url.trim_end_matches('/')
            ),
        }
    }

    pub fn allowed_origin_list(&self) -> Option<Vec<String>> {
        let raw = self.allowed_origins.as_deref()?.trim();
        if raw.is_empty() || raw == "*" {
            return None;
        }
        Some(
            raw.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        )
    }
}

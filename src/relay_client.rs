//! Client side of the upload relay, used by a [`crate::session::RecordingSession`].
//!
//! Every call resolves to an [`UploadOutcome`]; transport and decoding errors
//! are folded into `UploadOutcome::Failure` so callers render one branch per
//! variant.

use crate::models::{RelayEnvelope, UploadOutcome};
use crate::session::AudioArtifact;
use std::time::Duration;

/// Which relay route an artifact is sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayEndpoint {
    /// Persist only.
    Upload,
    /// Forward to the transcription service.
    Transcribe,
}

impl RelayEndpoint {
    pub fn path(&self) -> &'static str {
        match self {
            RelayEndpoint::Upload => "/api/upload",
            RelayEndpoint::Transcribe => "/api/transcribe",
        }
    }
}

#[derive(Clone)]
pub struct RelayClient {
    client: reqwest::Client,
    base_url: String,
    engine: Option<String>,
}

impl RelayClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            engine: None,
        }
    }

    /// Ask the transcription service for a specific engine.
    pub fn engine(mut self, engine: impl Into<String>) -> Self {
        self.engine = Some(engine.into());
        self
    }

    pub async fn send(&self, endpoint: RelayEndpoint, artifact: &AudioArtifact) -> UploadOutcome {
        let url = format!("{}{}", self.base_url, endpoint.path());

        let part = match reqwest::multipart::Part::bytes(artifact.data.clone())
            .file_name(artifact.file_name.clone())
            .mime_str(&artifact.content_type)
        {
            Ok(part) => part,
            Err(e) => return UploadOutcome::failure(format!("Invalid media type: {}", e)),
        };

        let mut form = reqwest::multipart::Form::new().part("audio", part);
        if let (RelayEndpoint::Transcribe, Some(engine)) = (endpoint, &self.engine) {
            form = form.text("engine", engine.clone());
        }

        tracing::debug!(
            "Sending {} ({} bytes) to {}",
            artifact.file_name,
            artifact.data.len(),
            url
        );

        let response = match self.client.post(&url).multipart(form).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("Relay request to {} failed: {}", url, e);
                return UploadOutcome::failure("Could not reach the server");
            }
        };

        let status = response.status();
        match response.json::<RelayEnvelope>().await {
            Ok(envelope) => {
                if !status.is_success() && envelope.success {
                    return UploadOutcome::failure(format!("Server returned {}", status));
                }
                UploadOutcome::from(envelope)
            }
            Err(e) => {
                tracing::error!("Malformed relay response ({}): {}", status, e);
                UploadOutcome::failure(format!("Unexpected response from server ({})", status))
            }
        }
    }
}

//! Client for the external transcription service.
//!
//! The service accepts a multipart `file` field and answers with JSON holding
//! at least `text`. Non-2xx answers may carry a `detail` message, which is
//! relayed as-is; every other failure collapses into a generic message.

use crate::audio::AudioUpload;
use crate::config::Config;
use crate::models::{TranscriptionResult, UpstreamErrorBody, UpstreamTranscription};
use crate::{AppError, Result};
use std::time::Duration;

pub const GENERIC_FAILURE: &str = "Transcription service error";

#[derive(Clone)]
pub struct TranscriptionClient {
    client: reqwest::Client,
    transcribe_url: String,
    engines_url: String,
}

impl TranscriptionClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.transcription_timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            transcribe_url: config.transcription_url.clone(),
            engines_url: config.engines_status_url(),
        })
    }

    /// Forward an upload to the transcription service.
    ///
    /// `engine` is passed through as the service's preferred-engine query
    /// parameter when set.
    pub async fn transcribe(
        &self,
        upload: AudioUpload,
        engine: Option<&str>,
    ) -> Result<TranscriptionResult> {
        let AudioUpload {
            file_name,
            content_type,
            data,
        } = upload;
        let size = data.len();

        let part = reqwest::multipart::Part::bytes(data)
            .file_name(file_name.clone())
            .mime_str(&content_type)
            .map_err(|e| AppError::Validation(format!("Invalid media type: {}", e)))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let mut request = self.client.post(&self.transcribe_url).multipart(form);
        if let Some(engine) = engine.filter(|e| !e.is_empty()) {
            request = request.query(&[("engine", engine)]);
        }

        tracing::info!(
            "Forwarding {} ({} bytes, {}) to {}",
            file_name,
            size,
            content_type,
            self.transcribe_url
        );

        let response = request.send().await.map_err(|e| {
            tracing::error!("Transcription request failed: {}", e);
            AppError::Upstream(GENERIC_FAILURE.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!("Transcription service returned {}: {}", status, body);
            let detail = serde_json::from_str::<UpstreamErrorBody>(&body)
                .ok()
                .and_then(|b| b.detail)
                .filter(|d| !d.is_empty());
            return Err(AppError::Upstream(
                detail.unwrap_or_else(|| GENERIC_FAILURE.to_string()),
            ));
        }

        let upstream: UpstreamTranscription = response.json().await.map_err(|e| {
            tracing::error!("Malformed transcription response: {}", e);
            AppError::Upstream(GENERIC_FAILURE.to_string())
        })?;

        if upstream.success == Some(false) {
            return Err(AppError::Upstream(
                upstream
                    .message
                    .unwrap_or_else(|| GENERIC_FAILURE.to_string()),
            ));
        }

        tracing::debug!(
            "Transcription of {} finished via {:?}",
            file_name,
            upstream.engine
        );

        Ok(upstream.into_result(&content_type))
    }

    /// Fetch the service's engine availability document.
    pub async fn engine_status(&self) -> Result<serde_json::Value> {
        let response = self
            .client
            .get(&self.engines_url)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Engine status request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Upstream(format!(
                "Engine status returned {}",
                status
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Malformed engine status: {}", e)))
    }
}

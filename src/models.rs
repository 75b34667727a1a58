use serde::{Deserialize, Serialize};

/// One timed span of transcribed speech.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimestampSegment {
    #[serde(alias = "startSec")]
    pub start: f64,
    #[serde(alias = "endSec")]
    pub end: f64,
    pub text: String,
}

/// Transcription as rendered by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionResult {
    pub text: String,
    pub engine: Option<String>,
    pub file_type: Option<String>,
    pub timestamps: Option<Vec<TimestampSegment>>,
}

/// Body returned by the external transcription service.
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamTranscription {
    pub text: String,
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub engine: Option<String>,
    #[serde(default)]
    pub file_type: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub timestamps: Option<Vec<TimestampSegment>>,
}

impl UpstreamTranscription {
    pub fn into_result(self, fallback_file_type: &str) -> TranscriptionResult {
        TranscriptionResult {
            text: self.text,
            engine: self.engine,
            file_type: self
                .file_type
                .or_else(|| Some(fallback_file_type.to_string())),
            timestamps: self.timestamps,
        }
    }
}

/// Error body of the external transcription service on non-2xx responses.
#[derive(Debug, Deserialize)]
pub struct UpstreamErrorBody {
    pub detail: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    #[serde(rename = "fileName")]
    pub file_name: String,
    #[serde(rename = "fileUrl")]
    pub file_url: String,
}

#[derive(Debug, Serialize)]
pub struct TranscribeResponse {
    pub success: bool,
    #[serde(rename = "fileName")]
    pub file_name: String,
    pub text: String,
    pub engine: Option<String>,
    pub file_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamps: Option<Vec<TimestampSegment>>,
}

/// The relay's JSON envelope as seen by a client, before it is narrowed into
/// an [`UploadOutcome`].
#[derive(Debug, Default, Deserialize)]
pub struct RelayEnvelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default, rename = "fileName")]
    pub file_name: Option<String>,
    #[serde(default, rename = "fileUrl")]
    pub file_url: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub engine: Option<String>,
    #[serde(default)]
    pub file_type: Option<String>,
    #[serde(default)]
    pub timestamps: Option<Vec<TimestampSegment>>,
}

/// Result of one upload or transcription call.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadOutcome {
    Success {
        file_name: Option<String>,
        file_url: Option<String>,
        transcription: Option<TranscriptionResult>,
    },
    Failure {
        error: String,
    },
}

impl UploadOutcome {
    pub fn failure(error: impl Into<String>) -> Self {
        UploadOutcome::Failure {
            error: error.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, UploadOutcome::Success { .. })
    }
}

impl From<RelayEnvelope> for UploadOutcome {
    fn from(envelope: RelayEnvelope) -> Self {
        if !envelope.success {
            return UploadOutcome::failure(
                envelope
                    .error
                    .unwrap_or_else(|| "Upload failed".to_string()),
            );
        }

        let transcription = envelope.text.map(|text| TranscriptionResult {
            text,
            engine: envelope.engine,
            file_type: envelope.file_type,
            timestamps: envelope.timestamps,
        });

        UploadOutcome::Success {
            file_name: envelope.file_name,
            file_url: envelope.file_url,
            transcription,
        }
    }
}

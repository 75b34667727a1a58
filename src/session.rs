//! Recording/upload session: the client-side workflow that captures audio,
//! tracks elapsed time and drives the upload relay.
//!
//! States run `Idle -> Recording <-> Paused -> Stopped`, with a separate
//! `transcribing` flag while a relay call is in flight. Every transition is
//! guarded on the current state, so a late timer tick or a repeated button
//! press is a no-op rather than an error.
//!
//! The capture device is owned by the session through [`Capture`]. It is
//! consumed on stop and dropped on clear or when the session itself is
//! dropped, so the device is released on every exit path.

use crate::audio;
use crate::models::{TranscriptionResult, UploadOutcome};
use crate::relay_client::{RelayClient, RelayEndpoint};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Recording ceiling; the session stops itself when elapsed time reaches it.
pub const MAX_DURATION_SECS: u64 = 300;

/// The owned audio blob produced by a recording or a selected file.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioArtifact {
    /// Name sent to the relay (the picked file's name, or `recording.<ext>`)
    pub file_name: String,
    /// Declared media type, e.g. "audio/webm;codecs=opus"
    pub content_type: String,
    /// Encoded audio bytes
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Idle,
    Recording,
    Paused,
    Stopped,
}

/// Relay variant a session uploads to.
///
/// The default sizes match the server's `TRANSCRIBE_MAX_FILE_SIZE_MB` and
/// `STORAGE_MAX_FILE_SIZE_MB` defaults. A server configured otherwise should
/// be mirrored with [`RecordingSession::with_max_file_size_mb`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeCeiling {
    /// Transcription-capable variant: 25 MB by default.
    Transcription,
    /// Storage-only variant: 10 MB by default.
    Storage,
}

impl SizeCeiling {
    pub fn default_megabytes(&self) -> u64 {
        match self {
            SizeCeiling::Transcription => 25,
            SizeCeiling::Storage => 10,
        }
    }

    /// The server-side limit this variant is checked against.
    pub fn megabytes_in(&self, config: &crate::Config) -> u64 {
        match self {
            SizeCeiling::Transcription => config.transcribe_max_file_size_mb,
            SizeCeiling::Storage => config.storage_max_file_size_mb,
        }
    }

    pub fn endpoint(&self) -> RelayEndpoint {
        match self {
            SizeCeiling::Transcription => RelayEndpoint::Transcribe,
            SizeCeiling::Storage => RelayEndpoint::Upload,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("Microphone permission denied")]
    PermissionDenied,

    #[error("Audio recording is not supported: {0}")]
    Unsupported(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("No audio to send")]
    NoArtifact,

    #[error("A transcription is already in progress")]
    InFlight,

    #[error("Stop the current recording first")]
    CaptureActive,

    #[error("Please select an audio file")]
    NotAudio(String),

    #[error("File too large: max {0}MB allowed")]
    FileTooLarge(u64),

    #[error("The selected file is empty")]
    EmptyFile,
}

/// A source of audio captures, e.g. a microphone behind a permission prompt.
pub trait AudioInput {
    type Capture: Capture;

    fn open(&mut self) -> Result<Self::Capture, CaptureError>;
}

/// An open capture device. Dropping it releases the device.
pub trait Capture: Send {
    /// Append encoded audio produced by the device.
    fn write(&mut self, chunk: &[u8]);

    fn pause(&mut self);

    fn resume(&mut self);

    /// Finalize everything captured so far into one artifact and release the
    /// device.
    fn finish(self) -> AudioArtifact;
}

/// Capture that collects encoded chunks in memory, the way a browser
/// recorder hands over `dataavailable` blobs. Chunks written while paused
/// are discarded.
#[derive(Debug)]
pub struct BufferedCapture {
    content_type: String,
    buffer: Vec<u8>,
    paused: bool,
}

impl BufferedCapture {
    pub fn new(content_type: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
            buffer: Vec::new(),
            paused: false,
        }
    }
}

impl Capture for BufferedCapture {
    fn write(&mut self, chunk: &[u8]) {
        if !self.paused {
            self.buffer.extend_from_slice(chunk);
        }
    }

    fn pause(&mut self) {
        self.paused = true;
    }

    fn resume(&mut self) {
        self.paused = false;
    }

    fn finish(self) -> AudioArtifact {
        let ext = audio::resolve_extension("", &self.content_type);
        AudioArtifact {
            file_name: format!("recording.{}", ext),
            content_type: self.content_type,
            data: self.buffer,
        }
    }
}

/// Input handing out [`BufferedCapture`]s, gated on a permission flag.
#[derive(Debug, Clone)]
pub struct BufferedInput {
    pub content_type: String,
    pub permission_granted: bool,
}

impl BufferedInput {
    pub fn new(content_type: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
            permission_granted: true,
        }
    }

    pub fn denied() -> Self {
        Self {
            content_type: "audio/webm".to_string(),
            permission_granted: false,
        }
    }
}

impl AudioInput for BufferedInput {
    type Capture = BufferedCapture;

    fn open(&mut self) -> Result<BufferedCapture, CaptureError> {
        if !self.permission_granted {
            return Err(CaptureError::PermissionDenied);
        }
        Ok(BufferedCapture::new(self.content_type.clone()))
    }
}

/// A single recording/upload workflow.
#[derive(Debug)]
pub struct RecordingSession<C: Capture> {
    /// Changes on every new recording or file selection
    id: Uuid,
    status: SessionStatus,
    /// Seconds spent recording, excluding paused time
    elapsed_secs: u64,
    /// Auto-stop threshold in seconds
    max_duration_secs: u64,
    /// Relay variant, which also picks the route
    ceiling: SizeCeiling,
    /// Size limit for selected files, in megabytes
    max_file_size_mb: u64,
    /// Open capture device while recording or paused
    capture: Option<C>,
    /// The single live artifact
    artifact: Option<AudioArtifact>,
    /// Ticket of the relay call in flight, if any
    in_flight: Option<u64>,
    /// Ticket handed to the next relay call
    next_ticket: u64,
    /// Set when the capture device could not be opened
    recorder_unsupported: bool,
    /// Last successful transcription
    transcription: Option<TranscriptionResult>,
    /// Public URL of the last stored upload
    file_url: Option<String>,
    /// Last error message shown to the user
    error: Option<String>,
}

/// A relay call handed out by [`RecordingSession::begin_upload`]. Its ticket
/// must be passed back to [`RecordingSession::finish_upload`].
#[derive(Debug, Clone)]
pub struct PendingUpload {
    pub ticket: u64,
    pub artifact: AudioArtifact,
}

impl<C: Capture> RecordingSession<C> {
    pub fn new(ceiling: SizeCeiling) -> Self {
        Self {
            id: Uuid::new_v4(),
            status: SessionStatus::Idle,
            elapsed_secs: 0,
            max_duration_secs: MAX_DURATION_SECS,
            ceiling,
            max_file_size_mb: ceiling.default_megabytes(),
            capture: None,
            artifact: None,
            in_flight: None,
            next_ticket: 0,
            recorder_unsupported: false,
            transcription: None,
            file_url: None,
            error: None,
        }
    }

    /// Override the file size limit to match the server's configuration.
    pub fn with_max_file_size_mb(mut self, max_mb: u64) -> Self {
        self.max_file_size_mb = max_mb;
        self
    }

    pub fn max_file_size_mb(&self) -> u64 {
        self.max_file_size_mb
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed_secs
    }

    pub fn max_duration_secs(&self) -> u64 {
        self.max_duration_secs
    }

    pub fn ceiling(&self) -> SizeCeiling {
        self.ceiling
    }

    /// Recording or paused: a capture device is held.
    pub fn is_active(&self) -> bool {
        matches!(
            self.status,
            SessionStatus::Recording | SessionStatus::Paused
        )
    }

    pub fn is_transcribing(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn recorder_unsupported(&self) -> bool {
        self.recorder_unsupported
    }

    pub fn artifact(&self) -> Option<&AudioArtifact> {
        self.artifact.as_ref()
    }

    pub fn transcription(&self) -> Option<&TranscriptionResult> {
        self.transcription.as_ref()
    }

    pub fn file_url(&self) -> Option<&str> {
        self.file_url.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn reset_results(&mut self) {
        self.transcription = None;
        self.file_url = None;
        self.error = None;
    }

    /// Begin recording. Returns `false` when the device could not be opened;
    /// the session then stays idle with `recorder_unsupported` set.
    pub fn start<I>(&mut self, input: &mut I) -> bool
    where
        I: AudioInput<Capture = C>,
    {
        if self.is_active() || self.is_transcribing() {
            return false;
        }

        match input.open() {
            Ok(capture) => {
                self.id = Uuid::new_v4();
                self.capture = Some(capture);
                self.artifact = None;
                self.reset_results();
                self.elapsed_secs = 0;
                self.recorder_unsupported = false;
                self.status = SessionStatus::Recording;
                tracing::info!("Session {} started recording", self.id);
                true
            }
            Err(e) => {
                tracing::warn!("Could not start recording: {}", e);
                self.recorder_unsupported = true;
                false
            }
        }
    }

    /// Feed encoded audio from the device into the active capture.
    pub fn push_audio(&mut self, chunk: &[u8]) {
        if self.status != SessionStatus::Recording {
            return;
        }
        if let Some(capture) = self.capture.as_mut() {
            capture.write(chunk);
        }
    }

    pub fn pause(&mut self) -> bool {
        if self.status != SessionStatus::Recording {
            return false;
        }
        if let Some(capture) = self.capture.as_mut() {
            capture.pause();
        }
        self.status = SessionStatus::Paused;
        true
    }

    pub fn resume(&mut self) -> bool {
        if self.status != SessionStatus::Paused {
            return false;
        }
        if let Some(capture) = self.capture.as_mut() {
            capture.resume();
        }
        self.status = SessionStatus::Recording;
        true
    }

    /// Finalize the artifact and release the capture device.
    pub fn stop(&mut self) -> bool {
        if !self.is_active() {
            return false;
        }
        if let Some(capture) = self.capture.take() {
            self.artifact = Some(capture.finish());
        }
        self.status = SessionStatus::Stopped;
        tracing::info!(
            "Session {} stopped after {}s ({} bytes)",
            self.id,
            self.elapsed_secs,
            self.artifact.as_ref().map(|a| a.data.len()).unwrap_or(0)
        );
        true
    }

    /// One-second timer tick. Counts only while recording and stops the
    /// session once the ceiling is reached.
    pub fn tick(&mut self) {
        if self.status != SessionStatus::Recording {
            return;
        }
        self.elapsed_secs += 1;
        if self.elapsed_secs >= self.max_duration_secs {
            self.elapsed_secs = self.max_duration_secs;
            tracing::info!("Session {} reached the recording limit", self.id);
            self.stop();
        }
    }

    /// Use a picked or dropped file as the artifact, skipping recording.
    pub fn select_file(
        &mut self,
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        data: Vec<u8>,
    ) -> Result<(), SessionError> {
        let result = self.try_select_file(file_name.into(), content_type.into(), data);
        if let Err(e) = &result {
            self.error = Some(e.to_string());
        }
        result
    }

    fn try_select_file(
        &mut self,
        file_name: String,
        content_type: String,
        data: Vec<u8>,
    ) -> Result<(), SessionError> {
        if self.is_active() {
            return Err(SessionError::CaptureActive);
        }
        if self.is_transcribing() {
            return Err(SessionError::InFlight);
        }
        if !audio::is_audio_media_type(&content_type) {
            return Err(SessionError::NotAudio(content_type));
        }
        if data.len() as u64 > self.max_file_size_mb * 1024 * 1024 {
            return Err(SessionError::FileTooLarge(self.max_file_size_mb));
        }
        if data.is_empty() {
            return Err(SessionError::EmptyFile);
        }

        self.id = Uuid::new_v4();
        self.reset_results();
        self.elapsed_secs = 0;
        self.artifact = Some(AudioArtifact {
            file_name,
            content_type,
            data,
        });
        self.status = SessionStatus::Stopped;
        Ok(())
    }

    /// Mark a relay call as in flight and hand out the artifact to send.
    pub fn begin_upload(&mut self) -> Result<PendingUpload, SessionError> {
        if self.is_transcribing() {
            return Err(SessionError::InFlight);
        }
        let artifact = self.artifact.clone().ok_or(SessionError::NoArtifact)?;
        self.reset_results();

        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.in_flight = Some(ticket);
        Ok(PendingUpload { ticket, artifact })
    }

    /// Record the relay's answer for `ticket` and clear the in-flight state.
    ///
    /// Answers for any other ticket are dropped: they belong to a call that
    /// was abandoned by [`clear`](Self::clear) and must not land on a later
    /// artifact.
    pub fn finish_upload(&mut self, ticket: u64, outcome: &UploadOutcome) {
        if self.in_flight != Some(ticket) {
            tracing::debug!("Session {} ignoring stale upload answer {}", self.id, ticket);
            return;
        }
        self.in_flight = None;
        match outcome {
            UploadOutcome::Success {
                file_url,
                transcription,
                ..
            } => {
                self.file_url = file_url.clone();
                self.transcription = transcription.clone();
                self.error = None;
            }
            UploadOutcome::Failure { error } => {
                tracing::warn!("Session {} upload failed: {}", self.id, error);
                self.error = Some(error.clone());
            }
        }
    }

    /// Send the artifact to the relay route matching this session's ceiling.
    pub async fn submit(&mut self, client: &RelayClient) -> Result<UploadOutcome, SessionError> {
        let pending = self.begin_upload()?;
        let outcome = client.send(self.ceiling.endpoint(), &pending.artifact).await;
        self.finish_upload(pending.ticket, &outcome);
        Ok(outcome)
    }

    /// Back to idle, dropping any artifact and capture device. A relay call
    /// still running is abandoned; its answer will be ignored.
    pub fn clear(&mut self) {
        self.capture = None;
        self.artifact = None;
        self.reset_results();
        self.elapsed_secs = 0;
        self.in_flight = None;
        self.status = SessionStatus::Idle;
    }
}

/// Session shared between the UI and its timer task.
pub type SharedSession<C> = Arc<Mutex<RecordingSession<C>>>;

pub fn new_shared_session<C: Capture>(ceiling: SizeCeiling) -> SharedSession<C> {
    Arc::new(Mutex::new(RecordingSession::new(ceiling)))
}

/// Drive [`RecordingSession::tick`] once per second until the recording that
/// was active at spawn time ends.
pub fn spawn_ticker<C>(session: SharedSession<C>) -> JoinHandle<()>
where
    C: Capture + 'static,
{
    tokio::spawn(async move {
        let owner = session.lock().await.id();
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        // The first tick completes immediately.
        interval.tick().await;

        loop {
            interval.tick().await;
            let mut session = session.lock().await;
            if session.id() != owner || !session.is_active() {
                break;
            }
            session.tick();
        }
    })
}

/// Upload without holding the lock across the network call, so the
/// `transcribing` flag stays observable while the request runs.
pub async fn submit_shared<C: Capture>(
    session: &SharedSession<C>,
    client: &RelayClient,
) -> Result<UploadOutcome, SessionError> {
    let (pending, endpoint) = {
        let mut session = session.lock().await;
        let pending = session.begin_upload()?;
        (pending, session.ceiling().endpoint())
    };

    let outcome = client.send(endpoint, &pending.artifact).await;
    session.lock().await.finish_upload(pending.ticket, &outcome);
    Ok(outcome)
}

//! Transcription relay: validate an audio file and forward it to the external
//! transcription service.

use crate::models::TranscribeResponse;
use crate::{AppState, Result};
use axum::{
    extract::{Multipart, State},
    Json,
};
use serde_json::Value;
use std::sync::Arc;

use super::read_audio_form;

/// POST /api/transcribe
pub async fn transcribe_audio(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<TranscribeResponse>> {
    tracing::info!("Received transcription request");

    let form = read_audio_form(
        &mut multipart,
        state.config.transcribe_max_file_size_bytes(),
        state.config.transcribe_max_file_size_mb,
    )
    .await?;
    let file_name = form.upload.file_name.clone();

    let result = state
        .transcriber
        .transcribe(form.upload, form.engine.as_deref())
        .await?;

    tracing::info!(
        "Transcribed {}: {} chars via {}",
        file_name,
        result.text.len(),
        result.engine.as_deref().unwrap_or("unknown engine")
    );

    Ok(Json(TranscribeResponse {
        success: true,
        file_name,
        text: result.text,
        engine: result.engine,
        file_type: result.file_type,
        timestamps: result.timestamps,
    }))
}

/// GET /api/engines
pub async fn engine_status(State(state): State<Arc<AppState>>) -> Result<Json<Value>> {
    let status = state.transcriber.engine_status().await?;
    Ok(Json(status))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{json_body, multipart_request, Part};
    use crate::{build_router, AppState, Config};
    use axum::{
        body::Bytes,
        extract::{Query, State},
        http::StatusCode,
        response::IntoResponse,
        routing::{get, post},
        Json, Router,
    };
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;
    use tower::ServiceExt;

    /// Stand-in for the transcription service: answers every request with a
    /// fixed status and body, recording what it received.
    #[derive(Clone)]
    struct FakeService {
        status: StatusCode,
        body: String,
        hits: Arc<AtomicUsize>,
        last_body: Arc<Mutex<Vec<u8>>>,
        last_engine: Arc<Mutex<Option<String>>>,
    }

    impl FakeService {
        fn new(status: StatusCode, body: Value) -> Self {
            Self::raw(status, body.to_string())
        }

        fn raw(status: StatusCode, body: String) -> Self {
            Self {
                status,
                body,
                hits: Arc::new(AtomicUsize::new(0)),
                last_body: Arc::new(Mutex::new(Vec::new())),
                last_engine: Arc::new(Mutex::new(None)),
            }
        }

        fn hits(&self) -> usize {
            self.hits.load(Ordering::SeqCst)
        }

        async fn spawn(&self) -> String {
            async fn handle(
                State(fake): State<FakeService>,
                Query(query): Query<HashMap<String, String>>,
                body: Bytes,
            ) -> impl IntoResponse {
                fake.hits.fetch_add(1, Ordering::SeqCst);
                *fake.last_body.lock().unwrap() = body.to_vec();
                *fake.last_engine.lock().unwrap() = query.get("engine").cloned();
                (
                    fake.status,
                    [("content-type", "application/json")],
                    fake.body.clone(),
                )
            }

            async fn engines() -> Json<Value> {
                Json(json!({ "whisper": { "available": true, "description": "WHISPER" } }))
            }

            let app = Router::new()
                .route("/transcribe", post(handle))
                .route("/engines/status", get(engines))
                .with_state(self.clone());
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move {
                axum::serve(listener, app).await.unwrap();
            });
            format!("http://{}/transcribe", addr)
        }
    }

    fn relay(transcription_url: String, upload_dir: &std::path::Path) -> Router {
        let config = Config {
            transcription_url,
            transcription_timeout_secs: 5,
            transcribe_max_file_size_mb: 1,
            upload_dir: upload_dir.to_path_buf(),
            ..Config::default()
        };
        build_router(Arc::new(AppState::new(config).unwrap()))
    }

    fn audio_part(data: &[u8]) -> Part<'_> {
        Part::File {
            name: "audio",
            file_name: "recording.webm",
            content_type: "audio/webm",
            data,
        }
    }

    #[tokio::test]
    async fn test_relays_successful_transcription() {
        let temp_dir = TempDir::new().unwrap();
        let fake = FakeService::new(
            StatusCode::OK,
            json!({
                "success": true,
                "text": "hello",
                "engine": "whisper",
                "message": "Transcription completed successfully using whisper",
                "file_name": "recording.webm",
                "file_type": "audio/webm"
            }),
        );
        let url = fake.spawn().await;

        let response = relay(url, temp_dir.path())
            .oneshot(multipart_request(
                "/api/transcribe",
                &[audio_part(b"voice bytes")],
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["text"], "hello");
        assert_eq!(body["engine"], "whisper");
        assert_eq!(body["file_type"], "audio/webm");
        assert_eq!(fake.hits(), 1);

        let forwarded = fake.last_body.lock().unwrap().clone();
        let forwarded = String::from_utf8_lossy(&forwarded);
        assert!(forwarded.contains("name=\"file\""));
        assert!(forwarded.contains("voice bytes"));
    }

    #[tokio::test]
    async fn test_relays_timestamps_and_engine_choice() {
        let temp_dir = TempDir::new().unwrap();
        let fake = FakeService::new(
            StatusCode::OK,
            json!({
                "text": "hi there",
                "timestamps": [
                    { "start": 0.0, "end": 0.4, "text": "hi" },
                    { "start": 0.4, "end": 1.0, "text": "there" }
                ]
            }),
        );
        let url = fake.spawn().await;

        let response = relay(url, temp_dir.path())
            .oneshot(multipart_request(
                "/api/transcribe",
                &[
                    audio_part(b"voice"),
                    Part::Text {
                        name: "engine",
                        value: "vosk",
                    },
                ],
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["timestamps"].as_array().unwrap().len(), 2);
        assert_eq!(body["timestamps"][1]["text"], "there");
        // Falls back to the declared media type when the service omits it.
        assert_eq!(body["file_type"], "audio/webm");
        assert_eq!(fake.last_engine.lock().unwrap().as_deref(), Some("vosk"));
    }

    #[tokio::test]
    async fn test_upstream_server_error_becomes_failure_envelope() {
        let temp_dir = TempDir::new().unwrap();
        let fake = FakeService::raw(StatusCode::INTERNAL_SERVER_ERROR, "boom".to_string());
        let url = fake.spawn().await;

        let response = relay(url, temp_dir.path())
            .oneshot(multipart_request("/api/transcribe", &[audio_part(b"voice")]))
            .await
            .unwrap();

        assert!(response.status().is_server_error());
        let body = json_body(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Transcription service error");
        assert_eq!(fake.hits(), 1);
    }

    #[tokio::test]
    async fn test_upstream_detail_is_relayed() {
        let temp_dir = TempDir::new().unwrap();
        let fake = FakeService::new(
            StatusCode::BAD_REQUEST,
            json!({ "detail": "Unsupported file type. Supported formats: MP3, WAV" }),
        );
        let url = fake.spawn().await;

        let response = relay(url, temp_dir.path())
            .oneshot(multipart_request("/api/transcribe", &[audio_part(b"voice")]))
            .await
            .unwrap();

        assert!(response.status().is_server_error());
        let body = json_body(response).await;
        assert_eq!(
            body["error"],
            "Unsupported file type. Supported formats: MP3, WAV"
        );
    }

    #[tokio::test]
    async fn test_malformed_upstream_json_is_generic_failure() {
        let temp_dir = TempDir::new().unwrap();
        let fake = FakeService::raw(StatusCode::OK, "not json".to_string());
        let url = fake.spawn().await;

        let response = relay(url, temp_dir.path())
            .oneshot(multipart_request("/api/transcribe", &[audio_part(b"voice")]))
            .await
            .unwrap();

        assert!(response.status().is_server_error());
        let body = json_body(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Transcription service error");
    }

    #[tokio::test]
    async fn test_upstream_reported_failure() {
        let temp_dir = TempDir::new().unwrap();
        let fake = FakeService::new(
            StatusCode::OK,
            json!({
                "success": false,
                "text": "",
                "engine": "none",
                "message": "All transcription engines failed or returned empty results"
            }),
        );
        let url = fake.spawn().await;

        let response = relay(url, temp_dir.path())
            .oneshot(multipart_request("/api/transcribe", &[audio_part(b"voice")]))
            .await
            .unwrap();

        assert!(response.status().is_server_error());
        let body = json_body(response).await;
        assert_eq!(
            body["error"],
            "All transcription engines failed or returned empty results"
        );
    }

    #[tokio::test]
    async fn test_unreachable_service_is_generic_failure() {
        let temp_dir = TempDir::new().unwrap();
        // Bind then drop to get a port nobody listens on.
        let addr = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };

        let response = relay(format!("http://{}/transcribe", addr), temp_dir.path())
            .oneshot(multipart_request("/api/transcribe", &[audio_part(b"voice")]))
            .await
            .unwrap();

        assert!(response.status().is_server_error());
        let body = json_body(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Transcription service error");
    }

    #[tokio::test]
    async fn test_non_audio_is_not_forwarded() {
        let temp_dir = TempDir::new().unwrap();
        let fake = FakeService::new(StatusCode::OK, json!({ "text": "never" }));
        let url = fake.spawn().await;

        let response = relay(url, temp_dir.path())
            .oneshot(multipart_request(
                "/api/transcribe",
                &[Part::File {
                    name: "audio",
                    file_name: "clip.mp4",
                    content_type: "video/mp4",
                    data: b"video",
                }],
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(fake.hits(), 0);
    }

    #[tokio::test]
    async fn test_oversized_is_rejected_before_forwarding() {
        let temp_dir = TempDir::new().unwrap();
        let fake = FakeService::new(StatusCode::OK, json!({ "text": "never" }));
        let url = fake.spawn().await;
        let data = vec![1u8; 1024 * 1024 + 10];

        let response = relay(url, temp_dir.path())
            .oneshot(multipart_request("/api/transcribe", &[audio_part(&data)]))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let body = json_body(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(fake.hits(), 0);
    }

    #[tokio::test]
    async fn test_truncated_engine_field_is_rejected() {
        use super::super::test_support::{multipart_body, BOUNDARY};

        let temp_dir = TempDir::new().unwrap();
        let fake = FakeService::new(StatusCode::OK, json!({ "text": "never" }));
        let url = fake.spawn().await;

        // Complete audio part, then an engine field cut off before its boundary.
        let mut body = multipart_body(&[audio_part(b"voice")]);
        let closing = format!("--{}--\r\n", BOUNDARY);
        body.truncate(body.len() - closing.len());
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"engine\"\r\n\r\nvos",
                BOUNDARY
            )
            .as_bytes(),
        );

        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/api/transcribe")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(axum::body::Body::from(body))
            .unwrap();

        let response = relay(url, temp_dir.path()).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["success"], false);
        assert!(body["error"]
            .as_str()
            .unwrap()
            .starts_with("Failed to read engine field"));
        assert_eq!(fake.hits(), 0);
    }

    #[tokio::test]
    async fn test_engine_status_is_relayed() {
        let temp_dir = TempDir::new().unwrap();
        let fake = FakeService::new(StatusCode::OK, json!({ "text": "" }));
        let url = fake.spawn().await;

        let response = relay(url, temp_dir.path())
            .oneshot(
                axum::http::Request::builder()
                    .uri("/api/engines")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["whisper"]["available"], true);
    }
}

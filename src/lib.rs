pub mod audio;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod probe;
pub mod relay_client;
pub mod session;
pub mod storage;
pub mod transcription;

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub use config::Config;
pub use error::{AppError, Result};

use transcription::TranscriptionClient;

pub struct AppState {
    pub config: Config,
    pub transcriber: TranscriptionClient,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        let transcriber = TranscriptionClient::new(&config)?;
        Ok(Self {
            config,
            transcriber,
        })
    }
}

fn cors_layer(config: &Config) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    match config.allowed_origin_list() {
        Some(origins) => {
            let origins: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|o| match o.parse() {
                    Ok(value) => Some(value),
                    Err(_) => {
                        tracing::warn!("Ignoring invalid CORS origin: {}", o);
                        None
                    }
                })
                .collect();
            cors.allow_origin(origins)
        }
        None => cors.allow_origin(Any),
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let config = state.config.clone();

    Router::new()
        // Persisted uploads
        .nest_service(
            &config.public_upload_path,
            ServeDir::new(&config.upload_dir),
        )
        // Health check
        .route("/health", get(handlers::health_check))
        // Storage-only upload (10MB by default)
        .route("/api/upload", post(handlers::upload::upload_audio))
        // Transcription relay (25MB by default)
        .route("/api/transcribe", post(handlers::transcribe::transcribe_audio))
        .route("/api/engines", get(handlers::transcribe::engine_status))
        .layer(DefaultBodyLimit::max(config.max_request_body_bytes()))
        .layer(cors_layer(&config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

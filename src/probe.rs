//! Liveness probe: one GET against a local endpoint, mapped to an exit code.

use std::time::Duration;

pub const DEFAULT_URL: &str = "http://localhost:3000/health";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeStatus {
    Healthy,
    Unhealthy { reason: String },
}

impl ProbeStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, ProbeStatus::Healthy)
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            ProbeStatus::Healthy => 0,
            ProbeStatus::Unhealthy { .. } => 1,
        }
    }
}

/// Issue a single GET; only HTTP 200 counts as healthy. No retries.
pub async fn check(url: &str, timeout: Duration) -> ProbeStatus {
    let client = match reqwest::Client::builder().timeout(timeout).build() {
        Ok(client) => client,
        Err(e) => {
            tracing::error!("Failed to build probe client: {}", e);
            return ProbeStatus::Unhealthy {
                reason: e.to_string(),
            };
        }
    };

    match client.get(url).send().await {
        Ok(response) if response.status() == reqwest::StatusCode::OK => ProbeStatus::Healthy,
        Ok(response) => {
            tracing::error!("Health check {} returned {}", url, response.status());
            ProbeStatus::Unhealthy {
                reason: format!("status {}", response.status()),
            }
        }
        Err(e) => {
            tracing::error!("Health check {} failed: {}", url, e);
            ProbeStatus::Unhealthy {
                reason: e.to_string(),
            }
        }
    }
}

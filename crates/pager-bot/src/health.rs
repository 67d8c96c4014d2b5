//! HTTP health checks: `/health` reports bot and pagination state, `/live` always
//! answers, `/ready` answers once the gateway has sent READY.

use std::sync::Arc;
use std::time::Instant;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::config::OperationalStatus;
use crate::error_cache::ErrorCache;

/// Reports how many pagination sessions are running.
pub type SessionGauge = Arc<dyn Fn() -> usize + Send + Sync>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    /// `ok` once connected, `starting` before.
    pub status: String,
    pub bot_username: Option<String>,
    pub uptime_secs: u64,
    pub operational_status: OperationalStatus,
    pub cached_errors: usize,
    pub active_sessions: usize,
}

/// State shared between the gateway handler and the health server.
#[derive(Clone)]
pub struct AppState {
    started: Instant,
    bot_username: Arc<RwLock<Option<String>>>,
    operational_status: OperationalStatus,
    errors: Arc<RwLock<ErrorCache>>,
    sessions: SessionGauge,
}

impl AppState {
    pub fn new(
        operational_status: OperationalStatus,
        errors: Arc<RwLock<ErrorCache>>,
        sessions: SessionGauge,
    ) -> Self {
        Self {
            started: Instant::now(),
            bot_username: Arc::new(RwLock::new(None)),
            operational_status,
            errors,
            sessions,
        }
    }

    /// Called from the READY event.
    pub async fn set_bot_username(&self, username: String) {
        *self.bot_username.write().await = Some(username);
    }

    async fn report(&self) -> HealthReport {
        let bot_username = self.bot_username.read().await.clone();
        HealthReport {
            status: if bot_username.is_some() { "ok" } else { "starting" }.to_string(),
            bot_username,
            uptime_secs: self.started.elapsed().as_secs(),
            operational_status: self.operational_status,
            cached_errors: self.errors.read().await.len(),
            active_sessions: (self.sessions)(),
        }
    }
}

async fn health(State(state): State<AppState>) -> Json<HealthReport> {
    Json(state.report().await)
}

async fn live() -> StatusCode {
    StatusCode::OK
}

async fn ready(State(state): State<AppState>) -> StatusCode {
    if state.bot_username.read().await.is_some() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/live", get(live))
        .route("/ready", get(ready))
        .with_state(state)
}

/// Serve the health checks on `0.0.0.0:port` until the process exits.
pub async fn start_health_server(state: AppState, port: u16) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Health check server listening on {}", addr);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

//! Media server admin handlers.
//!
//! These always return 200: upstream failures are reported in the body with
//! `status: "error"`.

use crate::auth::ServiceIdentity;
use crate::models::{
    BackendStatus, ConnectionTestReport, MediaConfigSummary, ParticipantListing, RoomListing,
};
use crate::routes::AppState;
use axum::extract::{Path, State};
use axum::{Extension, Json};
use std::sync::Arc;
use tracing::instrument;

/// Handler for GET /rooms/
#[instrument(skip_all, name = "ls.rooms.list")]
pub async fn list_rooms(
    State(state): State<Arc<AppState>>,
    caller: Option<Extension<ServiceIdentity>>,
) -> Json<RoomListing> {
    log_caller(caller.as_ref().map(|Extension(c)| c), "list_rooms");
    Json(state.media.list_rooms().await)
}

/// Handler for GET /rooms/{room}/participants/
#[instrument(skip_all, name = "ls.rooms.participants", fields(room = %room))]
pub async fn list_participants(
    State(state): State<Arc<AppState>>,
    caller: Option<Extension<ServiceIdentity>>,
    Path(room): Path<String>,
) -> Json<ParticipantListing> {
    log_caller(caller.as_ref().map(|Extension(c)| c), "list_participants");
    Json(state.media.list_participants(&room).await)
}

/// Handler for GET /test-connection/
///
/// Probes each configured media endpoint and echoes non-secret media config.
#[instrument(skip_all, name = "ls.rooms.test_connection")]
pub async fn test_connection(State(state): State<Arc<AppState>>) -> Json<ConnectionTestReport> {
    let media_tests = state.media.test_connection().await;
    let config = &state.config;

    Json(ConnectionTestReport {
        backend: BackendStatus {
            status: "connected".to_string(),
            message: "Livestream backend is running".to_string(),
            timestamp: chrono::Utc::now().timestamp(),
        },
        media_tests,
        config: MediaConfigSummary {
            api_key: config.media_api_key.clone(),
            ws_url: config.media_ws_url.clone(),
            http_url: config.media_http_url.clone(),
            fallback_url: config.media_fallback_url.clone(),
            rtc_port: config.media_rtc_port,
            udp_range: config.media_udp_range.clone(),
        },
    })
}

fn log_caller(caller: Option<&ServiceIdentity>, operation: &str) {
    if let Some(caller) = caller {
        tracing::debug!(
            target: "ls.handlers.rooms",
            service = %caller.service_name,
            operation,
            "Admin request from service"
        );
    }
}

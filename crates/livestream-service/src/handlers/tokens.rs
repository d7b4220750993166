//! Access token handler.

use crate::auth::{Role, ServiceIdentity};
use crate::errors::LsError;
use crate::models::{ServerConfig, TokenRequest, TokenResponse};
use crate::observability::metrics;
use crate::routes::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::{Extension, Json};
use std::sync::Arc;
use tracing::instrument;

/// Handler for POST /token/
///
/// Issues a media server access token for `identity` in `room_name`.
/// `role` defaults to `audience`.
///
/// # Response
///
/// - 200 OK with the token and media server connection details
/// - 400 Bad Request for invalid JSON, missing fields, or an unknown role
/// - 500 Internal Server Error if signing fails
#[instrument(skip_all, name = "ls.tokens.issue")]
pub async fn issue_token(
    State(state): State<Arc<AppState>>,
    caller: Option<Extension<ServiceIdentity>>,
    payload: Result<Json<TokenRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, LsError> {
    let Json(request) = payload.map_err(|e| {
        tracing::debug!(target: "ls.handlers.tokens", error = %e, "Rejected token request body");
        LsError::Validation("Invalid JSON".to_string())
    })?;

    let role = request
        .role
        .as_deref()
        .map(str::parse::<Role>)
        .transpose()
        .map_err(|e| LsError::Validation(e.to_string()))?
        .unwrap_or_default();

    let identity = request.identity.unwrap_or_default();
    let room_name = request.room_name.unwrap_or_default();

    let issued = state.issuer.issue(&identity, &room_name, role)?;
    metrics::record_token_issued(role.as_str());

    if let Some(Extension(caller)) = caller {
        tracing::info!(
            target: "ls.handlers.tokens",
            service = %caller.service_name,
            role = %role,
            "Token issued on behalf of service"
        );
    }

    let config = &state.config;
    Ok(Json(TokenResponse {
        token: issued.token,
        identity: issued.identity,
        room_name: issued.room_name,
        role: issued.role.to_string(),
        server_url: config.media_ws_url.clone(),
        server_config: ServerConfig {
            ws_url: config.media_ws_url.clone(),
            http_url: config.media_http_url.clone(),
            rtc_port: config.media_rtc_port,
            udp_range: config.media_udp_range.clone(),
        },
        expires_in: issued.expires_in,
    }))
}

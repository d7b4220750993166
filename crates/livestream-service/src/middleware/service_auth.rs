//! Service token middleware.
//!
//! Inspects `Authorization: Service <jwt>` on every request it wraps:
//!
//! - accepted tokens put a [`ServiceIdentity`](crate::auth::ServiceIdentity)
//!   into request extensions
//! - rejected tokens fail the request with 401
//! - requests without a service token pass through unless `required` is set

use crate::auth::{ServiceAuthOutcome, ServiceTokenVerifier};
use crate::errors::LsError;
use crate::observability::metrics;
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::instrument;

/// State for the service auth middleware.
#[derive(Clone)]
pub struct ServiceAuthState {
    pub verifier: ServiceTokenVerifier,

    /// Reject requests that carry no service token.
    pub required: bool,
}

#[instrument(skip_all, name = "ls.middleware.service_auth")]
pub async fn service_auth(
    State(state): State<Arc<ServiceAuthState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, LsError> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let outcome = state.verifier.verify(header);
    metrics::record_service_auth(outcome.label());

    match outcome {
        ServiceAuthOutcome::Accepted(identity) => {
            req.extensions_mut().insert(identity);
        }
        ServiceAuthOutcome::Rejected(reason) => {
            tracing::debug!(target: "ls.middleware.service_auth", reason = %reason, "Service token rejected");
            return Err(LsError::Authentication(reason));
        }
        ServiceAuthOutcome::NotApplicable if state.required => {
            tracing::debug!(target: "ls.middleware.service_auth", "Missing required service token");
            return Err(LsError::Authentication(
                "Service token required".to_string(),
            ));
        }
        ServiceAuthOutcome::NotApplicable => {}
    }

    Ok(next.run(req).await)
}

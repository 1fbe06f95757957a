//! HTTP transport for admission reviews
//!
//! The API server POSTs an AdmissionReview envelope; the router extracts the
//! request, runs it through a [`Webhook`], and answers with the response
//! envelope. Only malformed envelopes (no request, not JSON) are answered with
//! an HTTP error; everything else is an AdmissionReview, allowed or denied.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use kube::core::admission::{AdmissionRequest as ReviewRequest, AdmissionResponse, AdmissionReview};
use kube::core::DynamicObject;
use tracing::error;

use crate::context::ReviewContext;
use crate::response::to_denial;
use crate::review::AdmissionRequest;
use crate::webhook::Webhook;

/// Default route for mutation requests
pub const DEFAULT_WEBHOOK_PATH: &str = "/mutate";

/// Error type for envelope handling
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    /// The body was not an AdmissionReview
    #[error("invalid admission review: {0}")]
    InvalidReview(String),

    /// The AdmissionReview had no request
    #[error("admission review has no request")]
    MissingRequest,
}

impl IntoResponse for EnvelopeError {
    fn into_response(self) -> Response {
        (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": self.to_string()})),
        )
            .into_response()
    }
}

/// Router configuration
#[derive(Debug, Clone)]
pub struct WebhookRouterConfig {
    /// Route serving mutation requests
    pub path: String,
    /// Deadline applied to every review
    pub timeout: Option<Duration>,
}

impl Default for WebhookRouterConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_WEBHOOK_PATH.to_string(),
            timeout: None,
        }
    }
}

/// Shared state for webhook handlers
#[derive(Clone)]
pub struct WebhookState {
    webhook: Arc<dyn Webhook>,
    timeout: Option<Duration>,
}

/// Create the webhook router
///
/// Routes:
/// - POST `{config.path}` - review a mutation request
/// - GET /healthz - liveness check
pub fn webhook_router(webhook: Arc<dyn Webhook>, config: WebhookRouterConfig) -> Router {
    let state = WebhookState {
        webhook,
        timeout: config.timeout,
    };
    Router::new()
        .route(&config.path, post(review_handler))
        .route("/healthz", get(|| async { "ok" }))
        .with_state(state)
}

/// Handle one AdmissionReview
async fn review_handler(State(state): State<WebhookState>, body: Bytes) -> Response {
    match review_envelope(&state, &body).await {
        Ok(review) => Json(review).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to parse admission review");
            e.into_response()
        }
    }
}

async fn review_envelope(
    state: &WebhookState,
    body: &[u8],
) -> Result<AdmissionReview<DynamicObject>, EnvelopeError> {
    let review: AdmissionReview<DynamicObject> =
        serde_json::from_slice(body).map_err(|e| EnvelopeError::InvalidReview(e.to_string()))?;
    let review_request: ReviewRequest<DynamicObject> = review
        .try_into()
        .map_err(|_| EnvelopeError::MissingRequest)?;

    let response = match AdmissionRequest::try_from(&review_request) {
        Ok(request) => {
            let mut ctx = ReviewContext::new();
            if let Some(timeout) = state.timeout {
                ctx = ctx.with_timeout(timeout);
            }
            // Dropping this guard (client gone, handler aborted) cancels the
            // mutator too.
            let _cancel_on_drop = ctx.cancellation().clone().drop_guard();
            state.webhook.review(&ctx, &request).await
        }
        Err(e) => to_denial(AdmissionResponse::from(&review_request), &e),
    };

    Ok(response.into_review())
}

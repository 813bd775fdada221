use axum::{
    body::Body,
    http::{Response, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::sync::Arc;
use tower_governor::{governor::GovernorConfigBuilder, GovernorError, GovernorLayer};

/// Type alias for the global governor layer (IP-based rate limiting)
pub type GlobalGovernorLayer = GovernorLayer<
    tower_governor::key_extractor::PeerIpKeyExtractor,
    governor::middleware::NoOpMiddleware<governor::clock::QuantaInstant>,
    Body,
>;

/// Create a GovernorLayer for global rate limiting (per IP address)
/// - 1000 requests per minute (one token every 60ms)
/// - Applied before authentication
pub fn create_global_governor() -> GlobalGovernorLayer {
    let config = Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond(60)
            .burst_size(1000)
            .finish()
            .expect("valid global rate limit configuration"),
    );

    GovernorLayer::new(config).error_handler(rate_limit_error_handler)
}

/// JSON body for rejected requests, matching the API error shape
pub fn rate_limit_error_handler(error: GovernorError) -> Response<Body> {
    match error {
        GovernorError::TooManyRequests { wait_time, .. } => {
            tracing::warn!(wait_time, "RATE LIMITED - Request rejected due to too many requests");
            (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({
                    "error": format!("Too many requests, retry in {} seconds", wait_time),
                })),
            )
                .into_response()
        }
        GovernorError::UnableToExtractKey => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Unable to identify client" })),
        )
            .into_response(),
        other => {
            tracing::error!(error = ?other, "Rate limiter failure");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Internal server error" })),
            )
                .into_response()
        }
    }
}

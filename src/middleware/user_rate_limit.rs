use axum::http::Request;
use std::sync::Arc;
use tower_governor::{
    governor::GovernorConfigBuilder,
    key_extractor::KeyExtractor,
    GovernorError, GovernorLayer,
};

use crate::middleware::rate_limit::rate_limit_error_handler;
use crate::utils::jwt::Claims;

/// Key extractor that uses the user id from JWT claims in request extensions
#[derive(Debug, Clone, Copy)]
pub struct UserIdExtractor;

impl KeyExtractor for UserIdExtractor {
    type Key = i64;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        // Claims are set by auth_middleware, which must run first
        let claims = req
            .extensions()
            .get::<Claims>()
            .ok_or(GovernorError::UnableToExtractKey)?;

        Ok(claims.sub)
    }
}

pub type UserGovernorLayer = GovernorLayer<
    UserIdExtractor,
    governor::middleware::NoOpMiddleware<governor::clock::QuantaInstant>,
    axum::body::Body,
>;

/// Per-customer limit: 100 requests per minute, refilling one every 600ms.
/// Staff routes are only covered by the global per-IP limiter.
pub fn create_customer_governor() -> UserGovernorLayer {
    let config = Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond(600)
            .burst_size(100)
            .key_extractor(UserIdExtractor)
            .finish()
            .expect("valid customer rate limit configuration"),
    );

    GovernorLayer::new(config).error_handler(rate_limit_error_handler)
}

//! API middleware for rate limiting and authentication.

use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Header name for API key.
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Default rate limit for unauthenticated requests.
const DEFAULT_RATE_LIMIT: u32 = 100;

/// Anonymous key prefix for rate limiting unauthenticated requests.
const ANONYMOUS_KEY_PREFIX: &str = "anon_";

/// Identity the sliding window is keyed on.
struct RequestIdentity {
    key_id: String,
    rate_limit: u32,
}

/// Resolves the rate-limit identity for a request. A valid API key gets its
/// own window and limit; everything else shares an IP-keyed window at the
/// default limit.
fn request_identity(state: &AppState, request: &Request<Body>) -> RequestIdentity {
    let api_key = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok());

    if let Some(key) = api_key
        && let Some(stored) = state.api_keys.validate_key(key)
    {
        return RequestIdentity {
            key_id: stored.key_id,
            rate_limit: stored.rate_limit,
        };
    }

    RequestIdentity {
        key_id: format!("{}{}", ANONYMOUS_KEY_PREFIX, extract_client_ip(request)),
        rate_limit: DEFAULT_RATE_LIMIT,
    }
}

/// Rate limiting middleware.
///
/// Returns 429 Too Many Requests when the window is exhausted and adds rate
/// limit headers to passing responses. Health and documentation endpoints
/// are exempt.
pub async fn rate_limit_middleware(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path();
    if path == "/health" || path.starts_with("/swagger-ui") || path.starts_with("/api-docs") {
        return next.run(request).await;
    }

    let identity = request_identity(&state, &request);
    let allowed = state
        .api_keys
        .check_rate_limit(&identity.key_id, identity.rate_limit);

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let reset = now + 60;

    if !allowed {
        return ApiError::RateLimitExceeded {
            limit: identity.rate_limit,
            remaining: 0,
            reset,
            retry_after: 60,
        }
        .into_response();
    }

    let mut response = next.run(request).await;

    let headers = response.headers_mut();
    if let Ok(limit) = identity.rate_limit.to_string().parse() {
        headers.insert("X-RateLimit-Limit", limit);
    }
    if let Ok(reset) = reset.to_string().parse() {
        headers.insert("X-RateLimit-Reset", reset);
    }

    response
}

/// Extract client IP from request headers.
fn extract_client_ip(request: &Request<Body>) -> String {
    if let Some(forwarded) = request.headers().get("X-Forwarded-For")
        && let Ok(value) = forwarded.to_str()
        && let Some(ip) = value.split(',').next()
    {
        return ip.trim().to_string();
    }

    if let Some(real_ip) = request.headers().get("X-Real-IP")
        && let Ok(value) = real_ip.to_str()
    {
        return value.to_string();
    }

    "unknown".to_string()
}

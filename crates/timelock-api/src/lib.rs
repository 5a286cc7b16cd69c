//! Timelock HTTP API
//!
//! # API Structure
//!
//! ```text
//! /health                 - Service and ledger connection status
//! /api/health             - Same, under the API prefix
//! /escrow/
//! ├── /create             - Lock funds from buyer for seller
//! ├── /finish             - Release funds to the seller
//! └── /cancel             - Refund the buyer
//! /api/escrow/*           - Same escrow routes, under the API prefix
//! ```
//!
//! Bodies are JSON with camelCase keys. Every escrow response carries
//! `success`; failures carry `error`.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod routes;
pub mod state;

use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, Method, Request};
use axum::Router;
use std::sync::Arc;
use tracing::Span;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

pub use error::{ApiError, ApiResult};
pub use state::AppState;

/// API configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Enable CORS for browser clients
    pub enable_cors: bool,
    /// Allowed origins for CORS (`*` allows any)
    pub cors_origins: Vec<String>,
    /// Enable response compression
    pub enable_compression: bool,
    /// Enable request tracing
    pub enable_tracing: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enable_cors: true,
            cors_origins: vec!["*".to_string()],
            enable_compression: true,
            enable_tracing: true,
        }
    }
}

/// Header carrying the per-request correlation id
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Build the router with request ids, tracing, compression and CORS
pub fn create_router(state: Arc<AppState>, config: ApiConfig) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);
    let mut router =
        create_test_router(state).layer(PropagateRequestIdLayer::new(request_id.clone()));

    if config.enable_tracing {
        router = router.layer(TraceLayer::new_for_http().make_span_with(request_span));
    }
    if config.enable_compression {
        router = router.layer(CompressionLayer::new());
    }
    if config.enable_cors {
        router = router.layer(cors_layer(&config.cors_origins));
    }

    // Outermost, so the trace span sees the id.
    router.layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
}

fn request_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-");

    tracing::info_span!(
        "escrow_http",
        method = %request.method(),
        path = %request.uri().path(),
        request_id = %request_id,
    )
}

/// `*` anywhere in `origins` allows every origin
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

/// Create a minimal router for testing
pub fn create_test_router(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/escrow", routes::escrow_routes())
        .nest("/api/escrow", routes::escrow_routes())
        .merge(routes::health_routes())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cors_layer_accepts_listed_origins() {
        // Unparseable origins are skipped.
        let _ = cors_layer(&["https://example.com".to_string(), "not a\norigin".to_string()]);
        let _ = cors_layer(&["*".to_string()]);
    }

    #[test]
    fn test_default_config() {
        let config = ApiConfig::default();
        assert!(config.enable_cors);
        assert!(config.enable_compression);
        assert_eq!(config.cors_origins, vec!["*".to_string()]);
    }
}

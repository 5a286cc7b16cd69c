//! API Routes

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::handlers;
use crate::state::AppState;

/// Escrow routes, nested under both `/escrow` and `/api/escrow`
pub fn escrow_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/create", post(handlers::escrow::create_escrow))
        .route("/finish", post(handlers::escrow::finish_escrow))
        .route("/cancel", post(handlers::escrow::cancel_escrow))
}

/// Health check, served at both `/health` and `/api/health`
pub fn health_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/api/health", get(handlers::health::health_check))
}

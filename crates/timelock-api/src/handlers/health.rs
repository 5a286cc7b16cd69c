//! Health Check Handler

use axum::{extract::State, Json};
use chrono::Utc;
use std::sync::Arc;

use timelock_types::HealthResponse;

use crate::state::AppState;

/// Reports the configured network and whether the ledger connection is open.
///
/// Always 200: a closed connection is normal before the first escrow call.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let health = state.service.health().await;

    Json(HealthResponse {
        status: "ok".to_string(),
        network: health.network,
        timestamp: Utc::now(),
        connected: health.connected,
    })
}

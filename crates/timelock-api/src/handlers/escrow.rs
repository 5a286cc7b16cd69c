//! Escrow Handlers
//!
//! Thin adapters from the wire format to `EscrowLifecycleService`.

use axum::{extract::State, Json};
use std::sync::Arc;

use timelock_types::{CreateEscrowRequest, EscrowResponse, SequenceRequest};

use crate::error::ApiResult;
use crate::extractors::EscrowJson;
use crate::state::AppState;

/// `POST /escrow/create`
pub async fn create_escrow(
    State(state): State<Arc<AppState>>,
    EscrowJson(req): EscrowJson<CreateEscrowRequest>,
) -> ApiResult<Json<EscrowResponse>> {
    let created = state
        .service
        .create_escrow(req.amount, &req.invoice_id, req.refund_window_seconds)
        .await?;

    Ok(Json(EscrowResponse::confirmed(created.receipt)))
}

/// `POST /escrow/finish`
pub async fn finish_escrow(
    State(state): State<Arc<AppState>>,
    EscrowJson(req): EscrowJson<SequenceRequest>,
) -> ApiResult<Json<EscrowResponse>> {
    let receipt = state.service.finish_escrow(req.escrow_sequence).await?;
    Ok(Json(EscrowResponse::confirmed(receipt)))
}

/// `POST /escrow/cancel`
pub async fn cancel_escrow(
    State(state): State<Arc<AppState>>,
    EscrowJson(req): EscrowJson<SequenceRequest>,
) -> ApiResult<Json<EscrowResponse>> {
    let receipt = state.service.cancel_escrow(req.escrow_sequence).await?;
    Ok(Json(EscrowResponse::confirmed(receipt)))
}

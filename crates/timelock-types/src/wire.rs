//! HTTP wire format shared by the API server and the client
//!
//! Bodies are JSON with camelCase keys. Every escrow response carries a
//! `success` flag; failures carry `error`, and client-side simulated
//! results carry `message`.

use crate::{EscrowReceipt, EscrowSequence};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// `POST /escrow/create`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEscrowRequest {
    /// Amount in XRP, sent as a JSON number
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(default)]
    pub invoice_id: String,
    pub refund_window_seconds: i64,
}

/// `POST /escrow/finish` and `POST /escrow/cancel`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceRequest {
    #[serde(default)]
    pub escrow_sequence: Option<i64>,
}

impl SequenceRequest {
    pub fn new(escrow_sequence: i64) -> Self {
        Self {
            escrow_sequence: Some(escrow_sequence),
        }
    }
}

/// Response body of every escrow endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscrowResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explorer_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escrow_sequence: Option<EscrowSequence>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl EscrowResponse {
    /// Successful response from a ledger receipt
    pub fn confirmed(receipt: EscrowReceipt) -> Self {
        Self {
            success: true,
            tx_hash: Some(receipt.tx_hash),
            explorer_url: Some(receipt.explorer_url),
            escrow_sequence: receipt.escrow_sequence,
            error: None,
            message: None,
        }
    }

    /// Failure response carrying an error message
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            tx_hash: None,
            explorer_url: None,
            escrow_sequence: None,
            error: Some(error.into()),
            message: None,
        }
    }

    /// Receipt view of a successful response
    pub fn receipt(&self) -> Option<EscrowReceipt> {
        if !self.success {
            return None;
        }
        Some(EscrowReceipt {
            tx_hash: self.tx_hash.clone()?,
            explorer_url: self.explorer_url.clone()?,
            escrow_sequence: self.escrow_sequence,
        })
    }
}

/// `GET /health`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub network: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub connected: bool,
}

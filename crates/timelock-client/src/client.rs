//! HTTP client for the escrow service
//!
//! Every call goes to the service first. Only when the service cannot be
//! reached at all does the client synthesize a simulated outcome; server
//! errors and timeouts are always surfaced.

use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, warn};

use timelock_types::{
    CreateEscrowRequest, DestinationTag, Drops, EscrowAction, EscrowResponse, EscrowSequence,
    HealthResponse, SequenceRequest, TimeWindow,
};

use crate::{simulate, ClientError, ClientResult, EscrowOutcome};

/// Default service address
pub const DEFAULT_SERVER_URL: &str = "http://localhost:3001";

/// Upper bound on a single call; ledger validation can take several ledgers
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(90);

const FALLBACK_ERROR_MESSAGE: &str = "Request failed";

/// Client that degrades to simulated results while the service is down
#[derive(Debug, Clone)]
pub struct ResilientApiClient {
    base_url: String,
    client: reqwest::Client,
    timeout: Duration,
    fallback: bool,
}

impl ResilientApiClient {
    /// Create a client for `base_url` with the default timeout
    pub fn new(base_url: &str) -> ClientResult<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> ClientResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout,
            fallback: true,
        })
    }

    /// Surface unreachable-service errors instead of simulating
    pub fn without_fallback(mut self) -> Self {
        self.fallback = false;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn fallback_enabled(&self) -> bool {
        self.fallback
    }

    /// Lock `amount` XRP for the seller.
    pub async fn create_escrow(
        &self,
        amount: Decimal,
        invoice_id: &str,
        refund_window_seconds: i64,
    ) -> ClientResult<EscrowOutcome> {
        Drops::from_xrp(amount)?;
        TimeWindow::compute(Utc::now().timestamp(), 0, refund_window_seconds)?;
        DestinationTag::from_invoice_id(invoice_id)?;

        let request = CreateEscrowRequest {
            amount,
            invoice_id: invoice_id.to_string(),
            refund_window_seconds,
        };
        self.request(EscrowAction::Create, &request).await
    }

    /// Release the escrow with `escrow_sequence` to the seller.
    pub async fn finish_escrow(&self, escrow_sequence: i64) -> ClientResult<EscrowOutcome> {
        EscrowSequence::parse(Some(escrow_sequence))?;
        self.request(EscrowAction::Finish, &SequenceRequest::new(escrow_sequence))
            .await
    }

    /// Refund the escrow with `escrow_sequence` to the buyer.
    pub async fn cancel_escrow(&self, escrow_sequence: i64) -> ClientResult<EscrowOutcome> {
        EscrowSequence::parse(Some(escrow_sequence))?;
        self.request(EscrowAction::Cancel, &SequenceRequest::new(escrow_sequence))
            .await
    }

    /// Query service health. Never simulated.
    pub async fn health(&self) -> ClientResult<HealthResponse> {
        let response = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))?;

        if !status.is_success() {
            return Err(ClientError::Api {
                status: status.as_u16(),
                message: error_message(&bytes),
            });
        }

        serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode(e.to_string()))
    }

    /// POST `payload` to the endpoint for `action`.
    pub async fn request<P: Serialize + ?Sized>(
        &self,
        action: EscrowAction,
        payload: &P,
    ) -> ClientResult<EscrowOutcome> {
        let url = format!("{}{}", self.base_url, action.path());
        debug!(action = %action, url = %url, "Sending escrow request");

        let response = match self.client.post(&url).json(payload).send().await {
            Ok(response) => response,
            Err(e) if self.fallback && is_unreachable(&e) => {
                warn!(action = %action, error = %e, "Service unreachable, simulating result");
                return Ok(simulate::simulated(action));
            }
            Err(e) => return Err(self.map_send_error(e)),
        };

        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                ClientError::Timeout(self.timeout)
            } else {
                ClientError::Decode(e.to_string())
            }
        })?;

        if !status.is_success() {
            return Err(ClientError::Api {
                status: status.as_u16(),
                message: error_message(&bytes),
            });
        }

        let body: EscrowResponse =
            serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode(e.to_string()))?;

        if !body.success {
            return Err(ClientError::Api {
                status: status.as_u16(),
                message: body
                    .error
                    .or(body.message)
                    .unwrap_or_else(|| FALLBACK_ERROR_MESSAGE.to_string()),
            });
        }

        body.receipt()
            .map(EscrowOutcome::Confirmed)
            .ok_or_else(|| ClientError::Decode("success response without a transaction hash".into()))
    }

    fn map_send_error(&self, e: reqwest::Error) -> ClientError {
        if e.is_timeout() {
            ClientError::Timeout(self.timeout)
        } else {
            ClientError::Transport(e.to_string())
        }
    }
}

/// Whether the request never reached a live service.
///
/// Only connection failures count. A timeout or a connection dropped after
/// the request was sent means the service may already have submitted the
/// transaction.
fn is_unreachable(e: &reqwest::Error) -> bool {
    e.is_connect() && !e.is_timeout()
}

/// `error`, then `message`, then a generic message.
fn error_message(bytes: &[u8]) -> String {
    serde_json::from_slice::<serde_json::Value>(bytes)
        .ok()
        .and_then(|body| {
            ["error", "message"]
                .iter()
                .find_map(|key| body.get(key).and_then(|v| v.as_str()).map(str::to_string))
        })
        .unwrap_or_else(|| FALLBACK_ERROR_MESSAGE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_precedence() {
        assert_eq!(error_message(br#"{"success":false,"error":"boom","message":"m"}"#), "boom");
        assert_eq!(error_message(br#"{"message":"only message"}"#), "only message");
        assert_eq!(error_message(br#"{"success":false}"#), "Request failed");
        assert_eq!(error_message(b"<html>bad gateway</html>"), "Request failed");
    }

    #[test]
    fn test_base_url_is_trimmed() {
        let client = ResilientApiClient::new("http://localhost:3001/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:3001");
        assert!(client.fallback_enabled());
        assert!(!client.without_fallback().fallback_enabled());
    }
}

//! API error handling
//!
//! Every failure is rendered as `{"success": false, "error": "..."}` with a
//! status that tells the caller who is at fault:
//!
//! | Error                         | Status |
//! |-------------------------------|--------|
//! | validation, malformed body    | 400    |
//! | ledger rejection              | 500    |
//! | ledger unreachable            | 502    |
//! | ledger timeout                | 504    |

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use timelock_types::{EscrowError, EscrowResponse};

/// API result type
pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Escrow(#[from] EscrowError),

    #[error("Invalid request body: {0}")]
    InvalidRequestBody(String),
}

impl ApiError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::Escrow(err) => match err {
                EscrowError::Validation(_) => StatusCode::BAD_REQUEST,
                EscrowError::Submission { .. } => StatusCode::INTERNAL_SERVER_ERROR,
                EscrowError::Transport(_) => StatusCode::BAD_GATEWAY,
                EscrowError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
                EscrowError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Stable error code for logs
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidRequestBody(_) => "INVALID_REQUEST_BODY",
            Self::Escrow(err) => err.error_code(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.error_code(), error = %self, "Request failed");
        } else {
            tracing::debug!(code = self.error_code(), error = %self, "Request rejected");
        }

        (status, Json(EscrowResponse::failure(self.to_string()))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use timelock_types::ValidationError;

    #[test]
    fn test_status_codes() {
        let cases = [
            (EscrowError::Validation(ValidationError::MissingSequence), StatusCode::BAD_REQUEST),
            (EscrowError::submission("tecNO_PERMISSION", "no"), StatusCode::INTERNAL_SERVER_ERROR),
            (EscrowError::Transport("down".into()), StatusCode::BAD_GATEWAY),
            (EscrowError::Timeout { after_secs: 60 }, StatusCode::GATEWAY_TIMEOUT),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status_code(), status);
        }
        assert_eq!(
            ApiError::InvalidRequestBody("eof".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_message_passes_through() {
        let err = ApiError::from(EscrowError::Validation(ValidationError::MissingSequence));
        assert_eq!(err.to_string(), "Escrow sequence required");

        let err = ApiError::from(EscrowError::submission(
            "tecNO_PERMISSION",
            "No permission to perform requested operation.",
        ));
        assert!(err.to_string().contains("tecNO_PERMISSION"));
    }
}

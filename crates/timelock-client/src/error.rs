//! Client errors

use std::time::Duration;
use thiserror::Error;
use timelock_types::{EscrowError, ValidationError};

#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// Input rejected before sending
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The service could not be reached and no fallback applies
    #[error("Service unreachable: {0}")]
    Transport(String),

    /// The service did not answer before the client deadline
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The service answered with an error
    #[error("{message} (HTTP {status})")]
    Api { status: u16, message: String },

    /// The service answered with something unreadable
    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl ClientError {
    /// Message shown to users and stored in the transaction log
    pub fn display_message(&self) -> String {
        match self {
            Self::Api { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<ClientError> for EscrowError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Validation(e) => EscrowError::Validation(e),
            ClientError::Transport(msg) => EscrowError::Transport(msg),
            ClientError::Timeout(after) => EscrowError::Timeout {
                after_secs: after.as_secs(),
            },
            ClientError::Api { status, message } => {
                EscrowError::submission(format!("HTTP {}", status), message)
            }
            ClientError::Decode(msg) => EscrowError::submission("decode", msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_message() {
        let err = ClientError::Api {
            status: 400,
            message: "Invalid amount: amount must be greater than zero".into(),
        };
        assert_eq!(err.display_message(), "Invalid amount: amount must be greater than zero");
        assert!(err.to_string().contains("HTTP 400"));
    }

    #[test]
    fn test_into_escrow_error() {
        let err: EscrowError = ClientError::Timeout(Duration::from_secs(90)).into();
        assert!(matches!(err, EscrowError::Timeout { after_secs: 90 }));

        let err: EscrowError = ClientError::Validation(ValidationError::MissingSequence).into();
        assert!(err.is_client_correctable());
    }
}

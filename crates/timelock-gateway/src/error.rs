//! Gateway errors
//!
//! Transport failures, ledger rejections and timeouts are distinct variants
//! so callers never have to inspect messages to tell them apart.

use std::time::Duration;
use thiserror::Error;
use timelock_types::EscrowError;

/// Gateway result type
pub type GatewayResult<T> = Result<T, GatewayError>;

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// The connection could not be opened or was lost
    #[error("Ledger transport failure: {0}")]
    Transport(String),

    /// A request was issued without an open connection
    #[error("Not connected to the ledger network")]
    NotConnected,

    /// The ledger refused or failed the transaction
    #[error("Ledger rejected transaction ({code}): {message}")]
    Rejected { code: String, message: String },

    /// The node answered a command with an error (e.g. `actNotFound`)
    #[error("Ledger request failed ({error}): {message}")]
    Request { error: String, message: String },

    /// The node sent something we could not interpret
    #[error("Malformed ledger response: {0}")]
    Protocol(String),

    /// A deadline elapsed
    #[error("Ledger operation timed out after {0:?}")]
    Timeout(Duration),
}

impl GatewayError {
    pub fn rejected(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rejected {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn protocol(reason: impl Into<String>) -> Self {
        Self::Protocol(reason.into())
    }

    /// True for failures of the connection itself
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::NotConnected)
    }

    /// Error code reported by the node, if any
    pub fn ledger_code(&self) -> Option<&str> {
        match self {
            Self::Rejected { code, .. } => Some(code),
            Self::Request { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl From<GatewayError> for EscrowError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Transport(msg) => EscrowError::Transport(msg),
            GatewayError::NotConnected => {
                EscrowError::Transport("not connected to the ledger network".to_string())
            }
            GatewayError::Rejected { code, message } => EscrowError::Submission { code, message },
            GatewayError::Request { error, message } => EscrowError::Submission {
                code: error,
                message,
            },
            GatewayError::Protocol(msg) => EscrowError::Submission {
                code: "malformedResponse".to_string(),
                message: msg,
            },
            GatewayError::Timeout(after) => EscrowError::Timeout {
                after_secs: after.as_secs(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion_keeps_kinds_apart() {
        let err: EscrowError = GatewayError::Transport("refused".into()).into();
        assert!(matches!(err, EscrowError::Transport(_)));

        let err: EscrowError = GatewayError::rejected("tecNO_PERMISSION", "too early").into();
        match err {
            EscrowError::Submission { code, message } => {
                assert_eq!(code, "tecNO_PERMISSION");
                assert_eq!(message, "too early");
            }
            other => panic!("unexpected {:?}", other),
        }

        let err: EscrowError = GatewayError::Timeout(Duration::from_secs(60)).into();
        assert!(matches!(err, EscrowError::Timeout { after_secs: 60 }));
    }

    #[test]
    fn test_is_transport() {
        assert!(GatewayError::NotConnected.is_transport());
        assert!(!GatewayError::rejected("tefPAST_SEQ", "").is_transport());
    }
}

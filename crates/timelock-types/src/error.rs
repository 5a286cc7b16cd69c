//! Error types for Timelock
//!
//! Four kinds of failure are kept structurally apart: validation (the caller
//! can fix the input), submission (the ledger said no), transport (nothing
//! could be reached) and timeout (the ledger did not answer in time).

use thiserror::Error;

/// Result type for Timelock operations
pub type Result<T> = std::result::Result<T, EscrowError>;

/// Input problems detected before any network call is made
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Amount is zero, negative, or not representable in drops
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Refund window is zero or negative
    #[error("Invalid refund window: {0}")]
    InvalidWindow(String),

    /// Escrow sequence was absent or non-positive
    #[error("Escrow sequence required")]
    MissingSequence,

    /// Invoice id yields a destination tag wider than the ledger allows
    #[error("Invalid invoice id: {0}")]
    InvalidInvoiceId(String),

    /// Account address is malformed
    #[error("Invalid account address: {0}")]
    InvalidAddress(String),
}

/// Timelock error taxonomy
#[derive(Debug, Clone, Error)]
pub enum EscrowError {
    // ========================================================================
    // Client-correctable
    // ========================================================================

    /// Request failed validation
    #[error(transparent)]
    Validation(#[from] ValidationError),

    // ========================================================================
    // Ledger outcomes
    // ========================================================================

    /// The ledger rejected the transaction (premature finish/cancel,
    /// already-resolved escrow, insufficient funds, ...)
    #[error("{message} ({code})")]
    Submission { code: String, message: String },

    /// The ledger network (or the service, seen from a client) was unreachable
    #[error("Ledger unreachable: {0}")]
    Transport(String),

    /// Submission exceeded its deadline
    #[error("Submission timed out after {after_secs}s")]
    Timeout { after_secs: u64 },

    // ========================================================================
    // Startup
    // ========================================================================

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl EscrowError {
    /// Create a submission error
    pub fn submission(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Submission {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration(reason.into())
    }

    /// Whether the caller can fix the request and try again
    pub fn is_client_correctable(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Get an error code for API responses and logs
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(ValidationError::InvalidAmount(_)) => "INVALID_AMOUNT",
            Self::Validation(ValidationError::InvalidWindow(_)) => "INVALID_WINDOW",
            Self::Validation(ValidationError::MissingSequence) => "MISSING_SEQUENCE",
            Self::Validation(ValidationError::InvalidInvoiceId(_)) => "INVALID_INVOICE_ID",
            Self::Validation(ValidationError::InvalidAddress(_)) => "INVALID_ADDRESS",
            Self::Submission { .. } => "SUBMISSION_REJECTED",
            Self::Transport(_) => "TRANSPORT_FAILURE",
            Self::Timeout { .. } => "TIMEOUT",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err: EscrowError = ValidationError::MissingSequence.into();
        assert_eq!(err.error_code(), "MISSING_SEQUENCE");
        assert!(err.is_client_correctable());

        let err = EscrowError::submission("tecNO_PERMISSION", "No permission");
        assert_eq!(err.error_code(), "SUBMISSION_REJECTED");
        assert!(!err.is_client_correctable());
    }

    #[test]
    fn test_submission_message_passes_through() {
        let err = EscrowError::submission("tecNO_TARGET", "Escrow not found");
        assert_eq!(err.to_string(), "Escrow not found (tecNO_TARGET)");
    }

    #[test]
    fn test_validation_is_transparent() {
        let err: EscrowError = ValidationError::InvalidAmount("must be positive".into()).into();
        assert_eq!(err.to_string(), "Invalid amount: must be positive");
    }
}

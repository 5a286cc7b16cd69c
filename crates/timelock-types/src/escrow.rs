//! Escrow types for Timelock
//!
//! An escrow is a conditional, time-bounded payment held by the ledger until
//! it is released to the destination (finish) or refunded to the owner
//! (cancel). Nothing here is persisted; the ledger is the source of truth.

use crate::{AccountAddress, Drops, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default grace period before a release is permitted, in seconds
pub const DEFAULT_GRACE_PERIOD_SECS: i64 = 10;

/// Maximum number of invoice digits used for the destination tag
pub const MAX_TAG_DIGITS: usize = 10;

// ============================================================================
// Actions and Status
// ============================================================================

/// The three escrow operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EscrowAction {
    Create,
    Finish,
    Cancel,
}

impl EscrowAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Finish => "finish",
            Self::Cancel => "cancel",
        }
    }

    /// HTTP path of the service endpoint for this action
    pub fn path(&self) -> &'static str {
        match self {
            Self::Create => "/escrow/create",
            Self::Finish => "/escrow/finish",
            Self::Cancel => "/escrow/cancel",
        }
    }
}

impl fmt::Display for EscrowAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Projection of an escrow's state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EscrowStatus {
    /// Funds are locked on the ledger
    Pending,
    /// Funds released to the destination
    Finished,
    /// Funds refunded to the owner
    Cancelled,
}

impl EscrowStatus {
    /// Check if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Cancelled)
    }

    /// State after applying `action`, or `None` if the transition is not allowed.
    ///
    /// `Pending` is the only state with outgoing transitions.
    pub fn apply(&self, action: EscrowAction) -> Option<EscrowStatus> {
        match (self, action) {
            (Self::Pending, EscrowAction::Finish) => Some(Self::Finished),
            (Self::Pending, EscrowAction::Cancel) => Some(Self::Cancelled),
            _ => None,
        }
    }
}

// ============================================================================
// Time Window
// ============================================================================

/// Absolute release and refund times of an escrow (Unix seconds)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeWindow {
    /// Earliest time the escrow may be finished
    pub finish_after: i64,
    /// Earliest time the escrow may be cancelled
    pub cancel_after: i64,
}

impl TimeWindow {
    /// Compute the window for an escrow created at `now`.
    ///
    /// `finish_after = now + grace_period_secs`,
    /// `cancel_after = now + refund_window_secs`.
    pub fn compute(
        now: i64,
        grace_period_secs: i64,
        refund_window_secs: i64,
    ) -> Result<Self, ValidationError> {
        if refund_window_secs <= 0 {
            return Err(ValidationError::InvalidWindow(
                "refund window must be greater than zero".to_string(),
            ));
        }

        let cancel_after = now.checked_add(refund_window_secs).ok_or_else(|| {
            ValidationError::InvalidWindow(format!("{} seconds is out of range", refund_window_secs))
        })?;

        Ok(Self {
            finish_after: now + grace_period_secs,
            cancel_after,
        })
    }

    /// Whether release strictly precedes refund
    pub fn is_ordered(&self) -> bool {
        self.finish_after < self.cancel_after
    }

    pub fn finish_after_ledger(&self) -> u32 {
        crate::to_ledger_time(self.finish_after)
    }

    pub fn cancel_after_ledger(&self) -> u32 {
        crate::to_ledger_time(self.cancel_after)
    }
}

// ============================================================================
// Destination Tag
// ============================================================================

/// Routing tag derived from an invoice identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DestinationTag(pub u32);

impl DestinationTag {
    /// Derive a tag from the digits of an invoice id.
    ///
    /// Keeps the first ten digit characters and parses them. No digits, or
    /// a value of zero, yields tag `1`. Values wider than 32 bits are
    /// rejected since the ledger cannot carry them.
    pub fn from_invoice_id(invoice_id: &str) -> Result<Self, ValidationError> {
        let digits: String = invoice_id
            .chars()
            .filter(|c| c.is_ascii_digit())
            .take(MAX_TAG_DIGITS)
            .collect();

        if digits.is_empty() {
            return Ok(Self(1));
        }

        // Ten digits always fit in a u64.
        let value: u64 = digits.parse().unwrap_or(0);
        match u32::try_from(value) {
            Ok(0) => Ok(Self(1)),
            Ok(tag) => Ok(Self(tag)),
            Err(_) => Err(ValidationError::InvalidInvoiceId(format!(
                "{} yields tag {} which exceeds {}",
                invoice_id,
                value,
                u32::MAX
            ))),
        }
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

// ============================================================================
// Escrow Sequence
// ============================================================================

/// Ledger-assigned escrow handle (the create transaction's sequence)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EscrowSequence(pub u32);

impl EscrowSequence {
    /// Validate a caller-supplied sequence: present, positive and 32-bit.
    pub fn parse(raw: Option<i64>) -> Result<Self, ValidationError> {
        match raw {
            Some(n) if n > 0 => u32::try_from(n)
                .map(Self)
                .map_err(|_| ValidationError::MissingSequence),
            _ => Err(ValidationError::MissingSequence),
        }
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for EscrowSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Escrow
// ============================================================================

/// An escrow as created by this system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Escrow {
    /// Account that funded the escrow (the owner)
    pub source_account: AccountAddress,
    /// Account that receives the funds on finish
    pub destination_account: AccountAddress,
    pub amount: Drops,
    pub window: TimeWindow,
    pub destination_tag: DestinationTag,
    pub sequence: EscrowSequence,
    pub status: EscrowStatus,
}

/// Normalized result of a confirmed escrow operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscrowReceipt {
    pub tx_hash: String,
    pub explorer_url: String,
    /// Only present for create
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escrow_sequence: Option<EscrowSequence>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destination_tag_from_invoice() {
        assert_eq!(DestinationTag::from_invoice_id("INV-12345").unwrap().value(), 12345);
        assert_eq!(DestinationTag::from_invoice_id("NODIGITS").unwrap().value(), 1);
        assert_eq!(DestinationTag::from_invoice_id("").unwrap().value(), 1);
        assert_eq!(DestinationTag::from_invoice_id("INV-000").unwrap().value(), 1);
    }

    #[test]
    fn test_destination_tag_uses_first_ten_digits() {
        let tag = DestinationTag::from_invoice_id("INV-1700000000000").unwrap();
        assert_eq!(tag.value(), 1_700_000_000);

        let tag = DestinationTag::from_invoice_id("A1B2C3D4E5F6G7H8I9J0K1L2").unwrap();
        assert_eq!(tag.value(), 1_234_567_890);
    }

    #[test]
    fn test_destination_tag_rejects_wide_values() {
        assert!(matches!(
            DestinationTag::from_invoice_id("INV-9999999999"),
            Err(ValidationError::InvalidInvoiceId(_))
        ));
    }

    #[test]
    fn test_time_window() {
        let window = TimeWindow::compute(1_000, 10, 120).unwrap();
        assert_eq!(window.finish_after, 1_010);
        assert_eq!(window.cancel_after, 1_120);
        assert!(window.is_ordered());

        let short = TimeWindow::compute(1_000, 10, 5).unwrap();
        assert!(!short.is_ordered());
    }

    #[test]
    fn test_time_window_rejects_non_positive() {
        assert!(matches!(
            TimeWindow::compute(1_000, 10, 0),
            Err(ValidationError::InvalidWindow(_))
        ));
        assert!(TimeWindow::compute(1_000, 10, -30).is_err());
    }

    #[test]
    fn test_escrow_sequence_parse() {
        assert_eq!(EscrowSequence::parse(Some(42)).unwrap().value(), 42);
        assert_eq!(EscrowSequence::parse(None), Err(ValidationError::MissingSequence));
        assert_eq!(EscrowSequence::parse(Some(0)), Err(ValidationError::MissingSequence));
        assert_eq!(EscrowSequence::parse(Some(-7)), Err(ValidationError::MissingSequence));
        assert!(EscrowSequence::parse(Some(i64::from(u32::MAX) + 1)).is_err());
    }

    #[test]
    fn test_status_transitions() {
        let pending = EscrowStatus::Pending;
        assert_eq!(pending.apply(EscrowAction::Finish), Some(EscrowStatus::Finished));
        assert_eq!(pending.apply(EscrowAction::Cancel), Some(EscrowStatus::Cancelled));
        assert_eq!(pending.apply(EscrowAction::Create), None);

        let finished = EscrowStatus::Finished;
        assert!(finished.is_terminal());
        assert_eq!(finished.apply(EscrowAction::Cancel), None);
        assert_eq!(EscrowStatus::Cancelled.apply(EscrowAction::Finish), None);
    }

    #[test]
    fn test_action_paths() {
        assert_eq!(EscrowAction::Create.path(), "/escrow/create");
        assert_eq!(EscrowAction::Cancel.to_string(), "cancel");
    }
}

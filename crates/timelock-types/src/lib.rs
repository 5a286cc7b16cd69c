//! Timelock Types - Canonical domain types for time-locked escrow
//!
//! This crate contains the foundational types shared by every Timelock crate
//! with zero dependencies on the others. It defines:
//!
//! - Native asset amounts (XRP and drops)
//! - Ledger account addresses and signing credentials
//! - Escrow time windows, destination tags and escrow sequences
//! - The three ledger transaction shapes (create/finish/cancel)
//! - Network endpoints and explorer links
//! - The HTTP wire format shared by the API and the client
//! - The error taxonomy
//!
//! # Escrow Lifecycle
//!
//! ```text
//! Created ──finish (after FinishAfter)──▶ Finished
//!    │
//!    └────cancel (after CancelAfter)───▶ Cancelled
//! ```
//!
//! Both outcomes are terminal. The ledger, not this system, is authoritative.

pub mod amount;
pub mod credential;
pub mod escrow;
pub mod network;
pub mod transaction;
pub mod wire;
pub mod error;

pub use amount::*;
pub use credential::*;
pub use escrow::*;
pub use network::*;
pub use transaction::*;
pub use wire::*;
pub use error::*;

/// Seconds between the Unix epoch and the ledger epoch (2000-01-01T00:00:00Z)
pub const LEDGER_EPOCH_OFFSET: i64 = 946_684_800;

/// Convert a Unix timestamp (seconds) into ledger epoch seconds.
///
/// Times before the ledger epoch saturate to zero and times past the
/// representable range saturate to `u32::MAX`.
pub fn to_ledger_time(unix_secs: i64) -> u32 {
    let ledger = unix_secs - LEDGER_EPOCH_OFFSET;
    ledger.clamp(0, u32::MAX as i64) as u32
}

/// Convert ledger epoch seconds back into a Unix timestamp.
pub fn from_ledger_time(ledger_secs: u32) -> i64 {
    ledger_secs as i64 + LEDGER_EPOCH_OFFSET
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_time_conversion() {
        assert_eq!(to_ledger_time(LEDGER_EPOCH_OFFSET), 0);
        assert_eq!(to_ledger_time(1_700_000_000), 753_315_200);
        assert_eq!(from_ledger_time(753_315_200), 1_700_000_000);
    }

    #[test]
    fn test_ledger_time_saturates() {
        assert_eq!(to_ledger_time(0), 0);
        assert_eq!(to_ledger_time(i64::MAX), u32::MAX);
    }
}

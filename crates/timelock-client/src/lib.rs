//! Timelock Client
//!
//! HTTP client for the escrow service, with a simulated fallback for when
//! the service is unreachable, and a bounded log of recent calls.
//!
//! ```rust,no_run
//! use rust_decimal::Decimal;
//! use timelock_client::ResilientApiClient;
//!
//! # async fn run() -> Result<(), timelock_client::ClientError> {
//! let client = ResilientApiClient::new("http://localhost:3001")?;
//! let outcome = client.create_escrow(Decimal::TEN, "INV-1001", 120).await?;
//! if outcome.is_simulated() {
//!     println!("service offline: {}", outcome.note().unwrap_or_default());
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod display;
pub mod error;
pub mod log;
pub mod outcome;
pub mod simulate;

pub use client::{ResilientApiClient, DEFAULT_SERVER_URL, DEFAULT_TIMEOUT};
pub use error::ClientError;
pub use log::{EntryStatus, TransactionLog, TransactionLogEntry, MAX_LOG_ENTRIES};
pub use outcome::EscrowOutcome;

pub type ClientResult<T> = Result<T, ClientError>;

//! Timelock Service - Escrow lifecycle orchestration
//!
//! `EscrowLifecycleService` turns the three escrow operations into ledger
//! transactions, hands them to the shared [`TransactionGateway`], and
//! normalizes the outcome into an [`EscrowReceipt`].
//!
//! | Operation | Submitted by | Owner  | Ledger precondition  |
//! |-----------|--------------|--------|----------------------|
//! | create    | buyer        | buyer  | funded buyer         |
//! | finish    | seller       | buyer  | time ≥ FinishAfter   |
//! | cancel    | buyer        | buyer  | time ≥ CancelAfter   |
//!
//! Inputs are validated before the gateway is touched. Time preconditions
//! are left to the ledger, which is authoritative.

pub mod clock;
pub mod config;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::EscrowConfig;

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{error, info, instrument, warn};

use timelock_gateway::TransactionGateway;
use timelock_types::{
    Credential, DestinationTag, Drops, Escrow, EscrowAction, EscrowCancel, EscrowCreate,
    EscrowError, EscrowFinish, EscrowReceipt, EscrowSequence, EscrowStatus, FinalizedTransaction,
    LedgerTransaction, PreparedTransaction, Result, TimeWindow,
};

/// Counter of escrow submissions, labelled by `action` and `outcome`
pub const SUBMISSIONS_TOTAL: &str = "timelock_submissions_total";

/// A newly created escrow and the receipt of its create transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedEscrow {
    pub escrow: Escrow,
    pub receipt: EscrowReceipt,
}

/// Connection status reported by the health endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceHealth {
    pub network: String,
    pub connected: bool,
}

/// Orchestrates escrow create/finish/cancel against the ledger
pub struct EscrowLifecycleService {
    gateway: Arc<TransactionGateway>,
    config: EscrowConfig,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for EscrowLifecycleService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EscrowLifecycleService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl EscrowLifecycleService {
    pub fn new(gateway: Arc<TransactionGateway>, config: EscrowConfig) -> Self {
        Self {
            gateway,
            config,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the time source used for escrow windows
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &EscrowConfig {
        &self.config
    }

    pub fn gateway(&self) -> &Arc<TransactionGateway> {
        &self.gateway
    }

    // ========================================================================
    // Operations
    // ========================================================================

    /// Lock `amount` XRP from the buyer for the seller.
    ///
    /// The escrow may be finished `grace_period_secs` after creation and
    /// cancelled `refund_window_secs` after creation. The returned sequence
    /// is the handle for both.
    #[instrument(skip(self), fields(action = "create"))]
    pub async fn create_escrow(
        &self,
        amount: Decimal,
        invoice_id: &str,
        refund_window_secs: i64,
    ) -> Result<CreatedEscrow> {
        let (amount, window, tag) = self
            .validate_create(amount, invoice_id, refund_window_secs)
            .map_err(|e| rejected_input(EscrowAction::Create, e))?;

        if !window.is_ordered() {
            warn!(
                refund_window_secs,
                grace_period_secs = self.config.grace_period_secs,
                "Refund window does not exceed the grace period"
            );
        }

        let buyer = &self.config.buyer;
        let tx = LedgerTransaction::EscrowCreate(EscrowCreate {
            account: buyer.address.clone(),
            destination: self.config.seller.address.clone(),
            amount,
            finish_after: window.finish_after_ledger(),
            cancel_after: window.cancel_after_ledger(),
            destination_tag: tag.value(),
        });

        let (prepared, finalized) = self.submit(EscrowAction::Create, tx, buyer).await?;
        let sequence = EscrowSequence(prepared.sequence());

        info!(
            sequence = %sequence,
            tx_hash = %finalized.hash,
            amount_drops = amount.as_u64(),
            destination_tag = tag.value(),
            "Escrow created"
        );

        Ok(CreatedEscrow {
            escrow: Escrow {
                source_account: buyer.address.clone(),
                destination_account: self.config.seller.address.clone(),
                amount,
                window,
                destination_tag: tag,
                sequence,
                status: EscrowStatus::Pending,
            },
            receipt: self.receipt(&finalized, Some(sequence)),
        })
    }

    /// Release the escrow identified by `sequence` to the seller.
    #[instrument(skip(self), fields(action = "finish"))]
    pub async fn finish_escrow(&self, sequence: Option<i64>) -> Result<EscrowReceipt> {
        let sequence = EscrowSequence::parse(sequence)
            .map_err(|e| rejected_input(EscrowAction::Finish, e.into()))?;

        let tx = LedgerTransaction::EscrowFinish(EscrowFinish {
            account: self.config.seller.address.clone(),
            owner: self.config.buyer.address.clone(),
            offer_sequence: sequence,
        });

        let (_, finalized) = self
            .submit(EscrowAction::Finish, tx, &self.config.seller)
            .await?;
        info!(sequence = %sequence, tx_hash = %finalized.hash, "Escrow finished");
        Ok(self.receipt(&finalized, None))
    }

    /// Refund the escrow identified by `sequence` to the buyer.
    #[instrument(skip(self), fields(action = "cancel"))]
    pub async fn cancel_escrow(&self, sequence: Option<i64>) -> Result<EscrowReceipt> {
        let sequence = EscrowSequence::parse(sequence)
            .map_err(|e| rejected_input(EscrowAction::Cancel, e.into()))?;

        let tx = LedgerTransaction::EscrowCancel(EscrowCancel {
            account: self.config.buyer.address.clone(),
            owner: self.config.buyer.address.clone(),
            offer_sequence: sequence,
        });

        let (_, finalized) = self
            .submit(EscrowAction::Cancel, tx, &self.config.buyer)
            .await?;
        info!(sequence = %sequence, tx_hash = %finalized.hash, "Escrow cancelled");
        Ok(self.receipt(&finalized, None))
    }

    pub async fn health(&self) -> ServiceHealth {
        ServiceHealth {
            network: self.gateway.endpoint().kind.as_str().to_string(),
            connected: self.gateway.is_connected().await,
        }
    }

    /// Close the ledger connection
    pub async fn shutdown(&self) -> Result<()> {
        self.gateway.disconnect().await?;
        Ok(())
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn validate_create(
        &self,
        amount: Decimal,
        invoice_id: &str,
        refund_window_secs: i64,
    ) -> Result<(Drops, TimeWindow, DestinationTag)> {
        let amount = Drops::from_xrp(amount)?;
        let window = TimeWindow::compute(
            self.clock.now(),
            self.config.grace_period_secs,
            refund_window_secs,
        )?;
        let tag = DestinationTag::from_invoice_id(invoice_id)?;
        Ok((amount, window, tag))
    }

    async fn submit(
        &self,
        action: EscrowAction,
        tx: LedgerTransaction,
        credential: &Credential,
    ) -> Result<(PreparedTransaction, FinalizedTransaction)> {
        let result = self
            .gateway
            .execute(tx, credential)
            .await
            .map_err(EscrowError::from);

        match &result {
            Ok(_) => record(action, "success"),
            Err(err) => {
                error!(action = %action, code = err.error_code(), error = %err, "Escrow submission failed");
                record(action, outcome_label(err));
            }
        }
        result
    }

    fn receipt(&self, finalized: &FinalizedTransaction, sequence: Option<EscrowSequence>) -> EscrowReceipt {
        EscrowReceipt {
            tx_hash: finalized.hash.clone(),
            explorer_url: self.gateway.endpoint().explorer_url(&finalized.hash),
            escrow_sequence: sequence,
        }
    }
}

fn outcome_label(err: &EscrowError) -> &'static str {
    match err {
        EscrowError::Validation(_) => "invalid",
        EscrowError::Submission { .. } => "rejected",
        EscrowError::Transport(_) => "unreachable",
        EscrowError::Timeout { .. } => "timeout",
        EscrowError::Configuration(_) => "error",
    }
}

fn rejected_input(action: EscrowAction, err: EscrowError) -> EscrowError {
    warn!(action = %action, error = %err, "Rejected escrow request");
    record(action, "invalid");
    err
}

fn record(action: EscrowAction, outcome: &'static str) {
    metrics::counter!(SUBMISSIONS_TOTAL, "action" => action.as_str(), "outcome" => outcome)
        .increment(1);
}

//! Bounded, newest-first record of recent escrow calls

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;
use timelock_types::{EscrowAction, EscrowSequence};

use crate::{ClientError, EscrowOutcome};

/// Entries kept before the oldest is evicted
pub const MAX_LOG_ENTRIES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionLogEntry {
    /// `<action>-<unix millis>-<counter>`
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub action: EscrowAction,
    pub status: EntryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explorer_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escrow_sequence: Option<EscrowSequence>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub simulated: bool,
}

impl TransactionLogEntry {
    pub fn is_success(&self) -> bool {
        self.status == EntryStatus::Success
    }
}

#[derive(Debug, Clone, Default)]
pub struct TransactionLog {
    entries: VecDeque<TransactionLogEntry>,
    recorded: u64,
}

impl TransactionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the result of `action`, evicting the oldest entry when full.
    pub fn record(
        &mut self,
        action: EscrowAction,
        result: &Result<EscrowOutcome, ClientError>,
    ) -> &TransactionLogEntry {
        let timestamp = Utc::now();
        self.recorded += 1;
        let id = format!(
            "{}-{}-{}",
            action,
            timestamp.timestamp_millis(),
            self.recorded
        );

        let entry = match result {
            Ok(outcome) => {
                let receipt = outcome.receipt();
                TransactionLogEntry {
                    id,
                    timestamp,
                    action,
                    status: EntryStatus::Success,
                    tx_hash: Some(receipt.tx_hash.clone()),
                    explorer_url: Some(receipt.explorer_url.clone()),
                    escrow_sequence: receipt.escrow_sequence,
                    error: None,
                    simulated: outcome.is_simulated(),
                }
            }
            Err(err) => TransactionLogEntry {
                id,
                timestamp,
                action,
                status: EntryStatus::Error,
                tx_hash: None,
                explorer_url: None,
                escrow_sequence: None,
                error: Some(err.display_message()),
                simulated: false,
            },
        };

        self.entries.push_front(entry);
        self.entries.truncate(MAX_LOG_ENTRIES);
        &self.entries[0]
    }

    /// Entries, newest first
    pub fn entries(&self) -> impl Iterator<Item = &TransactionLogEntry> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&TransactionLogEntry> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulate::simulated;
    use timelock_types::ValidationError;

    #[test]
    fn test_keeps_five_newest() {
        let mut log = TransactionLog::new();
        let mut hashes = Vec::new();
        for _ in 0..7 {
            let outcome = simulated(EscrowAction::Create);
            hashes.push(outcome.tx_hash().to_string());
            log.record(EscrowAction::Create, &Ok(outcome));
        }

        assert_eq!(log.len(), MAX_LOG_ENTRIES);
        let logged: Vec<_> = log.entries().map(|e| e.tx_hash.clone().unwrap()).collect();
        let expected: Vec<_> = hashes.iter().rev().take(5).cloned().collect();
        assert_eq!(logged, expected);
    }

    #[test]
    fn test_records_errors() {
        let mut log = TransactionLog::new();
        let entry = log
            .record(
                EscrowAction::Finish,
                &Err(ClientError::Validation(ValidationError::MissingSequence)),
            )
            .clone();

        assert!(!entry.is_success());
        assert!(!entry.simulated);
        assert_eq!(entry.error.as_deref(), Some("Escrow sequence required"));
        assert!(entry.id.starts_with("finish-"));
        assert!(entry.tx_hash.is_none());
    }

    #[test]
    fn test_ids_are_unique() {
        let mut log = TransactionLog::new();
        log.record(EscrowAction::Cancel, &Ok(simulated(EscrowAction::Cancel)));
        log.record(EscrowAction::Cancel, &Ok(simulated(EscrowAction::Cancel)));

        let ids: Vec<_> = log.entries().map(|e| e.id.clone()).collect();
        assert_ne!(ids[0], ids[1]);
        assert!(log.latest().unwrap().simulated);
    }
}

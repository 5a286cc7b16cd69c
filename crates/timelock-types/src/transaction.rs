//! Ledger transaction shapes
//!
//! These serialize to the JSON form ledger nodes accept as `tx_json`.
//! A transaction moves through three stages on its way to the ledger:
//!
//! ```text
//! LedgerTransaction → PreparedTransaction → SignedTransaction → FinalizedTransaction
//!   (built locally)     (fee/sequence)        (blob + hash)        (validated result)
//! ```

use crate::{AccountAddress, Drops, EscrowAction, EscrowSequence};
use serde::{Deserialize, Serialize};

/// Lock funds until a release or refund time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EscrowCreate {
    pub account: AccountAddress,
    pub destination: AccountAddress,
    pub amount: Drops,
    /// Ledger epoch seconds
    pub finish_after: u32,
    /// Ledger epoch seconds
    pub cancel_after: u32,
    pub destination_tag: u32,
}

/// Release escrowed funds to the destination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EscrowFinish {
    pub account: AccountAddress,
    pub owner: AccountAddress,
    pub offer_sequence: EscrowSequence,
}

/// Return escrowed funds to the owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EscrowCancel {
    pub account: AccountAddress,
    pub owner: AccountAddress,
    pub offer_sequence: EscrowSequence,
}

/// A transaction as built by the escrow service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "TransactionType")]
pub enum LedgerTransaction {
    EscrowCreate(EscrowCreate),
    EscrowFinish(EscrowFinish),
    EscrowCancel(EscrowCancel),
}

impl LedgerTransaction {
    /// Account that submits (and pays the fee for) the transaction
    pub fn account(&self) -> &AccountAddress {
        match self {
            Self::EscrowCreate(tx) => &tx.account,
            Self::EscrowFinish(tx) => &tx.account,
            Self::EscrowCancel(tx) => &tx.account,
        }
    }

    pub fn action(&self) -> EscrowAction {
        match self {
            Self::EscrowCreate(_) => EscrowAction::Create,
            Self::EscrowFinish(_) => EscrowAction::Finish,
            Self::EscrowCancel(_) => EscrowAction::Cancel,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::EscrowCreate(_) => "EscrowCreate",
            Self::EscrowFinish(_) => "EscrowFinish",
            Self::EscrowCancel(_) => "EscrowCancel",
        }
    }

    /// Escrow referenced by a finish or cancel
    pub fn offer_sequence(&self) -> Option<EscrowSequence> {
        match self {
            Self::EscrowCreate(_) => None,
            Self::EscrowFinish(tx) => Some(tx.offer_sequence),
            Self::EscrowCancel(tx) => Some(tx.offer_sequence),
        }
    }
}

/// Network-assigned fields the ledger requires before signing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AutofillFields {
    pub sequence: u32,
    pub fee: Drops,
    pub last_ledger_sequence: u32,
}

/// A transaction with fee, sequence and expiry filled in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreparedTransaction {
    #[serde(flatten)]
    pub transaction: LedgerTransaction,
    #[serde(flatten)]
    pub autofill: AutofillFields,
}

impl PreparedTransaction {
    pub fn new(transaction: LedgerTransaction, autofill: AutofillFields) -> Self {
        Self { transaction, autofill }
    }

    pub fn sequence(&self) -> u32 {
        self.autofill.sequence
    }

    pub fn last_ledger_sequence(&self) -> u32 {
        self.autofill.last_ledger_sequence
    }

    /// JSON form sent to the ledger as `tx_json`
    pub fn to_tx_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}

/// A signed transaction ready for submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    /// Hex-encoded signed blob
    pub tx_blob: String,
    /// Transaction hash (64 hex characters)
    pub hash: String,
    pub last_ledger_sequence: u32,
}

/// Outcome of a transaction that reached a validated ledger with `tesSUCCESS`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizedTransaction {
    pub hash: String,
    pub ledger_index: u32,
    pub result: String,
}

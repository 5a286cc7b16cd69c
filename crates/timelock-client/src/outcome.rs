//! Result of an escrow call made through the client

use serde::{Deserialize, Serialize};
use timelock_types::{EscrowReceipt, EscrowSequence};

/// Either a receipt from the service or a stand-in produced while the
/// service was unreachable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum EscrowOutcome {
    /// The service confirmed the operation on the ledger
    Confirmed(EscrowReceipt),
    /// Synthesized locally; nothing reached the ledger
    Simulated { receipt: EscrowReceipt, note: String },
}

impl EscrowOutcome {
    pub fn receipt(&self) -> &EscrowReceipt {
        match self {
            Self::Confirmed(receipt) => receipt,
            Self::Simulated { receipt, .. } => receipt,
        }
    }

    pub fn is_simulated(&self) -> bool {
        matches!(self, Self::Simulated { .. })
    }

    pub fn note(&self) -> Option<&str> {
        match self {
            Self::Confirmed(_) => None,
            Self::Simulated { note, .. } => Some(note),
        }
    }

    pub fn tx_hash(&self) -> &str {
        &self.receipt().tx_hash
    }

    pub fn escrow_sequence(&self) -> Option<EscrowSequence> {
        self.receipt().escrow_sequence
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn receipt() -> EscrowReceipt {
        EscrowReceipt {
            tx_hash: "9F4E8DABC".into(),
            explorer_url: "https://testnet.xrpl.org/transactions/9F4E8DABC".into(),
            escrow_sequence: Some(EscrowSequence(12345)),
        }
    }

    #[test]
    fn test_tagged_serialization() {
        let outcome = EscrowOutcome::Simulated {
            receipt: receipt(),
            note: "offline".into(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["mode"], "simulated");
        assert_eq!(json["note"], "offline");

        let json = serde_json::to_value(EscrowOutcome::Confirmed(receipt())).unwrap();
        assert_eq!(json["mode"], "confirmed");
        assert_eq!(json["txHash"], "9F4E8DABC");
    }

    #[test]
    fn test_accessors() {
        let outcome = EscrowOutcome::Confirmed(receipt());
        assert!(!outcome.is_simulated());
        assert_eq!(outcome.note(), None);
        assert_eq!(outcome.escrow_sequence(), Some(EscrowSequence(12345)));
    }
}

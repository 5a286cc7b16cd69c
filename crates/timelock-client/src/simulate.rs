//! Stand-in receipts for when the service is unreachable
//!
//! Hashes start with `9F4E8D` so they are recognizable at a glance and
//! never collide with the 64-character hashes the ledger produces.

use rand::Rng;
use timelock_types::{explorer_url, EscrowAction, EscrowReceipt, EscrowSequence, NetworkKind};

use crate::EscrowOutcome;

/// Prefix of every simulated transaction hash
pub const SIMULATED_HASH_PREFIX: &str = "9F4E8D";

/// Range of simulated escrow sequences
pub const SIMULATED_SEQUENCE_RANGE: std::ops::RangeInclusive<u32> = 10_000..=99_999;

const HASH_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const HASH_SUFFIX_LEN: usize = 13;

/// Build a simulated outcome for `action`.
pub fn simulate<R: Rng + ?Sized>(action: EscrowAction, rng: &mut R) -> EscrowOutcome {
    let suffix: String = (0..HASH_SUFFIX_LEN)
        .map(|_| HASH_ALPHABET[rng.gen_range(0..HASH_ALPHABET.len())] as char)
        .collect();
    let tx_hash = format!("{}{}", SIMULATED_HASH_PREFIX, suffix);

    let escrow_sequence = match action {
        EscrowAction::Create => Some(EscrowSequence(rng.gen_range(SIMULATED_SEQUENCE_RANGE))),
        EscrowAction::Finish | EscrowAction::Cancel => None,
    };

    let note = match action {
        EscrowAction::Create => "Demo mode: Escrow created (backend offline)",
        EscrowAction::Finish => "Demo mode: Escrow finished (backend offline)",
        EscrowAction::Cancel => "Demo mode: Escrow cancelled (backend offline)",
    };

    EscrowOutcome::Simulated {
        receipt: EscrowReceipt {
            explorer_url: explorer_url(NetworkKind::Testnet, &tx_hash),
            tx_hash,
            escrow_sequence,
        },
        note: note.to_string(),
    }
}

/// Build a simulated outcome using the thread-local generator.
pub fn simulated(action: EscrowAction) -> EscrowOutcome {
    simulate(action, &mut rand::thread_rng())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_simulated_create() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let outcome = simulate(EscrowAction::Create, &mut rng);
            assert!(outcome.is_simulated());
            assert!(outcome.tx_hash().starts_with(SIMULATED_HASH_PREFIX));
            assert_eq!(outcome.tx_hash().len(), 19);
            assert!(outcome
                .receipt()
                .explorer_url
                .ends_with(&format!("/transactions/{}", outcome.tx_hash())));

            let sequence = outcome.escrow_sequence().unwrap().value();
            assert!(SIMULATED_SEQUENCE_RANGE.contains(&sequence));
        }
    }

    #[test]
    fn test_simulated_finish_and_cancel_have_no_sequence() {
        let mut rng = StdRng::seed_from_u64(1);
        let finish = simulate(EscrowAction::Finish, &mut rng);
        assert_eq!(finish.escrow_sequence(), None);
        assert!(finish.note().unwrap().contains("finished"));

        let cancel = simulate(EscrowAction::Cancel, &mut rng);
        assert!(cancel.note().unwrap().contains("cancelled"));
    }
}

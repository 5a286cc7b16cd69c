//! Escrow service configuration
//!
//! Built once at startup from the process environment and passed by value
//! into the service. Nothing mutates it afterwards.

use timelock_types::{Credential, EscrowError, NetworkEndpoint, DEFAULT_GRACE_PERIOD_SECS};

/// Network, parties and timing of every escrow this service creates
#[derive(Debug, Clone)]
pub struct EscrowConfig {
    /// Ledger the service submits to
    pub network: NetworkEndpoint,
    /// Funds escrows and receives refunds
    pub buyer: Credential,
    /// Receives released funds
    pub seller: Credential,
    /// Delay between creation and the earliest release, in seconds
    pub grace_period_secs: i64,
}

impl EscrowConfig {
    pub fn new(network: NetworkEndpoint, buyer: Credential, seller: Credential) -> Self {
        Self {
            network,
            buyer,
            seller,
            grace_period_secs: DEFAULT_GRACE_PERIOD_SECS,
        }
    }

    pub fn with_grace_period(mut self, secs: i64) -> Self {
        self.grace_period_secs = secs;
        self
    }

    /// Build from raw settings, rejecting anything unusable.
    pub fn from_settings(
        network_url: &str,
        buyer_address: &str,
        buyer_seed: &str,
        seller_address: &str,
        seller_seed: &str,
    ) -> Result<Self, EscrowError> {
        let buyer = party("buyer", buyer_address, buyer_seed)?;
        let seller = party("seller", seller_address, seller_seed)?;

        if buyer.address == seller.address {
            return Err(EscrowError::configuration(
                "buyer and seller must be different accounts",
            ));
        }

        Ok(Self::new(NetworkEndpoint::new(network_url), buyer, seller))
    }

    /// Check invariants that `new` cannot enforce through types
    pub fn validate(&self) -> Result<(), EscrowError> {
        if self.grace_period_secs < 0 {
            return Err(EscrowError::configuration(
                "grace period must not be negative",
            ));
        }
        if self.buyer.secret().is_empty() || self.seller.secret().is_empty() {
            return Err(EscrowError::configuration("account seeds must not be empty"));
        }
        Ok(())
    }
}

fn party(role: &str, address: &str, seed: &str) -> Result<Credential, EscrowError> {
    if address.is_empty() || seed.is_empty() {
        return Err(EscrowError::configuration(format!(
            "{} address and seed are required",
            role
        )));
    }
    Credential::parse(address, seed)
        .map_err(|e| EscrowError::configuration(format!("{}: {}", role, e)))
}

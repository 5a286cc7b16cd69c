//! Ledger network endpoints and explorer links

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default endpoint: the public test network
pub const DEFAULT_NETWORK_URL: &str = "wss://s.altnet.rippletest.net:51233";

/// Endpoint value that selects the in-process simulated ledger
pub const LOCAL_SIM_URL: &str = "local-sim";

/// Which ledger network an endpoint belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkKind {
    Mainnet,
    Testnet,
    Devnet,
    /// In-process simulated ledger
    LocalSim,
}

impl NetworkKind {
    /// Infer the network from an endpoint URL.
    ///
    /// Anything that is not recognizably a test, dev or simulated endpoint
    /// is treated as mainnet.
    pub fn from_url(url: &str) -> Self {
        let url = url.to_lowercase();
        if url == LOCAL_SIM_URL {
            NetworkKind::LocalSim
        } else if url.contains("altnet") || url.contains("testnet") {
            NetworkKind::Testnet
        } else if url.contains("devnet") {
            NetworkKind::Devnet
        } else {
            NetworkKind::Mainnet
        }
    }

    /// Base URL of the public explorer for this network.
    ///
    /// The simulated ledger links to the test network explorer, where its
    /// hashes do not resolve.
    pub fn explorer_base(&self) -> &'static str {
        match self {
            NetworkKind::Mainnet => "https://livenet.xrpl.org",
            NetworkKind::Testnet | NetworkKind::LocalSim => "https://testnet.xrpl.org",
            NetworkKind::Devnet => "https://devnet.xrpl.org",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkKind::Mainnet => "mainnet",
            NetworkKind::Testnet => "testnet",
            NetworkKind::Devnet => "devnet",
            NetworkKind::LocalSim => "local-sim",
        }
    }
}

impl fmt::Display for NetworkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A configured ledger endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkEndpoint {
    pub url: String,
    pub kind: NetworkKind,
}

impl NetworkEndpoint {
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        let kind = NetworkKind::from_url(&url);
        Self { url, kind }
    }

    pub fn local_sim() -> Self {
        Self::new(LOCAL_SIM_URL)
    }

    pub fn is_local_sim(&self) -> bool {
        self.kind == NetworkKind::LocalSim
    }

    /// Explorer link for a transaction hash
    pub fn explorer_url(&self, tx_hash: &str) -> String {
        explorer_url(self.kind, tx_hash)
    }
}

impl Default for NetworkEndpoint {
    fn default() -> Self {
        Self::new(DEFAULT_NETWORK_URL)
    }
}

/// Explorer link for a transaction hash on the given network
pub fn explorer_url(kind: NetworkKind, tx_hash: &str) -> String {
    format!("{}/transactions/{}", kind.explorer_base(), tx_hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_url() {
        assert_eq!(NetworkKind::from_url(DEFAULT_NETWORK_URL), NetworkKind::Testnet);
        assert_eq!(NetworkKind::from_url("wss://testnet.xrpl-labs.com"), NetworkKind::Testnet);
        assert_eq!(NetworkKind::from_url("wss://s.devnet.rippletest.net:51233"), NetworkKind::Devnet);
        assert_eq!(NetworkKind::from_url("wss://xrplcluster.com"), NetworkKind::Mainnet);
        assert_eq!(NetworkKind::from_url("local-sim"), NetworkKind::LocalSim);
    }

    #[test]
    fn test_explorer_url() {
        let endpoint = NetworkEndpoint::default();
        assert_eq!(
            endpoint.explorer_url("ABC123"),
            "https://testnet.xrpl.org/transactions/ABC123"
        );

        let mainnet = NetworkEndpoint::new("wss://xrplcluster.com");
        assert!(mainnet.explorer_url("ABC").starts_with("https://livenet.xrpl.org/"));
    }
}

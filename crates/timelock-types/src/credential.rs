//! Ledger accounts and signing credentials

use crate::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Base58 alphabet used by ledger account addresses
pub const ADDRESS_ALPHABET: &str = "rpshnaf39wBUDNEGHJKLM4PQRST7VWXYZ2bcdeCg65jkm8oFqi1tuvAxyz";

/// A classic ledger account address (`r...`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountAddress(String);

impl AccountAddress {
    /// Parse and validate an address.
    ///
    /// Checks the leading `r`, the length range (25..=35) and the alphabet.
    /// The base58 checksum is left to the ledger.
    pub fn parse(address: impl Into<String>) -> Result<Self, ValidationError> {
        let address = address.into();
        let valid = address.starts_with('r')
            && (25..=35).contains(&address.len())
            && address.chars().all(|c| ADDRESS_ALPHABET.contains(c));

        if valid {
            Ok(Self(address))
        } else {
            Err(ValidationError::InvalidAddress(address))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for AccountAddress {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<AccountAddress> for String {
    fn from(address: AccountAddress) -> Self {
        address.0
    }
}

/// Secret seed; never printed
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(seed: impl Into<String>) -> Self {
        Self(seed.into())
    }

    /// Access the raw seed, only for handing it to the signer
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// An account together with the seed that signs for it
#[derive(Debug, Clone)]
pub struct Credential {
    pub address: AccountAddress,
    secret: Secret,
}

impl Credential {
    pub fn new(address: AccountAddress, secret: Secret) -> Self {
        Self { address, secret }
    }

    /// Build a credential from raw strings
    pub fn parse(address: &str, seed: &str) -> Result<Self, ValidationError> {
        Ok(Self::new(AccountAddress::parse(address)?, Secret::new(seed)))
    }

    pub fn secret(&self) -> &Secret {
        &self.secret
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_address() {
        let addr = AccountAddress::parse("rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh").unwrap();
        assert_eq!(addr.as_str(), "rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh");
    }

    #[test]
    fn test_rejects_bad_addresses() {
        assert!(AccountAddress::parse("xHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh").is_err());
        assert!(AccountAddress::parse("r123").is_err());
        // '0' is not part of the alphabet
        assert!(AccountAddress::parse("rHb9CJAWyB4rj91VRWn96DkukG4bwdty0h").is_err());
    }

    #[test]
    fn test_secret_is_redacted() {
        let cred = Credential::parse("rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh", "snoPBrXtMeMyMHUVTgbuqAfg1SUTb")
            .unwrap();
        let printed = format!("{:?}", cred);
        assert!(!printed.contains("snoPBrXtMeMyMHUVTgbuqAfg1SUTb"));
        assert!(printed.contains("***"));
        assert_eq!(cred.secret().expose(), "snoPBrXtMeMyMHUVTgbuqAfg1SUTb");
    }

    #[test]
    fn test_address_serde_validates() {
        let ok: Result<AccountAddress, _> =
            serde_json::from_str("\"rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh\"");
        assert!(ok.is_ok());
        let bad: Result<AccountAddress, _> = serde_json::from_str("\"nope\"");
        assert!(bad.is_err());
    }
}

//! Native asset amounts
//!
//! Amounts arrive as decimal XRP and travel to the ledger as an integer
//! count of drops (1 XRP = 1,000,000 drops), serialized as a string.

use crate::ValidationError;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Drops per whole XRP
pub const DROPS_PER_XRP: u64 = 1_000_000;

/// Maximum number of decimal places a native amount may carry
pub const MAX_XRP_DECIMALS: u32 = 6;

/// Total native supply in drops; no single amount may exceed it
pub const MAX_DROPS: u64 = 100_000_000_000 * DROPS_PER_XRP;

/// An amount of the native asset in drops
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Drops(u64);

impl Drops {
    /// Create from a raw drop count
    pub const fn new(drops: u64) -> Self {
        Self(drops)
    }

    /// Convert a decimal XRP amount into drops.
    ///
    /// The amount must be strictly positive, carry at most six decimal
    /// places and not exceed the total supply.
    pub fn from_xrp(xrp: Decimal) -> Result<Self, ValidationError> {
        if xrp <= Decimal::ZERO {
            return Err(ValidationError::InvalidAmount(
                "amount must be greater than zero".to_string(),
            ));
        }

        if xrp.normalize().scale() > MAX_XRP_DECIMALS {
            return Err(ValidationError::InvalidAmount(format!(
                "{} has more than {} decimal places",
                xrp, MAX_XRP_DECIMALS
            )));
        }

        let drops = xrp
            .checked_mul(Decimal::from(DROPS_PER_XRP))
            .and_then(|d| d.to_u64())
            .filter(|d| *d <= MAX_DROPS)
            .ok_or_else(|| {
                ValidationError::InvalidAmount(format!("{} exceeds the native supply", xrp))
            })?;

        Ok(Self(drops))
    }

    /// Raw drop count
    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Value in whole XRP
    pub fn to_xrp(&self) -> Decimal {
        Decimal::from(self.0) / Decimal::from(DROPS_PER_XRP)
    }

    pub fn checked_add(self, other: Drops) -> Option<Drops> {
        self.0.checked_add(other.0).map(Drops)
    }

    pub fn checked_sub(self, other: Drops) -> Option<Drops> {
        self.0.checked_sub(other.0).map(Drops)
    }
}

impl fmt::Display for Drops {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Drops {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Drops {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Ledger nodes send drops as strings; accept bare integers as well.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(u64),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(Drops(n)),
            Raw::Text(s) => s
                .parse::<u64>()
                .map(Drops)
                .map_err(|_| de::Error::custom(format!("invalid drops value: {}", s))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_from_xrp() {
        assert_eq!(Drops::from_xrp(dec!(10)).unwrap().as_u64(), 10_000_000);
        assert_eq!(Drops::from_xrp(dec!(0.000001)).unwrap().as_u64(), 1);
        assert_eq!(Drops::from_xrp(dec!(1.50)).unwrap().as_u64(), 1_500_000);
    }

    #[test]
    fn test_rejects_non_positive() {
        assert!(matches!(
            Drops::from_xrp(dec!(0)),
            Err(ValidationError::InvalidAmount(_))
        ));
        assert!(matches!(
            Drops::from_xrp(dec!(-5)),
            Err(ValidationError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_rejects_sub_drop_precision() {
        assert!(Drops::from_xrp(dec!(0.0000001)).is_err());
    }

    #[test]
    fn test_rejects_above_supply() {
        assert!(Drops::from_xrp(dec!(100000000001)).is_err());
    }

    #[test]
    fn test_serializes_as_string() {
        let json = serde_json::to_string(&Drops::new(42)).unwrap();
        assert_eq!(json, "\"42\"");

        let back: Drops = serde_json::from_str("\"42\"").unwrap();
        assert_eq!(back, Drops::new(42));
        let back: Drops = serde_json::from_str("42").unwrap();
        assert_eq!(back, Drops::new(42));
    }
}

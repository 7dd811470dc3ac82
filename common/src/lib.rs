//! Shared types for the TradeFair marketplace
//!
//! Vocabulary types used by the server and any future tooling:
//! the four fixed category domains and minor-unit money conversion.

pub mod money;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed marketplace category domains. Each domain owns a pool of 100 sheds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Domain {
    /// Clothings and Beddings
    CB,
    /// Electronics and Computer wares
    EC,
    /// Food and Beverages
    FB,
    /// Jewelry and Accessories
    JA,
}

impl Domain {
    /// Two-letter code stored in the database and used as the shed prefix.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CB => "CB",
            Self::EC => "EC",
            Self::FB => "FB",
            Self::JA => "JA",
        }
    }

    /// Human-readable category label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::CB => "Clothings and Beddings",
            Self::EC => "Electronics and Computer wares",
            Self::FB => "Food and Beverages",
            Self::JA => "Jewelry and Accessories",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "CB" => Some(Self::CB),
            "EC" => Some(Self::EC),
            "FB" => Some(Self::FB),
            "JA" => Some(Self::JA),
            _ => None,
        }
    }

    pub fn all() -> [Self; 4] {
        [Self::CB, Self::EC, Self::FB, Self::JA]
    }

    /// Format a shed code for a 1-based sequence within this domain,
    /// e.g. `CB007`.
    pub fn shed_code(&self, sequence: u32) -> String {
        format!("{}{:03}", self.as_str(), sequence)
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_round_trip() {
        for d in Domain::all() {
            assert_eq!(Domain::from_str(d.as_str()), Some(d));
        }
        assert_eq!(Domain::from_str("XX"), None);
    }

    #[test]
    fn test_shed_code_zero_padding() {
        assert_eq!(Domain::CB.shed_code(1), "CB001");
        assert_eq!(Domain::JA.shed_code(42), "JA042");
        assert_eq!(Domain::FB.shed_code(100), "FB100");
    }
}

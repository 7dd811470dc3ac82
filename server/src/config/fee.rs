//! Shed registration fee configuration
//!
//! The upfront fee a vendor pays before a shed is provisioned. Amounts are
//! in kobo; the fee is configurable via environment variable within bounds.

use std::env;

/// Default shed registration fee: NGN 50,000.
///
/// Override via SHED_FEE_KOBO environment variable.
pub const DEFAULT_SHED_FEE_KOBO: i64 = 5_000_000;

/// Minimum accepted fee (NGN 1,000). Below this the gateway's own minimum
/// transaction amount rejects the charge anyway.
pub const MIN_SHED_FEE_KOBO: i64 = 100_000;

/// Maximum accepted fee (NGN 1,000,000). Above this the configuration is
/// almost certainly a unit mistake (naira entered instead of kobo).
pub const MAX_SHED_FEE_KOBO: i64 = 100_000_000;

/// Get the configured shed registration fee in kobo.
///
/// Reads SHED_FEE_KOBO, clamping to the valid range with a warning.
pub fn get_shed_fee_kobo() -> i64 {
    env::var("SHED_FEE_KOBO")
        .ok()
        .and_then(|v| v.parse().ok())
        .map(|fee: i64| {
            if fee < MIN_SHED_FEE_KOBO {
                tracing::warn!(
                    fee = fee,
                    min = MIN_SHED_FEE_KOBO,
                    "SHED_FEE_KOBO below minimum, using minimum"
                );
                MIN_SHED_FEE_KOBO
            } else if fee > MAX_SHED_FEE_KOBO {
                tracing::warn!(
                    fee = fee,
                    max = MAX_SHED_FEE_KOBO,
                    "SHED_FEE_KOBO above maximum, using maximum"
                );
                MAX_SHED_FEE_KOBO
            } else {
                fee
            }
        })
        .unwrap_or(DEFAULT_SHED_FEE_KOBO)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_fee() {
        // NGN 50,000 = 5,000,000 kobo
        assert_eq!(DEFAULT_SHED_FEE_KOBO, 5_000_000);
    }

    #[test]
    fn test_fee_bounds() {
        assert!(MIN_SHED_FEE_KOBO < DEFAULT_SHED_FEE_KOBO);
        assert!(DEFAULT_SHED_FEE_KOBO < MAX_SHED_FEE_KOBO);
    }
}

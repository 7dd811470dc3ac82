//! Minor-unit money conversion (naira <-> kobo)
//!
//! All amounts are stored and sent to the payment gateway in kobo
//! (1 naira = 100 kobo). Conversion happens exactly once at each boundary.

/// Kobo per naira.
pub const KOBO_PER_NAIRA: i64 = 100;

/// Convert a naira amount (as received from a client, e.g. "500.00") to kobo.
///
/// Returns `None` for non-finite, negative, or overflowing amounts.
pub fn naira_to_kobo(naira: f64) -> Option<i64> {
    if !naira.is_finite() || naira < 0.0 {
        return None;
    }
    let kobo = (naira * KOBO_PER_NAIRA as f64).round();
    if kobo > i64::MAX as f64 {
        return None;
    }
    Some(kobo as i64)
}

/// Format a kobo amount as a naira string with two decimal places, e.g.
/// `50000` -> `"500.00"`.
pub fn format_naira(kobo: i64) -> String {
    let sign = if kobo < 0 { "-" } else { "" };
    let abs = kobo.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_naira_to_kobo() {
        assert_eq!(naira_to_kobo(500.0), Some(50_000));
        assert_eq!(naira_to_kobo(0.01), Some(1));
        assert_eq!(naira_to_kobo(1234.56), Some(123_456));
        assert_eq!(naira_to_kobo(-1.0), None);
        assert_eq!(naira_to_kobo(f64::NAN), None);
        assert_eq!(naira_to_kobo(f64::INFINITY), None);
    }

    #[test]
    fn test_format_naira() {
        assert_eq!(format_naira(50_000), "500.00");
        assert_eq!(format_naira(1), "0.01");
        assert_eq!(format_naira(123_456), "1234.56");
    }
}

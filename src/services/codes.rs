use chrono::{DateTime, Datelike, Utc};

/// Document code prefixes: receiving, issuing, reconciliation.
pub const STOCK_IN_PREFIX: &str = "RCV";
pub const STOCK_OUT_PREFIX: &str = "ISS";
pub const INVENTORY_CHECK_PREFIX: &str = "CHK";

/// Month-scoped code prefix, e.g. `RCV202608`.
pub fn month_prefix(prefix: &str, at: DateTime<Utc>) -> String {
    format!("{}{}{:02}", prefix, at.year(), at.month())
}

/// Next code in a month's sequence given the highest existing code for that
/// prefix (codes sort lexicographically within a month, so `MAX(code)` is the
/// latest). Restarts at 0001 each month.
pub fn next_in_sequence(month_prefix: &str, last_code: Option<&str>) -> String {
    let next = last_code
        .and_then(|code| code.strip_prefix(month_prefix))
        .and_then(|seq| seq.parse::<u32>().ok())
        .map(|seq| seq + 1)
        .unwrap_or(1);
    format!("{}{:04}", month_prefix, next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn first_code_of_a_month() {
        let at = Utc.with_ymd_and_hms(2026, 8, 6, 12, 0, 0).unwrap();
        let prefix = month_prefix(STOCK_IN_PREFIX, at);
        assert_eq!(prefix, "RCV202608");
        assert_eq!(next_in_sequence(&prefix, None), "RCV2026080001");
    }

    #[test]
    fn sequence_increments() {
        assert_eq!(
            next_in_sequence("ISS202608", Some("ISS2026080007")),
            "ISS2026080008"
        );
    }

    #[test]
    fn stale_code_from_previous_month_restarts() {
        // MAX(code) filtered by the current month's prefix never yields this,
        // but a non-matching prefix must fall back to 0001 rather than panic.
        assert_eq!(
            next_in_sequence("CHK202609", Some("CHK2026080099")),
            "CHK2026090001"
        );
    }
}

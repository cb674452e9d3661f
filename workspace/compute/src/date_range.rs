//! In-memory month-reported range filter.
//!
//! The stored `MM-YY` code does not compare chronologically under the
//! database's native string ordering, so range filtering happens here,
//! strictly after the scoped fetch, on the structured month key.

use chrono::NaiveDate;
use common::MonthKey;

/// Integer key for a stored report code. Malformed codes key to zero,
/// which sorts before any real boundary. A month token outside 1-12
/// (`"13-25"`) is deliberately treated as malformed rather than given a
/// sortable key of its own.
fn report_code_key(code: &str) -> i32 {
    MonthKey::from_report_code(code)
        .map(MonthKey::sort_key)
        .unwrap_or(0)
}

/// Whether a loan's `month_reported` falls inside the caller's optional
/// date range. Both bounds are inclusive and compare on year and month
/// only (the day component of the boundary dates is ignored).
pub fn month_reported_in_range(
    month_reported: &str,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> bool {
    let key = report_code_key(month_reported);
    if let Some(start) = start {
        if key < MonthKey::from_date(start).sort_key() {
            return false;
        }
    }
    if let Some(end) = end {
        if key > MonthKey::from_date(end).sort_key() {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn march_2025_inside_year_range() {
        assert!(month_reported_in_range(
            "03-25",
            Some(date(2025, 1, 15)),
            Some(date(2025, 12, 31)),
        ));
    }

    #[test]
    fn march_2025_excluded_by_february_end() {
        assert!(!month_reported_in_range(
            "03-25",
            None,
            Some(date(2025, 2, 28)),
        ));
    }

    #[test]
    fn bounds_are_inclusive_on_the_month() {
        // Day component of the boundary is ignored.
        assert!(month_reported_in_range(
            "03-25",
            Some(date(2025, 3, 31)),
            Some(date(2025, 3, 1)),
        ));
    }

    #[test]
    fn bounds_apply_independently() {
        assert!(month_reported_in_range("03-25", Some(date(2024, 6, 1)), None));
        assert!(!month_reported_in_range(
            "03-25",
            Some(date(2025, 4, 1)),
            None
        ));
        assert!(month_reported_in_range("03-25", None, Some(date(2026, 1, 1))));
        assert!(month_reported_in_range("03-25", None, None));
    }

    #[test]
    fn malformed_codes_key_to_zero() {
        // Excluded by any real start bound...
        assert!(!month_reported_in_range(
            "garbage",
            Some(date(2025, 1, 1)),
            None
        ));
        // ...but included by any end bound.
        assert!(month_reported_in_range(
            "garbage",
            None,
            Some(date(2025, 1, 1))
        ));
    }

    #[test]
    fn out_of_range_month_counts_as_malformed() {
        assert!(!month_reported_in_range(
            "13-25",
            Some(date(2025, 1, 1)),
            None
        ));
        assert!(month_reported_in_range("13-25", None, Some(date(2025, 1, 1))));
    }
}

//! Calendar types used by the loan filters and report pivoters.
//!
//! Loans carry the period they were reported past-due as a literal `MM-YY`
//! string (e.g. `"01-26"` for January 2026). That encoding does not sort
//! chronologically as text, so it is parsed into a structured [`MonthKey`]
//! at the data-access boundary and only rendered back to the string form at
//! the persistence edge.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A calendar month parsed from the stored `MM-YY` report code or taken
/// from a full date.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
pub struct MonthKey {
    /// Full four-digit year.
    pub year: i32,
    /// Month number, 1-12.
    pub month: u32,
}

impl MonthKey {
    /// Parses a stored `MM-YY` report code. The two-digit year maps to
    /// `2000 + YY`. Returns `None` for anything that is not exactly two
    /// numeric dash-separated tokens, or a month outside 1-12.
    pub fn from_report_code(code: &str) -> Option<Self> {
        let mut parts = code.trim().split('-');
        let month: u32 = parts.next()?.trim().parse().ok()?;
        let year: i32 = parts.next()?.trim().parse().ok()?;
        if parts.next().is_some() || !(1..=12).contains(&month) {
            return None;
        }
        Some(Self {
            year: 2000 + year,
            month,
        })
    }

    /// Month key of a full calendar date (the day component is dropped).
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Chronologically ordered integer key, `year * 100 + month`.
    pub fn sort_key(self) -> i32 {
        self.year * 100 + self.month as i32
    }

    /// Renders the persisted `MM-YY` form.
    pub fn report_code(self) -> String {
        format!("{:02}-{:02}", self.month, self.year % 100)
    }
}

/// Days-past-due bucket of the receivables aging report.
///
/// Buckets are fixed, ordered, and inclusive on both ends. Loans that are
/// not yet due (or due today) fall into no bucket at all.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
pub enum AgingBucket {
    #[serde(rename = "1-30 Days")]
    Days1To30,
    #[serde(rename = "31-45 Days")]
    Days31To45,
    #[serde(rename = "46-60 Days")]
    Days46To60,
    #[serde(rename = "61-90 Days")]
    Days61To90,
    #[serde(rename = "91-120 Days")]
    Days91To120,
    #[serde(rename = "120+ Days")]
    Days120Plus,
}

impl AgingBucket {
    /// All buckets in report order.
    pub const ALL: [AgingBucket; 6] = [
        AgingBucket::Days1To30,
        AgingBucket::Days31To45,
        AgingBucket::Days46To60,
        AgingBucket::Days61To90,
        AgingBucket::Days91To120,
        AgingBucket::Days120Plus,
    ];

    /// Classifies a days-past-due count. `None` means the loan is current.
    pub fn from_days_past_due(days: i64) -> Option<Self> {
        match days {
            d if d <= 0 => None,
            1..=30 => Some(AgingBucket::Days1To30),
            31..=45 => Some(AgingBucket::Days31To45),
            46..=60 => Some(AgingBucket::Days46To60),
            61..=90 => Some(AgingBucket::Days61To90),
            91..=120 => Some(AgingBucket::Days91To120),
            _ => Some(AgingBucket::Days120Plus),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AgingBucket::Days1To30 => "1-30 Days",
            AgingBucket::Days31To45 => "31-45 Days",
            AgingBucket::Days46To60 => "46-60 Days",
            AgingBucket::Days61To90 => "61-90 Days",
            AgingBucket::Days91To120 => "91-120 Days",
            AgingBucket::Days120Plus => "120+ Days",
        }
    }
}

/// One of the eight fixed ~45-day collection periods covering a calendar
/// year. Boundaries are compared on month and day only, inclusive on both
/// ends, and together cover every date of the year (including Feb 29).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
pub enum CollectionPeriod {
    #[serde(rename = "Period 1")]
    P1,
    #[serde(rename = "Period 2")]
    P2,
    #[serde(rename = "Period 3")]
    P3,
    #[serde(rename = "Period 4")]
    P4,
    #[serde(rename = "Period 5")]
    P5,
    #[serde(rename = "Period 6")]
    P6,
    #[serde(rename = "Period 7")]
    P7,
    #[serde(rename = "Period 8")]
    P8,
}

impl CollectionPeriod {
    /// All periods in calendar order.
    pub const ALL: [CollectionPeriod; 8] = [
        CollectionPeriod::P1,
        CollectionPeriod::P2,
        CollectionPeriod::P3,
        CollectionPeriod::P4,
        CollectionPeriod::P5,
        CollectionPeriod::P6,
        CollectionPeriod::P7,
        CollectionPeriod::P8,
    ];

    /// Classifies a date by its month-day component.
    pub fn of_date(date: NaiveDate) -> Self {
        let md = (date.month(), date.day());
        if md <= (2, 15) {
            CollectionPeriod::P1
        } else if md <= (3, 31) {
            CollectionPeriod::P2
        } else if md <= (5, 15) {
            CollectionPeriod::P3
        } else if md <= (6, 30) {
            CollectionPeriod::P4
        } else if md <= (8, 15) {
            CollectionPeriod::P5
        } else if md <= (9, 30) {
            CollectionPeriod::P6
        } else if md <= (11, 15) {
            CollectionPeriod::P7
        } else {
            CollectionPeriod::P8
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CollectionPeriod::P1 => "Period 1",
            CollectionPeriod::P2 => "Period 2",
            CollectionPeriod::P3 => "Period 3",
            CollectionPeriod::P4 => "Period 4",
            CollectionPeriod::P5 => "Period 5",
            CollectionPeriod::P6 => "Period 6",
            CollectionPeriod::P7 => "Period 7",
            CollectionPeriod::P8 => "Period 8",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_key_parses_report_code() {
        let key = MonthKey::from_report_code("03-25").unwrap();
        assert_eq!(key.year, 2025);
        assert_eq!(key.month, 3);
        assert_eq!(key.sort_key(), 202503);
        assert_eq!(key.report_code(), "03-25");
    }

    #[test]
    fn month_key_rejects_malformed_codes() {
        assert_eq!(MonthKey::from_report_code(""), None);
        assert_eq!(MonthKey::from_report_code("2025-03"), None);
        assert_eq!(MonthKey::from_report_code("03-25-01"), None);
        assert_eq!(MonthKey::from_report_code("13-25"), None);
        assert_eq!(MonthKey::from_report_code("ab-cd"), None);
        assert_eq!(MonthKey::from_report_code("0325"), None);
    }

    #[test]
    fn month_key_sorts_chronologically() {
        let dec_24 = MonthKey::from_report_code("12-24").unwrap();
        let jan_25 = MonthKey::from_report_code("01-25").unwrap();
        // Lexically "12-24" > "01-25"; the structured key flips that.
        assert!(dec_24.sort_key() < jan_25.sort_key());
    }

    #[test]
    fn aging_bucket_edges() {
        assert_eq!(AgingBucket::from_days_past_due(-5), None);
        assert_eq!(AgingBucket::from_days_past_due(0), None);
        assert_eq!(
            AgingBucket::from_days_past_due(1),
            Some(AgingBucket::Days1To30)
        );
        assert_eq!(
            AgingBucket::from_days_past_due(30),
            Some(AgingBucket::Days1To30)
        );
        assert_eq!(
            AgingBucket::from_days_past_due(31),
            Some(AgingBucket::Days31To45)
        );
        assert_eq!(
            AgingBucket::from_days_past_due(35),
            Some(AgingBucket::Days31To45)
        );
        assert_eq!(
            AgingBucket::from_days_past_due(45),
            Some(AgingBucket::Days31To45)
        );
        assert_eq!(
            AgingBucket::from_days_past_due(46),
            Some(AgingBucket::Days46To60)
        );
        assert_eq!(
            AgingBucket::from_days_past_due(90),
            Some(AgingBucket::Days61To90)
        );
        assert_eq!(
            AgingBucket::from_days_past_due(120),
            Some(AgingBucket::Days91To120)
        );
        assert_eq!(
            AgingBucket::from_days_past_due(121),
            Some(AgingBucket::Days120Plus)
        );
    }

    #[test]
    fn collection_period_boundaries() {
        let date = |m, d| NaiveDate::from_ymd_opt(2025, m, d).unwrap();
        assert_eq!(CollectionPeriod::of_date(date(1, 1)), CollectionPeriod::P1);
        assert_eq!(CollectionPeriod::of_date(date(2, 15)), CollectionPeriod::P1);
        assert_eq!(CollectionPeriod::of_date(date(2, 16)), CollectionPeriod::P2);
        assert_eq!(CollectionPeriod::of_date(date(3, 31)), CollectionPeriod::P2);
        assert_eq!(CollectionPeriod::of_date(date(4, 1)), CollectionPeriod::P3);
        assert_eq!(CollectionPeriod::of_date(date(6, 30)), CollectionPeriod::P4);
        assert_eq!(CollectionPeriod::of_date(date(7, 1)), CollectionPeriod::P5);
        assert_eq!(CollectionPeriod::of_date(date(9, 30)), CollectionPeriod::P6);
        assert_eq!(
            CollectionPeriod::of_date(date(11, 15)),
            CollectionPeriod::P7
        );
        assert_eq!(
            CollectionPeriod::of_date(date(11, 16)),
            CollectionPeriod::P8
        );
        assert_eq!(
            CollectionPeriod::of_date(date(12, 31)),
            CollectionPeriod::P8
        );
        // Leap day falls inside Period 2.
        let leap = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(CollectionPeriod::of_date(leap), CollectionPeriod::P2);
    }
}

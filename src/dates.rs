//! Date handling for temporal filters.
//!
//! Inputs are `YYYY-MM-DD` or a bare `YYYY`. A bare year expands to the first
//! day of the year for a start bound and the last day for an end bound.
//! Remote date filters exclude their end date, so a year-expanded end is
//! passed on as the following January 1 (see [`IsoDate::filter_end`]).

use std::fmt;
use std::sync::LazyLock;

use chrono::{NaiveDate, Utc};
use regex::Regex;

use crate::error::HarvestError;

#[allow(clippy::expect_used)]
static YEAR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}$").expect("year regex is valid")); // Static pattern, safe to panic

/// Which end of a date range a value is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateBound {
    Start,
    End,
}

/// A validated ISO `YYYY-MM-DD` date.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IsoDate {
    value: String,
    /// Set for an end bound expanded from a bare year; the date itself is in range.
    inclusive: bool,
}

impl IsoDate {
    /// Parses `YYYY-MM-DD` or `YYYY`, expanding a bare year according to `bound`.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError::InvalidDate`] for anything else, including
    /// impossible calendar dates such as `2019-02-30`.
    pub fn parse(field: &'static str, raw: &str, bound: DateBound) -> Result<Self, HarvestError> {
        let raw = raw.trim();
        if YEAR_PATTERN.is_match(raw) {
            return Ok(match bound {
                DateBound::Start => Self::exact(format!("{raw}-01-01")),
                DateBound::End => Self {
                    value: format!("{raw}-12-31"),
                    inclusive: true,
                },
            });
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(|date| Self::exact(date.format("%Y-%m-%d").to_string()))
            .map_err(|_| HarvestError::invalid_date(field, raw))
    }

    fn exact(value: String) -> Self {
        Self {
            value,
            inclusive: false,
        }
    }

    /// Today's date in UTC.
    #[must_use]
    pub fn today() -> Self {
        Self::exact(Utc::now().date_naive().format("%Y-%m-%d").to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// The exclusive end to hand to a date filter.
    ///
    /// A year-expanded end bound (`2019` as `2019-12-31`) moves to the next
    /// day so its last day is kept; every other date is returned unchanged.
    #[must_use]
    pub fn filter_end(&self) -> Self {
        if !self.inclusive {
            return self.clone();
        }
        NaiveDate::parse_from_str(&self.value, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.succ_opt())
            .map_or_else(|| self.clone(), |next| Self::exact(next.format("%Y-%m-%d").to_string()))
    }
}

impl fmt::Display for IsoDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

//! Year-range matching for time-scoped commands (spec §3 "Year matcher",
//! §4.6).

use serde::{Deserialize, Serialize};

/// `(min?, max?)` bounds on a year, with `beginning`/`onwards` sentinels
/// represented as the corresponding bound being absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct YearMatcher {
    pub min: Option<i32>,
    pub max: Option<i32>,
}

impl YearMatcher {
    /// Matches every year (no `during` clause given).
    pub fn any() -> Self {
        Self { min: None, max: None }
    }

    /// Matches a single year.
    pub fn exact(year: i32) -> Self {
        Self { min: Some(year), max: Some(year) }
    }

    /// Matches `[min, max]` inclusive, `beginning` as an open lower bound
    /// and `onwards` as an open upper bound.
    pub fn range(min: Option<i32>, max: Option<i32>) -> Self {
        Self { min, max }
    }

    pub fn from_year(year: i32) -> Self {
        Self { min: Some(year), max: None }
    }

    pub fn to_year(year: i32) -> Self {
        Self { min: None, max: Some(year) }
    }

    /// Whether `year` falls within this matcher's bounds.
    pub fn covers(&self, year: i32) -> bool {
        self.min.is_none_or(|min| year >= min) && self.max.is_none_or(|max| year <= max)
    }
}

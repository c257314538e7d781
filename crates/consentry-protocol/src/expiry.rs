//! Age-based validity of stored consent.

use chrono::{DateTime, Months, Utc};

use consentry_core::ConsentRecord;

/// Records expire a whole number of calendar years after they were made.
///
/// The cutoff is "now, with the year decremented", not a fixed number of
/// hours, so a record made on 2024-03-01 stays valid through 2025-03-01
/// regardless of the leap day in between. A date that does not exist in the
/// target year (Feb 29) clamps to the last day of that month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpirationPolicy {
    max_age_years: u32,
}

impl ExpirationPolicy {
    pub fn new(max_age_years: u32) -> Self {
        Self {
            max_age_years: max_age_years.max(1),
        }
    }

    pub fn max_age_years(&self) -> u32 {
        self.max_age_years
    }

    fn span(&self) -> Months {
        Months::new(self.max_age_years.saturating_mul(12))
    }

    /// Oldest timestamp still considered valid at `now`.
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_sub_months(self.span())
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Whether `record` must be re-collected. Absent records always are.
    pub fn is_expired(&self, record: Option<&ConsentRecord>, now: DateTime<Utc>) -> bool {
        match record {
            Some(record) => record.timestamp < self.cutoff(now),
            None => true,
        }
    }

    /// The last instant at which `record` is still valid.
    pub fn expires_at(&self, record: &ConsentRecord) -> DateTime<Utc> {
        record
            .timestamp
            .checked_add_months(self.span())
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

impl Default for ExpirationPolicy {
    fn default() -> Self {
        Self::new(consentry_core::config::DEFAULT_MAX_AGE_YEARS)
    }
}

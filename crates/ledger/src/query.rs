use chrono::{DateTime, NaiveDate, Utc};

use crate::{LedgerError, Result};

/// Date format accepted by listing filters.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Filter for listing movements by creation day.
///
/// Both bounds are inclusive and compared at day granularity, so a query
/// from `2024-01-01` to `2024-01-01` matches every movement created on that
/// calendar day. Either bound may be absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MovementQuery {
    /// Earliest creation day to include.
    pub start_date: Option<NaiveDate>,

    /// Latest creation day to include.
    pub end_date: Option<NaiveDate>,
}

impl MovementQuery {
    /// Creates an unbounded query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses optional `YYYY-MM-DD` bounds. Empty strings count as absent.
    pub fn parse(start_date: Option<&str>, end_date: Option<&str>) -> Result<Self> {
        Ok(Self {
            start_date: parse_date(start_date)?,
            end_date: parse_date(end_date)?,
        })
    }

    /// Includes movements created on or after this day.
    pub fn from(mut self, date: NaiveDate) -> Self {
        self.start_date = Some(date);
        self
    }

    /// Includes movements created on or before this day.
    pub fn until(mut self, date: NaiveDate) -> Self {
        self.end_date = Some(date);
        self
    }

    /// Returns true if a movement created at `created_at` passes the filter.
    pub fn matches(&self, created_at: &DateTime<Utc>) -> bool {
        let day = created_at.date_naive();
        if let Some(start) = self.start_date
            && day < start
        {
            return false;
        }
        if let Some(end) = self.end_date
            && day > end
        {
            return false;
        }
        true
    }
}

fn parse_date(raw: Option<&str>) -> Result<Option<NaiveDate>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, DATE_FORMAT)
            .map(Some)
            .map_err(|_| LedgerError::InvalidDate(s.to_string())),
    }
}

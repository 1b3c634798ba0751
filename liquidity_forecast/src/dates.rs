//! Trade date parsing and day indexing
//!
//! Trade dates arrive as `<day><Mon><yyyy>` with no separator, e.g. `16Mar2016`.
//! Day indices are 1-based and contiguous from the earliest observed date.

use crate::error::{ForecastError, Result};
use chrono::{Month, NaiveDate};

/// Parse a trade date such as `16Mar2016` or `3Jan2017`
pub fn parse_trade_date(raw: &str) -> Result<NaiveDate> {
    let text = raw.trim();
    let malformed = |what: &str| {
        ForecastError::Parse(format!("Malformed trade date '{}': {}", raw, what))
    };

    if !text.is_ascii() || text.len() < 8 {
        return Err(malformed("expected <day><Mon><yyyy>"));
    }

    let (rest, year) = text.split_at(text.len() - 4);
    let (day, month) = rest.split_at(rest.len() - 3);

    if day.is_empty() || day.len() > 2 || !day.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed("day is not a number"));
    }
    if !year.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed("year is not a number"));
    }

    let day: u32 = day.parse().map_err(|_| malformed("day is not a number"))?;
    let year: i32 = year.parse().map_err(|_| malformed("year is not a number"))?;
    let month: Month = month
        .parse()
        .map_err(|_| malformed("unrecognized month"))?;

    NaiveDate::from_ymd_opt(year, month.number_from_month(), day)
        .ok_or_else(|| malformed("day out of range for month"))
}

/// Maps calendar dates onto a contiguous 1-based day index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateIndexer {
    min_date: NaiveDate,
    total_days: usize,
}

impl DateIndexer {
    /// Build from the set of observed dates
    pub fn from_dates<I>(dates: I) -> Result<Self>
    where
        I: IntoIterator<Item = NaiveDate>,
    {
        let mut bounds: Option<(NaiveDate, NaiveDate)> = None;
        for date in dates {
            bounds = Some(match bounds {
                None => (date, date),
                Some((lo, hi)) => (lo.min(date), hi.max(date)),
            });
        }

        let (min_date, max_date) = bounds.ok_or_else(|| {
            ForecastError::Data("No transaction dates to index".to_string())
        })?;

        Ok(Self {
            min_date,
            total_days: (max_date - min_date).num_days() as usize + 1,
        })
    }

    /// Earliest observed date (day 1)
    pub fn min_date(&self) -> NaiveDate {
        self.min_date
    }

    /// Inclusive span of observed dates in days
    pub fn total_days(&self) -> usize {
        self.total_days
    }

    /// 1-based index of `date`
    pub fn day_index(&self, date: NaiveDate) -> Result<usize> {
        let offset = (date - self.min_date).num_days();
        if offset < 0 || offset as usize >= self.total_days {
            return Err(ForecastError::Data(format!(
                "Date {} lies outside the indexed range starting {} ({} days)",
                date, self.min_date, self.total_days
            )));
        }
        Ok(offset as usize + 1)
    }

    /// Label used for panel columns, e.g. `Day7`
    pub fn day_label(day: usize) -> String {
        format!("Day{}", day)
    }
}

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::{Error, Result};

/// Row selection for the pair export. Both dates are inclusive.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportFilter {
    start: NaiveDate,
    end: NaiveDate,
    event_types: Vec<String>,
    advertisers: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    min_deposit: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_deposit: Option<f64>,
}

impl ExportFilter {
    /// Rows must match one of `event_types` and one of `advertisers`. Both lists need
    /// at least one non-blank value; duplicates are dropped.
    pub fn new<E, A>(start: NaiveDate, end: NaiveDate, event_types: E, advertisers: A) -> Result<Self>
    where
        E: IntoIterator,
        E::Item: Into<String>,
        A: IntoIterator,
        A::Item: Into<String>,
    {
        if start > end {
            return Err(Error::InvalidFilter(format!(
                "start date {} is after end date {}",
                start, end
            )));
        }
        if end.succ_opt().is_none() {
            return Err(Error::InvalidFilter(format!("end date {} is out of range", end)));
        }

        Ok(Self {
            start,
            end,
            event_types: distinct_values("event type", event_types)?,
            advertisers: distinct_values("advertiser", advertisers)?,
            min_deposit: None,
            max_deposit: None,
        })
    }

    /// Restrict to rows whose `converted_amount` lies within the given bounds
    pub fn with_deposit_range(mut self, min: Option<f64>, max: Option<f64>) -> Result<Self> {
        for bound in [min, max].into_iter().flatten() {
            if !bound.is_finite() {
                return Err(Error::InvalidFilter(format!("deposit bound {} is not finite", bound)));
            }
        }
        if let (Some(min), Some(max)) = (min, max) {
            if min > max {
                return Err(Error::InvalidFilter(format!(
                    "min deposit {} is above max deposit {}",
                    min, max
                )));
            }
        }
        self.min_deposit = min;
        self.max_deposit = max;
        Ok(self)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// First day past the window, used as the exclusive upper bound in queries
    pub fn end_exclusive(&self) -> NaiveDate {
        // checked in `new`
        self.end.succ_opt().unwrap_or(NaiveDate::MAX)
    }

    pub fn event_types(&self) -> &[String] {
        &self.event_types
    }

    pub fn advertisers(&self) -> &[String] {
        &self.advertisers
    }

    pub fn min_deposit(&self) -> Option<f64> {
        self.min_deposit
    }

    pub fn max_deposit(&self) -> Option<f64> {
        self.max_deposit
    }
}

fn distinct_values<I>(what: &str, values: I) -> Result<Vec<String>>
where
    I: IntoIterator,
    I::Item: Into<String>,
{
    let mut out: Vec<String> = Vec::new();
    for value in values {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(Error::InvalidFilter(format!("{} must not be blank", what)));
        }
        if !out.contains(&value) {
            out.push(value);
        }
    }
    if out.is_empty() {
        return Err(Error::InvalidFilter(format!("at least one {} is required", what)));
    }
    Ok(out)
}

/// Parse a `YYYY-MM-DD` date argument
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
        Error::InvalidFilter(format!("invalid date '{}', expected YYYY-MM-DD", s))
    })
}

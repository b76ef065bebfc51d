use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::{Error, Result};

pub const DEFAULT_LISTING_LIMIT: usize = 50;

/// A column whose distinct values can be listed to pick export filters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    EventType,
    Advertiser,
}

impl Dimension {
    pub fn column(self) -> &'static str {
        match self {
            Dimension::EventType => "event_type",
            Dimension::Advertiser => "advertiser",
        }
    }
}

#[async_trait]
pub trait ValueSource: Send {
    /// Up to `limit` distinct non-empty values, ordered
    async fn distinct_values(&mut self, dimension: Dimension, limit: usize) -> Result<Vec<String>>;
}

/// Distinct values of `dimension`, sorted by byte order and capped at `limit`
pub async fn list_values<S>(source: &mut S, dimension: Dimension, limit: usize) -> Result<Vec<String>>
where
    S: ValueSource + ?Sized,
{
    if limit == 0 {
        return Err(Error::InvalidFilter("limit must be at least 1".to_string()));
    }

    let values: BTreeSet<String> = source
        .distinct_values(dimension, limit)
        .await?
        .into_iter()
        .filter(|v| !v.trim().is_empty())
        .collect();
    tracing::debug!(column = dimension.column(), count = values.len(), "listed values");

    Ok(values.into_iter().take(limit).collect())
}

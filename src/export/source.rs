use async_trait::async_trait;
use serde::Serialize;
use sqlx::{Connection, PgConnection};

use super::filter::ExportFilter;
use super::listing::{Dimension, ValueSource};
use crate::config::Config;
use crate::db;
use crate::error::Result;

const DISTINCT_PAIRS: &str = r#"
    SELECT DISTINCT
        ue.user_agent,
        ue.ip_address
    FROM public.user_events ue
    WHERE ue.external_user_id IS NOT NULL
      AND ue.event_date >= $1::date
      AND ue.event_date < $2::date
      AND ue.event_type = ANY($3)
      AND ue.advertiser = ANY($4)
      AND ($5::float8 IS NULL OR ue.converted_amount >= $5::float8)
      AND ($6::float8 IS NULL OR ue.converted_amount <= $6::float8)
      AND ue.user_agent IS NOT NULL
      AND ue.user_agent != ''
      AND ue.ip_address IS NOT NULL
      AND ue.ip_address != ''
    ORDER BY ue.user_agent, ue.ip_address
"#;

const PAIR_STATS: &str = r#"
    SELECT
        COUNT(*) AS total_events,
        COUNT(DISTINCT ue.external_user_id) AS unique_users,
        COUNT(DISTINCT ue.user_agent || '|' || ue.ip_address) AS unique_pairs
    FROM public.user_events ue
    WHERE ue.external_user_id IS NOT NULL
      AND ue.event_date >= $1::date
      AND ue.event_date < $2::date
      AND ue.event_type = ANY($3)
      AND ue.advertiser = ANY($4)
      AND ($5::float8 IS NULL OR ue.converted_amount >= $5::float8)
      AND ($6::float8 IS NULL OR ue.converted_amount <= $6::float8)
      AND ue.user_agent IS NOT NULL
      AND ue.user_agent != ''
      AND ue.ip_address IS NOT NULL
      AND ue.ip_address != ''
"#;

const DISTINCT_EVENT_TYPES: &str = r#"
    SELECT DISTINCT event_type
    FROM public.user_events
    WHERE event_type IS NOT NULL
      AND event_type != ''
    ORDER BY event_type
    LIMIT $1
"#;

const DISTINCT_ADVERTISERS: &str = r#"
    SELECT DISTINCT advertiser
    FROM public.user_events
    WHERE advertiser IS NOT NULL
      AND advertiser != ''
    ORDER BY advertiser
    LIMIT $1
"#;

/// A distinct (user agent, IP address) combination. Orders by user agent, then IP.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, sqlx::FromRow)]
pub struct UaIpPair {
    pub user_agent: String,
    pub ip_address: String,
}

impl UaIpPair {
    pub fn new(user_agent: impl Into<String>, ip_address: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            ip_address: ip_address.into(),
        }
    }
}

/// Aggregate counts over the rows an export selects
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct ExportStats {
    pub total_events: i64,
    pub unique_users: i64,
    pub unique_pairs: i64,
}

#[async_trait]
pub trait PairSource: Send {
    async fn distinct_pairs(&mut self, filter: &ExportFilter) -> Result<Vec<UaIpPair>>;

    async fn stats(&mut self, filter: &ExportFilter) -> Result<ExportStats>;
}

/// Reads from `public.user_events` over a single Postgres connection
pub struct PgEventSource {
    conn: PgConnection,
}

impl PgEventSource {
    pub async fn connect(config: &Config) -> Result<Self> {
        Ok(Self {
            conn: db::connect(config).await?,
        })
    }

    pub async fn close(self) -> Result<()> {
        Ok(self.conn.close().await?)
    }
}

#[async_trait]
impl PairSource for PgEventSource {
    async fn distinct_pairs(&mut self, filter: &ExportFilter) -> Result<Vec<UaIpPair>> {
        tracing::debug!(
            start = %filter.start(),
            end = %filter.end(),
            event_types = ?filter.event_types(),
            advertisers = ?filter.advertisers(),
            "querying distinct pairs"
        );
        let pairs = sqlx::query_as::<_, UaIpPair>(DISTINCT_PAIRS)
            .bind(filter.start())
            .bind(filter.end_exclusive())
            .bind(filter.event_types())
            .bind(filter.advertisers())
            .bind(filter.min_deposit())
            .bind(filter.max_deposit())
            .fetch_all(&mut self.conn)
            .await?;
        Ok(pairs)
    }

    async fn stats(&mut self, filter: &ExportFilter) -> Result<ExportStats> {
        let stats = sqlx::query_as::<_, ExportStats>(PAIR_STATS)
            .bind(filter.start())
            .bind(filter.end_exclusive())
            .bind(filter.event_types())
            .bind(filter.advertisers())
            .bind(filter.min_deposit())
            .bind(filter.max_deposit())
            .fetch_one(&mut self.conn)
            .await?;
        Ok(stats)
    }
}

#[async_trait]
impl ValueSource for PgEventSource {
    async fn distinct_values(&mut self, dimension: Dimension, limit: usize) -> Result<Vec<String>> {
        let sql = match dimension {
            Dimension::EventType => DISTINCT_EVENT_TYPES,
            Dimension::Advertiser => DISTINCT_ADVERTISERS,
        };
        let values = sqlx::query_scalar::<_, String>(sql)
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&mut self.conn)
            .await?;
        Ok(values)
    }
}

use std::collections::HashSet;

use async_trait::async_trait;
use serde::Serialize;
use sqlx::{Connection, PgConnection};

use super::descriptor::IndexDescriptor;
use crate::config::Config;
use crate::db;
use crate::error::{Error, Result};

const EXISTING_INDEX_NAMES: &str = r#"
    SELECT indexname::text
    FROM pg_indexes
    WHERE tablename = 'user_events'
      AND schemaname = 'public'
"#;

const LIST_INDEXES: &str = r#"
    SELECT indexname::text AS name, indexdef AS definition
    FROM pg_indexes
    WHERE tablename = 'user_events'
      AND schemaname = 'public'
    ORDER BY indexname
"#;

/// An index as recorded in the database catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct CatalogIndex {
    pub name: String,
    pub definition: String,
}

/// Index metadata and DDL for the target table
#[async_trait]
pub trait Catalog: Send {
    async fn existing_index_names(&mut self) -> Result<HashSet<String>>;

    /// Run one conditional creation statement and commit it before returning
    async fn create_index(&mut self, descriptor: &IndexDescriptor) -> Result<()>;

    /// All indexes on the target table, ordered by name
    async fn list_indexes(&mut self) -> Result<Vec<CatalogIndex>>;
}

/// Catalog backed by a single Postgres connection
pub struct PgCatalog {
    conn: PgConnection,
}

impl PgCatalog {
    pub async fn connect(config: &Config) -> Result<Self> {
        Ok(Self {
            conn: db::connect(config).await?,
        })
    }

    pub async fn close(self) -> Result<()> {
        self.conn.close().await.map_err(Error::Query)
    }
}

#[async_trait]
impl Catalog for PgCatalog {
    async fn existing_index_names(&mut self) -> Result<HashSet<String>> {
        let names: Vec<String> = sqlx::query_scalar(EXISTING_INDEX_NAMES)
            .fetch_all(&mut self.conn)
            .await
            .map_err(Error::Catalog)?;
        tracing::debug!(count = names.len(), "read existing index names");
        Ok(names.into_iter().collect())
    }

    async fn create_index(&mut self, descriptor: &IndexDescriptor) -> Result<()> {
        let mut tx = self.conn.begin().await?;
        sqlx::query(descriptor.definition).execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn list_indexes(&mut self) -> Result<Vec<CatalogIndex>> {
        sqlx::query_as::<_, CatalogIndex>(LIST_INDEXES)
            .fetch_all(&mut self.conn)
            .await
            .map_err(Error::Catalog)
    }
}

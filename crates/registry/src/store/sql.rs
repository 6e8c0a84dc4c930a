//! Relational store over sqlx (SQLite driver)
//!
//! One table per region. Every write bumps `version`; conditional writes
//! use `WHERE version = ?` and report a lost race as `Error::Conflict`.

use super::{BackendInfo, Consistency, StorageRegion, StoredTicket, TicketStore};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use std::str::FromStr;
use std::time::Duration;
use ticketry_core::{Error, Result, TicketRecord};

const BACKEND: &str = "sql";

/// How long a caller waits for a pooled connection
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, FromRow)]
struct TicketRow {
    id: String,
    body: String,
    version: i64,
}

impl TicketRow {
    fn into_stored(self) -> Result<StoredTicket> {
        let record = TicketRecord::from_json(&self.id, &self.body)?;
        Ok(StoredTicket::new(self.id, record).with_revision(self.version.to_string()))
    }
}

/// Strongly consistent store backed by a SQL database
pub struct SqlTicketStore {
    pool: SqlitePool,
    acquire_timeout: Duration,
}

impl SqlTicketStore {
    /// Connect to `url`, creating the database file when missing
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with(url, 5, DEFAULT_ACQUIRE_TIMEOUT).await
    }

    pub async fn connect_with(
        url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| Error::configuration(format!("invalid sql url '{url}': {e}")))?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect_with(options)
            .await
            .map_err(|e| Self::driver_error("connect", acquire_timeout, e))?;
        Ok(Self {
            pool,
            acquire_timeout,
        })
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self {
            pool,
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn error(&self, operation: &'static str, error: sqlx::Error) -> Error {
        Self::driver_error(operation, self.acquire_timeout, error)
    }

    fn driver_error(
        operation: &'static str,
        acquire_timeout: Duration,
        error: sqlx::Error,
    ) -> Error {
        match error {
            sqlx::Error::PoolTimedOut => {
                Error::timeout(format!("{BACKEND} {operation}"), acquire_timeout)
            }
            other => Error::backend_with_source(BACKEND, operation, other),
        }
    }

    async fn exists(&self, table: &str, key: &str) -> Result<bool> {
        let row: Option<(i64,)> = sqlx::query_as(&format!("SELECT 1 FROM {table} WHERE id = ?"))
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| self.error("exists", e))?;
        Ok(row.is_some())
    }

    /// A zero-row conditional write is either a lost race or a missing key
    async fn settle(
        &self,
        operation: &'static str,
        table: &str,
        key: &str,
        affected: u64,
        conditional: bool,
    ) -> Result<bool> {
        if affected > 0 {
            return Ok(true);
        }
        if conditional && self.exists(table, key).await? {
            return Err(Error::conflict(key, operation));
        }
        Ok(false)
    }
}

fn principal_of(record: &TicketRecord) -> Option<&str> {
    record.as_ticket().ok().and_then(|ticket| ticket.principal_id())
}

fn parse_revision(key: &str, revision: &str) -> Result<i64> {
    revision
        .parse()
        .map_err(|_| Error::conflict(key, "parse revision"))
}

#[async_trait]
impl TicketStore for SqlTicketStore {
    fn backend(&self) -> BackendInfo {
        BackendInfo {
            name: BACKEND,
            consistency: Consistency::Strong,
            native_expiry: false,
        }
    }

    async fn initialize(&self, regions: &[StorageRegion]) -> Result<()> {
        for region in regions {
            let table = &region.name;
            sqlx::query(&format!(
                "CREATE TABLE IF NOT EXISTS {table} (
                    id TEXT PRIMARY KEY NOT NULL,
                    kind TEXT NOT NULL,
                    principal TEXT,
                    body TEXT NOT NULL,
                    version INTEGER NOT NULL
                )"
            ))
            .execute(&self.pool)
            .await
            .map_err(|e| self.error("initialize", e))?;

            sqlx::query(&format!(
                "CREATE INDEX IF NOT EXISTS {table}_principal ON {table} (principal)"
            ))
            .execute(&self.pool)
            .await
            .map_err(|e| self.error("initialize", e))?;

            tracing::debug!(table = %table, "ticket table ready");
        }
        Ok(())
    }

    async fn fetch(&self, region: &StorageRegion, key: &str) -> Result<Option<StoredTicket>> {
        let row: Option<TicketRow> = sqlx::query_as(&format!(
            "SELECT id, body, version FROM {} WHERE id = ?",
            region.name
        ))
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| self.error("fetch", e))?;

        row.map(TicketRow::into_stored).transpose()
    }

    async fn insert(&self, region: &StorageRegion, ticket: StoredTicket) -> Result<()> {
        let body = ticket.record.to_json()?;
        let table = &region.name;
        sqlx::query(&format!(
            "INSERT INTO {table} (id, kind, principal, body, version) VALUES (?, ?, ?, ?, 1)
             ON CONFLICT(id) DO UPDATE SET
                kind = excluded.kind,
                principal = excluded.principal,
                body = excluded.body,
                version = {table}.version + 1"
        ))
        .bind(&ticket.key)
        .bind(region.kind.as_str())
        .bind(principal_of(&ticket.record))
        .bind(body)
        .execute(&self.pool)
        .await
        .map_err(|e| self.error("insert", e))?;
        Ok(())
    }

    async fn replace(
        &self,
        region: &StorageRegion,
        ticket: StoredTicket,
        expected: Option<&str>,
    ) -> Result<bool> {
        let body = ticket.record.to_json()?;
        let table = &region.name;
        let principal = principal_of(&ticket.record);

        let result = match expected {
            Some(revision) => {
                sqlx::query(&format!(
                    "UPDATE {table} SET principal = ?, body = ?, version = version + 1
                     WHERE id = ? AND version = ?"
                ))
                .bind(principal)
                .bind(body)
                .bind(&ticket.key)
                .bind(parse_revision(&ticket.key, revision)?)
                .execute(&self.pool)
                .await
            }
            None => {
                sqlx::query(&format!(
                    "UPDATE {table} SET principal = ?, body = ?, version = version + 1 WHERE id = ?"
                ))
                .bind(principal)
                .bind(body)
                .bind(&ticket.key)
                .execute(&self.pool)
                .await
            }
        }
        .map_err(|e| self.error("replace", e))?;

        self.settle("replace", table, &ticket.key, result.rows_affected(), expected.is_some())
            .await
    }

    async fn remove(
        &self,
        region: &StorageRegion,
        key: &str,
        expected: Option<&str>,
    ) -> Result<bool> {
        let table = &region.name;
        let result = match expected {
            Some(revision) => {
                sqlx::query(&format!("DELETE FROM {table} WHERE id = ? AND version = ?"))
                    .bind(key)
                    .bind(parse_revision(key, revision)?)
                    .execute(&self.pool)
                    .await
            }
            None => {
                sqlx::query(&format!("DELETE FROM {table} WHERE id = ?"))
                    .bind(key)
                    .execute(&self.pool)
                    .await
            }
        }
        .map_err(|e| self.error("remove", e))?;

        self.settle("remove", table, key, result.rows_affected(), expected.is_some())
            .await
    }

    async fn scan(&self, region: &StorageRegion) -> Result<Vec<StoredTicket>> {
        let rows: Vec<TicketRow> = sqlx::query_as(&format!(
            "SELECT id, body, version FROM {}",
            region.name
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| self.error("scan", e))?;

        rows.into_iter().map(TicketRow::into_stored).collect()
    }

    async fn count(&self, region: &StorageRegion) -> Result<usize> {
        let (count,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {}", region.name))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| self.error("count", e))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    async fn clear(&self, region: &StorageRegion) -> Result<usize> {
        let result = sqlx::query(&format!("DELETE FROM {}", region.name))
            .execute(&self.pool)
            .await
            .map_err(|e| self.error("clear", e))?;
        Ok(usize::try_from(result.rows_affected()).unwrap_or(usize::MAX))
    }
}

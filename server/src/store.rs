//! Relational store behind the to-do handlers.
//!
//! # Design
//! `Store` owns an `sqlx` SQLite pool and exposes three primitives over SQL
//! text and positional [`Arg`]s: [`Store::query_rows`], [`Store::query_row`]
//! and [`Store::exec`]. Each one is bounded by the caller's
//! [`CallContext`]. The pool is shared by every concurrent call; SQLite
//! serializes the statements, so handlers never lock.

use std::str::FromStr;

use sqlx::query::Query;
use sqlx::sqlite::{
    SqliteArguments, SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow,
};
use sqlx::{Sqlite, SqlitePool};
use tracing::info;

use crate::context::CallContext;
use crate::error::StoreError;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://greeter.db";

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS todos (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    status INTEGER NOT NULL,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
)";

/// A positional statement argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    Int(i64),
    Text(String),
}

impl From<i64> for Arg {
    fn from(value: i64) -> Self {
        Arg::Int(value)
    }
}

impl From<i32> for Arg {
    fn from(value: i32) -> Self {
        Arg::Int(i64::from(value))
    }
}

impl From<&str> for Arg {
    fn from(value: &str) -> Self {
        Arg::Text(value.to_string())
    }
}

impl From<String> for Arg {
    fn from(value: String) -> Self {
        Arg::Text(value)
    }
}

/// Shared handle to the database. Cloning is cheap and shares the pool.
#[derive(Debug, Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Opens (creating if missing) the database at `url` and initializes the
    /// schema.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        let store = Store { pool };
        store.init().await?;
        info!(url, "database initialized");
        Ok(store)
    }

    /// A private in-memory database. The pool is pinned to one connection
    /// that never expires, since each SQLite memory connection is its own
    /// database.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        let store = Store { pool };
        store.init().await?;
        Ok(store)
    }

    /// Creates the `todos` table if it does not exist. Safe to call on every
    /// start.
    pub async fn init(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_TABLE).execute(&self.pool).await?;
        Ok(())
    }

    pub async fn query_rows(
        &self,
        ctx: &CallContext,
        sql: &str,
        args: &[Arg],
    ) -> Result<Vec<SqliteRow>, StoreError> {
        ctx.run(async {
            bind_all(sql, args)
                .fetch_all(&self.pool)
                .await
                .map_err(StoreError::from)
        })
        .await
    }

    /// `Ok(None)` is the "no rows" signal.
    pub async fn query_row(
        &self,
        ctx: &CallContext,
        sql: &str,
        args: &[Arg],
    ) -> Result<Option<SqliteRow>, StoreError> {
        ctx.run(async {
            bind_all(sql, args)
                .fetch_optional(&self.pool)
                .await
                .map_err(StoreError::from)
        })
        .await
    }

    /// Returns the number of affected rows.
    pub async fn exec(&self, ctx: &CallContext, sql: &str, args: &[Arg]) -> Result<u64, StoreError> {
        ctx.run(async {
            bind_all(sql, args)
                .execute(&self.pool)
                .await
                .map(|result| result.rows_affected())
                .map_err(StoreError::from)
        })
        .await
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn bind_all<'q>(sql: &'q str, args: &'q [Arg]) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    args.iter().fold(sqlx::query(sql), |query, arg| match arg {
        Arg::Int(value) => query.bind(*value),
        Arg::Text(value) => query.bind(value.as_str()),
    })
}

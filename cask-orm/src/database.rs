//! # Database Module
//!
//! This module provides the database provider Cask ORM consumes: connection
//! pooling, driver detection, the [`Connection`] abstraction shared by pools
//! and transactions, and raw SQL queries.

// ============================================================================
// External Crate Imports
// ============================================================================

use futures::future::BoxFuture;
use sqlx::{
    AnyPool,
    any::{AnyArguments, AnyQueryResult, AnyRow},
};
use std::sync::Arc;

// ============================================================================
// Internal Crate Imports
// ============================================================================

use crate::{
    attributes::{Attributes, FromAttributes},
    config::DatabaseConfig,
    errors::{Error, Result},
    hydration::decode_row,
    model::Model,
    query_builder::QueryBuilder,
    scope::ScopeRegistry,
    transaction::{Transaction, TransactionHandle},
    value::Value,
};

// ============================================================================
// Database Driver Enum
// ============================================================================

/// Supported database drivers for Cask ORM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Drivers {
    /// PostgreSQL driver
    Postgres,
    /// MySQL driver
    MySQL,
    /// SQLite driver
    SQLite,
}

impl Drivers {
    /// Detects the driver from a connection URL.
    pub fn from_url(url: &str) -> Self {
        if url.starts_with("postgres") {
            Drivers::Postgres
        } else if url.starts_with("mysql") || url.starts_with("mariadb") {
            Drivers::MySQL
        } else {
            Drivers::SQLite
        }
    }
}

// ============================================================================
// Database Struct
// ============================================================================

/// The main entry point for Cask ORM database operations.
///
/// `Database` manages a connection pool and the scope registry of every
/// model queried through it. It is cheap to clone and safe to share across
/// tasks.
#[derive(Debug, Clone)]
pub struct Database {
    /// The underlying SQLx connection pool
    pub(crate) pool: AnyPool,
    /// The detected database driver
    pub(crate) driver: Drivers,
    /// Connection name, used by `ConnectionManager`
    pub(crate) name: Arc<str>,
    pub(crate) scopes: Arc<ScopeRegistry>,
}

impl Database {
    /// Creates a new DatabaseBuilder for configuring the connection.
    pub fn builder() -> DatabaseBuilder {
        DatabaseBuilder::new()
    }

    /// Connects to a database using the provided connection string.
    pub async fn connect(url: &str) -> Result<Self> {
        DatabaseBuilder::new().connect(url).await
    }

    /// Connects using a [`DatabaseConfig`].
    pub async fn from_config(config: &DatabaseConfig) -> Result<Self> {
        let mut builder = DatabaseBuilder::new().max_connections(config.max_connections);
        if let Some(name) = &config.name {
            builder = builder.name(name);
        }
        builder.connect(&config.url).await
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn driver(&self) -> Drivers {
        self.driver
    }

    /// The scope registry of this database handle.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// db.scopes().add_global::<Post>("published", |q, _| q.equals("published", true));
    /// ```
    pub fn scopes(&self) -> &ScopeRegistry {
        &self.scopes
    }

    /// Starts building a query for the specified model.
    pub fn model<M: Model>(&self) -> QueryBuilder<M, Self> {
        QueryBuilder::new(self.clone())
    }

    /// Creates a raw SQL query. Raw queries return plain attribute rows,
    /// never model instances.
    pub fn raw<'a>(&self, sql: &'a str) -> RawQuery<'a, Self> {
        RawQuery::new(self.clone(), sql)
    }

    /// Starts a new database transaction.
    ///
    /// The caller owns the outcome: call [`Transaction::commit`] or
    /// [`Transaction::rollback`].
    pub async fn begin(&self) -> Result<Transaction> {
        let tx = self.pool.begin().await?;
        log::debug!("[{}] transaction started", self.name);
        Ok(Transaction::new(tx, self.driver, self.scopes.clone()))
    }

    /// Closes the pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

// ============================================================================
// DatabaseBuilder Struct
// ============================================================================

/// Configures and opens a [`Database`].
pub struct DatabaseBuilder {
    max_connections: u32,
    name: String,
}

impl Default for DatabaseBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DatabaseBuilder {
    pub fn new() -> Self {
        Self { max_connections: 5, name: "primary".to_string() }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub async fn connect(self, url: &str) -> Result<Database> {
        sqlx::any::install_default_drivers();
        let pool = sqlx::any::AnyPoolOptions::new().max_connections(self.max_connections).connect(url).await?;
        let driver = Drivers::from_url(url);
        log::info!("[{}] connected ({:?}, max {} connections)", self.name, driver, self.max_connections);
        Ok(Database { pool, driver, name: Arc::from(self.name), scopes: Arc::new(ScopeRegistry::new()) })
    }
}

// ============================================================================
// Connection Trait
// ============================================================================

/// Something statements can run on: a pool or a transaction.
pub trait Connection: Send + Sync {
    fn driver(&self) -> Drivers;

    fn scopes(&self) -> &Arc<ScopeRegistry>;

    /// The transaction statements run in, if any. Instances hydrated or
    /// created through this connection get bound to it.
    fn transaction(&self) -> Option<TransactionHandle> {
        None
    }

    fn execute<'a, 'q: 'a>(&'a self, sql: &'q str, args: AnyArguments<'q>) -> BoxFuture<'a, Result<AnyQueryResult>>;
    fn fetch_all<'a, 'q: 'a>(&'a self, sql: &'q str, args: AnyArguments<'q>) -> BoxFuture<'a, Result<Vec<AnyRow>>>;
    fn fetch_one<'a, 'q: 'a>(&'a self, sql: &'q str, args: AnyArguments<'q>) -> BoxFuture<'a, Result<AnyRow>>;
    fn fetch_optional<'a, 'q: 'a>(&'a self, sql: &'q str, args: AnyArguments<'q>) -> BoxFuture<'a, Result<Option<AnyRow>>>;
}

impl Connection for Database {
    fn driver(&self) -> Drivers {
        self.driver
    }

    fn scopes(&self) -> &Arc<ScopeRegistry> {
        &self.scopes
    }

    fn execute<'a, 'q: 'a>(&'a self, sql: &'q str, args: AnyArguments<'q>) -> BoxFuture<'a, Result<AnyQueryResult>> {
        Box::pin(async move {
            log::debug!("[{}] {}", self.name, sql);
            Ok(sqlx::query_with(sql, args).execute(&self.pool).await?)
        })
    }

    fn fetch_all<'a, 'q: 'a>(&'a self, sql: &'q str, args: AnyArguments<'q>) -> BoxFuture<'a, Result<Vec<AnyRow>>> {
        Box::pin(async move {
            log::debug!("[{}] {}", self.name, sql);
            Ok(sqlx::query_with(sql, args).fetch_all(&self.pool).await?)
        })
    }

    fn fetch_one<'a, 'q: 'a>(&'a self, sql: &'q str, args: AnyArguments<'q>) -> BoxFuture<'a, Result<AnyRow>> {
        Box::pin(async move {
            log::debug!("[{}] {}", self.name, sql);
            Ok(sqlx::query_with(sql, args).fetch_one(&self.pool).await?)
        })
    }

    fn fetch_optional<'a, 'q: 'a>(&'a self, sql: &'q str, args: AnyArguments<'q>) -> BoxFuture<'a, Result<Option<AnyRow>>> {
        Box::pin(async move {
            log::debug!("[{}] {}", self.name, sql);
            Ok(sqlx::query_with(sql, args).fetch_optional(&self.pool).await?)
        })
    }
}

// ============================================================================
// Raw SQL Query Builder
// ============================================================================

/// A hand-written statement. Placeholders are passed to the driver as
/// written (`?` for SQLite/MySQL, `$n` for PostgreSQL).
pub struct RawQuery<'a, C> {
    conn: C,
    sql: &'a str,
    args: AnyArguments<'static>,
    error: Option<Error>,
}

impl<'a, C> RawQuery<'a, C>
where
    C: Connection,
{
    pub(crate) fn new(conn: C, sql: &'a str) -> Self {
        Self { conn, sql, args: AnyArguments::default(), error: None }
    }

    /// Binds the next positional argument.
    pub fn bind(mut self, value: impl Into<Value>) -> Self {
        if self.error.is_none() {
            if let Err(e) = value.into().bind(&mut self.args) {
                self.error = Some(e);
            }
        }
        self
    }

    pub async fn fetch_all(self) -> Result<Vec<Attributes>> {
        let (conn, sql, args) = self.into_parts()?;
        let rows = conn.fetch_all(sql, args).await?;
        rows.iter().map(decode_row).collect()
    }

    pub async fn fetch_one(self) -> Result<Attributes> {
        let (conn, sql, args) = self.into_parts()?;
        let row = conn.fetch_one(sql, args).await?;
        decode_row(&row)
    }

    pub async fn fetch_optional(self) -> Result<Option<Attributes>> {
        let (conn, sql, args) = self.into_parts()?;
        let row = conn.fetch_optional(sql, args).await?;
        row.as_ref().map(decode_row).transpose()
    }

    /// Fetches every row and maps it into `T`.
    pub async fn fetch_as<T: FromAttributes>(self) -> Result<Vec<T>> {
        self.fetch_all().await?.iter().map(T::from_attributes).collect()
    }

    /// Executes the statement and returns the number of affected rows.
    pub async fn execute(self) -> Result<u64> {
        let (conn, sql, args) = self.into_parts()?;
        let result = conn.execute(sql, args).await?;
        Ok(result.rows_affected())
    }

    fn into_parts(self) -> Result<(C, &'a str, AnyArguments<'static>)> {
        match self.error {
            Some(e) => Err(e),
            None => Ok((self.conn, self.sql, self.args)),
        }
    }
}

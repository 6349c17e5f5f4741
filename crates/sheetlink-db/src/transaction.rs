//! Scoped transactions.
//!
//! A [`Transaction`] owns one pooled connection for its lifetime. Dropping
//! it without [`Transaction::commit`] rolls back and returns the connection
//! to the pool.

use sqlx::{PgConnection, Postgres};

use sheetlink_core::Result;

use crate::error::SqlxResultExt;
use crate::Connection;

/// Transaction isolation levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IsolationLevel {
    /// Read committed (PostgreSQL default)
    #[default]
    ReadCommitted,
    /// Repeatable read; every statement sees one snapshot
    RepeatableRead,
}

impl IsolationLevel {
    pub fn to_sql(&self) -> &'static str {
        match self {
            IsolationLevel::ReadCommitted => "READ COMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
        }
    }
}

/// Transaction access mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessMode {
    #[default]
    ReadWrite,
    ReadOnly,
}

impl AccessMode {
    pub fn to_sql(&self) -> &'static str {
        match self {
            AccessMode::ReadWrite => "READ WRITE",
            AccessMode::ReadOnly => "READ ONLY",
        }
    }
}

/// Isolation and access mode for a transaction.
///
/// ```rust,ignore
/// // Consistent snapshot for a whole-sheet read
/// let options = TransactionOptions::snapshot();
/// let mut tx = Transaction::begin(&conn, options).await?;
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransactionOptions {
    pub isolation_level: IsolationLevel,
    pub access_mode: AccessMode,
}

impl TransactionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Repeatable-read, read-only. Used for whole-sheet reads.
    pub fn snapshot() -> Self {
        Self::new()
            .isolation_level(IsolationLevel::RepeatableRead)
            .read_only()
    }

    pub fn isolation_level(mut self, level: IsolationLevel) -> Self {
        self.isolation_level = level;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.access_mode = AccessMode::ReadOnly;
        self
    }

    /// The `SET TRANSACTION` statement for these options.
    pub fn to_sql(&self) -> String {
        format!(
            "SET TRANSACTION ISOLATION LEVEL {}, {}",
            self.isolation_level.to_sql(),
            self.access_mode.to_sql()
        )
    }
}

/// An open transaction on a pooled connection.
pub struct Transaction {
    tx: sqlx::Transaction<'static, Postgres>,
    options: TransactionOptions,
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Transaction {
    /// Checks out a connection and begins a transaction with `options`.
    ///
    /// # Errors
    ///
    /// `Timeout` if no pooled connection frees up within the acquire
    /// timeout, otherwise a storage error.
    pub async fn begin(conn: &Connection, options: TransactionOptions) -> Result<Self> {
        let mut tx = conn.pool().begin().await.during("begin")?;

        sqlx::query(&options.to_sql())
            .execute(&mut *tx)
            .await
            .during("begin")?;

        tracing::debug!(
            isolation_level = ?options.isolation_level,
            access_mode = ?options.access_mode,
            "Started transaction"
        );

        Ok(Self { tx, options })
    }

    /// Executor for queries inside the transaction.
    pub fn conn(&mut self) -> &mut PgConnection {
        &mut self.tx
    }

    pub async fn commit(self) -> Result<()> {
        self.tx.commit().await.during("commit")
    }

    pub async fn rollback(self) -> Result<()> {
        self.tx.rollback().await.during("rollback")
    }
}

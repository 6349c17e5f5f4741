//! PostgreSQL connection pool for the graph store.
//!
//! Connections come from an SQLx pool. Establishing the pool retries with a
//! doubling delay so the server can start before the database is ready.

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, instrument, warn};

use sheetlink_core::{Result, SheetError};

use crate::error::SqlxResultExt;

/// Upper bound on the wait between two connection attempts.
const MAX_RETRY_DELAY: Duration = Duration::from_secs(5);

/// How pool creation is retried while the database comes up.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    /// Wait before the first retry. Doubles on each further attempt.
    pub base_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(100),
        }
    }
}

impl RetryConfig {
    /// Fail on the first connection error.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
        }
    }

    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(1 << attempt.min(16))
            .min(MAX_RETRY_DELAY)
    }
}

/// Connection pool configuration.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Minimum number of connections in the pool.
    pub min_connections: u32,
    /// Maximum number of connections in the pool.
    pub max_connections: u32,
    /// How long a store call may wait for a pooled connection, in seconds.
    pub acquire_timeout: u64,
    /// Maximum lifetime of a connection in seconds.
    pub max_lifetime: Option<u64>,
    /// Idle timeout in seconds.
    pub idle_timeout: Option<u64>,
    /// Server-side `statement_timeout` in milliseconds, if any.
    pub statement_timeout_ms: Option<u64>,
    /// Retry configuration for connection establishment.
    pub retry: RetryConfig,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_connections: 1,
            max_connections: 10,
            acquire_timeout: 30,
            max_lifetime: Some(1800), // 30 minutes
            idle_timeout: Some(600),  // 10 minutes
            statement_timeout_ms: None,
            retry: RetryConfig::default(),
        }
    }
}

impl PoolConfig {
    /// Sets the maximum pool size.
    pub fn max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    /// Sets the server-side statement timeout.
    pub fn statement_timeout(mut self, timeout: Duration) -> Self {
        self.statement_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    fn pool_options(&self) -> PgPoolOptions {
        let mut options = PgPoolOptions::new()
            .min_connections(self.min_connections)
            .max_connections(self.max_connections)
            .acquire_timeout(Duration::from_secs(self.acquire_timeout));

        if let Some(secs) = self.max_lifetime {
            options = options.max_lifetime(Duration::from_secs(secs));
        }
        if let Some(secs) = self.idle_timeout {
            options = options.idle_timeout(Duration::from_secs(secs));
        }
        options
    }

    fn connect_options(&self, uri: &str) -> Result<PgConnectOptions> {
        let mut options = PgConnectOptions::from_str(uri)
            .map_err(|e| SheetError::storage("connect", format!("invalid connection URI: {e}")))?;
        if let Some(ms) = self.statement_timeout_ms {
            options = options.options([("statement_timeout", ms.to_string())]);
        }
        Ok(options)
    }
}

/// Pooled PostgreSQL connection handle. Cheap to clone.
#[derive(Clone)]
pub struct Connection {
    pool: PgPool,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("size", &self.pool.size())
            .field("num_idle", &self.pool.num_idle())
            .finish()
    }
}

impl Connection {
    /// Creates a connection pool, retrying per `config.retry`.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the URI is empty or invalid, or if no
    /// connection could be established after all retries.
    #[instrument(skip(uri), fields(
        min_connections = config.min_connections,
        max_connections = config.max_connections,
        max_retries = config.retry.max_retries
    ))]
    pub async fn new(uri: &str, config: PoolConfig) -> Result<Self> {
        if uri.is_empty() {
            return Err(SheetError::storage(
                "connect",
                "connection URI cannot be empty",
            ));
        }

        info!("Initializing connection pool");

        let connect_options = config.connect_options(uri)?;
        let pool = Self::connect_with_retry(config.pool_options(), connect_options, &config.retry)
            .await?;

        let conn = Self { pool };
        conn.ping().await?;

        info!("Connection pool initialized");
        Ok(conn)
    }

    async fn connect_with_retry(
        pool_options: PgPoolOptions,
        connect_options: PgConnectOptions,
        retry: &RetryConfig,
    ) -> Result<PgPool> {
        let mut attempt = 0;
        loop {
            match pool_options.clone().connect_with(connect_options.clone()).await {
                Ok(pool) => {
                    if attempt > 0 {
                        info!(attempt, "Connection established after retry");
                    }
                    return Ok(pool);
                }
                Err(e) if attempt < retry.max_retries => {
                    let delay = retry.delay_for_attempt(attempt);
                    warn!(
                        attempt,
                        max_retries = retry.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Connection failed, retrying after delay"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(SheetError::storage("connect", e)),
            }
        }
    }

    /// The underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Round-trips a trivial query.
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .during("ping")?;
        Ok(())
    }
}

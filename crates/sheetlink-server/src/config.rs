use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use clap::Parser;
use sheetlink_core::ServiceConfig;
use sheetlink_db::PoolConfig;

use crate::error::ServerError;

/// Server configuration. Every flag falls back to an environment variable,
/// and a `.env` file is loaded before parsing.
#[derive(Parser, Debug, Clone)]
#[command(name = "sheetlink-server")]
#[command(about = "HTTP API for typed sheets with chained cell lookups")]
pub struct Args {
    /// Server host address
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Server port
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// PostgreSQL connection URI; sheets are kept in memory when unset
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Maximum number of pooled database connections
    #[arg(long, env = "DB_MAX_CONNECTIONS", default_value_t = 10)]
    pub db_max_connections: u32,

    /// Deadline for a single store call, in milliseconds
    #[arg(long, env = "STORE_TIMEOUT_MS", default_value_t = 10_000)]
    pub store_timeout_ms: u64,

    /// Log filter directives (e.g. "info,sheetlink_core=debug")
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_filter: String,
}

impl Args {
    pub fn bind_addr(&self) -> Result<SocketAddr, ServerError> {
        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ServerError::BindAddress {
                host: self.host.clone(),
                source,
            })?;
        Ok(SocketAddr::new(ip, self.port))
    }

    /// Database URI, treating an empty value as unset.
    pub fn database_url(&self) -> Option<&str> {
        self.database_url.as_deref().filter(|url| !url.is_empty())
    }

    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            store_timeout: Duration::from_millis(self.store_timeout_ms),
        }
    }

    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig::default()
            .max_connections(self.db_max_connections)
            .statement_timeout(Duration::from_millis(self.store_timeout_ms))
    }
}

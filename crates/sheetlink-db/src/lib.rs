//! PostgreSQL graph store for sheetlink.
//!
//! Sheets are stored as adjacency tables: `sheets`, `sheet_columns`, and
//! `cells`, where a cell row carries either a JSONB literal or a
//! `(lookup_column, lookup_index)` edge to another cell of the same sheet.
//! Lookup chains are chased in process by the sheetlink-core resolution
//! engine over a one-hop read.
//!
//! # Architecture
//!
//! ```text
//!     SheetService (sheetlink-core)
//!           |
//!     PgGraphStore  (GraphStore impl)
//!           |
//!     Connection / Transaction  (pooled, scoped per call)
//!           |
//!         SQLx (PostgreSQL driver)
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sheetlink_core::SheetService;
//! use sheetlink_db::{PgGraphStore, PoolConfig};
//!
//! let store = PgGraphStore::connect("postgresql://localhost/sheets", PoolConfig::default()).await?;
//! store.migrate().await?;
//! let service = SheetService::new(Arc::new(store));
//! ```
//!
//! # Concurrency
//!
//! Every store call checks a connection out of the pool and returns it when
//! the call finishes, on success or failure. Literal writes are plain
//! upserts (last write wins). Lookup writes lock the sheet row so concurrent
//! lookup writers on one sheet cannot each close half of a cycle.

/// Pooled connection management with connect retries.
pub mod connection;

/// SQLSTATE-aware mapping of driver errors.
pub mod error;

/// Schema bootstrap.
pub mod schema;

/// `GraphStore` implementation.
pub mod store;

/// Scoped transactions with explicit isolation and access mode.
pub mod transaction;

pub use connection::{Connection, PoolConfig, RetryConfig};
pub use store::PgGraphStore;
pub use transaction::{AccessMode, IsolationLevel, Transaction, TransactionOptions};

pub use sheetlink_core::{Result, SheetError};

//! Typed tabular sheets whose cells hold either a literal or a lookup.
//!
//! A sheet is a fixed set of typed columns. Each column owns a sparse map of
//! cells, and a cell holds either a literal that matches the column type or a
//! reference to another cell of the same sheet. Reading a sheet resolves every
//! reference chain down to its terminal literal.
//!
//! # Architecture
//!
//! ```text
//!   request handling layer (HTTP, CLI, tests)
//!           |
//!     request  (boundary validation)
//!           |
//!     SheetService  (type checks, write paths, timeouts)
//!           |
//!     GraphStore  (adapter contract) ---- resolve (lookup chasing)
//!           |
//!   InMemoryGraphStore | sheetlink-db::PgGraphStore
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sheetlink_core::{ColumnSpec, ColumnType, InMemoryGraphStore, SetCellBody, SheetService};
//!
//! let service = SheetService::new(Arc::new(InMemoryGraphStore::new()));
//! let id = service
//!     .create_sheet(vec![ColumnSpec::new("A", ColumnType::Int)])
//!     .await?;
//! service
//!     .set_cell_in_sheet(&id, "A", SetCellBody::value(0, serde_json::json!(7)))
//!     .await?;
//! let sheet = service.get_sheet_by_id(&id).await?;
//! ```

/// Error taxonomy shared by every layer.
pub mod error;

/// In-memory graph store.
pub mod memory;

/// Boundary validation of raw JSON requests.
pub mod request;

/// Lookup chasing over the one-hop sheet graph.
pub mod resolve;

/// Orchestration of reads and writes against a graph store.
pub mod service;

/// Graph store adapter contract.
pub mod store;

/// Column type predicate.
pub mod type_system;

/// Sheets, columns, cells and their views.
pub mod types;

pub use error::{ErrorKind, Result, SheetError};
pub use memory::InMemoryGraphStore;
pub use request::{CreateSheetRequest, SetCellBody};
pub use resolve::{resolve_cell, resolve_sheet};
pub use service::{ServiceConfig, SheetService};
pub use store::GraphStore;
pub use type_system::is_same_type;
pub use types::{
    CellContent, CellIndex, CellRef, CellValue, CellView, ColumnGraph, ColumnSpec, ColumnType,
    ColumnView, PersistedCell, SheetGraph, SheetId, SheetView,
};

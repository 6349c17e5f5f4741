//! Graph store adapter contract.
//!
//! The engine never talks to a database directly. Anything able to persist
//! sheets, columns, cells and "points to another cell" edges can back it by
//! implementing [`GraphStore`]. Each method acquires whatever connection,
//! session or lock it needs for the duration of the call and releases it on
//! every exit path.

use async_trait::async_trait;

use crate::error::{Result, SheetError};
use crate::resolve;
use crate::types::{
    CellIndex, CellRef, CellValue, ColumnSpec, ColumnType, PersistedCell, SheetGraph, SheetId,
    SheetView,
};

#[async_trait]
pub trait GraphStore: Send + Sync {
    /// One-hop read of a sheet: columns, cells, and lookup edges unresolved.
    ///
    /// Fails with [`SheetError::SheetNotFound`] if the sheet does not exist.
    async fn fetch_sheet_graph(&self, sheet_id: &SheetId) -> Result<SheetGraph>;

    /// Reads a sheet with every cell replaced by its effective value.
    ///
    /// The default chases lookups in process over [`fetch_sheet_graph`]
    /// (see [`resolve::resolve_sheet`]). Stores that traverse natively may
    /// override it but must honor the same cycle and ordering rules.
    ///
    /// [`fetch_sheet_graph`]: GraphStore::fetch_sheet_graph
    async fn fetch_resolved_sheet(&self, sheet_id: &SheetId) -> Result<SheetView> {
        let graph = self.fetch_sheet_graph(sheet_id).await?;
        resolve::resolve_sheet(&graph)
    }

    /// Declared type of a column.
    ///
    /// Fails with [`SheetError::SheetNotFound`] or [`SheetError::ColumnNotFound`].
    async fn fetch_column_type(&self, sheet_id: &SheetId, column: &str) -> Result<ColumnType>;

    /// Creates or overwrites the cell at `(column, cell_index)` with a literal.
    ///
    /// The caller has already type-checked `value`. Concurrent writers to the
    /// same address are not ordered beyond what the store serializes; the last
    /// write wins.
    async fn write_cell_literal(
        &self,
        sheet_id: &SheetId,
        column: &str,
        cell_index: CellIndex,
        value: CellValue,
    ) -> Result<PersistedCell>;

    /// Makes the cell at `(column, cell_index)` a reference to `target`.
    ///
    /// Implementations resolve the new cell within the same critical section
    /// and leave the sheet untouched, returning [`SheetError::LookupCycle`], if
    /// the new edge would close a cycle. The returned cell carries the
    /// effective value.
    async fn write_cell_lookup(
        &self,
        sheet_id: &SheetId,
        column: &str,
        cell_index: CellIndex,
        target: CellRef,
    ) -> Result<PersistedCell> {
        let _ = (sheet_id, column, cell_index, target);
        Err(SheetError::Unimplemented("lookup writes"))
    }

    /// Persists a new sheet together with all its columns in one operation.
    ///
    /// The store generates the identifier. Column names are already known to
    /// be unique.
    async fn create_sheet_with_columns(&self, columns: &[ColumnSpec]) -> Result<SheetId>;
}

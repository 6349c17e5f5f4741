//! In-memory graph store.
//!
//! Keeps every sheet as a [`SheetGraph`] behind a tokio `RwLock`. Reads take
//! the shared lock, writes the exclusive one; the guard is dropped at the end
//! of each call. Nothing is persisted across process restarts.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{Result, SheetError};
use crate::resolve;
use crate::store::GraphStore;
use crate::types::{
    CellContent, CellIndex, CellRef, CellValue, ColumnSpec, ColumnType, PersistedCell, SheetGraph,
    SheetId,
};

#[derive(Clone, Default)]
pub struct InMemoryGraphStore {
    sheets: Arc<RwLock<HashMap<SheetId, SheetGraph>>>,
}

impl std::fmt::Debug for InMemoryGraphStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryGraphStore").finish_non_exhaustive()
    }
}

impl InMemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sheets currently held.
    pub async fn sheet_count(&self) -> usize {
        self.sheets.read().await.len()
    }
}

fn sheet_mut<'a>(
    sheets: &'a mut HashMap<SheetId, SheetGraph>,
    sheet_id: &SheetId,
) -> Result<&'a mut SheetGraph> {
    sheets.get_mut(sheet_id).ok_or(SheetError::SheetNotFound {
        sheet_id: *sheet_id,
    })
}

#[async_trait]
impl GraphStore for InMemoryGraphStore {
    async fn fetch_sheet_graph(&self, sheet_id: &SheetId) -> Result<SheetGraph> {
        let sheets = self.sheets.read().await;
        sheets
            .get(sheet_id)
            .cloned()
            .ok_or(SheetError::SheetNotFound {
                sheet_id: *sheet_id,
            })
    }

    async fn fetch_column_type(&self, sheet_id: &SheetId, column: &str) -> Result<ColumnType> {
        let sheets = self.sheets.read().await;
        let sheet = sheets.get(sheet_id).ok_or(SheetError::SheetNotFound {
            sheet_id: *sheet_id,
        })?;
        sheet
            .columns
            .get(column)
            .map(|c| c.column_type)
            .ok_or_else(|| SheetError::column_not_found(*sheet_id, column))
    }

    async fn write_cell_literal(
        &self,
        sheet_id: &SheetId,
        column: &str,
        cell_index: CellIndex,
        value: CellValue,
    ) -> Result<PersistedCell> {
        let mut sheets = self.sheets.write().await;
        let sheet = sheet_mut(&mut sheets, sheet_id)?;
        if !sheet.set_cell(column, cell_index, CellContent::Literal(value.clone())) {
            return Err(SheetError::column_not_found(*sheet_id, column));
        }
        Ok(PersistedCell {
            cell_index,
            value: Some(value),
        })
    }

    async fn write_cell_lookup(
        &self,
        sheet_id: &SheetId,
        column: &str,
        cell_index: CellIndex,
        target: CellRef,
    ) -> Result<PersistedCell> {
        let mut sheets = self.sheets.write().await;
        let sheet = sheet_mut(&mut sheets, sheet_id)?;
        if !sheet.columns.contains_key(&target.column_name) {
            return Err(SheetError::column_not_found(*sheet_id, target.column_name));
        }

        let column_graph = sheet
            .columns
            .get_mut(column)
            .ok_or_else(|| SheetError::column_not_found(*sheet_id, column))?;
        let previous = column_graph
            .cells
            .insert(cell_index, CellContent::Lookup(target));

        match resolve::resolve_cell(sheet, &CellRef::new(column, cell_index)) {
            Ok(value) => Ok(PersistedCell { cell_index, value }),
            Err(err) => {
                // Roll back so a rejected edge never becomes visible.
                if let Some(column_graph) = sheet.columns.get_mut(column) {
                    match previous {
                        Some(content) => {
                            column_graph.cells.insert(cell_index, content);
                        }
                        None => {
                            column_graph.cells.remove(&cell_index);
                        }
                    }
                }
                Err(err)
            }
        }
    }

    async fn create_sheet_with_columns(&self, columns: &[ColumnSpec]) -> Result<SheetId> {
        let sheet_id = SheetId::new_v4();
        let graph = columns
            .iter()
            .fold(SheetGraph::new(sheet_id), |graph, spec| {
                graph.with_column(spec.name.clone(), spec.column_type)
            });

        let mut sheets = self.sheets.write().await;
        sheets.insert(sheet_id, graph);
        Ok(sheet_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    async fn store_with_sheet() -> (InMemoryGraphStore, SheetId) {
        let store = InMemoryGraphStore::new();
        let id = store
            .create_sheet_with_columns(&[
                ColumnSpec::new("A", ColumnType::Int),
                ColumnSpec::new("B", ColumnType::Int),
                ColumnSpec::new("S", ColumnType::String),
            ])
            .await
            .unwrap();
        (store, id)
    }

    #[tokio::test]
    async fn test_create_and_fetch_empty_sheet() {
        let (store, id) = store_with_sheet().await;
        assert_eq!(store.sheet_count().await, 1);

        let view = store.fetch_resolved_sheet(&id).await.unwrap();
        assert_eq!(view.sheet_id, id);
        assert_eq!(view.columns.len(), 3);
        assert!(view.columns.iter().all(|c| c.cells.is_empty()));
    }

    #[tokio::test]
    async fn test_unknown_sheet_and_column() {
        let (store, id) = store_with_sheet().await;
        let other = SheetId::new_v4();

        let err = store.fetch_sheet_graph(&other).await.unwrap_err();
        assert_eq!(err, SheetError::SheetNotFound { sheet_id: other });

        let err = store.fetch_column_type(&id, "Z").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = store
            .write_cell_literal(&id, "Z", 0, CellValue::int(1))
            .await
            .unwrap_err();
        assert_eq!(err, SheetError::column_not_found(id, "Z"));
    }

    #[tokio::test]
    async fn test_literal_write_is_upsert() {
        let (store, id) = store_with_sheet().await;
        store.write_cell_literal(&id, "A", 3, CellValue::int(1)).await.unwrap();
        let written = store.write_cell_literal(&id, "A", 3, CellValue::int(2)).await.unwrap();
        assert_eq!(written.value, Some(CellValue::int(2)));

        let graph = store.fetch_sheet_graph(&id).await.unwrap();
        assert_eq!(graph.cell_count(), 1);
        assert_eq!(
            graph.cell(&CellRef::new("A", 3)),
            Some(&CellContent::Literal(CellValue::int(2)))
        );
    }

    #[tokio::test]
    async fn test_lookup_write_returns_effective_value() {
        let (store, id) = store_with_sheet().await;
        store.write_cell_literal(&id, "A", 0, CellValue::int(5)).await.unwrap();

        let written = store
            .write_cell_lookup(&id, "B", 1, CellRef::new("A", 0))
            .await
            .unwrap();
        assert_eq!(written.value, Some(CellValue::int(5)));

        let dangling = store
            .write_cell_lookup(&id, "B", 2, CellRef::new("A", 99))
            .await
            .unwrap();
        assert_eq!(dangling.value, None);
    }

    #[tokio::test]
    async fn test_cycle_closing_lookup_is_rolled_back() {
        let (store, id) = store_with_sheet().await;
        store.write_cell_literal(&id, "A", 0, CellValue::int(5)).await.unwrap();
        store
            .write_cell_lookup(&id, "B", 0, CellRef::new("A", 0))
            .await
            .unwrap();

        let err = store
            .write_cell_lookup(&id, "A", 0, CellRef::new("B", 0))
            .await
            .unwrap_err();
        assert!(matches!(err, SheetError::LookupCycle { .. }));

        // The literal that was about to be replaced is back in place.
        let graph = store.fetch_sheet_graph(&id).await.unwrap();
        assert_eq!(
            graph.cell(&CellRef::new("A", 0)),
            Some(&CellContent::Literal(CellValue::int(5)))
        );
        let view = store.fetch_resolved_sheet(&id).await.unwrap();
        assert_eq!(
            view.column("B").unwrap().cell(0).unwrap().value,
            Some(CellValue::int(5))
        );

        let err = store
            .write_cell_lookup(&id, "A", 7, CellRef::new("A", 7))
            .await
            .unwrap_err();
        assert!(matches!(err, SheetError::LookupCycle { .. }));
        let graph = store.fetch_sheet_graph(&id).await.unwrap();
        assert!(graph.cell(&CellRef::new("A", 7)).is_none());
    }

    #[tokio::test]
    async fn test_lookup_to_unknown_column() {
        let (store, id) = store_with_sheet().await;
        let err = store
            .write_cell_lookup(&id, "A", 0, CellRef::new("Nope", 0))
            .await
            .unwrap_err();
        assert_eq!(err, SheetError::column_not_found(id, "Nope"));
    }
}

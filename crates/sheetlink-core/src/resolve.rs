//! Resolution engine.
//!
//! Computes effective values by walking lookup edges of a [`SheetGraph`]
//! until a literal (or an empty slot) is reached. The walk is iterative and
//! keeps a visited set keyed by cell address, so a cycle is reported as
//! [`SheetError::LookupCycle`] instead of looping or overflowing the stack.

use std::collections::{HashMap, HashSet};

use crate::error::{Result, SheetError};
use crate::types::{CellContent, CellRef, CellValue, CellView, ColumnView, SheetGraph, SheetView};

/// Resolves every present cell of every column.
///
/// Columns come out ordered by name and cells by index. A column with no
/// cells yields an empty cell list.
pub fn resolve_sheet(graph: &SheetGraph) -> Result<SheetView> {
    let mut resolver = Resolver::new(graph);
    let mut columns = Vec::with_capacity(graph.columns.len());

    for (name, column) in &graph.columns {
        let mut cells = Vec::with_capacity(column.cells.len());
        for (&cell_index, content) in &column.cells {
            if let CellContent::Literal(value) = content {
                if !value.matches(column.column_type) {
                    return Err(SheetError::DataIntegrity {
                        sheet_id: graph.sheet_id,
                        detail: format!(
                            "cell {}[{}] holds a {} literal in a {} column",
                            name,
                            cell_index,
                            value.kind(),
                            column.column_type
                        ),
                    });
                }
            }
            let value = resolver.resolve(&CellRef::new(name.clone(), cell_index))?;
            cells.push(CellView { cell_index, value });
        }
        columns.push(ColumnView {
            name: name.clone(),
            column_type: column.column_type,
            cells,
        });
    }

    Ok(SheetView {
        sheet_id: graph.sheet_id,
        columns,
    })
}

/// Effective value of a single cell; `None` for an empty slot.
pub fn resolve_cell(graph: &SheetGraph, cell: &CellRef) -> Result<Option<CellValue>> {
    Resolver::new(graph).resolve(cell)
}

/// One resolution pass over a graph. Chains already walked are memoized so
/// resolving a whole sheet visits each cell a bounded number of times.
struct Resolver<'g> {
    graph: &'g SheetGraph,
    resolved: HashMap<CellRef, Option<CellValue>>,
}

impl<'g> Resolver<'g> {
    fn new(graph: &'g SheetGraph) -> Self {
        Self {
            graph,
            resolved: HashMap::new(),
        }
    }

    fn resolve(&mut self, start: &CellRef) -> Result<Option<CellValue>> {
        let graph = self.graph;
        let mut visited: HashSet<CellRef> = HashSet::new();
        let mut path: Vec<CellRef> = Vec::new();
        let mut current = start.clone();

        let value = loop {
            if let Some(value) = self.resolved.get(&current) {
                break value.clone();
            }
            if !visited.insert(current.clone()) {
                return Err(self.cycle(start));
            }

            let column = graph.columns.get(&current.column_name).ok_or_else(|| {
                SheetError::DataIntegrity {
                    sheet_id: graph.sheet_id,
                    detail: format!(
                        "lookup chain from {} references missing column '{}'",
                        start, current.column_name
                    ),
                }
            })?;

            let next = match column.cells.get(&current.cell_index) {
                None => break None,
                Some(CellContent::Literal(value)) => {
                    path.push(current);
                    break Some(value.clone());
                }
                Some(CellContent::Lookup(target)) => target.clone(),
            };
            path.push(std::mem::replace(&mut current, next));
        };

        for cell in path {
            self.resolved.insert(cell, value.clone());
        }
        Ok(value)
    }

    fn cycle(&self, start: &CellRef) -> SheetError {
        tracing::warn!(
            sheet_id = %self.graph.sheet_id,
            cell = %start,
            "lookup cycle detected during resolution"
        );
        SheetError::LookupCycle {
            sheet_id: self.graph.sheet_id,
            column: start.column_name.clone(),
            cell_index: start.cell_index,
        }
    }
}

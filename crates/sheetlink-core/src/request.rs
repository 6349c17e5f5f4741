//! Boundary validation of raw JSON requests.
//!
//! Everything here fails with [`SheetError::Validation`] only. Presence of a
//! field is decided by key presence, never by truthiness: `false`, `0` and
//! `""` are values like any other.

use serde_json::{Map, Value};

use crate::error::{Result, SheetError};
use crate::types::{CellIndex, CellRef, ColumnSpec};

/// Validated body of a create-sheet request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateSheetRequest {
    pub columns: Vec<ColumnSpec>,
}

impl CreateSheetRequest {
    /// Parses `{"columns": [{"name": ..., "type": ...}, ...]}`.
    pub fn from_json(body: Value) -> Result<Self> {
        let mut body = match body {
            Value::Object(map) => map,
            _ => return Err(invalid("request body must be an object")),
        };
        let columns = body
            .remove("columns")
            .ok_or_else(|| invalid("'columns' is required"))?;
        let columns: Vec<ColumnSpec> = serde_json::from_value(columns)
            .map_err(|e| invalid(format!("invalid 'columns': {}", e)))?;

        validate_columns(&columns)?;
        Ok(Self { columns })
    }
}

/// Rejects an empty column list and duplicate column names.
pub fn validate_columns(columns: &[ColumnSpec]) -> Result<()> {
    if columns.is_empty() {
        return Err(invalid("at least one column is required"));
    }
    let mut seen = std::collections::HashSet::with_capacity(columns.len());
    for column in columns {
        if !seen.insert(column.name.as_str()) {
            return Err(invalid(format!("duplicate column name '{}'", column.name)));
        }
    }
    Ok(())
}

/// Body of a set-cell request: a literal or a lookup, never both.
#[derive(Debug, Clone, PartialEq)]
pub enum SetCellBody {
    /// Literal to type-check against the column and store.
    Value { cell_index: CellIndex, value: Value },
    /// Reference to another cell of the same sheet.
    Lookup { cell_index: CellIndex, lookup: CellRef },
}

impl SetCellBody {
    pub fn value(cell_index: CellIndex, value: Value) -> Self {
        SetCellBody::Value { cell_index, value }
    }

    pub fn lookup(cell_index: CellIndex, lookup: CellRef) -> Self {
        SetCellBody::Lookup { cell_index, lookup }
    }

    pub fn cell_index(&self) -> CellIndex {
        match self {
            SetCellBody::Value { cell_index, .. } | SetCellBody::Lookup { cell_index, .. } => {
                *cell_index
            }
        }
    }

    /// Parses `{"cellIndex", "value"}` or `{"cellIndex", "lookup": {"columnName", "cellIndex"}}`.
    pub fn from_json(body: Value) -> Result<Self> {
        let mut body = match body {
            Value::Object(map) => map,
            _ => return Err(invalid("request body must be an object")),
        };
        let cell_index = cell_index_field(&body, "cellIndex")?;

        match (body.remove("value"), body.remove("lookup")) {
            (Some(value), None) => Ok(SetCellBody::Value { cell_index, value }),
            (None, Some(lookup)) => Ok(SetCellBody::Lookup {
                cell_index,
                lookup: parse_lookup(lookup)?,
            }),
            _ => Err(invalid(
                "either 'value' or 'lookup' must be provided, but not both",
            )),
        }
    }
}

fn parse_lookup(lookup: Value) -> Result<CellRef> {
    let lookup = match lookup {
        Value::Object(map) => map,
        _ => return Err(invalid("'lookup' must be an object")),
    };
    let column_name = match lookup.get("columnName") {
        Some(Value::String(name)) => name.clone(),
        Some(_) => return Err(invalid("'lookup.columnName' must be a string")),
        None => return Err(invalid("'lookup.columnName' is required")),
    };
    let cell_index = cell_index_field(&lookup, "cellIndex")
        .map_err(|_| invalid("'lookup.cellIndex' must be a non-negative integer"))?;
    Ok(CellRef {
        column_name,
        cell_index,
    })
}

fn cell_index_field(map: &Map<String, Value>, key: &str) -> Result<CellIndex> {
    let raw = map
        .get(key)
        .ok_or_else(|| invalid(format!("'{}' is required", key)))?;
    raw.as_u64()
        .and_then(|n| CellIndex::try_from(n).ok())
        .ok_or_else(|| invalid(format!("'{}' must be a non-negative integer", key)))
}

fn invalid(message: impl Into<String>) -> SheetError {
    SheetError::Validation(message.into())
}

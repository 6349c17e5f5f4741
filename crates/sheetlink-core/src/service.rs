//! Sheet service: orchestrates type checks, write paths and store calls.
//!
//! The service keeps no state between calls. Each operation talks to the
//! [`GraphStore`] through short, independent calls bounded by
//! [`ServiceConfig::store_timeout`]. The value write path reads the column
//! type and then writes in a second call, so two writers racing on the same
//! cell resolve as "last write wins". Nothing is retried here.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, instrument};

use crate::error::{Result, SheetError};
use crate::request::{validate_columns, SetCellBody};
use crate::store::GraphStore;
use crate::type_system::is_same_type;
use crate::types::{CellValue, ColumnSpec, PersistedCell, SheetId, SheetView};

/// Service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Upper bound for every individual store call.
    pub store_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            store_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Clone)]
pub struct SheetService {
    store: Arc<dyn GraphStore>,
    config: ServiceConfig,
}

impl std::fmt::Debug for SheetService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SheetService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SheetService {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self::with_config(store, ServiceConfig::default())
    }

    pub fn with_config(store: Arc<dyn GraphStore>, config: ServiceConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Creates a sheet with the given columns and returns its identifier.
    ///
    /// # Errors
    ///
    /// `Validation` for an empty list or duplicate names (no store call is
    /// made), `Storage`/`Timeout` if persisting fails. Retrying after a
    /// failure may create a second sheet.
    #[instrument(skip(self, columns), fields(columns = columns.len()))]
    pub async fn create_sheet(&self, columns: Vec<ColumnSpec>) -> Result<SheetId> {
        validate_columns(&columns)?;

        let sheet_id = self
            .call(
                "create_sheet_with_columns",
                self.store.create_sheet_with_columns(&columns),
            )
            .await?;

        debug!(%sheet_id, "Created sheet");
        Ok(sheet_id)
    }

    /// Reads a sheet with every cell resolved to its effective value.
    ///
    /// # Errors
    ///
    /// `SheetNotFound`, `LookupCycle`/`DataIntegrity` if stored lookups are
    /// broken, `Storage`/`Timeout`.
    #[instrument(skip(self), fields(sheet_id = %sheet_id))]
    pub async fn get_sheet_by_id(&self, sheet_id: &SheetId) -> Result<SheetView> {
        self.call("fetch_resolved_sheet", self.store.fetch_resolved_sheet(sheet_id))
            .await
    }

    /// Writes a literal or a lookup to `(column, cellIndex)` of a sheet.
    ///
    /// Returns the cell as persisted, carrying its effective value.
    ///
    /// # Errors
    ///
    /// `SheetNotFound`/`ColumnNotFound`, `TypeMismatch` for a literal the
    /// column type rejects, `LookupTypeMismatch` for a lookup across columns
    /// of different types, `LookupCycle` for a lookup that would close a
    /// cycle, `Unimplemented` if the store cannot record lookups,
    /// `Storage`/`Timeout`.
    #[instrument(
        skip(self, body),
        fields(sheet_id = %sheet_id, column = %column, cell_index = body.cell_index())
    )]
    pub async fn set_cell_in_sheet(
        &self,
        sheet_id: &SheetId,
        column: &str,
        body: SetCellBody,
    ) -> Result<PersistedCell> {
        match body {
            SetCellBody::Value { cell_index, value } => {
                let column_type = self
                    .call("fetch_column_type", self.store.fetch_column_type(sheet_id, column))
                    .await?;

                let mismatch = || SheetError::TypeMismatch {
                    sheet_id: *sheet_id,
                    column: column.to_string(),
                    cell_index,
                    expected: column_type,
                    found: json_kind(&value).to_string(),
                };
                if !is_same_type(&value, column_type) {
                    return Err(mismatch());
                }
                let literal = CellValue::from_json(&value, column_type).ok_or_else(mismatch)?;

                self.call(
                    "write_cell_literal",
                    self.store
                        .write_cell_literal(sheet_id, column, cell_index, literal),
                )
                .await
            }
            SetCellBody::Lookup { cell_index, lookup } => {
                let column_type = self
                    .call("fetch_column_type", self.store.fetch_column_type(sheet_id, column))
                    .await?;
                let target_type = self
                    .call(
                        "fetch_column_type",
                        self.store.fetch_column_type(sheet_id, &lookup.column_name),
                    )
                    .await?;

                if column_type != target_type {
                    return Err(SheetError::LookupTypeMismatch {
                        sheet_id: *sheet_id,
                        column: column.to_string(),
                        expected: column_type,
                        target_column: lookup.column_name,
                        found: target_type,
                    });
                }

                self.call(
                    "write_cell_lookup",
                    self.store
                        .write_cell_lookup(sheet_id, column, cell_index, lookup),
                )
                .await
            }
        }
    }

    /// Runs one store call under the configured deadline.
    async fn call<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.config.store_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(SheetError::Timeout { operation }),
        }
    }
}

/// Runtime kind of a JSON value, as reported in type mismatches.
fn json_kind(value: &serde_json::Value) -> &'static str {
    use serde_json::Value;
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "int",
        Value::Number(n) if n.as_f64().is_some_and(|f| f.fract() == 0.0) => "int",
        Value::Number(_) => "double",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

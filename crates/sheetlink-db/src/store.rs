//! PostgreSQL [`GraphStore`].
//!
//! Reads load the whole sheet graph (columns plus one row per cell, lookup
//! edges unresolved) inside a repeatable-read snapshot. Writes are upserts
//! keyed on `(sheet_id, column_name, cell_index)`.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgConnection;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use sheetlink_core::{
    resolve_cell, CellContent, CellIndex, CellRef, CellValue, ColumnSpec, ColumnType, GraphStore,
    PersistedCell, Result, SheetError, SheetGraph, SheetId,
};

use crate::error::SqlxResultExt;
use crate::transaction::{Transaction, TransactionOptions};
use crate::{schema, Connection, PoolConfig};

/// The rejection is returned even when the rollback fails; the server aborts
/// the transaction once the connection drops.
fn keep_rejection(err: SheetError, rollback: Result<()>) -> SheetError {
    if let Err(rollback_err) = rollback {
        warn!(error = %rollback_err, "Rollback of rejected write failed");
    }
    err
}

/// Row shape of `cells`.
type CellRow = (String, i64, Option<Value>, Option<String>, Option<i64>);

#[derive(Debug, Clone)]
pub struct PgGraphStore {
    conn: Connection,
}

impl PgGraphStore {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Opens a pool against `uri`. Does not create tables; see [`migrate`](Self::migrate).
    pub async fn connect(uri: &str, config: PoolConfig) -> Result<Self> {
        Ok(Self::new(Connection::new(uri, config).await?))
    }

    /// Creates the `sheets`, `sheet_columns` and `cells` tables if missing.
    pub async fn migrate(&self) -> Result<()> {
        schema::migrate(&self.conn).await
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

async fn sheet_exists(conn: &mut PgConnection, sheet_id: &SheetId) -> Result<bool> {
    let row: Option<(i32,)> = sqlx::query_as("SELECT 1 FROM sheets WHERE id = $1")
        .bind(*sheet_id.as_uuid())
        .fetch_optional(conn)
        .await
        .during("fetch_sheet")?;
    Ok(row.is_some())
}

/// Declared type of `column`, distinguishing a missing sheet from a missing column.
async fn column_type(
    conn: &mut PgConnection,
    sheet_id: &SheetId,
    column: &str,
) -> Result<ColumnType> {
    let row: Option<(String,)> = sqlx::query_as(
        "SELECT column_type FROM sheet_columns WHERE sheet_id = $1 AND name = $2",
    )
    .bind(*sheet_id.as_uuid())
    .bind(column)
    .fetch_optional(&mut *conn)
    .await
    .during("fetch_column_type")?;

    if let Some((raw,)) = row {
        return parse_column_type(sheet_id, column, &raw);
    }
    if sheet_exists(conn, sheet_id).await? {
        Err(SheetError::column_not_found(*sheet_id, column))
    } else {
        Err(SheetError::SheetNotFound {
            sheet_id: *sheet_id,
        })
    }
}

fn parse_column_type(sheet_id: &SheetId, column: &str, raw: &str) -> Result<ColumnType> {
    raw.parse().map_err(|_| SheetError::DataIntegrity {
        sheet_id: *sheet_id,
        detail: format!("column '{column}' has unknown type '{raw}'"),
    })
}

fn stored_index(sheet_id: &SheetId, column: &str, raw: i64) -> Result<CellIndex> {
    CellIndex::try_from(raw).map_err(|_| SheetError::DataIntegrity {
        sheet_id: *sheet_id,
        detail: format!("cell {column}[{raw}] has an out-of-range index"),
    })
}

fn cell_content(sheet_id: &SheetId, row: CellRow) -> Result<(String, CellIndex, CellContent)> {
    let (column, raw_index, value, lookup_column, lookup_index) = row;
    let cell_index = stored_index(sheet_id, &column, raw_index)?;

    let content = match (value, lookup_column, lookup_index) {
        (Some(value), None, None) => {
            let literal = serde_json::from_value::<CellValue>(value).map_err(|e| {
                SheetError::DataIntegrity {
                    sheet_id: *sheet_id,
                    detail: format!("cell {column}[{cell_index}] holds an unreadable literal: {e}"),
                }
            })?;
            CellContent::Literal(literal)
        }
        (None, Some(target_column), Some(target_index)) => {
            let target_index = stored_index(sheet_id, &target_column, target_index)?;
            CellContent::Lookup(CellRef::new(target_column, target_index))
        }
        _ => {
            return Err(SheetError::DataIntegrity {
                sheet_id: *sheet_id,
                detail: format!("cell {column}[{cell_index}] is neither a literal nor a lookup"),
            })
        }
    };

    Ok((column, cell_index, content))
}

/// One-hop read of a sheet over `conn`.
async fn load_graph(conn: &mut PgConnection, sheet_id: &SheetId) -> Result<SheetGraph> {
    if !sheet_exists(&mut *conn, sheet_id).await? {
        return Err(SheetError::SheetNotFound {
            sheet_id: *sheet_id,
        });
    }

    let columns: Vec<(String, String)> = sqlx::query_as(
        "SELECT name, column_type FROM sheet_columns WHERE sheet_id = $1 ORDER BY position",
    )
    .bind(*sheet_id.as_uuid())
    .fetch_all(&mut *conn)
    .await
    .during("fetch_sheet_graph")?;

    let mut graph = SheetGraph::new(*sheet_id);
    for (name, raw) in columns {
        let column_type = parse_column_type(sheet_id, &name, &raw)?;
        graph = graph.with_column(name, column_type);
    }

    let rows: Vec<CellRow> = sqlx::query_as(
        "SELECT column_name, cell_index, value, lookup_column, lookup_index \
         FROM cells WHERE sheet_id = $1",
    )
    .bind(*sheet_id.as_uuid())
    .fetch_all(&mut *conn)
    .await
    .during("fetch_sheet_graph")?;

    for row in rows {
        let (column, cell_index, content) = cell_content(sheet_id, row)?;
        if !graph.set_cell(&column, cell_index, content) {
            return Err(SheetError::DataIntegrity {
                sheet_id: *sheet_id,
                detail: format!("cell {column}[{cell_index}] belongs to no column"),
            });
        }
    }

    debug!(cells = graph.cell_count(), "Loaded sheet graph");
    Ok(graph)
}

#[async_trait]
impl GraphStore for PgGraphStore {
    #[instrument(skip(self, sheet_id), fields(sheet_id = %sheet_id))]
    async fn fetch_sheet_graph(&self, sheet_id: &SheetId) -> Result<SheetGraph> {
        let mut tx = Transaction::begin(&self.conn, TransactionOptions::snapshot()).await?;
        let graph = load_graph(tx.conn(), sheet_id).await?;
        tx.commit().await?;
        Ok(graph)
    }

    #[instrument(skip(self, sheet_id), fields(sheet_id = %sheet_id))]
    async fn fetch_column_type(&self, sheet_id: &SheetId, column: &str) -> Result<ColumnType> {
        let mut conn = self
            .conn
            .pool()
            .acquire()
            .await
            .during("fetch_column_type")?;
        column_type(&mut conn, sheet_id, column).await
    }

    #[instrument(skip(self, sheet_id, value), fields(sheet_id = %sheet_id))]
    async fn write_cell_literal(
        &self,
        sheet_id: &SheetId,
        column: &str,
        cell_index: CellIndex,
        value: CellValue,
    ) -> Result<PersistedCell> {
        let mut tx = Transaction::begin(&self.conn, TransactionOptions::new()).await?;
        column_type(tx.conn(), sheet_id, column).await?;

        sqlx::query(
            "INSERT INTO cells (sheet_id, column_name, cell_index, value, lookup_column, lookup_index) \
             VALUES ($1, $2, $3, $4, NULL, NULL) \
             ON CONFLICT (sheet_id, column_name, cell_index) DO UPDATE \
             SET value = EXCLUDED.value, lookup_column = NULL, lookup_index = NULL, updated_at = now()",
        )
        .bind(*sheet_id.as_uuid())
        .bind(column)
        .bind(i64::from(cell_index))
        .bind(value.to_json())
        .execute(tx.conn())
        .await
        .during("write_cell_literal")?;

        tx.commit().await?;
        Ok(PersistedCell {
            cell_index,
            value: Some(value),
        })
    }

    #[instrument(skip(self, sheet_id, target), fields(sheet_id = %sheet_id, target = %target))]
    async fn write_cell_lookup(
        &self,
        sheet_id: &SheetId,
        column: &str,
        cell_index: CellIndex,
        target: CellRef,
    ) -> Result<PersistedCell> {
        let mut tx = Transaction::begin(&self.conn, TransactionOptions::new()).await?;

        // Serializes lookup writers per sheet.
        let locked: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM sheets WHERE id = $1 FOR UPDATE")
            .bind(*sheet_id.as_uuid())
            .fetch_optional(tx.conn())
            .await
            .during("write_cell_lookup")?;
        if locked.is_none() {
            return Err(SheetError::SheetNotFound {
                sheet_id: *sheet_id,
            });
        }
        column_type(tx.conn(), sheet_id, column).await?;
        column_type(tx.conn(), sheet_id, &target.column_name).await?;

        sqlx::query(
            "INSERT INTO cells (sheet_id, column_name, cell_index, value, lookup_column, lookup_index) \
             VALUES ($1, $2, $3, NULL, $4, $5) \
             ON CONFLICT (sheet_id, column_name, cell_index) DO UPDATE \
             SET value = NULL, lookup_column = EXCLUDED.lookup_column, \
                 lookup_index = EXCLUDED.lookup_index, updated_at = now()",
        )
        .bind(*sheet_id.as_uuid())
        .bind(column)
        .bind(i64::from(cell_index))
        .bind(&target.column_name)
        .bind(i64::from(target.cell_index))
        .execute(tx.conn())
        .await
        .during("write_cell_lookup")?;

        let graph = load_graph(tx.conn(), sheet_id).await?;
        match resolve_cell(&graph, &CellRef::new(column, cell_index)) {
            Ok(value) => {
                tx.commit().await?;
                Ok(PersistedCell { cell_index, value })
            }
            Err(err) => {
                warn!(error = %err, "Rejected lookup write");
                Err(keep_rejection(err, tx.rollback().await))
            }
        }
    }

    #[instrument(skip(self, columns), fields(columns = columns.len()))]
    async fn create_sheet_with_columns(&self, columns: &[ColumnSpec]) -> Result<SheetId> {
        let sheet_id = SheetId::new_v4();
        let mut tx = Transaction::begin(&self.conn, TransactionOptions::new()).await?;

        sqlx::query("INSERT INTO sheets (id) VALUES ($1)")
            .bind(*sheet_id.as_uuid())
            .execute(tx.conn())
            .await
            .during("create_sheet_with_columns")?;

        for (position, spec) in columns.iter().enumerate() {
            sqlx::query(
                "INSERT INTO sheet_columns (sheet_id, name, column_type, position) \
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(*sheet_id.as_uuid())
            .bind(&spec.name)
            .bind(spec.column_type.as_str())
            .bind(position as i32)
            .execute(tx.conn())
            .await
            .during("create_sheet_with_columns")?;
        }

        tx.commit().await?;
        debug!(sheet_id = %sheet_id, "Created sheet");
        Ok(sheet_id)
    }
}

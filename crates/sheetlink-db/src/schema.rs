//! Table definitions and bootstrap.
//!
//! `cells` holds exactly one of a JSONB literal or a lookup edge. Both the
//! owning column and a lookup's target column are foreign keys into
//! `sheet_columns`, so an edge can never name a column the sheet lacks.

use tracing::{info, instrument};

use sheetlink_core::Result;

use crate::error::SqlxResultExt;
use crate::Connection;

/// Statements run by [`migrate`], in order. Each is idempotent.
pub const SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS sheets (
        id UUID PRIMARY KEY,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )"#,
    r#"CREATE TABLE IF NOT EXISTS sheet_columns (
        sheet_id UUID NOT NULL REFERENCES sheets (id) ON DELETE CASCADE,
        name TEXT NOT NULL,
        column_type TEXT NOT NULL
            CHECK (column_type IN ('boolean', 'int', 'double', 'string')),
        position INTEGER NOT NULL,
        PRIMARY KEY (sheet_id, name)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS cells (
        sheet_id UUID NOT NULL,
        column_name TEXT NOT NULL,
        cell_index BIGINT NOT NULL CHECK (cell_index >= 0),
        value JSONB,
        lookup_column TEXT,
        lookup_index BIGINT CHECK (lookup_index >= 0),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        PRIMARY KEY (sheet_id, column_name, cell_index),
        FOREIGN KEY (sheet_id, column_name)
            REFERENCES sheet_columns (sheet_id, name) ON DELETE CASCADE,
        FOREIGN KEY (sheet_id, lookup_column)
            REFERENCES sheet_columns (sheet_id, name) ON DELETE CASCADE,
        CHECK ((value IS NULL) <> (lookup_column IS NULL)),
        CHECK ((lookup_column IS NULL) = (lookup_index IS NULL))
    )"#,
    r#"CREATE INDEX IF NOT EXISTS idx_cells_lookup_target
        ON cells (sheet_id, lookup_column, lookup_index)
        WHERE lookup_column IS NOT NULL"#,
];

/// Creates the tables if they do not exist yet.
#[instrument(skip(conn))]
pub async fn migrate(conn: &Connection) -> Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(conn.pool())
            .await
            .during("migrate")?;
    }
    info!(statements = SCHEMA.len(), "Schema ready");
    Ok(())
}

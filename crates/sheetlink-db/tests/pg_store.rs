//! Integration tests for the PostgreSQL graph store.
//!
//! These tests require a PostgreSQL database and are ignored by default.
//! Set DATABASE_URL to customize the connection.
//! Default: postgresql://localhost/test_db
//!
//! Run with: cargo test -p sheetlink-db --test pg_store -- --ignored

use std::sync::Arc;

use serde_json::json;
use sheetlink_core::{
    CellRef, CellValue, ColumnSpec, ColumnType, ErrorKind, GraphStore, SetCellBody, SheetError,
    SheetId, SheetService,
};
use sheetlink_db::{PgGraphStore, PoolConfig, RetryConfig};

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| "postgresql://localhost/test_db".to_string())
}

async fn store() -> Result<PgGraphStore, SheetError> {
    let config = PoolConfig {
        retry: RetryConfig::no_retry(),
        ..PoolConfig::default()
    };
    let store = PgGraphStore::connect(&get_database_url(), config).await?;
    store.migrate().await?;
    Ok(store)
}

async fn sheet(store: &PgGraphStore) -> Result<SheetId, SheetError> {
    store
        .create_sheet_with_columns(&[
            ColumnSpec::new("A", ColumnType::Int),
            ColumnSpec::new("B", ColumnType::Int),
            ColumnSpec::new("D", ColumnType::Double),
            ColumnSpec::new("S", ColumnType::String),
        ])
        .await
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_migrate_is_repeatable() -> TestResult {
    let store = store().await?;
    store.migrate().await?;
    store.connection().ping().await?;
    Ok(())
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_create_and_read_empty_sheet() -> TestResult {
    let store = store().await?;
    let id = sheet(&store).await?;

    let view = store.fetch_resolved_sheet(&id).await?;
    assert_eq!(view.sheet_id, id);
    let names: Vec<_> = view.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["A", "B", "D", "S"]);
    assert!(view.columns.iter().all(|c| c.cells.is_empty()));

    assert_eq!(store.fetch_column_type(&id, "D").await?, ColumnType::Double);
    Ok(())
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_not_found_errors() -> TestResult {
    let store = store().await?;
    let id = sheet(&store).await?;
    let missing = SheetId::new_v4();

    let err = store.fetch_sheet_graph(&missing).await.unwrap_err();
    assert_eq!(err, SheetError::SheetNotFound { sheet_id: missing });

    let err = store.fetch_column_type(&missing, "A").await.unwrap_err();
    assert_eq!(err, SheetError::SheetNotFound { sheet_id: missing });

    let err = store.fetch_column_type(&id, "Z").await.unwrap_err();
    assert_eq!(err, SheetError::column_not_found(id, "Z"));

    let err = store
        .write_cell_literal(&id, "Z", 0, CellValue::int(1))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = store
        .write_cell_lookup(&id, "A", 0, CellRef::new("Z", 0))
        .await
        .unwrap_err();
    assert_eq!(err, SheetError::column_not_found(id, "Z"));
    Ok(())
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_literals_round_trip_and_upsert() -> TestResult {
    let store = store().await?;
    let id = sheet(&store).await?;

    store.write_cell_literal(&id, "A", 2, CellValue::int(1)).await?;
    store.write_cell_literal(&id, "A", 2, CellValue::int(-7)).await?;
    store.write_cell_literal(&id, "D", 0, CellValue::Double(0.25)).await?;
    store
        .write_cell_literal(&id, "S", 9, CellValue::String(String::new()))
        .await?;

    let view = store.fetch_resolved_sheet(&id).await?;
    let a = view.column("A").unwrap();
    assert_eq!(a.cells.len(), 1);
    assert_eq!(a.cell(2).unwrap().value, Some(CellValue::int(-7)));
    assert_eq!(
        view.column("D").unwrap().cell(0).unwrap().value,
        Some(CellValue::Double(0.25))
    );
    assert_eq!(
        view.column("S").unwrap().cell(9).unwrap().value,
        Some(CellValue::String(String::new()))
    );
    Ok(())
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_lookup_chain_and_overwrite() -> TestResult {
    let store = store().await?;
    let id = sheet(&store).await?;

    let empty = store
        .write_cell_lookup(&id, "A", 0, CellRef::new("B", 5))
        .await?;
    assert_eq!(empty.value, None);

    store.write_cell_literal(&id, "B", 5, CellValue::int(42)).await?;
    store
        .write_cell_lookup(&id, "B", 1, CellRef::new("A", 0))
        .await?;

    let view = store.fetch_resolved_sheet(&id).await?;
    assert_eq!(
        view.column("B").unwrap().cell(1).unwrap().value,
        Some(CellValue::int(42))
    );

    // A literal replaces the edge.
    store.write_cell_literal(&id, "A", 0, CellValue::int(3)).await?;
    let view = store.fetch_resolved_sheet(&id).await?;
    assert_eq!(
        view.column("B").unwrap().cell(1).unwrap().value,
        Some(CellValue::int(3))
    );
    Ok(())
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_cycle_closing_lookup_is_rolled_back() -> TestResult {
    let store = store().await?;
    let id = sheet(&store).await?;

    store.write_cell_literal(&id, "B", 0, CellValue::int(8)).await?;
    store
        .write_cell_lookup(&id, "A", 0, CellRef::new("B", 0))
        .await?;

    let err = store
        .write_cell_lookup(&id, "B", 0, CellRef::new("A", 0))
        .await
        .unwrap_err();
    assert!(matches!(err, SheetError::LookupCycle { .. }), "{err:?}");

    let view = store.fetch_resolved_sheet(&id).await?;
    assert_eq!(
        view.column("B").unwrap().cell(0).unwrap().value,
        Some(CellValue::int(8))
    );
    assert_eq!(
        view.column("A").unwrap().cell(0).unwrap().value,
        Some(CellValue::int(8))
    );

    let err = store
        .write_cell_lookup(&id, "A", 1, CellRef::new("A", 1))
        .await
        .unwrap_err();
    assert!(matches!(err, SheetError::LookupCycle { .. }));
    let graph = store.fetch_sheet_graph(&id).await?;
    assert!(graph.cell(&CellRef::new("A", 1)).is_none());
    Ok(())
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_service_over_postgres() -> TestResult {
    let service = SheetService::new(Arc::new(store().await?));

    let id = service
        .create_sheet(vec![
            ColumnSpec::new("A", ColumnType::Boolean),
            ColumnSpec::new("B", ColumnType::Boolean),
        ])
        .await?;

    let body = SetCellBody::from_json(json!({"cellIndex": 0, "value": false}))?;
    service.set_cell_in_sheet(&id, "A", body).await?;
    let body = SetCellBody::from_json(json!({"cellIndex": 3, "lookup": {"columnName": "A", "cellIndex": 0}}))?;
    let cell = service.set_cell_in_sheet(&id, "B", body).await?;
    assert_eq!(cell.value, Some(CellValue::Boolean(false)));

    let body = SetCellBody::from_json(json!({"cellIndex": 1, "value": 1}))?;
    let err = service.set_cell_in_sheet(&id, "A", body).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TypeMismatch);

    let view = service.get_sheet_by_id(&id).await?;
    assert_eq!(
        serde_json::to_value(&view)?,
        json!({
            "sheetId": id.to_string(),
            "columns": [
                {"name": "A", "type": "boolean", "cells": [{"cellIndex": 0, "value": false}]},
                {"name": "B", "type": "boolean", "cells": [{"cellIndex": 3, "value": false}]},
            ]
        })
    );
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "requires PostgreSQL"]
async fn test_concurrent_writers_release_connections() -> TestResult {
    let config = PoolConfig {
        retry: RetryConfig::no_retry(),
        ..PoolConfig::default().max_connections(4)
    };
    let store = Arc::new(PgGraphStore::connect(&get_database_url(), config).await?);
    store.migrate().await?;
    let id = sheet(&store).await?;

    let mut handles = Vec::new();
    for i in 0..32u32 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store
                .write_cell_literal(&id, "A", i, CellValue::int(i64::from(i)))
                .await
        }));
    }
    for handle in handles {
        handle.await??;
    }

    let view = store.fetch_resolved_sheet(&id).await?;
    assert_eq!(view.column("A").unwrap().cells.len(), 32);
    Ok(())
}

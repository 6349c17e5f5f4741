//! HTTP routes.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};
use sheetlink_core::{CreateSheetRequest, PersistedCell, SetCellBody, SheetId, SheetService, SheetView};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::ApiError;

/// State shared by all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub service: SheetService,
}

pub fn router(service: SheetService) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/sheets", post(create_sheet))
        .route("/api/sheets/{sheet_id}", get(get_sheet))
        .route(
            "/api/sheets/{sheet_id}/columns/{column_name}/cell",
            put(set_cell),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(AppState { service })
}

/// A path segment that is not a UUID can never name a sheet.
fn parse_sheet_id(raw: &str) -> Result<SheetId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::not_found(format!("Sheet not found: {raw}")))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn create_sheet(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let Json(body) = body?;
    let request = CreateSheetRequest::from_json(body)?;
    let id = state.service.create_sheet(request.columns).await?;
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

async fn get_sheet(
    State(state): State<AppState>,
    Path(sheet_id): Path<String>,
) -> Result<Json<SheetView>, ApiError> {
    let sheet_id = parse_sheet_id(&sheet_id)?;
    Ok(Json(state.service.get_sheet_by_id(&sheet_id).await?))
}

async fn set_cell(
    State(state): State<AppState>,
    Path((sheet_id, column_name)): Path<(String, String)>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<PersistedCell>, ApiError> {
    let sheet_id = parse_sheet_id(&sheet_id)?;
    let Json(body) = body?;
    let body = SetCellBody::from_json(body)?;
    let cell = state
        .service
        .set_cell_in_sheet(&sheet_id, &column_name, body)
        .await?;
    Ok(Json(cell))
}

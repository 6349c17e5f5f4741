//! HTTP API for sheetlink.
//!
//! ```text
//! POST /api/sheets                                     create a sheet
//! GET  /api/sheets/{sheetId}                           read a resolved sheet
//! PUT  /api/sheets/{sheetId}/columns/{columnName}/cell set a value or a lookup
//! GET  /health
//! ```

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use sheetlink_core::{GraphStore, InMemoryGraphStore, SheetService};
use sheetlink_db::PgGraphStore;
use tracing::{info, warn};

pub use config::Args;
pub use error::{ApiError, ServerError};
pub use routes::{router, AppState};

/// Builds the sheet service over PostgreSQL when a database URL is
/// configured, otherwise over the in-memory store.
pub async fn build_service(args: &Args) -> Result<SheetService, ServerError> {
    let store: Arc<dyn GraphStore> = match args.database_url() {
        Some(url) => {
            let store = PgGraphStore::connect(url, args.pool_config()).await?;
            store.migrate().await?;
            info!("Using PostgreSQL graph store");
            Arc::new(store)
        }
        None => {
            warn!("DATABASE_URL not set, sheets are kept in memory only");
            Arc::new(InMemoryGraphStore::new())
        }
    };
    Ok(SheetService::with_config(store, args.service_config()))
}

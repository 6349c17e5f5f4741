//! Mapping of `sqlx` errors onto the sheetlink error taxonomy.
//!
//! Every driver fault becomes a storage failure tagged with the store
//! operation it happened in. Deadline-style faults become `Timeout` so
//! callers can tell them apart.

use sheetlink_core::SheetError;
use sqlx::Error;

/// Classifies a driver error raised while running `operation`.
pub fn map_sqlx(operation: &'static str, err: Error) -> SheetError {
    match &err {
        Error::PoolTimedOut => SheetError::Timeout { operation },
        Error::Database(db_err) => {
            // See: https://www.postgresql.org/docs/current/errcodes-appendix.html
            match db_err.code().as_deref() {
                // query_canceled, raised by statement_timeout
                Some("57014") => SheetError::Timeout { operation },
                // lock_not_available
                Some("55P03") => SheetError::Timeout { operation },
                _ => SheetError::storage(operation, &err),
            }
        }
        _ => SheetError::storage(operation, &err),
    }
}

/// Extension for attaching the operation name to driver results.
pub(crate) trait SqlxResultExt<T> {
    fn during(self, operation: &'static str) -> Result<T, SheetError>;
}

impl<T> SqlxResultExt<T> for Result<T, Error> {
    fn during(self, operation: &'static str) -> Result<T, SheetError> {
        self.map_err(|e| map_sqlx(operation, e))
    }
}

//! Error types for sheetlink

use thiserror::Error;

use crate::types::{CellIndex, ColumnType, SheetId};

/// Result type alias for sheetlink operations
pub type Result<T> = std::result::Result<T, SheetError>;

/// Coarse classification of a [`SheetError`], used by callers that map
/// failures onto another protocol (HTTP status codes, exit codes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    NotFound,
    TypeMismatch,
    DataIntegrity,
    Unimplemented,
    StorageFailure,
}

/// Unified error type for all sheetlink operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SheetError {
    /// Malformed or duplicate input, rejected before any store interaction
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Sheet not found: {sheet_id}")]
    SheetNotFound { sheet_id: SheetId },

    #[error("Column '{column}' not found in sheet {sheet_id}")]
    ColumnNotFound { sheet_id: SheetId, column: String },

    /// Literal incompatible with the declared column type
    #[error("Type mismatch in sheet {sheet_id}, cell {column}[{cell_index}]: expected {expected}, got {found}")]
    TypeMismatch {
        sheet_id: SheetId,
        column: String,
        cell_index: CellIndex,
        expected: ColumnType,
        found: String,
    },

    /// Lookup between columns of different declared types
    #[error("Type mismatch in sheet {sheet_id}: column '{column}' is {expected} but lookup target column '{target_column}' is {found}")]
    LookupTypeMismatch {
        sheet_id: SheetId,
        column: String,
        expected: ColumnType,
        target_column: String,
        found: ColumnType,
    },

    /// Following lookups from this cell revisits a cell already seen
    #[error("Lookup cycle in sheet {sheet_id} reached from cell {column}[{cell_index}]")]
    LookupCycle {
        sheet_id: SheetId,
        column: String,
        cell_index: CellIndex,
    },

    /// Stored data violates an invariant
    #[error("Data integrity error in sheet {sheet_id}: {detail}")]
    DataIntegrity { sheet_id: SheetId, detail: String },

    #[error("Not implemented: {0}")]
    Unimplemented(&'static str),

    /// The store or its driver faulted
    #[error("Storage error during {operation}: {message}")]
    Storage {
        operation: &'static str,
        message: String,
    },

    /// The store did not answer in time
    #[error("Timeout during {operation}")]
    Timeout { operation: &'static str },
}

impl SheetError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SheetError::Validation(_) => ErrorKind::Validation,
            SheetError::SheetNotFound { .. } | SheetError::ColumnNotFound { .. } => {
                ErrorKind::NotFound
            }
            SheetError::TypeMismatch { .. } | SheetError::LookupTypeMismatch { .. } => {
                ErrorKind::TypeMismatch
            }
            SheetError::LookupCycle { .. } | SheetError::DataIntegrity { .. } => {
                ErrorKind::DataIntegrity
            }
            SheetError::Unimplemented(_) => ErrorKind::Unimplemented,
            SheetError::Storage { .. } | SheetError::Timeout { .. } => ErrorKind::StorageFailure,
        }
    }

    /// Returns true if this error is potentially retryable.
    ///
    /// Nothing in this crate retries; the flag is for callers that layer a
    /// retry policy on top.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SheetError::Timeout { .. })
    }

    pub fn storage(operation: &'static str, err: impl std::fmt::Display) -> Self {
        SheetError::Storage {
            operation,
            message: err.to_string(),
        }
    }

    pub fn column_not_found(sheet_id: SheetId, column: impl Into<String>) -> Self {
        SheetError::ColumnNotFound {
            sheet_id,
            column: column.into(),
        }
    }
}

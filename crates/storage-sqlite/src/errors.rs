//! Storage-specific error types for SQLite operations.
//!
//! This module provides error types that wrap Diesel-specific errors and convert
//! them to the database-agnostic error types defined in `curator_core`.

use curator_core::errors::{DatabaseError, Error};
use diesel::result::Error as DieselError;
use thiserror::Error;

/// Storage-specific errors that wrap Diesel and r2d2 types.
///
/// These errors are internal to the storage layer and are converted to
/// `curator_core::Error` before being returned to callers.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database connection failed: {0}")]
    ConnectionFailed(#[from] diesel::ConnectionError),

    #[error("Connection pool error: {0}")]
    PoolError(#[from] r2d2::Error),

    #[error("Query execution failed: {0}")]
    QueryFailed(#[from] DieselError),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Writer actor unavailable: {0}")]
    WriterUnavailable(String),

    /// A domain error raised inside a write transaction. It rolls the
    /// transaction back and reaches the caller unchanged.
    #[error(transparent)]
    Core(Error),
}

impl From<Error> for StorageError {
    fn from(err: Error) -> Self {
        StorageError::Core(err)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::SerializationError(err.to_string())
    }
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::ConnectionFailed(e) => {
                Error::Database(DatabaseError::ConnectionFailed(e.to_string()))
            }
            StorageError::PoolError(e) => {
                Error::Database(DatabaseError::PoolCreationFailed(e.to_string()))
            }
            StorageError::QueryFailed(DieselError::NotFound) => {
                Error::Database(DatabaseError::NotFound("Record not found".to_string()))
            }
            StorageError::QueryFailed(DieselError::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                info,
            )) => Error::Database(DatabaseError::UniqueViolation(info.message().to_string())),
            StorageError::QueryFailed(DieselError::DatabaseError(
                diesel::result::DatabaseErrorKind::ForeignKeyViolation,
                info,
            )) => Error::Database(DatabaseError::ForeignKeyViolation(
                info.message().to_string(),
            )),
            StorageError::QueryFailed(e) => {
                Error::Database(DatabaseError::QueryFailed(e.to_string()))
            }
            StorageError::MigrationFailed(e) => Error::Database(DatabaseError::MigrationFailed(e)),
            StorageError::SerializationError(e) => Error::Database(DatabaseError::Internal(e)),
            StorageError::WriterUnavailable(e) => {
                Error::Database(DatabaseError::TransactionFailed(e))
            }
            StorageError::Core(e) => e,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use curator_core::variables::{Category, VariablesError};

    #[test]
    fn test_not_found_maps_to_database_not_found() {
        let err: Error = StorageError::QueryFailed(DieselError::NotFound).into();
        assert!(matches!(err, Error::Database(DatabaseError::NotFound(_))));
    }

    #[test]
    fn test_core_errors_pass_through_unchanged() {
        let conflict: Error = VariablesError::Conflict {
            expected: 2,
            current: 3,
        }
        .into();
        let err: Error = StorageError::from(conflict).into();
        assert!(matches!(
            err,
            Error::Variables(VariablesError::Conflict {
                expected: 2,
                current: 3
            })
        ));

        let missing: Error = VariablesError::NotFound {
            category: Category::Eras,
            id: "e1".to_string(),
        }
        .into();
        let err: Error = StorageError::from(missing).into();
        assert!(matches!(err, Error::Variables(VariablesError::NotFound { .. })));
    }

    #[test]
    fn test_migration_failure_maps_to_database_error() {
        let err: Error = StorageError::MigrationFailed("bad sql".to_string()).into();
        assert!(matches!(
            err,
            Error::Database(DatabaseError::MigrationFailed(msg)) if msg == "bad sql"
        ));
    }
}

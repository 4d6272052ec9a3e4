use thiserror::Error;

use crate::traits::{AuthApiError, LedgerError};

#[derive(Debug, Error)]
pub enum SqliteDatabaseError {
    #[error("Database connection error: {0}")]
    DriverError(#[from] sqlx::Error),
    #[error("Stored data could not be converted: {0}")]
    ConversionError(String),
    #[error("Order #{0} does not exist")]
    OrderNotFound(i64),
    #[error("Order number {0} is already in use")]
    DuplicateOrderNumber(String),
    #[error("Could not migrate the database: {0}")]
    MigrationError(String),
}

impl From<crate::db_types::ConversionError> for SqliteDatabaseError {
    fn from(e: crate::db_types::ConversionError) -> Self {
        SqliteDatabaseError::ConversionError(e.0)
    }
}

impl From<SqliteDatabaseError> for LedgerError {
    fn from(e: SqliteDatabaseError) -> Self {
        match e {
            SqliteDatabaseError::DriverError(e) => LedgerError::DatabaseError(e.to_string()),
            SqliteDatabaseError::MigrationError(s) => LedgerError::DatabaseError(s),
            SqliteDatabaseError::ConversionError(s) => LedgerError::InvalidData(s),
            SqliteDatabaseError::OrderNotFound(id) => LedgerError::OrderNotFound(id),
            SqliteDatabaseError::DuplicateOrderNumber(n) => LedgerError::DuplicateOrderNumber(n),
        }
    }
}

impl From<SqliteDatabaseError> for AuthApiError {
    fn from(e: SqliteDatabaseError) -> Self {
        match e {
            SqliteDatabaseError::ConversionError(_) => AuthApiError::RoleNotFound,
            e => AuthApiError::DatabaseError(e.to_string()),
        }
    }
}

pub mod schema;
pub mod store;
pub mod table;

use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub enum StoreError {
    /// The database file could not be opened at all.
    Unreachable(String),
    /// The store answered but the statement failed.
    Query(String),
    /// The blocking worker running the statement died.
    Task(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Unreachable(msg) => write!(f, "Data store unreachable: {}", msg),
            StoreError::Query(msg) => write!(f, "{}", msg),
            StoreError::Task(msg) => write!(f, "Database task execution failed: {}", msg),
        }
    }
}

impl Error for StoreError {}

impl From<duckdb::Error> for StoreError {
    fn from(e: duckdb::Error) -> Self {
        StoreError::Query(e.to_string())
    }
}

impl From<arrow::error::ArrowError> for StoreError {
    fn from(e: arrow::error::ArrowError) -> Self {
        StoreError::Query(format!("Failed to decode result: {}", e))
    }
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(e: tokio::task::JoinError) -> Self {
        StoreError::Task(e.to_string())
    }
}

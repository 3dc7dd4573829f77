use duckdb::{AccessMode, Config, Connection};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

use crate::db::schema::SchemaSnapshot;
use crate::db::table::ResultTable;
use crate::db::StoreError;

/// Read-only handle on the sales database file.
///
/// Nothing is held open between calls: every introspection or query opens its own
/// connection on a blocking worker and closes it before returning.
#[derive(Debug, Clone)]
pub struct DataStore {
    path: PathBuf,
}

impl DataStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(path: &Path) -> Result<Connection, StoreError> {
        if !path.exists() {
            return Err(StoreError::Unreachable(format!(
                "database file {} does not exist",
                path.display()
            )));
        }

        let config = Config::default()
            .access_mode(AccessMode::ReadOnly)
            .map_err(|e| StoreError::Unreachable(e.to_string()))?;

        Connection::open_with_flags(path, config).map_err(|e| {
            StoreError::Unreachable(format!("failed to open {}: {}", path.display(), e))
        })
    }

    /// Current table and column layout of the store.
    pub async fn schema(&self) -> Result<SchemaSnapshot, StoreError> {
        let path = self.path.clone();
        let snapshot = tokio::task::spawn_blocking(move || -> Result<SchemaSnapshot, StoreError> {
            let conn = Self::open(&path)?;
            SchemaSnapshot::read(&conn)
        })
        .await??;

        debug!("Introspected {} tables", snapshot.tables.len());
        Ok(snapshot)
    }

    /// Runs a single read-only statement and collects its rows.
    pub async fn execute(&self, sql: &str) -> Result<ResultTable, StoreError> {
        let path = self.path.clone();
        let sql = sql.to_string();

        tokio::task::spawn_blocking(move || -> Result<ResultTable, StoreError> {
            let start_time = Instant::now();
            let conn = Self::open(&path)?;

            let mut stmt = conn.prepare(&sql)?;
            let arrow_batch = stmt.query_arrow([])?;
            let schema = arrow_batch.get_schema();
            let record_batches: Vec<_> = arrow_batch.collect();

            let table = ResultTable::from_batches(&schema, &record_batches)?;
            info!(
                "Query executed successfully. Row count: {}, Execution time: {}ms",
                table.row_count(),
                start_time.elapsed().as_millis()
            );
            Ok(table)
        })
        .await?
    }
}

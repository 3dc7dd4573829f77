use duckdb::Connection;
use serde::Serialize;
use std::fmt;
use tracing::debug;

use crate::db::StoreError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSchema {
    pub name: String,
    /// Type name exactly as the store reports it
    pub data_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnSchema>,
}

/// Tables and their columns, in the order the store lists them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SchemaSnapshot {
    pub tables: Vec<TableSchema>,
}

impl SchemaSnapshot {
    /// Reads every user table of the connected database. Catalog schemas are skipped.
    pub fn read(conn: &Connection) -> Result<Self, StoreError> {
        let mut tables_stmt = conn.prepare(
            "SELECT table_schema, table_name FROM information_schema.tables \
             WHERE table_type = 'BASE TABLE' \
             AND table_schema NOT IN ('information_schema', 'pg_catalog') \
             ORDER BY table_schema, table_name",
        )?;
        let names: Vec<(String, String)> = tables_stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<Result<_, _>>()?;

        let mut columns_stmt = conn.prepare(
            "SELECT column_name, data_type FROM information_schema.columns \
             WHERE table_schema = ? AND table_name = ? \
             ORDER BY ordinal_position",
        )?;

        let mut tables = Vec::with_capacity(names.len());
        for (schema_name, table_name) in names {
            let columns: Vec<ColumnSchema> = columns_stmt
                .query_map(duckdb::params![schema_name, table_name], |row| {
                    Ok(ColumnSchema {
                        name: row.get(0)?,
                        data_type: row.get(1)?,
                    })
                })?
                .collect::<Result<_, _>>()?;

            debug!("Table {} has {} columns", table_name, columns.len());
            tables.push(TableSchema {
                name: table_name,
                columns,
            });
        }

        Ok(Self { tables })
    }

    pub fn table(&self, name: &str) -> Option<&TableSchema> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Text block handed to the model as grounding.
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for SchemaSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Database Schema:")?;
        for table in &self.tables {
            writeln!(f, "Table '{}':", table.name)?;
            for column in &table.columns {
                writeln!(f, "  - {} ({})", column.name, column.data_type)?;
            }
        }
        Ok(())
    }
}

//! Schema creation and versioning for the JSON message format.
//!
//! Each message class gets one table: the identifier columns, the creation
//! time in microseconds since the epoch, and the message body as JSON text.
//! `_seq` records insertion order and breaks creation-time ties.

use tracing::info;

use crate::db::{BackendKind, DbError, SqlSession};
use crate::format::{has_format_table, FORMAT_TABLE};
use crate::idmef::MessageKind;

use super::FORMAT_NAME;

/// Current schema version of the JSON format.
pub const SCHEMA_VERSION: i64 = 1;

pub fn table_name(kind: MessageKind) -> &'static str {
    kind.name()
}

fn seq_column(backend: BackendKind) -> &'static str {
    match backend {
        BackendKind::Sqlite => "_seq INTEGER PRIMARY KEY AUTOINCREMENT",
        BackendKind::Postgres => "_seq BIGSERIAL PRIMARY KEY",
    }
}

/// DDL statements creating the schema, in execution order.
///
/// Every statement is idempotent.
pub fn create_statements(backend: BackendKind) -> Vec<String> {
    let mut statements = vec![format!(
        "CREATE TABLE IF NOT EXISTS {} (name TEXT NOT NULL PRIMARY KEY, version INTEGER NOT NULL)",
        FORMAT_TABLE
    )];

    for kind in [MessageKind::Alert, MessageKind::Heartbeat] {
        let table = table_name(kind);
        statements.push(format!(
            "CREATE TABLE IF NOT EXISTS {table} (\
             {seq}, \
             analyzerid BIGINT NOT NULL, \
             ident BIGINT NOT NULL, \
             create_time BIGINT NOT NULL, \
             payload TEXT NOT NULL, \
             UNIQUE (analyzerid, ident))",
            table = table,
            seq = seq_column(backend)
        ));
        statements.push(format!(
            "CREATE INDEX IF NOT EXISTS {table}_create_time ON {table} (create_time, _seq)",
            table = table
        ));
    }

    statements
}

/// Create the schema and record its version.
pub fn initialize_schema(sql: &mut SqlSession) -> Result<i64, DbError> {
    let backend = sql.kind();
    let name = sql.escape(FORMAT_NAME)?;

    let mut tx = sql.transaction()?;
    for statement in create_statements(backend) {
        tx.query(&statement)?;
    }
    tx.query(&format!(
        "INSERT INTO {} (name, version) VALUES ({}, {}) \
         ON CONFLICT (name) DO UPDATE SET version = excluded.version",
        FORMAT_TABLE, name, SCHEMA_VERSION
    ))?;
    tx.commit()?;

    info!(backend = %backend, version = SCHEMA_VERSION, "JSON format schema ready");
    Ok(SCHEMA_VERSION)
}

/// Schema version recorded in the database, `None` if never set up.
pub fn get_schema_version(sql: &mut SqlSession) -> Result<Option<i64>, DbError> {
    if !has_format_table(sql)? {
        return Ok(None);
    }

    let query = format!(
        "SELECT version FROM {} WHERE name = {}",
        FORMAT_TABLE,
        sql.escape(FORMAT_NAME)?
    );
    let Some(mut table) = sql.query(&query)? else {
        return Ok(None);
    };
    match table.row_fetch()? {
        Some(row) => Ok(row.get(0)?.as_i64()),
        None => Ok(None),
    }
}

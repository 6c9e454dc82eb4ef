//! Message formats: how messages map onto tables and how requests map onto SQL.
//!
//! The database facade never writes SQL about messages itself. It hands the
//! session to the configured `Format`, which owns the schema and renders
//! criteria and selections in the session's dialect.

pub mod json;

use tracing::debug;

use crate::db::{BackendKind, DbError, MessageIdent, Selection, SqlSession, Table};
use crate::idmef::{Criteria, Message, MessageKind};

pub use json::JsonFormat;

/// A storage format for IDMEF messages.
///
/// Every operation runs on a connected session supplied by the caller. Result
/// tables are returned unread so callers can stream them.
pub trait Format {
    /// Name recorded in the database and used in configuration.
    fn name(&self) -> &'static str;

    /// Schema version this implementation writes.
    fn version(&self) -> i64;

    /// Create the schema if missing. Returns the schema version.
    fn setup(&self, sql: &mut SqlSession) -> Result<i64, DbError>;

    /// Schema version found in the database, `None` if never set up.
    fn schema_version(&self, sql: &mut SqlSession) -> Result<Option<i64>, DbError>;

    /// Identifiers of matching messages as two columns, newest first.
    fn get_idents(
        &self,
        sql: &mut SqlSession,
        kind: MessageKind,
        criteria: Option<&Criteria>,
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> Result<Table, DbError>;

    fn get_message(
        &self,
        sql: &mut SqlSession,
        kind: MessageKind,
        ident: MessageIdent,
    ) -> Result<Option<Message>, DbError>;

    /// Delete one message. Returns the number of rows removed.
    fn delete_message(&self, sql: &mut SqlSession, kind: MessageKind, ident: MessageIdent) -> Result<u64, DbError>;

    fn insert_message(&self, sql: &mut SqlSession, message: &Message) -> Result<(), DbError>;

    /// One column per selected path, labelled with the path's canonical form.
    fn get_values(
        &self,
        sql: &mut SqlSession,
        selection: &Selection,
        criteria: Option<&Criteria>,
        distinct: bool,
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> Result<Table, DbError>;
}

/// Table in which the format of a database records its name and schema
/// version.
pub const FORMAT_TABLE: &str = "_format";

/// Query yielding one row when the format table exists. On PostgreSQL only
/// the session's current schema is considered.
pub fn format_table_query(backend: BackendKind) -> String {
    match backend {
        BackendKind::Sqlite => format!(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = '{}'",
            FORMAT_TABLE
        ),
        BackendKind::Postgres => format!(
            "SELECT 1 FROM pg_tables WHERE tablename = '{}' AND schemaname = current_schema()",
            FORMAT_TABLE
        ),
    }
}

pub fn has_format_table(sql: &mut SqlSession) -> Result<bool, DbError> {
    let query = format_table_query(sql.kind());
    Ok(sql.query(&query)?.is_some_and(|table| table.rows_num() > 0))
}

/// Name of the format recorded in the database, `None` when no format was
/// ever set up.
///
/// Fails with `BadConfiguration` when several formats are recorded.
pub fn detect(sql: &mut SqlSession) -> Result<Option<String>, DbError> {
    if !has_format_table(sql)? {
        return Ok(None);
    }
    let Some(mut table) = sql.query(&format!("SELECT name FROM {} ORDER BY name", FORMAT_TABLE))? else {
        return Ok(None);
    };

    let mut names = Vec::new();
    while let Some(row) = table.row_fetch()? {
        names.push(row.get(0)?.as_string_or(""));
    }
    debug!(formats = ?names, "Formats recorded in database");
    match names.len() {
        0 => Ok(None),
        1 => Ok(names.pop()),
        _ => Err(DbError::BadConfiguration {
            message: format!("several message formats recorded: {}", names.join(", ")),
        }),
    }
}

/// Names of the formats this build provides.
pub const AVAILABLE_FORMATS: &[&str] = &[json::FORMAT_NAME];

/// Look up a format by name.
pub fn by_name(name: &str) -> Option<Box<dyn Format>> {
    match name {
        json::FORMAT_NAME => Some(Box::new(JsonFormat::new())),
        _ => None,
    }
}

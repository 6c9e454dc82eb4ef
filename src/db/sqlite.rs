//! SQLite driver.
//!
//! SQLite types values per cell rather than per column, so every field carries
//! the tag of its own storage class. Blobs are outside the portable value set:
//! they are reported as `Other("blob")` with hex-encoded data.

use std::path::Path;
use std::time::Duration;

use rusqlite::types::ValueRef;
use rusqlite::Connection;
use tracing::debug;

use super::backend::{BackendKind, BufferedTable, DriverError, QueryOutcome, RawField, SqlDriver, TypeTag};
use super::DbError;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Generic SQLite failure code, used for errors that carry no engine code.
const SQLITE_ERROR: i64 = 1;

pub struct SqliteDriver {
    conn: Option<Connection>,
}

impl SqliteDriver {
    /// Open (or create) a database file.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path).map_err(|e| DbError::Connection {
            message: format!("Failed to open SQLite database at {}: {}", path.display(), e),
        })?;
        debug!(path = %path.display(), "Opened SQLite database");
        Self::configure(conn)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory().map_err(|e| DbError::Connection {
            message: format!("Failed to open in-memory SQLite database: {}", e),
        })?;
        Self::configure(conn)
    }

    fn configure(conn: Connection) -> Result<Self, DbError> {
        conn.busy_timeout(BUSY_TIMEOUT).map_err(|e| DbError::Connection {
            message: format!("Failed to configure SQLite connection: {}", e),
        })?;
        Ok(Self { conn: Some(conn) })
    }

    fn conn(&self) -> Result<&Connection, DriverError> {
        self.conn
            .as_ref()
            .ok_or_else(|| DriverError::new(SQLITE_ERROR, "connection is closed"))
    }
}

fn driver_error(e: rusqlite::Error) -> DriverError {
    match e {
        rusqlite::Error::SqliteFailure(err, message) => {
            let message = message.unwrap_or_else(|| err.to_string());
            DriverError::new(i64::from(err.extended_code), message)
        }
        other => DriverError::new(SQLITE_ERROR, other.to_string()),
    }
}

fn raw_field(value: ValueRef<'_>) -> RawField {
    match value {
        ValueRef::Null => RawField::null(),
        ValueRef::Integer(i) => RawField::new(TypeTag::Int64, i.to_string()),
        ValueRef::Real(f) => RawField::new(TypeTag::Float64, f.to_string()),
        ValueRef::Text(t) => RawField::new(TypeTag::Text, String::from_utf8_lossy(t)),
        ValueRef::Blob(b) => RawField::new(TypeTag::Other("blob".to_string()), hex::encode(b)),
    }
}

impl SqlDriver for SqliteDriver {
    fn kind(&self) -> BackendKind {
        BackendKind::Sqlite
    }

    fn query(&mut self, sql: &str) -> Result<QueryOutcome, DriverError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql).map_err(driver_error)?;

        let width = stmt.column_count();
        if width == 0 {
            let affected = stmt.execute([]).map_err(driver_error)?;
            return Ok(QueryOutcome::Done {
                affected: affected as u64,
            });
        }

        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let mut rows = stmt.query([]).map_err(driver_error)?;
        let mut buffered = Vec::new();
        while let Some(row) = rows.next().map_err(driver_error)? {
            let mut fields = Vec::with_capacity(width);
            for i in 0..width {
                fields.push(raw_field(row.get_ref(i).map_err(driver_error)?));
            }
            buffered.push(fields);
        }

        Ok(QueryOutcome::Rows(Box::new(BufferedTable::new(columns, buffered))))
    }

    fn close(&mut self) -> Result<(), DriverError> {
        match self.conn.take() {
            Some(conn) => conn.close().map_err(|(_, e)| driver_error(e)),
            None => Ok(()),
        }
    }

    fn limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> String {
        match (limit, offset) {
            (Some(limit), Some(offset)) => format!(" LIMIT {} OFFSET {}", limit, offset),
            (Some(limit), None) => format!(" LIMIT {}", limit),
            // SQLite only accepts OFFSET after a LIMIT clause.
            (None, Some(offset)) => format!(" LIMIT -1 OFFSET {}", offset),
            (None, None) => String::new(),
        }
    }
}

//! Backend-agnostic storage layer for IDMEF alerts and heartbeats.
//!
//! This module provides the query/result abstraction between an application
//! and a concrete SQL engine:
//! - Connection and session management with transaction control
//! - Result tables with lazy, forward-only row cursors
//! - Decoding of backend column types into a closed set of portable values
//! - Message identifier cursors that keep their owning interface alive
//!
//! # Architecture
//!
//! `Database` is the facade. It owns one `SqlSession`, which in turn owns one
//! `SqlDriver` (SQLite or PostgreSQL). Criteria and selections are handed to
//! the configured `Format`, which produces SQL text; the session runs it and
//! wraps the driver's buffered rows in a `Table`. Values are decoded from the
//! driver's raw fields only when a field is read.
//!
//! # Type Decisions
//!
//! **Why `Rc<RefCell<..>>` instead of `Arc<Mutex<..>>` for `Database`?**
//! One database handle drives one connection from one thread of control. The
//! layer does no locking; `Rc` makes the handle and every cursor derived from
//! it `!Send`, so sharing a connection across threads is a compile error
//! rather than a runtime race.
//!
//! **Why do drivers report field data as text?**
//! Every backend can render its native values as text, and parsing that text
//! per `TypeTag` keeps a single decode path for all drivers. Rust's float
//! formatting round-trips, so no precision is lost.

mod backend;
mod config;
mod connection;
mod escape;
mod ident;
mod interface;
pub mod postgres;
mod selection;
mod session;
pub mod sqlite;
mod table;
mod value;

pub use backend::{BackendKind, BufferedTable, DriverError, QueryOutcome, RawField, RawTable, SqlDriver, TypeTag};
pub use config::{BackendConfig, DatabaseConfig, PostgresConfig};
pub use connection::{open_db, open_driver};
#[cfg(test)]
pub use connection::open_mem_db;
pub use escape::{quote_identifier, quote_literal};
pub use ident::{IdentList, MessageIdent};
pub(crate) use ident::{decode_ident, encode_ident, ident_component};
pub use interface::{ConnectionState, Database, ValueList};
pub use selection::{Aggregate, Selection, SelectedPath, SortOrder};
pub use session::{SqlSession, Transaction};
pub use table::{Row, Table};
pub use value::{decode, Value};

use thiserror::Error;

/// Error reported by a backend for a rejected statement.
///
/// `code` and `message` are the backend's own, unmodified. `state` carries the
/// SQLSTATE for backends that have one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlError {
    pub code: i64,
    pub state: Option<String>,
    pub message: String,
}

impl std::fmt::Display for SqlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.state {
            Some(state) => write!(f, "{} (errno: {}, sqlstate: {})", self.message, self.code, state),
            None => write!(f, "{} (errno: {})", self.message, self.code),
        }
    }
}

impl From<DriverError> for SqlError {
    fn from(e: DriverError) -> Self {
        Self {
            code: e.code,
            state: e.state,
            message: e.message,
        }
    }
}

/// Database error types
#[derive(Error, Debug)]
pub enum DbError {
    #[error("Connection failed: {message}")]
    Connection { message: String },

    #[error("Database is already connected")]
    AlreadyConnected,

    #[error("Database is not connected")]
    NotConnected,

    #[error("SQL error: {0}")]
    Sql(SqlError),

    #[error("Message ({analyzerid}, {ident}) not found")]
    NotFound { analyzerid: u64, ident: u64 },

    #[error("Failed to delete message ({analyzerid}, {ident}): {reason}")]
    DeletionFailed {
        analyzerid: u64,
        ident: u64,
        reason: String,
    },

    #[error("No such field '{name}' in query result")]
    NoSuchField { name: String },

    #[error("Column {index} is out of range")]
    InvalidColumn { index: usize },

    #[error("Unsupported column type '{type_name}'")]
    UnsupportedType { type_name: String },

    #[error("Invalid {type_name} value '{data}'")]
    InvalidValue { type_name: String, data: String },

    #[error("Row has {actual} fields, table declares {expected}")]
    FieldCountMismatch { expected: usize, actual: usize },

    #[error("Bad configuration: {message}")]
    BadConfiguration { message: String },

    #[error("Invalid selection '{input}': {reason}")]
    InvalidSelection { input: String, reason: String },

    #[error("Cannot translate request: {message}")]
    Translation { message: String },

    #[error("Message codec error: {message}")]
    Codec { message: String },

    #[error("SQL session is already in use")]
    SessionBusy,
}

impl From<SqlError> for DbError {
    fn from(e: SqlError) -> Self {
        DbError::Sql(e)
    }
}

//! Driver traits implemented by each concrete SQL engine.
//!
//! A driver owns one live connection. It runs statement text, reports success
//! or failure explicitly, and tags every field it returns with a `TypeTag` so
//! the value codec can decode it without knowing the engine.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::escape::quote_literal;

/// The SQL engines this crate has drivers for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Sqlite,
    Postgres,
}

impl BackendKind {
    /// Get the backend name for logging/debugging.
    pub fn name(&self) -> &'static str {
        match self {
            BackendKind::Sqlite => "sqlite",
            BackendKind::Postgres => "postgres",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Column type reported by a driver for one field.
///
/// `Other` carries the engine's own type name for anything outside the
/// portable set; decoding such a field is a defect, not a data condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeTag {
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float32,
    Float64,
    Text,
    Null,
    Other(String),
}

impl TypeTag {
    pub fn name(&self) -> &str {
        match self {
            TypeTag::Int32 => "int32",
            TypeTag::UInt32 => "uint32",
            TypeTag::Int64 => "int64",
            TypeTag::UInt64 => "uint64",
            TypeTag::Float32 => "float32",
            TypeTag::Float64 => "float64",
            TypeTag::Text => "string",
            TypeTag::Null => "null",
            TypeTag::Other(name) => name,
        }
    }
}

/// One field as handed over by a driver: its type tag and textual data.
///
/// `data` is `None` for SQL NULL.
#[derive(Debug, Clone, PartialEq)]
pub struct RawField {
    pub tag: TypeTag,
    pub data: Option<String>,
}

impl RawField {
    pub fn new(tag: TypeTag, data: impl Into<String>) -> Self {
        Self {
            tag,
            data: Some(data.into()),
        }
    }

    pub fn null() -> Self {
        Self {
            tag: TypeTag::Null,
            data: None,
        }
    }
}

/// Failure reported by a driver, carried verbatim up to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverError {
    pub code: i64,
    pub state: Option<String>,
    pub message: String,
}

impl DriverError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            state: None,
            message: message.into(),
        }
    }

    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (errno: {})", self.message, self.code)
    }
}

impl std::error::Error for DriverError {}

/// Row-set produced by one statement.
///
/// Row and column counts are known as soon as the statement completes.
/// `fetch_row` hands out each row exactly once and returns `Ok(None)` after
/// the last one.
pub trait RawTable {
    fn column_count(&self) -> usize;

    fn row_count(&self) -> usize;

    fn column_name(&self, column: usize) -> Option<&str>;

    fn fetch_row(&mut self) -> Result<Option<Vec<RawField>>, DriverError>;
}

/// Result of running a statement.
pub enum QueryOutcome {
    /// The statement produced a row-set (possibly with zero rows).
    Rows(Box<dyn RawTable>),
    /// The statement produced no row-set (DDL, INSERT, UPDATE, DELETE, ...).
    Done { affected: u64 },
}

impl fmt::Debug for QueryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryOutcome::Rows(table) => f
                .debug_struct("Rows")
                .field("rows", &table.row_count())
                .field("columns", &table.column_count())
                .finish(),
            QueryOutcome::Done { affected } => {
                f.debug_struct("Done").field("affected", affected).finish()
            }
        }
    }
}

/// Trait for a live connection to one SQL engine.
///
/// Implementations report every failure through `Err`; an `Ok` outcome is
/// always a success, whether or not it carries rows.
pub trait SqlDriver {
    fn kind(&self) -> BackendKind;

    /// Run one statement.
    fn query(&mut self, sql: &str) -> Result<QueryOutcome, DriverError>;

    /// Close the connection. Called once; the driver is dropped afterwards.
    fn close(&mut self) -> Result<(), DriverError>;

    /// Render `input` as a quoted SQL string literal.
    ///
    /// # Default Implementation
    /// Standard SQL quoting (single quotes doubled).
    fn escape(&self, input: &str) -> String {
        quote_literal(input)
    }

    /// Build the LIMIT/OFFSET clause for this dialect.
    ///
    /// `None` disables the corresponding part. Returns an empty string when
    /// both are `None`, otherwise a clause starting with a space.
    fn limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> String {
        match (limit, offset) {
            (Some(limit), Some(offset)) => format!(" LIMIT {} OFFSET {}", limit, offset),
            (Some(limit), None) => format!(" LIMIT {}", limit),
            (None, Some(offset)) => format!(" OFFSET {}", offset),
            (None, None) => String::new(),
        }
    }
}

/// A `RawTable` over rows the driver has already received.
///
/// Both bundled drivers buffer their result sets the way the engines' client
/// libraries do; this type only hands the rows out one at a time.
#[derive(Debug)]
pub struct BufferedTable {
    columns: Vec<String>,
    rows: VecDeque<Vec<RawField>>,
    total: usize,
}

impl BufferedTable {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<RawField>>) -> Self {
        let total = rows.len();
        Self {
            columns,
            rows: rows.into(),
            total,
        }
    }
}

impl RawTable for BufferedTable {
    fn column_count(&self) -> usize {
        self.columns.len()
    }

    fn row_count(&self) -> usize {
        self.total
    }

    fn column_name(&self, column: usize) -> Option<&str> {
        self.columns.get(column).map(String::as_str)
    }

    fn fetch_row(&mut self) -> Result<Option<Vec<RawField>>, DriverError> {
        Ok(self.rows.pop_front())
    }
}

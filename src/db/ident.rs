//! Message identifiers and the lazy cursor over them.

use std::fmt;

use serde::Serialize;

use super::interface::Database;
use super::table::Table;
use super::value::Value;
use super::DbError;

/// Identifies one stored message: the analyzer that emitted it and the
/// analyzer-local message number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct MessageIdent {
    pub analyzerid: u64,
    pub ident: u64,
}

impl MessageIdent {
    pub fn new(analyzerid: u64, ident: u64) -> Self {
        Self { analyzerid, ident }
    }
}

impl fmt::Display for MessageIdent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.analyzerid, self.ident)
    }
}

/// Stored form of an identifier component.
///
/// Identifiers are unsigned but both backends only have signed 64-bit
/// integers. Flipping the top bit maps `0..=u64::MAX` onto
/// `i64::MIN..=i64::MAX` monotonically, so signed comparison, ordering and
/// min/max over stored values agree with the unsigned identifiers.
pub(crate) fn encode_ident(value: u64) -> i64 {
    (value ^ (1 << 63)) as i64
}

/// Inverse of `encode_ident`.
pub(crate) fn decode_ident(stored: i64) -> u64 {
    (stored as u64) ^ (1 << 63)
}

/// Read a stored identifier component back from a result field.
pub(crate) fn ident_component(value: Value) -> Result<u64, DbError> {
    let invalid = |data: String| DbError::InvalidValue {
        type_name: "uint64".to_string(),
        data,
    };
    match value {
        Value::Int64(i) => Ok(decode_ident(i)),
        Value::Int32(i) => Ok(decode_ident(i64::from(i))),
        Value::String(ref s) => s.trim().parse().map(decode_ident).map_err(|_| invalid(s.clone())),
        other => Err(invalid(other.to_string())),
    }
}

/// Lazy cursor over the identifiers matched by one listing query.
///
/// The list holds a `Database` handle, so the connection it reads from stays
/// open for as long as the list exists, even after every other handle is
/// gone. Each `next` fetches exactly one row.
pub struct IdentList {
    table: Table,
    _db: Database,
}

impl IdentList {
    pub(crate) fn new(db: Database, table: Table) -> Self {
        Self { table, _db: db }
    }

    /// Number of identifiers the query matched, as reported by the backend.
    pub fn len(&self) -> usize {
        self.table.rows_num()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn fetch(&mut self) -> Result<Option<MessageIdent>, DbError> {
        let Some(row) = self.table.row_fetch()? else {
            return Ok(None);
        };
        let analyzerid = ident_component(row.get(0)?)?;
        let ident = ident_component(row.get(1)?)?;
        Ok(Some(MessageIdent::new(analyzerid, ident)))
    }
}

impl Iterator for IdentList {
    type Item = Result<MessageIdent, DbError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.fetch().transpose()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.table.size_hint()
    }
}

impl fmt::Debug for IdentList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentList").field("table", &self.table).finish()
    }
}

//! Result tables and rows.
//!
//! A `Table` wraps the row-set of one statement. Its row count, field count
//! and field names are read once from the driver when the table is built.
//! Rows come out forward-only, each exactly once; fields are decoded only
//! when read.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use super::backend::{RawField, RawTable};
use super::value::{decode, Value};
use super::DbError;

/// Field names of a table and the reverse name → index map.
///
/// With duplicate column names the first column wins, matching what SQL
/// engines do for `SELECT` by name.
#[derive(Debug)]
struct Fields {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl Fields {
    fn new(names: Vec<String>) -> Self {
        let mut index = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            index.entry(name.clone()).or_insert(i);
        }
        Self { names, index }
    }

    fn lookup(&self, name: &str) -> Result<usize, DbError> {
        self.index.get(name).copied().ok_or_else(|| DbError::NoSuchField {
            name: name.to_string(),
        })
    }
}

/// Forward-only cursor over the rows of one statement.
pub struct Table {
    raw: Box<dyn RawTable>,
    rows: usize,
    fetched: usize,
    fields: Rc<Fields>,
}

impl Table {
    pub(crate) fn new(raw: Box<dyn RawTable>) -> Self {
        let rows = raw.row_count();
        let names = (0..raw.column_count())
            .map(|i| raw.column_name(i).unwrap_or_default().to_string())
            .collect();
        Self {
            raw,
            rows,
            fetched: 0,
            fields: Rc::new(Fields::new(names)),
        }
    }

    /// Wrap the driver row-set, for formats that rewrite fields before they
    /// are decoded. Must be called before the first fetch.
    pub(crate) fn map_raw(self, wrap: impl FnOnce(Box<dyn RawTable>) -> Box<dyn RawTable>) -> Self {
        debug_assert_eq!(self.fetched, 0, "map_raw after rows were fetched");
        Table::new(wrap(self.raw))
    }

    /// Number of rows in the result, as reported when the query completed.
    pub fn rows_num(&self) -> usize {
        self.rows
    }

    pub fn fields_num(&self) -> usize {
        self.fields.names.len()
    }

    pub fn field_name(&self, index: usize) -> Option<&str> {
        self.fields.names.get(index).map(String::as_str)
    }

    pub fn field_names(&self) -> &[String] {
        &self.fields.names
    }

    /// Resolve a field name to its zero-based index.
    pub fn field_index(&self, name: &str) -> Result<usize, DbError> {
        self.fields.lookup(name)
    }

    /// Number of rows not yet fetched.
    pub fn remaining(&self) -> usize {
        self.rows - self.fetched
    }

    /// Fetch the next row.
    ///
    /// Returns `Ok(None)` once every row has been handed out; exhaustion is not
    /// an error and repeated calls keep returning `Ok(None)`.
    pub fn row_fetch(&mut self) -> Result<Option<Row>, DbError> {
        if self.fetched >= self.rows {
            return Ok(None);
        }

        let Some(fields) = self.raw.fetch_row().map_err(|e| DbError::Sql(e.into()))? else {
            self.fetched = self.rows;
            return Ok(None);
        };

        if fields.len() != self.fields_num() {
            return Err(DbError::FieldCountMismatch {
                expected: self.fields_num(),
                actual: fields.len(),
            });
        }

        self.fetched += 1;
        Ok(Some(Row {
            fields,
            names: Rc::clone(&self.fields),
        }))
    }
}

impl Iterator for Table {
    type Item = Result<Row, DbError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.row_fetch().transpose()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining()))
    }
}

impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("rows", &self.rows)
            .field("fetched", &self.fetched)
            .field("fields", &self.fields.names)
            .finish()
    }
}

/// One fetched row. Fields are decoded on access.
#[derive(Debug)]
pub struct Row {
    fields: Vec<RawField>,
    names: Rc<Fields>,
}

impl Row {
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Decode the field at `index`.
    pub fn get(&self, index: usize) -> Result<Value, DbError> {
        let field = self.fields.get(index).ok_or(DbError::InvalidColumn { index })?;
        decode(field)
    }

    /// Decode the field named `name`.
    pub fn get_by_name(&self, name: &str) -> Result<Value, DbError> {
        self.get(self.names.lookup(name)?)
    }

    pub fn field_name(&self, index: usize) -> Option<&str> {
        self.names.names.get(index).map(String::as_str)
    }

    /// The undecoded field at `index`.
    pub fn raw(&self, index: usize) -> Option<&RawField> {
        self.fields.get(index)
    }

    /// Lazily decode the fields in column order.
    pub fn values(&self) -> impl Iterator<Item = Result<Value, DbError>> + '_ {
        self.fields.iter().map(decode)
    }

    /// Decode every field in column order.
    pub fn to_values(&self) -> Result<Vec<Value>, DbError> {
        self.values().collect()
    }
}

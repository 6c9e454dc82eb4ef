//! JSON message format.
//!
//! Messages are stored one row per message with the identifier columns and
//! creation time broken out and the body serialized as JSON text. Criteria
//! and selections reach into the body with the backend's JSON operators.

mod query;
mod schema;

use chrono::DateTime;

use crate::db::{
    decode_ident, encode_ident, ident_component, BufferedTable, DbError, DriverError, MessageIdent, RawField, RawTable,
    Row, Selection, SqlSession, Table, TypeTag,
};
use crate::idmef::{Criteria, Message, MessageKind};

use super::Format;
use query::{to_micros, Translator};

pub use schema::SCHEMA_VERSION;

/// Registered name of this format.
pub const FORMAT_NAME: &str = "json";

#[derive(Debug, Default, Clone, Copy)]
pub struct JsonFormat;

impl JsonFormat {
    pub fn new() -> Self {
        Self
    }
}

fn empty_table() -> Table {
    Table::new(Box::new(BufferedTable::new(Vec::new(), Vec::new())))
}

fn codec_error(message: impl Into<String>) -> DbError {
    DbError::Codec {
        message: message.into(),
    }
}

/// Row-set whose identifier columns are turned from their stored form back
/// into unsigned identifiers.
struct IdentColumns {
    inner: Box<dyn RawTable>,
    columns: Vec<usize>,
}

impl IdentColumns {
    fn decode(&self, column: usize, field: RawField) -> Result<RawField, DriverError> {
        let Some(data) = field.data else {
            return Ok(RawField::null());
        };
        let stored: i64 = data.trim().parse().map_err(|_| {
            DriverError::new(0, format!("identifier column {} holds '{}'", column, data))
        })?;
        Ok(RawField::new(TypeTag::UInt64, decode_ident(stored).to_string()))
    }
}

impl RawTable for IdentColumns {
    fn column_count(&self) -> usize {
        self.inner.column_count()
    }

    fn row_count(&self) -> usize {
        self.inner.row_count()
    }

    fn column_name(&self, column: usize) -> Option<&str> {
        self.inner.column_name(column)
    }

    fn fetch_row(&mut self) -> Result<Option<Vec<RawField>>, DriverError> {
        let Some(fields) = self.inner.fetch_row()? else {
            return Ok(None);
        };
        fields
            .into_iter()
            .enumerate()
            .map(|(i, field)| {
                if self.columns.contains(&i) {
                    self.decode(i, field)
                } else {
                    Ok(field)
                }
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }
}

/// Rebuild a message from a `SELECT analyzerid, ident, create_time, payload` row.
fn decode_message(kind: MessageKind, row: &Row) -> Result<Message, DbError> {
    let analyzerid = ident_component(row.get_by_name("analyzerid")?)?;
    let ident = ident_component(row.get_by_name("ident")?)?;

    let micros = row
        .get_by_name("create_time")?
        .as_i64()
        .ok_or_else(|| codec_error("create_time is not an integer"))?;
    let create_time = DateTime::from_timestamp_micros(micros)
        .ok_or_else(|| codec_error(format!("create_time {} is out of range", micros)))?;

    let payload = row.get_by_name("payload")?;
    let text = payload
        .as_str()
        .ok_or_else(|| codec_error("payload is not text"))?;
    let content = serde_json::from_str(text).map_err(|e| codec_error(format!("payload: {}", e)))?;

    Ok(Message {
        kind,
        analyzerid,
        ident,
        create_time,
        content,
    })
}

impl Format for JsonFormat {
    fn name(&self) -> &'static str {
        FORMAT_NAME
    }

    fn version(&self) -> i64 {
        SCHEMA_VERSION
    }

    fn setup(&self, sql: &mut SqlSession) -> Result<i64, DbError> {
        schema::initialize_schema(sql)
    }

    fn schema_version(&self, sql: &mut SqlSession) -> Result<Option<i64>, DbError> {
        schema::get_schema_version(sql)
    }

    fn get_idents(
        &self,
        sql: &mut SqlSession,
        kind: MessageKind,
        criteria: Option<&Criteria>,
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> Result<Table, DbError> {
        let query = Translator::new(sql, kind).idents_query(criteria, limit, offset)?;
        Ok(sql.query(&query)?.unwrap_or_else(empty_table))
    }

    fn get_message(
        &self,
        sql: &mut SqlSession,
        kind: MessageKind,
        ident: MessageIdent,
    ) -> Result<Option<Message>, DbError> {
        let query = Translator::new(sql, kind).message_query(ident.analyzerid, ident.ident);
        let Some(mut table) = sql.query(&query)? else {
            return Ok(None);
        };
        match table.row_fetch()? {
            Some(row) => decode_message(kind, &row).map(Some),
            None => Ok(None),
        }
    }

    fn delete_message(&self, sql: &mut SqlSession, kind: MessageKind, ident: MessageIdent) -> Result<u64, DbError> {
        let query = Translator::new(sql, kind).delete_query(ident.analyzerid, ident.ident);
        sql.execute(&query)
    }

    fn insert_message(&self, sql: &mut SqlSession, message: &Message) -> Result<(), DbError> {
        let payload = serde_json::to_string(&message.content).map_err(|e| codec_error(e.to_string()))?;
        let values = format!(
            "{}, {}, {}, {}",
            encode_ident(message.analyzerid),
            encode_ident(message.ident),
            to_micros(&message.create_time),
            sql.escape(&payload)?
        );
        sql.insert(
            schema::table_name(message.kind),
            "analyzerid, ident, create_time, payload",
            &values,
        )?;
        Ok(())
    }

    fn get_values(
        &self,
        sql: &mut SqlSession,
        selection: &Selection,
        criteria: Option<&Criteria>,
        distinct: bool,
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> Result<Table, DbError> {
        let kind = selection.kind().ok_or_else(|| DbError::Translation {
            message: if selection.is_empty() {
                "empty selection".to_string()
            } else {
                "selection mixes alert and heartbeat fields".to_string()
            },
        })?;
        let query = Translator::new(sql, kind).values_query(selection, criteria, distinct, limit, offset)?;
        let table = sql.query(&query.sql)?.unwrap_or_else(empty_table);
        if query.ident_columns.is_empty() {
            return Ok(table);
        }
        Ok(table.map_raw(|inner| {
            Box::new(IdentColumns {
                inner,
                columns: query.ident_columns,
            })
        }))
    }
}

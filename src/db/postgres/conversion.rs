//! Type conversion from PostgreSQL rows to driver fields.
//!
//! Handles conversion between:
//! - PostgreSQL column types → `TypeTag`
//! - `postgres::Row` cells → textual `RawField` data
//! - `json`/`jsonb` cells → a tag chosen per value, so that projected JSON
//!   scalars decode to the same `Value`s as under SQLite

use postgres::types::Type;
use postgres::Row;
use serde_json::Value as Json;

use crate::db::backend::{DriverError, RawField, TypeTag};

/// Map a PostgreSQL column type onto the portable tag set.
pub fn type_tag(ty: &Type) -> TypeTag {
    match *ty {
        Type::INT2 | Type::INT4 => TypeTag::Int32,
        Type::OID => TypeTag::UInt32,
        Type::INT8 => TypeTag::Int64,
        Type::FLOAT4 => TypeTag::Float32,
        Type::FLOAT8 => TypeTag::Float64,
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME => TypeTag::Text,
        _ => TypeTag::Other(ty.name().to_string()),
    }
}

fn cell<'a, T>(row: &'a Row, index: usize) -> Result<Option<T>, DriverError>
where
    T: postgres::types::FromSql<'a>,
{
    row.try_get::<_, Option<T>>(index)
        .map_err(|e| DriverError::new(1, format!("column {}: {}", index, e)))
}

fn field<T: ToString>(tag: TypeTag, value: Option<T>) -> RawField {
    RawField {
        tag,
        data: value.map(|v| v.to_string()),
    }
}

/// Tag a JSON value the way SQLite's `json_extract` types its result.
///
/// Booleans become 0 or 1. Objects and arrays stay JSON text.
pub fn json_field(value: Option<Json>) -> RawField {
    match value {
        None | Some(Json::Null) => RawField::null(),
        Some(Json::Bool(b)) => RawField::new(TypeTag::Int64, if b { "1" } else { "0" }),
        Some(Json::Number(n)) => match n.as_i64() {
            Some(i) => RawField::new(TypeTag::Int64, i.to_string()),
            None => match n.as_f64() {
                Some(f) => RawField::new(TypeTag::Float64, f.to_string()),
                None => RawField::new(TypeTag::Text, n.to_string()),
            },
        },
        Some(Json::String(text)) => RawField::new(TypeTag::Text, text),
        Some(other) => RawField::new(TypeTag::Text, other.to_string()),
    }
}

/// Convert the cell at `index` of `row` to a tagged textual field.
///
/// Columns of a type outside the portable set keep their PostgreSQL type
/// name and no data; decoding them reports the unsupported type.
pub fn raw_field(row: &Row, index: usize, ty: &Type) -> Result<RawField, DriverError> {
    if *ty == Type::JSON || *ty == Type::JSONB {
        return Ok(json_field(cell::<Json>(row, index)?));
    }
    let tag = type_tag(ty);
    let raw = match tag {
        TypeTag::Int32 if *ty == Type::INT2 => field(tag, cell::<i16>(row, index)?),
        TypeTag::Int32 => field(tag, cell::<i32>(row, index)?),
        TypeTag::UInt32 => field(tag, cell::<u32>(row, index)?),
        TypeTag::Int64 => field(tag, cell::<i64>(row, index)?),
        TypeTag::Float32 => field(tag, cell::<f32>(row, index)?),
        TypeTag::Float64 => field(tag, cell::<f64>(row, index)?),
        TypeTag::Text => field(tag, cell::<String>(row, index)?),
        TypeTag::UInt64 | TypeTag::Null | TypeTag::Other(_) => RawField { tag, data: None },
    };
    Ok(raw)
}

/// Convert a `postgres::Error` into a driver error.
///
/// Server-side failures keep their message and SQLSTATE; the numeric code is
/// always 1 since PostgreSQL has no numeric error codes.
pub fn driver_error(e: postgres::Error) -> DriverError {
    match e.as_db_error() {
        Some(db) => DriverError::new(1, db.message()).with_state(db.code().code()),
        None => DriverError::new(1, e.to_string()),
    }
}

//! Translation of criteria and selections into SQL for the JSON format.
//!
//! The identifier and time fields map to real columns; every other field is
//! read out of the JSON payload with the dialect's extraction operator:
//! - SQLite: `json_extract(payload, '$."a"."b"[0]')`
//! - PostgreSQL: `(payload::jsonb #>> '{a,b,0}')` in conditions and
//!   aggregates, which yields text, and `(payload::jsonb #> '{a,b,0}')` in
//!   projections, so the driver sees the JSON type of each value
//!
//! Identifier columns hold the order-preserving encoding of `encode_ident`.
//! Literals compared against them are encoded the same way, and the
//! projection reports which output columns carry identifiers so they can be
//! decoded back.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::db::{encode_ident, quote_identifier, Aggregate, BackendKind, DbError, Selection, SortOrder, SqlSession};
use crate::idmef::{Criteria, Criterion, CriterionValue, FieldPath, MessageKind, PathElement, Relation};

use super::schema::table_name;

/// Stored columns addressable by field path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    AnalyzerId,
    Ident,
    CreateTime,
}

impl Column {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "analyzerid" => Some(Column::AnalyzerId),
            "ident" => Some(Column::Ident),
            "create_time" => Some(Column::CreateTime),
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Column::AnalyzerId => "analyzerid",
            Column::Ident => "ident",
            Column::CreateTime => "create_time",
        }
    }

    fn is_ident(&self) -> bool {
        matches!(self, Column::AnalyzerId | Column::Ident)
    }
}

/// A field path resolved to SQL expressions.
#[derive(Debug, Clone, PartialEq)]
struct Field {
    /// Expression used in conditions and aggregates.
    expr: String,
    /// Expression used when the field is selected as an output column.
    projection: String,
    column: Option<Column>,
}

impl Field {
    fn is_json(&self) -> bool {
        self.column.is_none()
    }

    fn is_ident(&self) -> bool {
        self.column.is_some_and(|c| c.is_ident())
    }
}

/// SQL for a value projection.
#[derive(Debug, Clone, PartialEq)]
pub struct ValuesQuery {
    pub sql: String,
    /// Output columns holding stored identifiers.
    pub ident_columns: Vec<usize>,
}

fn translation_error(message: impl Into<String>) -> DbError {
    DbError::Translation {
        message: message.into(),
    }
}

/// Microseconds since the epoch, the stored form of `create_time`.
pub fn to_micros(time: &DateTime<Utc>) -> i64 {
    time.timestamp_micros()
}

/// Escape `%`, `_` and `\` for a LIKE pattern using `\` as escape character.
fn like_escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Builds SQL for one message class against one session's dialect.
pub struct Translator<'a> {
    sql: &'a SqlSession,
    backend: BackendKind,
    kind: MessageKind,
}

impl<'a> Translator<'a> {
    pub fn new(sql: &'a SqlSession, kind: MessageKind) -> Self {
        Self {
            sql,
            backend: sql.kind(),
            kind,
        }
    }

    fn table(&self) -> &'static str {
        table_name(self.kind)
    }

    /// JSON extraction in the session's dialect. `as_json` selects the
    /// PostgreSQL operator returning jsonb rather than text.
    fn json_extract(&self, elements: &[PathElement], as_json: bool) -> Result<String, DbError> {
        match self.backend {
            BackendKind::Sqlite => {
                let mut json_path = String::from("$");
                for element in elements {
                    json_path.push_str(&format!(".{}", quote_identifier(&element.name)));
                    match element.index {
                        Some(i) if i < 0 => json_path.push_str(&format!("[#{}]", i)),
                        Some(i) => json_path.push_str(&format!("[{}]", i)),
                        None => {}
                    }
                }
                Ok(format!("json_extract(payload, {})", self.sql.escape(&json_path)?))
            }
            BackendKind::Postgres => {
                let mut keys = Vec::new();
                for element in elements {
                    keys.push(element.name.clone());
                    if let Some(i) = element.index {
                        keys.push(i.to_string());
                    }
                }
                let text_array = format!("{{{}}}", keys.join(","));
                let operator = if as_json { "#>" } else { "#>>" };
                Ok(format!("(payload::jsonb {} {})", operator, self.sql.escape(&text_array)?))
            }
        }
    }

    fn field(&self, path: &FieldPath) -> Result<Field, DbError> {
        if path.kind() != self.kind {
            return Err(translation_error(format!(
                "field '{}' does not belong to {} messages",
                path,
                self.kind
            )));
        }

        if let Some(column) = path.top_level_name().and_then(Column::from_name) {
            return Ok(Field {
                expr: column.name().to_string(),
                projection: column.name().to_string(),
                column: Some(column),
            });
        }

        let expr = self.json_extract(path.elements(), false)?;
        let projection = match self.backend {
            BackendKind::Sqlite => expr.clone(),
            BackendKind::Postgres => self.json_extract(path.elements(), true)?,
        };
        Ok(Field {
            expr,
            projection,
            column: None,
        })
    }

    /// Floating-point value of a stored identifier.
    ///
    /// Stored values below zero are the identifiers under 2^63 and convert
    /// exactly; the rest are offset by 2^63 after conversion.
    fn ident_number(&self, expr: &str) -> String {
        let real = match self.backend {
            BackendKind::Sqlite => "REAL",
            BackendKind::Postgres => "DOUBLE PRECISION",
        };
        format!(
            "(CASE WHEN {e} < 0 THEN CAST({e} + 9223372036854775807 + 1 AS {real}) \
             ELSE CAST({e} AS {real}) + 9223372036854775808.0 END)",
            e = expr,
            real = real
        )
    }

    /// Stored form of a value compared against an identifier column.
    fn ident_literal(&self, column: Column, value: &CriterionValue) -> Result<String, DbError> {
        let ident = match value {
            CriterionValue::Integer(i) => u64::try_from(*i).map_err(|_| {
                translation_error(format!("{} cannot be negative, got {}", column.name(), i))
            })?,
            CriterionValue::Unsigned(u) => *u,
            CriterionValue::Text(s) => s.trim().parse().map_err(|_| {
                translation_error(format!("'{}' is not a valid {}", s, column.name()))
            })?,
            CriterionValue::Float(_) | CriterionValue::Time(_) => {
                return Err(translation_error(format!(
                    "{} only compares with unsigned integers, got {}",
                    column.name(),
                    value
                )));
            }
        };
        Ok(encode_ident(ident).to_string())
    }

    /// Expression usable in numeric comparisons and aggregates.
    fn numeric(&self, field: &Field) -> String {
        match (self.backend, field.is_json()) {
            (BackendKind::Postgres, true) => format!("CAST({} AS DOUBLE PRECISION)", field.expr),
            _ => field.expr.clone(),
        }
    }

    fn time_literal(&self, field: &Field, time: &DateTime<Utc>) -> Result<String, DbError> {
        match field.column {
            Some(Column::CreateTime) => Ok(to_micros(time).to_string()),
            Some(column) => Err(translation_error(format!(
                "cannot compare {} with a time value",
                column.name()
            ))),
            None => self
                .sql
                .escape(&time.to_rfc3339_opts(SecondsFormat::Micros, true)),
        }
    }

    /// Left and right side of a comparison between `field` and `value`.
    fn comparison(&self, field: &Field, value: &CriterionValue) -> Result<(String, String), DbError> {
        if let Some(column) = field.column.filter(Column::is_ident) {
            return Ok((field.expr.clone(), self.ident_literal(column, value)?));
        }
        match value {
            CriterionValue::Integer(i) => Ok((self.numeric(field), i.to_string())),
            CriterionValue::Unsigned(u) => Ok((self.numeric(field), u.to_string())),
            CriterionValue::Float(x) => Ok((self.numeric(field), x.to_string())),
            CriterionValue::Time(t) => Ok((field.expr.clone(), self.time_literal(field, t)?)),
            CriterionValue::Text(s) if field.column == Some(Column::CreateTime) => {
                let time = DateTime::parse_from_rfc3339(s.trim()).map_err(|_| {
                    translation_error(format!("'{}' is not a valid create_time", s))
                })?;
                Ok((field.expr.clone(), to_micros(&time.with_timezone(&Utc)).to_string()))
            }
            CriterionValue::Text(s) => Ok((field.expr.clone(), self.sql.escape(s)?)),
        }
    }

    fn criterion(&self, criterion: &Criterion) -> Result<String, DbError> {
        let path = FieldPath::parse(&criterion.path)
            .map_err(|e| translation_error(format!("criteria path '{}': {}", criterion.path, e)))?;
        let field = self.field(&path)?;

        let value = match (criterion.relation, &criterion.value) {
            (Relation::IsNull, _) => return Ok(format!("{} IS NULL", field.expr)),
            (Relation::IsNotNull, _) => return Ok(format!("{} IS NOT NULL", field.expr)),
            (_, Some(value)) => value,
            (_, None) => {
                return Err(translation_error(format!("criterion '{}' has no value", criterion)));
            }
        };

        if criterion.relation == Relation::Substr {
            if field.is_ident() {
                return Err(translation_error(format!(
                    "substring match is not available on {}",
                    criterion.path
                )));
            }
            let pattern = format!("%{}%", like_escape(&value.to_string()));
            return Ok(format!(
                "CAST({} AS TEXT) LIKE {} ESCAPE '\\'",
                field.expr,
                self.sql.escape(&pattern)?
            ));
        }

        let op = match criterion.relation {
            Relation::Equal => "=",
            Relation::NotEqual => "!=",
            Relation::Greater => ">",
            Relation::GreaterOrEqual => ">=",
            Relation::Lesser => "<",
            Relation::LesserOrEqual => "<=",
            Relation::Substr | Relation::IsNull | Relation::IsNotNull => unreachable!("handled above"),
        };
        let (lhs, rhs) = self.comparison(&field, value)?;
        Ok(format!("{} {} {}", lhs, op, rhs))
    }

    /// SQL boolean expression for a criteria tree.
    pub fn criteria(&self, criteria: &Criteria) -> Result<String, DbError> {
        let join = |list: &[Criteria], sep: &str, empty: &str| -> Result<String, DbError> {
            if list.is_empty() {
                return Ok(empty.to_string());
            }
            let parts = list
                .iter()
                .map(|c| self.criteria(c))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(format!("({})", parts.join(sep)))
        };

        match criteria {
            Criteria::Criterion(c) => self.criterion(c),
            Criteria::And(list) => join(list, " AND ", "1 = 1"),
            Criteria::Or(list) => join(list, " OR ", "1 = 0"),
            Criteria::Not(inner) => Ok(format!("NOT ({})", self.criteria(inner)?)),
        }
    }

    fn where_clause(&self, criteria: Option<&Criteria>) -> Result<String, DbError> {
        match criteria {
            Some(criteria) => Ok(format!(" WHERE {}", self.criteria(criteria)?)),
            None => Ok(String::new()),
        }
    }

    fn limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> Result<String, DbError> {
        self.sql.limit_offset(limit, offset)
    }

    /// Identifiers of matching messages, newest first.
    pub fn idents_query(
        &self,
        criteria: Option<&Criteria>,
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> Result<String, DbError> {
        Ok(format!(
            "SELECT analyzerid, ident FROM {}{} ORDER BY create_time DESC, _seq DESC{}",
            self.table(),
            self.where_clause(criteria)?,
            self.limit_offset(limit, offset)?
        ))
    }

    fn ident_condition(&self, analyzerid: u64, ident: u64) -> String {
        format!(
            "analyzerid = {} AND ident = {}",
            encode_ident(analyzerid),
            encode_ident(ident)
        )
    }

    pub fn message_query(&self, analyzerid: u64, ident: u64) -> String {
        format!(
            "SELECT analyzerid, ident, create_time, payload FROM {} WHERE {}",
            self.table(),
            self.ident_condition(analyzerid, ident)
        )
    }

    pub fn delete_query(&self, analyzerid: u64, ident: u64) -> String {
        format!(
            "DELETE FROM {} WHERE {}",
            self.table(),
            self.ident_condition(analyzerid, ident)
        )
    }

    fn aggregate(&self, aggregate: Aggregate, field: &Field) -> Result<String, DbError> {
        let number = if field.is_ident() {
            self.ident_number(&field.expr)
        } else {
            field.expr.clone()
        };
        let expr = match (aggregate, self.backend) {
            (Aggregate::Min, _) => format!("MIN({})", field.expr),
            (Aggregate::Max, _) => format!("MAX({})", field.expr),
            (Aggregate::Count, _) => format!("COUNT({})", field.expr),
            (Aggregate::Avg, BackendKind::Sqlite) => format!("AVG({})", number),
            (Aggregate::Avg, BackendKind::Postgres) => {
                format!("AVG(CAST({} AS DOUBLE PRECISION))", number)
            }
            (Aggregate::Std, BackendKind::Postgres) => {
                format!("STDDEV(CAST({} AS DOUBLE PRECISION))", number)
            }
            (Aggregate::Std, BackendKind::Sqlite) => {
                return Err(translation_error("std() is not available on sqlite"));
            }
        };
        Ok(expr)
    }

    /// Projection of `selection` over matching messages.
    ///
    /// Rows come in insertion order unless the selection orders, groups or
    /// aggregates, or `distinct` is set.
    pub fn values_query(
        &self,
        selection: &Selection,
        criteria: Option<&Criteria>,
        distinct: bool,
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> Result<ValuesQuery, DbError> {
        if selection.is_empty() {
            return Err(translation_error("empty selection"));
        }

        let mut columns = Vec::with_capacity(selection.len());
        let mut group_by = Vec::new();
        let mut order_by = Vec::new();
        let mut ident_columns = Vec::new();

        for (index, selected) in selection.iter().enumerate() {
            let field = self.field(&selected.path)?;
            let expr = match selected.aggregate {
                Some(aggregate) => self.aggregate(aggregate, &field)?,
                None => field.projection.clone(),
            };
            if field.is_ident() && matches!(selected.aggregate, None | Some(Aggregate::Min | Aggregate::Max)) {
                ident_columns.push(index);
            }

            if selected.group_by {
                group_by.push(field.projection.clone());
            }
            match selected.order {
                Some(SortOrder::Asc) => order_by.push(format!("{} ASC", expr)),
                Some(SortOrder::Desc) => order_by.push(format!("{} DESC", expr)),
                None => {}
            }
            columns.push(format!("{} AS {}", expr, quote_identifier(&selected.label())));
        }

        if order_by.is_empty() && !distinct && group_by.is_empty() && !selection.has_aggregate() {
            order_by.push("_seq ASC".to_string());
        }

        let mut query = format!(
            "SELECT {}{} FROM {}{}",
            if distinct { "DISTINCT " } else { "" },
            columns.join(", "),
            self.table(),
            self.where_clause(criteria)?
        );
        if !group_by.is_empty() {
            query.push_str(&format!(" GROUP BY {}", group_by.join(", ")));
        }
        if !order_by.is_empty() {
            query.push_str(&format!(" ORDER BY {}", order_by.join(", ")));
        }
        query.push_str(&self.limit_offset(limit, offset)?);
        Ok(ValuesQuery {
            sql: query,
            ident_columns,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::BackendConfig;
    use rstest::{fixture, rstest};

    #[fixture]
    fn session() -> SqlSession {
        let mut sql = SqlSession::new(BackendConfig::Memory);
        sql.connect().unwrap();
        sql
    }

    fn path(s: &str) -> FieldPath {
        FieldPath::parse(s).unwrap()
    }

    #[rstest]
    fn test_column_fields(session: SqlSession) {
        let t = Translator::new(&session, MessageKind::Alert);
        assert_eq!(t.field(&path("alert.analyzerid")).unwrap().expr, "analyzerid");
        assert_eq!(t.field(&path("alert.create_time")).unwrap().expr, "create_time");
    }

    #[rstest]
    fn test_json_field_sqlite(session: SqlSession) {
        let t = Translator::new(&session, MessageKind::Alert);
        assert_eq!(
            t.field(&path("alert.source(0).node.name")).unwrap().expr,
            r#"json_extract(payload, '$."source"[0]."node"."name"')"#
        );
        assert_eq!(
            t.field(&path("alert.target(-1).ident")).unwrap().expr,
            r#"json_extract(payload, '$."target"[#-1]."ident"')"#
        );
    }

    #[rstest]
    fn test_field_of_other_class_is_rejected(session: SqlSession) {
        let t = Translator::new(&session, MessageKind::Alert);
        assert!(matches!(
            t.field(&path("heartbeat.ident")),
            Err(DbError::Translation { .. })
        ));
    }

    #[rstest]
    fn test_criteria_sql(session: SqlSession) {
        let t = Translator::new(&session, MessageKind::Alert);
        let criteria = Criteria::equal("alert.classification.text", "it's")
            .and(Criteria::criterion("alert.analyzerid", Relation::Greater, 5i64))
            .or(!Criteria::is_null("alert.source"));
        assert_eq!(
            t.criteria(&criteria).unwrap(),
            r#"((json_extract(payload, '$."classification"."text"') = 'it''s' AND analyzerid > -9223372036854775803) OR NOT (json_extract(payload, '$."source"') IS NULL))"#
        );
    }

    #[rstest]
    fn test_substr_escapes_like_wildcards(session: SqlSession) {
        let t = Translator::new(&session, MessageKind::Alert);
        let criteria = Criteria::criterion("alert.classification.text", Relation::Substr, "50%_off");
        assert_eq!(
            t.criteria(&criteria).unwrap(),
            r#"CAST(json_extract(payload, '$."classification"."text"') AS TEXT) LIKE '%50\%\_off%' ESCAPE '\'"#
        );
    }

    #[rstest]
    fn test_create_time_compares_in_micros(session: SqlSession) {
        let t = Translator::new(&session, MessageKind::Alert);
        let time = DateTime::from_timestamp(1_700_000_000, 5_000).unwrap();
        let criteria = Criteria::criterion("alert.create_time", Relation::GreaterOrEqual, time);
        assert_eq!(t.criteria(&criteria).unwrap(), "create_time >= 1700000000000005");

        let text = Criteria::criterion("alert.create_time", Relation::Lesser, "2023-11-14T22:13:20Z");
        assert_eq!(t.criteria(&text).unwrap(), "create_time < 1700000000000000");
    }

    #[rstest]
    fn test_empty_and_or(session: SqlSession) {
        let t = Translator::new(&session, MessageKind::Alert);
        assert_eq!(t.criteria(&Criteria::And(vec![])).unwrap(), "1 = 1");
        assert_eq!(t.criteria(&Criteria::Or(vec![])).unwrap(), "1 = 0");
    }

    #[rstest]
    fn test_bad_criteria_path_is_translation_error(session: SqlSession) {
        let t = Translator::new(&session, MessageKind::Alert);
        assert!(matches!(
            t.criteria(&Criteria::equal("bogus", 1i64)),
            Err(DbError::Translation { .. })
        ));
    }

    #[rstest]
    fn test_idents_query(session: SqlSession) {
        let t = Translator::new(&session, MessageKind::Heartbeat);
        assert_eq!(
            t.idents_query(None, Some(10), None).unwrap(),
            "SELECT analyzerid, ident FROM heartbeat ORDER BY create_time DESC, _seq DESC LIMIT 10"
        );
    }

    #[rstest]
    fn test_ident_condition_uses_stored_form(session: SqlSession) {
        let t = Translator::new(&session, MessageKind::Alert);
        assert_eq!(
            t.delete_query(u64::MAX, 42),
            "DELETE FROM alert WHERE analyzerid = 9223372036854775807 AND ident = -9223372036854775766"
        );
    }

    #[rstest]
    #[case(CriterionValue::Integer(0), "-9223372036854775808")]
    #[case(CriterionValue::Unsigned(u64::MAX), "9223372036854775807")]
    #[case(CriterionValue::Unsigned(1 << 63), "0")]
    #[case(CriterionValue::Text(" 18446744073709551614 ".into()), "9223372036854775806")]
    fn test_ident_literals(session: SqlSession, #[case] value: CriterionValue, #[case] stored: &str) {
        let t = Translator::new(&session, MessageKind::Alert);
        let criteria = Criteria::criterion("alert.ident", Relation::LesserOrEqual, value);
        assert_eq!(t.criteria(&criteria).unwrap(), format!("ident <= {}", stored));
    }

    #[rstest]
    #[case(Relation::Equal, CriterionValue::Integer(-1))]
    #[case(Relation::Greater, CriterionValue::Float(1.5))]
    #[case(Relation::Equal, CriterionValue::Text("sensor".into()))]
    #[case(Relation::Substr, CriterionValue::Integer(12))]
    fn test_ident_rejects_non_identifier_values(
        session: SqlSession,
        #[case] relation: Relation,
        #[case] value: CriterionValue,
    ) {
        let t = Translator::new(&session, MessageKind::Alert);
        let criteria = Criteria::criterion("alert.analyzerid", relation, value);
        assert!(matches!(t.criteria(&criteria), Err(DbError::Translation { .. })));
    }

    #[rstest]
    fn test_values_query_default_order(session: SqlSession) {
        let t = Translator::new(&session, MessageKind::Alert);
        let selection = Selection::parse(&["alert.classification.text"]).unwrap();
        assert_eq!(
            t.values_query(&selection, None, false, Some(2), None).unwrap().sql,
            r#"SELECT json_extract(payload, '$."classification"."text"') AS "alert.classification.text" FROM alert ORDER BY _seq ASC LIMIT 2"#
        );
    }

    #[rstest]
    fn test_values_query_group_and_order(session: SqlSession) {
        let t = Translator::new(&session, MessageKind::Alert);
        let selection = Selection::parse(&[
            "alert.classification.text/group_by",
            "count(alert.ident)/order_desc",
        ])
        .unwrap();
        let query = t.values_query(&selection, None, false, None, None).unwrap();
        assert!(query.ident_columns.is_empty());
        assert_eq!(
            query.sql,
            r#"SELECT json_extract(payload, '$."classification"."text"') AS "alert.classification.text", COUNT(ident) AS "count(alert.ident)" FROM alert GROUP BY json_extract(payload, '$."classification"."text"') ORDER BY COUNT(ident) DESC"#
        );
    }

    #[rstest]
    fn test_values_query_distinct_has_no_default_order(session: SqlSession) {
        let t = Translator::new(&session, MessageKind::Alert);
        let selection = Selection::parse(&["alert.analyzerid"]).unwrap();
        let query = t.values_query(&selection, None, true, None, Some(3)).unwrap();
        assert_eq!(
            query.sql,
            r#"SELECT DISTINCT analyzerid AS "alert.analyzerid" FROM alert LIMIT -1 OFFSET 3"#
        );
        assert_eq!(query.ident_columns, vec![0]);
    }

    #[rstest]
    fn test_values_query_marks_identifier_columns(session: SqlSession) {
        let t = Translator::new(&session, MessageKind::Alert);
        let selection = Selection::parse(&[
            "alert.classification.text",
            "max(alert.analyzerid)",
            "count(alert.ident)",
            "min(alert.ident)",
            "avg(alert.ident)",
        ])
        .unwrap();
        let query = t.values_query(&selection, None, false, None, None).unwrap();
        assert_eq!(query.ident_columns, vec![1, 3]);
        assert!(query.sql.contains(
            "AVG((CASE WHEN ident < 0 THEN CAST(ident + 9223372036854775807 + 1 AS REAL) \
             ELSE CAST(ident AS REAL) + 9223372036854775808.0 END))"
        ));
    }

    #[rstest]
    fn test_values_query_rejects_empty_and_std_on_sqlite(session: SqlSession) {
        let t = Translator::new(&session, MessageKind::Alert);
        assert!(matches!(
            t.values_query(&Selection::new(), None, false, None, None),
            Err(DbError::Translation { .. })
        ));
        let std = Selection::parse(&["std(alert.assessment.confidence)"]).unwrap();
        assert!(matches!(
            t.values_query(&std, None, false, None, None),
            Err(DbError::Translation { .. })
        ));
    }
}

//! Integration tests of the database layer against PostgreSQL.
//!
//! These tests require a running PostgreSQL server.
//! Run with: cargo test --features postgres-tests
//!
//! Prerequisites:
//! 1. PostgreSQL reachable on localhost as user `postgres`
//! 2. Create test database: `createdb -U postgres idmef_db_test`
//!
//! The tests share the `alert` and `heartbeat` tables, so each one holds a
//! lock and empties them first.

#![cfg(feature = "postgres-tests")]

use std::sync::{Mutex, MutexGuard};

use chrono::DateTime;
use rstest::{fixture, rstest};

use idmef_db::db::{
    open_db, BackendConfig, Database, DatabaseConfig, DbError, MessageIdent, PostgresConfig, Selection, Value,
};
use idmef_db::idmef::{Criteria, Message, Relation};

/// Test connection string for PostgreSQL (local instance)
const PG_CONNECTION: &str = "host=localhost user=postgres dbname=idmef_db_test";

static LOCK: Mutex<()> = Mutex::new(());

struct PgDb {
    db: Database,
    _guard: MutexGuard<'static, ()>,
}

#[fixture]
fn pg() -> PgDb {
    let guard = LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let config = DatabaseConfig::new(BackendConfig::Postgres(PostgresConfig {
        connection_string: Some(PG_CONNECTION.to_string()),
        ..PostgresConfig::default()
    }));
    let db = open_db(config).expect("Failed to connect to PostgreSQL");
    db.setup().expect("Failed to create schema");
    {
        let mut sql = db.sql().unwrap();
        sql.execute("DELETE FROM alert").unwrap();
        sql.execute("DELETE FROM heartbeat").unwrap();
    }
    PgDb { db, _guard: guard }
}

fn alert(ident: u64, text: &str, secs: i64) -> Message {
    Message::alert(1, ident)
        .with_create_time(DateTime::from_timestamp(secs, 0).unwrap())
        .with("classification.text", text)
        .with("assessment.confidence.confidence", 0.25 * ident as f64)
}

#[fixture]
fn abc(pg: PgDb) -> PgDb {
    for (ident, text) in [(1, "A"), (2, "B"), (3, "C")] {
        pg.db.insert(&alert(ident, text, 100 + ident as i64)).unwrap();
    }
    pg
}

// ============================================================================
// Messages
// ============================================================================

#[rstest]
fn test_round_trip_full_range_identifiers(pg: PgDb) {
    let message = Message::heartbeat(u64::MAX, 1 << 63)
        .with_create_time("2024-05-06T07:08:09.123456Z".parse().unwrap())
        .with("heartbeat_interval", 600)
        .with("analyzer.name", "sensor 'one'");
    let ident = pg.db.insert(&message).unwrap();
    assert_eq!(pg.db.get_heartbeat(ident).unwrap(), message);
}

#[rstest]
fn test_get_missing_is_not_found(abc: PgDb) {
    assert!(matches!(
        abc.db.get_alert(MessageIdent::new(1, 42)),
        Err(DbError::NotFound { analyzerid: 1, ident: 42 })
    ));
}

#[rstest]
fn test_duplicate_insert_reports_sqlstate(abc: PgDb) {
    match abc.db.insert(&alert(1, "again", 1)) {
        Err(DbError::Sql(e)) => assert_eq!(e.state.as_deref(), Some("23505")),
        other => panic!("expected unique violation, got {:?}", other),
    }
    // The failed insert rolled back; the session is still usable.
    assert_eq!(abc.db.alert_idents(None, None, None).unwrap().len(), 3);
}

#[rstest]
fn test_idents_newest_first_with_window(abc: PgDb) {
    let idents: Vec<MessageIdent> = abc
        .db
        .alert_idents(None, Some(2), Some(1))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(idents, vec![MessageIdent::new(1, 2), MessageIdent::new(1, 1)]);
    assert!(abc.db.alert_idents(None, Some(0), None).unwrap().is_empty());
}

#[rstest]
fn test_delete(abc: PgDb) {
    abc.db.delete_alert(MessageIdent::new(1, 1)).unwrap();
    assert!(matches!(
        abc.db.delete_alert(MessageIdent::new(1, 1)),
        Err(DbError::DeletionFailed { analyzerid: 1, ident: 1, .. })
    ));
}

// ============================================================================
// Criteria and values
// ============================================================================

#[rstest]
fn test_criteria_on_json_fields(abc: PgDb) {
    let criteria = Criteria::criterion("alert.assessment.confidence.confidence", Relation::GreaterOrEqual, 0.5)
        .and(Criteria::criterion("alert.classification.text", Relation::Substr, "C"));
    let idents: Vec<MessageIdent> = abc
        .db
        .alert_idents(Some(&criteria), None, None)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(idents, vec![MessageIdent::new(1, 3)]);
}

#[rstest]
fn test_values_in_insertion_order(abc: PgDb) {
    let selection = Selection::parse(&["alert.classification.text"]).unwrap();
    let rows = abc.db.get_values(&selection, None, false, Some(2), None).unwrap();
    assert_eq!(rows, vec![vec![Value::from("A")], vec![Value::from("B")]]);
}

#[rstest]
fn test_json_values_typed_like_sqlite(pg: PgDb) {
    let sqlite = open_db(DatabaseConfig::new(BackendConfig::Memory)).unwrap();
    sqlite.setup().unwrap();
    for (ident, severity) in [(1, Some("low")), (2, None)] {
        let mut message = alert(ident, "A", ident as i64).with("analyzer.process.pid", 4000 + ident as i64);
        if let Some(severity) = severity {
            message = message.with("assessment.impact.severity", severity);
        }
        pg.db.insert(&message).unwrap();
        sqlite.insert(&message).unwrap();
    }

    let selection = Selection::parse(&[
        "alert.assessment.confidence.confidence",
        "alert.analyzer.process.pid",
        "alert.assessment.impact.severity",
        "alert.analyzerid",
    ])
    .unwrap();
    let rows = pg.db.get_values(&selection, None, false, None, None).unwrap();
    assert_eq!(
        rows[0],
        vec![Value::Float64(0.25), Value::Int64(4001), Value::from("low"), Value::UInt64(1)]
    );
    assert_eq!(rows[1][2], Value::Null);
    assert_eq!(rows, sqlite.get_values(&selection, None, false, None, None).unwrap());
}

#[rstest]
fn test_identifier_ranges_are_unsigned(pg: PgDb) {
    pg.db.insert(&Message::alert(u64::MAX, 1)).unwrap();
    pg.db.insert(&Message::alert(3, 2)).unwrap();
    let criteria = Criteria::criterion("alert.analyzerid", Relation::Greater, 5u64);
    let idents: Vec<MessageIdent> = pg
        .db
        .alert_idents(Some(&criteria), None, None)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(idents, vec![MessageIdent::new(u64::MAX, 1)]);

    let selection = Selection::parse(&["max(alert.analyzerid)"]).unwrap();
    let rows = pg.db.get_values(&selection, None, false, None, None).unwrap();
    assert_eq!(rows, vec![vec![Value::UInt64(u64::MAX)]]);
}

#[rstest]
fn test_format_detected_on_connect(abc: PgDb) {
    let db = open_db(DatabaseConfig::new(BackendConfig::Postgres(PostgresConfig {
        connection_string: Some(PG_CONNECTION.to_string()),
        ..PostgresConfig::default()
    })))
    .unwrap();
    assert_eq!(db.format_name(), "json");
    assert_eq!(db.alert_idents(None, None, None).unwrap().len(), 3);
}

#[rstest]
fn test_values_aggregates(abc: PgDb) {
    let selection = Selection::parse(&[
        "count(alert.ident)",
        "max(alert.assessment.confidence.confidence)",
        "avg(alert.assessment.confidence.confidence)",
    ])
    .unwrap();
    let rows = abc.db.get_values(&selection, None, false, None, None).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][0].as_i64(), Some(3));
    // Extracted JSON is text; only avg and std cast to a number.
    assert_eq!(rows[0][1], Value::from("0.75"));
    assert_eq!(rows[0][2].as_f64(), Some(0.5));
}

#[rstest]
fn test_values_distinct(pg: PgDb) {
    for (ident, text) in [(1, "scan"), (2, "scan"), (3, "ping")] {
        pg.db.insert(&alert(ident, text, ident as i64)).unwrap();
    }
    let selection = Selection::parse(&["alert.classification.text/order_asc"]).unwrap();
    let rows = pg.db.get_values(&selection, None, true, None, None).unwrap();
    assert_eq!(rows, vec![vec![Value::from("ping")], vec![Value::from("scan")]]);
}

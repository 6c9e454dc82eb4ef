//! Shared test utilities for unit and command tests.

use std::sync::{Mutex, MutexGuard, OnceLock};

use chrono::DateTime;

use crate::db::{open_mem_db, Database};
use crate::idmef::Message;

/// Serialize tests that touch process-wide state (environment variables and
/// the current directory).
pub fn test_lock() -> MutexGuard<'static, ()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// An alert created `secs` seconds after the epoch with a classification.
pub fn sample_alert(analyzerid: u64, ident: u64, text: &str, secs: i64) -> Message {
    Message::alert(analyzerid, ident)
        .with_create_time(DateTime::from_timestamp(secs, 0).expect("valid timestamp"))
        .with("classification.text", text)
        .with("assessment.impact.severity", "medium")
}

/// A heartbeat created `secs` seconds after the epoch.
pub fn sample_heartbeat(analyzerid: u64, ident: u64, secs: i64) -> Message {
    Message::heartbeat(analyzerid, ident)
        .with_create_time(DateTime::from_timestamp(secs, 0).expect("valid timestamp"))
        .with("heartbeat_interval", 600)
}

/// In-memory database holding three alerts ("A", "B", "C", oldest first)
/// from analyzer 1 and two heartbeats from analyzer 2.
pub fn populated_db() -> Database {
    let db = open_mem_db();
    for (ident, text) in [(1, "A"), (2, "B"), (3, "C")] {
        db.insert(&sample_alert(1, ident, text, 1_000 + ident as i64))
            .expect("insert alert");
    }
    for ident in [1, 2] {
        db.insert(&sample_heartbeat(2, ident, 2_000 + ident as i64))
            .expect("insert heartbeat");
    }
    db
}

//! Database connection management.

use super::backend::SqlDriver;
use super::config::{BackendConfig, DatabaseConfig};
use super::interface::Database;
use super::postgres::PostgresDriver;
use super::sqlite::SqliteDriver;
use super::DbError;

/// Open the driver described by `backend`.
pub fn open_driver(backend: &BackendConfig) -> Result<Box<dyn SqlDriver>, DbError> {
    let driver = match backend {
        BackendConfig::Sqlite { path } => Box::new(SqliteDriver::open(path)?) as Box<dyn SqlDriver>,
        BackendConfig::Memory => Box::new(SqliteDriver::open_in_memory()?) as Box<dyn SqlDriver>,
        BackendConfig::Postgres(pg) => Box::new(PostgresDriver::connect(pg)?) as Box<dyn SqlDriver>,
    };
    Ok(driver)
}

/// Build a `Database` from `config` and connect it.
pub fn open_db(config: DatabaseConfig) -> Result<Database, DbError> {
    let db = Database::new(config)?;
    db.connect()?;
    Ok(db)
}

/// Create a connected in-memory database with the schema in place.
///
/// Used for tests to avoid disk I/O and temp file management.
#[cfg(test)]
pub fn open_mem_db() -> Database {
    let db = open_db(DatabaseConfig::new(BackendConfig::Memory)).expect("Failed to create in-memory DB");
    db.setup().expect("Failed to create schema");
    db
}

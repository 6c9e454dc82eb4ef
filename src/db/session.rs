//! SQL session: one driver connection plus transaction and error bookkeeping.
//!
//! The session is the only place statements reach a driver. It records the
//! last backend error verbatim, tracks whether a transaction is open, and logs
//! every statement it sends.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::ops::{Deref, DerefMut};
use std::path::Path;

use tracing::{debug, info, warn};

use super::backend::{BackendKind, QueryOutcome, SqlDriver};
use super::config::BackendConfig;
use super::connection::open_driver;
use super::escape::contains_nul;
use super::table::Table;
use super::{DbError, SqlError};

const SQL_TARGET: &str = "idmef_db::sql";

/// A session against one SQL backend.
///
/// Created disconnected. `connect` opens the driver described by the
/// backend configuration; dropping the session rolls back any open
/// transaction and closes the driver.
pub struct SqlSession {
    backend: BackendConfig,
    driver: Option<Box<dyn SqlDriver>>,
    in_transaction: bool,
    last_error: Option<SqlError>,
    query_log: Option<File>,
}

impl SqlSession {
    pub fn new(backend: BackendConfig) -> Self {
        Self {
            backend,
            driver: None,
            in_transaction: false,
            last_error: None,
            query_log: None,
        }
    }

    pub fn kind(&self) -> BackendKind {
        self.backend.kind()
    }

    pub fn is_connected(&self) -> bool {
        self.driver.is_some()
    }

    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    /// Open the backend connection.
    pub fn connect(&mut self) -> Result<(), DbError> {
        if self.driver.is_some() {
            return Err(DbError::AlreadyConnected);
        }

        let driver = open_driver(&self.backend)?;
        info!(backend = %self.kind(), "SQL session connected");
        self.driver = Some(driver);
        self.in_transaction = false;
        self.last_error = None;
        Ok(())
    }

    /// Close the backend connection.
    ///
    /// A no-op when not connected. A transaction still open at this point is
    /// rolled back and reported as an error; the connection is closed either
    /// way.
    pub fn disconnect(&mut self) -> Result<(), DbError> {
        let Some(mut driver) = self.driver.take() else {
            return Ok(());
        };

        let mut teardown: Option<SqlError> = None;

        if self.in_transaction {
            self.in_transaction = false;
            warn!(backend = %self.kind(), "Disconnecting with an open transaction, rolling back");
            self.log_query("ROLLBACK");
            teardown = Some(match driver.query("ROLLBACK") {
                Ok(_) => SqlError {
                    code: 0,
                    state: None,
                    message: "connection closed while a transaction was open; transaction rolled back"
                        .to_string(),
                },
                Err(e) => e.into(),
            });
        }

        if let Err(e) = driver.close() {
            warn!(backend = %self.kind(), error = %e, "Error while closing connection");
            teardown.get_or_insert(e.into());
        }

        info!(backend = %self.kind(), "SQL session disconnected");

        match teardown {
            Some(e) => {
                self.last_error = Some(e.clone());
                Err(DbError::Sql(e))
            }
            None => Ok(()),
        }
    }

    /// Append every statement sent from now on to `path`.
    pub fn enable_query_logging(&mut self, path: &Path) -> Result<(), DbError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| DbError::BadConfiguration {
                message: format!("cannot open query log {}: {}", path.display(), e),
            })?;
        self.query_log = Some(file);
        Ok(())
    }

    pub fn disable_query_logging(&mut self) {
        self.query_log = None;
    }

    fn log_query(&mut self, sql: &str) {
        debug!(target: SQL_TARGET, backend = %self.backend.kind(), "{}", sql);

        if let Some(file) = self.query_log.as_mut() {
            // Logging failures never stop the statement from running.
            if let Err(e) = writeln!(file, "{}", sql).and_then(|_| file.flush()) {
                warn!(error = %e, "Could not write query log");
            }
        }
    }

    /// Run one statement.
    ///
    /// Returns `Ok(None)` for statements without a row-set.
    pub fn query(&mut self, sql: &str) -> Result<Option<Table>, DbError> {
        match self.run(sql)? {
            QueryOutcome::Rows(raw) => Ok(Some(Table::new(raw))),
            QueryOutcome::Done { .. } => Ok(None),
        }
    }

    /// Run one statement and return the number of rows it affected.
    ///
    /// Statements producing a row-set report the number of rows in it.
    pub fn execute(&mut self, sql: &str) -> Result<u64, DbError> {
        match self.run(sql)? {
            QueryOutcome::Rows(raw) => Ok(raw.row_count() as u64),
            QueryOutcome::Done { affected } => Ok(affected),
        }
    }

    /// Build and run `INSERT INTO table (fields) VALUES(values)`.
    ///
    /// `values` must already be escaped for this backend.
    pub fn insert(&mut self, table: &str, fields: &str, values: &str) -> Result<u64, DbError> {
        self.execute(&format!("INSERT INTO {} ({}) VALUES({})", table, fields, values))
    }

    fn run(&mut self, sql: &str) -> Result<QueryOutcome, DbError> {
        if self.driver.is_none() {
            return Err(DbError::NotConnected);
        }
        self.log_query(sql);

        let driver = self.driver.as_mut().ok_or(DbError::NotConnected)?;
        match driver.query(sql) {
            Ok(outcome) => {
                self.last_error = None;
                Ok(outcome)
            }
            Err(e) => {
                let err = SqlError::from(e);
                debug!(target: SQL_TARGET, code = err.code, error = %err.message, "Statement failed");
                self.last_error = Some(err.clone());
                Err(DbError::Sql(err))
            }
        }
    }

    /// Send `BEGIN`. Nested transactions are left for the backend to reject.
    pub fn begin(&mut self) -> Result<(), DbError> {
        self.run("BEGIN")?;
        self.in_transaction = true;
        Ok(())
    }

    /// Send `COMMIT`. The transaction is considered closed even if the
    /// backend rejects the statement.
    pub fn commit(&mut self) -> Result<(), DbError> {
        let result = self.run("COMMIT");
        self.in_transaction = false;
        result.map(|_| ())
    }

    /// Send `ROLLBACK`. The transaction is considered closed even if the
    /// backend rejects the statement.
    pub fn rollback(&mut self) -> Result<(), DbError> {
        let result = self.run("ROLLBACK");
        self.in_transaction = false;
        result.map(|_| ())
    }

    /// Begin a transaction that rolls back when the guard is dropped
    /// without `commit`.
    pub fn transaction(&mut self) -> Result<Transaction<'_>, DbError> {
        self.begin()?;
        Ok(Transaction {
            session: self,
            finished: false,
        })
    }

    /// Backend error code of the last failed statement.
    pub fn errno(&self) -> Option<i64> {
        self.last_error.as_ref().map(|e| e.code)
    }

    /// Backend error message of the last failed statement.
    pub fn error(&self) -> Option<&str> {
        self.last_error.as_ref().map(|e| e.message.as_str())
    }

    pub fn last_error(&self) -> Option<&SqlError> {
        self.last_error.as_ref()
    }

    /// Quote `input` as a string literal in this backend's dialect.
    ///
    /// Strings holding a NUL character cannot appear in statement text and
    /// fail with [`DbError::Translation`].
    pub fn escape(&self, input: &str) -> Result<String, DbError> {
        let driver = self.driver.as_ref().ok_or(DbError::NotConnected)?;
        if contains_nul(input) {
            return Err(DbError::Translation {
                message: "string literal contains a NUL character".to_string(),
            });
        }
        Ok(driver.escape(input))
    }

    /// LIMIT/OFFSET clause in this backend's dialect.
    pub fn limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> Result<String, DbError> {
        let driver = self.driver.as_ref().ok_or(DbError::NotConnected)?;
        Ok(driver.limit_offset(limit, offset))
    }
}

impl Drop for SqlSession {
    fn drop(&mut self) {
        if let Err(e) = self.disconnect() {
            warn!(error = %e, "SQL session dropped uncleanly");
        }
    }
}

/// Scoped transaction. Rolls back on drop unless committed.
pub struct Transaction<'a> {
    session: &'a mut SqlSession,
    finished: bool,
}

impl Transaction<'_> {
    pub fn commit(mut self) -> Result<(), DbError> {
        self.finished = true;
        self.session.commit()
    }

    pub fn rollback(mut self) -> Result<(), DbError> {
        self.finished = true;
        self.session.rollback()
    }
}

impl Deref for Transaction<'_> {
    type Target = SqlSession;

    fn deref(&self) -> &SqlSession {
        self.session
    }
}

impl DerefMut for Transaction<'_> {
    fn deref_mut(&mut self) -> &mut SqlSession {
        self.session
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if self.finished || !self.session.in_transaction {
            return;
        }
        if let Err(e) = self.session.rollback() {
            warn!(error = %e, "Rollback of abandoned transaction failed");
        }
    }
}

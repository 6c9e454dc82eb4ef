//! PostgreSQL driver.
//!
//! Statements are prepared first so the driver learns the result columns and
//! their types. Statements without result columns run through `execute` and
//! report the affected row count; everything else is queried and buffered.

mod conversion;

use postgres::{Client, NoTls};
use tracing::debug;

use super::backend::{BackendKind, BufferedTable, DriverError, QueryOutcome, SqlDriver};
use super::config::PostgresConfig;
use super::DbError;

pub use conversion::type_tag;

/// PostgreSQL driver over the synchronous `postgres` client.
pub struct PostgresDriver {
    client: Option<Client>,
}

impl PostgresDriver {
    /// Connect using the given configuration.
    ///
    /// # Errors
    /// Returns `BadConfiguration` if the configuration lacks connection
    /// details, `Connection` if the server is unreachable or rejects the
    /// credentials.
    pub fn connect(config: &PostgresConfig) -> Result<Self, DbError> {
        let conn_str = config.build_connection_string()?;
        let client = Client::connect(&conn_str, NoTls).map_err(|e| DbError::Connection {
            message: format!("Failed to connect to PostgreSQL: {}", e),
        })?;
        debug!(host = config.host.as_deref().unwrap_or("-"), "Connected to PostgreSQL");
        Ok(Self {
            client: Some(client),
        })
    }

    fn client(&mut self) -> Result<&mut Client, DriverError> {
        self.client
            .as_mut()
            .ok_or_else(|| DriverError::new(1, "connection is closed"))
    }
}

impl SqlDriver for PostgresDriver {
    fn kind(&self) -> BackendKind {
        BackendKind::Postgres
    }

    fn query(&mut self, sql: &str) -> Result<QueryOutcome, DriverError> {
        let client = self.client()?;
        let stmt = client.prepare(sql).map_err(conversion::driver_error)?;

        if stmt.columns().is_empty() {
            let affected = client.execute(&stmt, &[]).map_err(conversion::driver_error)?;
            return Ok(QueryOutcome::Done { affected });
        }

        let columns: Vec<String> = stmt.columns().iter().map(|c| c.name().to_string()).collect();
        let types: Vec<_> = stmt.columns().iter().map(|c| c.type_().clone()).collect();

        let rows = client.query(&stmt, &[]).map_err(conversion::driver_error)?;
        let mut buffered = Vec::with_capacity(rows.len());
        for row in &rows {
            let fields = types
                .iter()
                .enumerate()
                .map(|(i, ty)| conversion::raw_field(row, i, ty))
                .collect::<Result<Vec<_>, _>>()?;
            buffered.push(fields);
        }

        Ok(QueryOutcome::Rows(Box::new(BufferedTable::new(columns, buffered))))
    }

    fn close(&mut self) -> Result<(), DriverError> {
        match self.client.take() {
            Some(client) => client.close().map_err(conversion::driver_error),
            None => Ok(()),
        }
    }
}

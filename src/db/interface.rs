//! The `Database` facade: connection lifecycle and message operations.

use std::cell::{Cell, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use tracing::{debug, info, warn};

use crate::format::{self, Format, AVAILABLE_FORMATS};
use crate::idmef::{Criteria, Message, MessageKind};

use super::backend::BackendKind;
use super::config::{DatabaseConfig, DEFAULT_FORMAT};
use super::ident::{IdentList, MessageIdent};
use super::selection::Selection;
use super::session::SqlSession;
use super::table::Table;
use super::value::Value;
use super::DbError;

/// Lifecycle of a `Database` connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Unconnected,
    Connected,
    Disconnected,
}

struct Interface {
    session: RefCell<SqlSession>,
    format: RefCell<Box<dyn Format>>,
    /// Replace `format` by the one recorded in the database on connect.
    detect_format: bool,
    state: Cell<ConnectionState>,
    backend: BackendKind,
}

fn resolve_format(name: &str) -> Result<Box<dyn Format>, DbError> {
    format::by_name(name).ok_or_else(|| DbError::BadConfiguration {
        message: format!(
            "unknown message format '{}' (available: {})",
            name,
            AVAILABLE_FORMATS.join(", ")
        ),
    })
}

/// Handle to one database connection.
///
/// Cloning is cheap and every clone drives the same session. Identifier
/// lists and value lists hold a clone too, so the session is released only
/// when the last handle or cursor is dropped.
#[derive(Clone)]
pub struct Database {
    inner: Rc<Interface>,
}

impl Database {
    /// Build an unconnected database from `config`.
    ///
    /// Without a configured format, the format recorded in the database is
    /// picked up on `connect`.
    ///
    /// Fails with `BadConfiguration` when the format is unknown or the query
    /// log cannot be opened.
    pub fn new(config: DatabaseConfig) -> Result<Self, DbError> {
        let detect_format = config.format.is_none();
        let format = resolve_format(config.format.as_deref().unwrap_or(DEFAULT_FORMAT))?;

        let backend = config.backend.kind();
        let mut session = SqlSession::new(config.backend);
        if let Some(path) = &config.query_log {
            session.enable_query_logging(path)?;
        }

        Ok(Self {
            inner: Rc::new(Interface {
                session: RefCell::new(session),
                format: RefCell::new(format),
                detect_format,
                state: Cell::new(ConnectionState::Unconnected),
                backend,
            }),
        })
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.state.get()
    }

    pub fn format_name(&self) -> &'static str {
        self.inner.format.borrow().name()
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.inner.backend
    }

    fn session(&self) -> Result<RefMut<'_, SqlSession>, DbError> {
        self.inner.session.try_borrow_mut().map_err(|_| DbError::SessionBusy)
    }

    /// Run `f` against the session, which must be connected.
    fn with_session<T>(&self, f: impl FnOnce(&mut SqlSession, &dyn Format) -> Result<T, DbError>) -> Result<T, DbError> {
        if self.state() != ConnectionState::Connected {
            return Err(DbError::NotConnected);
        }
        let mut session = self.session()?;
        let format = self.inner.format.borrow();
        f(&mut session, format.as_ref())
    }

    /// Direct access to the SQL session for raw statements and transaction
    /// control. Fails with `SessionBusy` while another borrow is alive.
    pub fn sql(&self) -> Result<RefMut<'_, SqlSession>, DbError> {
        self.session()
    }

    pub fn connect(&self) -> Result<(), DbError> {
        if self.state() == ConnectionState::Connected {
            return Err(DbError::AlreadyConnected);
        }
        let mut session = self.session()?;
        session.connect()?;
        if self.inner.detect_format {
            if let Err(e) = self.detect_format(&mut session) {
                if let Err(close) = session.disconnect() {
                    warn!(error = %close, "Disconnect after failed format detection");
                }
                return Err(e);
            }
        }
        drop(session);

        self.inner.state.set(ConnectionState::Connected);
        info!(backend = %self.inner.backend, format = self.format_name(), "Database connected");
        Ok(())
    }

    /// Switch to the format recorded in the database, if any.
    fn detect_format(&self, session: &mut SqlSession) -> Result<(), DbError> {
        let Some(name) = format::detect(session)? else {
            return Ok(());
        };
        if name != self.format_name() {
            *self.inner.format.borrow_mut() = resolve_format(&name)?;
        }
        debug!(format = %name, "Message format detected");
        Ok(())
    }

    /// Release the connection. A no-op unless connected.
    ///
    /// The state becomes `Disconnected` even when teardown reports an error.
    pub fn disconnect(&self) -> Result<(), DbError> {
        if self.state() != ConnectionState::Connected {
            return Ok(());
        }
        let result = self.session()?.disconnect();
        self.inner.state.set(ConnectionState::Disconnected);
        info!(backend = %self.inner.backend, "Database disconnected");
        result
    }

    /// Create the format's schema if missing. Returns the schema version.
    pub fn setup(&self) -> Result<i64, DbError> {
        self.with_session(|sql, format| format.setup(sql))
    }

    /// Schema version found in the database, `None` before `setup`.
    pub fn schema_version(&self) -> Result<Option<i64>, DbError> {
        self.with_session(|sql, format| format.schema_version(sql))
    }

    /// Identifiers of matching messages, newest first.
    pub fn idents(
        &self,
        kind: MessageKind,
        criteria: Option<&Criteria>,
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> Result<IdentList, DbError> {
        let table = self.with_session(|sql, format| format.get_idents(sql, kind, criteria, limit, offset))?;
        debug!(kind = %kind, rows = table.rows_num(), "Identifier list opened");
        Ok(IdentList::new(self.clone(), table))
    }

    pub fn alert_idents(
        &self,
        criteria: Option<&Criteria>,
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> Result<IdentList, DbError> {
        self.idents(MessageKind::Alert, criteria, limit, offset)
    }

    pub fn heartbeat_idents(
        &self,
        criteria: Option<&Criteria>,
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> Result<IdentList, DbError> {
        self.idents(MessageKind::Heartbeat, criteria, limit, offset)
    }

    /// Fetch one message. `NotFound` when no such message exists.
    pub fn get_message(&self, kind: MessageKind, ident: MessageIdent) -> Result<Message, DbError> {
        self.with_session(|sql, format| format.get_message(sql, kind, ident))?
            .ok_or(DbError::NotFound {
                analyzerid: ident.analyzerid,
                ident: ident.ident,
            })
    }

    pub fn get_alert(&self, ident: MessageIdent) -> Result<Message, DbError> {
        self.get_message(MessageKind::Alert, ident)
    }

    pub fn get_heartbeat(&self, ident: MessageIdent) -> Result<Message, DbError> {
        self.get_message(MessageKind::Heartbeat, ident)
    }

    /// Delete one message.
    ///
    /// Any failure, including a missing message, is reported as
    /// `DeletionFailed` carrying the identifier.
    pub fn delete_message(&self, kind: MessageKind, ident: MessageIdent) -> Result<(), DbError> {
        let failed = |reason: String| DbError::DeletionFailed {
            analyzerid: ident.analyzerid,
            ident: ident.ident,
            reason,
        };

        match self.with_session(|sql, format| format.delete_message(sql, kind, ident)) {
            Ok(0) => Err(failed(format!("no such {}", kind))),
            Ok(_) => {
                debug!(kind = %kind, ident = %ident, "Message deleted");
                Ok(())
            }
            Err(e) => Err(failed(e.to_string())),
        }
    }

    pub fn delete_alert(&self, ident: MessageIdent) -> Result<(), DbError> {
        self.delete_message(MessageKind::Alert, ident)
    }

    pub fn delete_heartbeat(&self, ident: MessageIdent) -> Result<(), DbError> {
        self.delete_message(MessageKind::Heartbeat, ident)
    }

    /// Store a message.
    ///
    /// Runs in its own transaction unless the caller already opened one.
    pub fn insert(&self, message: &Message) -> Result<MessageIdent, DbError> {
        self.with_session(|sql, format| {
            if sql.in_transaction() {
                return format.insert_message(sql, message);
            }
            let mut tx = sql.transaction()?;
            format.insert_message(&mut tx, message)?;
            tx.commit()
        })?;
        debug!(kind = %message.kind, ident = %message.ident(), "Message inserted");
        Ok(message.ident())
    }

    fn values_table(
        &self,
        selection: &Selection,
        criteria: Option<&Criteria>,
        distinct: bool,
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> Result<Table, DbError> {
        self.with_session(|sql, format| format.get_values(sql, selection, criteria, distinct, limit, offset))
    }

    /// Project `selection` over matching messages.
    ///
    /// Each row holds one value per selected path, in selection order.
    pub fn get_values(
        &self,
        selection: &Selection,
        criteria: Option<&Criteria>,
        distinct: bool,
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> Result<Vec<Vec<Value>>, DbError> {
        let table = self.values_table(selection, criteria, distinct, limit, offset)?;
        table.map(|row| row?.to_values()).collect()
    }

    /// Same projection as `get_values`, decoded one row at a time.
    pub fn select_values(
        &self,
        selection: &Selection,
        criteria: Option<&Criteria>,
        distinct: bool,
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> Result<ValueList, DbError> {
        let table = self.values_table(selection, criteria, distinct, limit, offset)?;
        Ok(ValueList {
            table,
            _db: self.clone(),
        })
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("backend", &self.inner.backend)
            .field("format", &self.format_name())
            .field("state", &self.state())
            .finish()
    }
}

/// Lazy cursor over the rows of a value projection.
pub struct ValueList {
    table: Table,
    _db: Database,
}

impl ValueList {
    pub fn len(&self) -> usize {
        self.table.rows_num()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Column labels, one per selected path.
    pub fn field_names(&self) -> &[String] {
        self.table.field_names()
    }
}

impl Iterator for ValueList {
    type Item = Result<Vec<Value>, DbError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.table.next().map(|row| row?.to_values())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.table.size_hint()
    }
}

impl fmt::Debug for ValueList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueList").field("table", &self.table).finish()
    }
}

use std::error::Error;

use serde::Serialize;
use tracing::warn;

use super::CopyCmd;
use crate::commands::Execute;
use crate::db::{open_db, Database, DatabaseConfig, DbError};
use crate::idmef::MessageKind;

/// Result of the copy command execution
#[derive(Debug, Clone, Serialize)]
pub struct CopyResult {
    pub kind: MessageKind,
    pub destination: String,
    pub copied: usize,
    /// Messages the destination rejected, usually because they already exist
    pub skipped: usize,
}

/// Copy the messages matched by `cmd` from `source` into `destination`.
pub(crate) fn copy_messages(cmd: &CopyCmd, source: &Database, destination: &Database) -> Result<CopyResult, DbError> {
    destination.setup()?;

    let criteria = cmd.filter.to_criteria();
    let idents = source.idents(cmd.kind, criteria.as_ref(), cmd.limit, None)?;

    let mut copied = 0;
    let mut skipped = 0;
    for ident in idents {
        let message = source.get_message(cmd.kind, ident?)?;
        match destination.insert(&message) {
            Ok(_) => copied += 1,
            Err(DbError::Sql(e)) => {
                warn!(ident = %message.ident(), error = %e, "Destination rejected message, skipping");
                skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }

    Ok(CopyResult {
        kind: cmd.kind,
        destination: cmd.to.clone(),
        copied,
        skipped,
    })
}

impl Execute for CopyCmd {
    type Output = CopyResult;

    fn execute(self, db: &Database) -> Result<Self::Output, Box<dyn Error>> {
        let destination = open_db(DatabaseConfig::from_url(&self.to)?)?;
        let result = copy_messages(&self, db, &destination)?;
        destination.disconnect()?;
        Ok(result)
    }
}

use std::error::Error;

use serde::Serialize;

use super::DeleteCmd;
use crate::commands::Execute;
use crate::db::{Database, MessageIdent};
use crate::idmef::MessageKind;

/// Result of the delete command execution
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResult {
    pub kind: MessageKind,
    pub deleted: MessageIdent,
}

impl Execute for DeleteCmd {
    type Output = DeleteResult;

    fn execute(self, db: &Database) -> Result<Self::Output, Box<dyn Error>> {
        let ident = MessageIdent::new(self.analyzerid, self.ident);
        db.delete_message(self.kind, ident)?;
        Ok(DeleteResult {
            kind: self.kind,
            deleted: ident,
        })
    }
}

use std::error::Error;

use serde::Serialize;

use super::GetCmd;
use crate::commands::Execute;
use crate::db::{Database, MessageIdent};
use crate::idmef::Message;

/// Result of the get command execution
#[derive(Debug, Clone, Serialize)]
pub struct GetResult {
    pub message: Message,
}

impl Execute for GetCmd {
    type Output = GetResult;

    fn execute(self, db: &Database) -> Result<Self::Output, Box<dyn Error>> {
        let message = db.get_message(self.kind, MessageIdent::new(self.analyzerid, self.ident))?;
        Ok(GetResult { message })
    }
}

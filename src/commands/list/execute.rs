use std::error::Error;

use serde::Serialize;

use super::ListCmd;
use crate::commands::Execute;
use crate::db::{Database, MessageIdent};
use crate::idmef::MessageKind;

/// Result of the list command execution
#[derive(Debug, Clone, Serialize)]
pub struct ListResult {
    pub kind: MessageKind,
    pub idents: Vec<MessageIdent>,
}

impl Execute for ListCmd {
    type Output = ListResult;

    fn execute(self, db: &Database) -> Result<Self::Output, Box<dyn Error>> {
        let criteria = self.filter.to_criteria();
        let idents = db
            .idents(self.kind, criteria.as_ref(), self.limit, self.offset)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ListResult {
            kind: self.kind,
            idents,
        })
    }
}

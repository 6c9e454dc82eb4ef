use std::error::Error;

use serde::Serialize;

use super::CountCmd;
use crate::commands::Execute;
use crate::db::Database;
use crate::idmef::MessageKind;

/// Result of the count command execution
#[derive(Debug, Clone, Serialize)]
pub struct CountResult {
    pub kind: MessageKind,
    pub count: usize,
}

impl Execute for CountCmd {
    type Output = CountResult;

    fn execute(self, db: &Database) -> Result<Self::Output, Box<dyn Error>> {
        let criteria = self.filter.to_criteria();
        // The row count is known without fetching any identifier.
        let count = db.idents(self.kind, criteria.as_ref(), None, None)?.len();
        Ok(CountResult { kind: self.kind, count })
    }
}

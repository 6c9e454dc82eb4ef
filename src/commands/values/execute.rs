use std::error::Error;

use serde::Serialize;

use super::ValuesCmd;
use crate::commands::Execute;
use crate::db::{Database, Selection, Value};

/// Result of the values command execution
#[derive(Debug, Clone, Serialize)]
pub struct ValuesResult {
    /// Column labels, one per selected path
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Execute for ValuesCmd {
    type Output = ValuesResult;

    fn execute(self, db: &Database) -> Result<Self::Output, Box<dyn Error>> {
        let selection = Selection::parse(&self.paths)?;
        let criteria = self.filter.to_criteria();

        let list = db.select_values(&selection, criteria.as_ref(), self.distinct, self.limit, self.offset)?;
        let columns = list.field_names().to_vec();
        let rows = list.collect::<Result<Vec<_>, _>>()?;

        Ok(ValuesResult { columns, rows })
    }
}

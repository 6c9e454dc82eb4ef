//! Output formatting for values command results.

use super::execute::ValuesResult;
use crate::output::{render_columns, Outputable};

impl Outputable for ValuesResult {
    fn to_table(&self) -> String {
        if self.rows.is_empty() {
            return "No values found.".to_string();
        }

        let rows: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| row.iter().map(ToString::to_string).collect())
            .collect();

        let mut lines = render_columns(&self.columns, &rows);
        lines.push(String::new());
        lines.push(format!("({} rows)", self.rows.len()));
        lines.join("\n")
    }
}

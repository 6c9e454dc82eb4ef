//! Output formatting for list command results.

use super::execute::ListResult;
use crate::output::{render_columns, Outputable};

impl Outputable for ListResult {
    fn to_table(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("{} ({})", capitalize(self.kind.plural()), self.idents.len()));
        lines.push(String::new());

        if self.idents.is_empty() {
            lines.push(format!("No {} found.", self.kind.plural()));
            return lines.join("\n");
        }

        let headers = vec!["analyzerid".to_string(), "ident".to_string()];
        let rows: Vec<Vec<String>> = self
            .idents
            .iter()
            .map(|i| vec![i.analyzerid.to_string(), i.ident.to_string()])
            .collect();
        lines.extend(render_columns(&headers, &rows));

        lines.join("\n")
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

//! Output formatting for get command results.

use chrono::SecondsFormat;

use super::execute::GetResult;
use crate::output::Outputable;

impl Outputable for GetResult {
    fn to_table(&self) -> String {
        let message = &self.message;
        let mut lines = vec![
            format!("{} {}", message.kind, message.ident()),
            format!(
                "created: {}",
                message.create_time.to_rfc3339_opts(SecondsFormat::AutoSi, true)
            ),
            String::new(),
        ];
        lines.push(serde_json::to_string_pretty(&message.content).unwrap_or_default());
        lines.join("\n")
    }
}

//! Output formatting for copy command results.

use super::execute::CopyResult;
use crate::output::Outputable;

impl Outputable for CopyResult {
    fn to_table(&self) -> String {
        let mut line = format!("Copied {} {} to {}", self.copied, self.kind.plural(), self.destination);
        if self.skipped > 0 {
            line.push_str(&format!(" ({} skipped)", self.skipped));
        }
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::idmef::MessageKind;
    use rstest::{fixture, rstest};

    #[fixture]
    fn result() -> CopyResult {
        CopyResult {
            kind: MessageKind::Alert,
            destination: "./archive.sqlite".to_string(),
            copied: 12,
            skipped: 0,
        }
    }

    #[fixture]
    fn with_skips(result: CopyResult) -> CopyResult {
        CopyResult { skipped: 3, ..result }
    }

    crate::output_table_test! {
        test_name: test_to_table,
        fixture: result,
        fixture_type: CopyResult,
        expected: "Copied 12 alerts to ./archive.sqlite",
    }

    crate::output_table_test! {
        test_name: test_to_table_with_skips,
        fixture: with_skips,
        fixture_type: CopyResult,
        expected: "Copied 12 alerts to ./archive.sqlite (3 skipped)",
    }

    crate::output_json_test! {
        test_name: test_format_json,
        fixture: result,
        fixture_type: CopyResult,
        assertions: {
            "copied": 12,
            "skipped": 0,
            "destination": "./archive.sqlite",
        },
    }
}

//! Output formatting for setup command results.

use super::execute::SetupResult;
use crate::output::Outputable;

impl Outputable for SetupResult {
    fn to_table(&self) -> String {
        let mut output = String::new();

        output.push_str("Database Setup\n\n");
        output.push_str(&format!("  Backend: {}\n", self.backend));
        output.push_str(&format!("  Format:  {} (schema version {})\n", self.format, self.version));

        match self.previous_version {
            None => output.push_str("\nSchema created.\n"),
            Some(previous) if previous == self.version => output.push_str("\nSchema already up to date.\n"),
            Some(previous) => output.push_str(&format!(
                "\nSchema version updated from {} to {}.\n",
                previous, self.version
            )),
        }

        output
    }
}

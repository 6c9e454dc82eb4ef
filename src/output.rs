//! Output formatting for command results.
//!
//! Supports multiple output formats: table (human-readable), JSON, and toon.

use clap::ValueEnum;
use serde::Serialize;

/// Output format for command results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format
    Json,
    /// Token-efficient toon format
    Toon,
}

/// Trait for types that can be formatted for output
pub trait Outputable: Serialize {
    /// Format as a human-readable table
    fn to_table(&self) -> String;

    /// Format according to the specified output format
    fn format(&self, format: OutputFormat) -> String {
        match format {
            OutputFormat::Table => self.to_table(),
            OutputFormat::Json => serde_json::to_string_pretty(self).unwrap_or_default(),
            OutputFormat::Toon => {
                let json_value = serde_json::to_value(self).unwrap_or_default();
                toon::encode(&json_value, None)
            }
        }
    }
}

/// Render rows as left-aligned columns separated by two spaces.
///
/// Column widths are measured in characters. Trailing whitespace is trimmed
/// from every line.
pub fn render_columns(headers: &[String], rows: &[Vec<String>]) -> Vec<String> {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            let len = cell.chars().count();
            match widths.get_mut(i) {
                Some(w) => *w = (*w).max(len),
                None => widths.push(len),
            }
        }
    }

    let render = |cells: &[String]| -> String {
        cells
            .iter()
            .enumerate()
            .map(|(i, cell)| format!("{:<width$}", cell, width = widths[i]))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(render(headers));
    lines.push(
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("  "),
    );
    lines.extend(rows.iter().map(|row| render(row)));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[derive(Serialize)]
    struct Sample {
        name: String,
        count: usize,
    }

    impl Outputable for Sample {
        fn to_table(&self) -> String {
            format!("{}: {}", self.name, self.count)
        }
    }

    #[rstest]
    fn test_format_dispatch() {
        let sample = Sample {
            name: "alerts".to_string(),
            count: 3,
        };
        assert_eq!(sample.format(OutputFormat::Table), "alerts: 3");
        assert_eq!(
            sample.format(OutputFormat::Json),
            "{\n  \"name\": \"alerts\",\n  \"count\": 3\n}"
        );
        assert!(sample.format(OutputFormat::Toon).contains("count: 3"));
    }

    #[rstest]
    fn test_render_columns_aligns() {
        let headers = vec!["analyzerid".to_string(), "ident".to_string()];
        let rows = vec![
            vec!["1".to_string(), "42".to_string()],
            vec!["100".to_string(), "7".to_string()],
        ];
        assert_eq!(
            render_columns(&headers, &rows),
            vec![
                "analyzerid  ident",
                "----------  -----",
                "1           42",
                "100         7",
            ]
        );
    }
}

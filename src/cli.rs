//! CLI argument definitions.
//!
//! This module contains the top-level CLI structure and shared types.
//! Individual command definitions are in the `commands` module.

use clap::Parser;

use crate::commands::Command;
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(author, version, about = "Administer an IDMEF alert and heartbeat database", long_about = None)]
pub struct Args {
    /// Database URL (`./file.sqlite`, `sqlite://path`, `:memory:`, `postgres://...`).
    /// Defaults to .idmef_db.json, then IDMEF_DB_URL / DATABASE_URL, then ./idmef.sqlite
    #[arg(long, global = true)]
    pub db: Option<String>,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value_t = OutputFormat::Table, global = true)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn test_global_options_after_subcommand() {
        let args = Args::try_parse_from(["idmef_db", "setup", "--db", ":memory:", "--format", "json"]).unwrap();
        assert_eq!(args.db.as_deref(), Some(":memory:"));
        assert_eq!(args.format, OutputFormat::Json);
    }

    #[rstest]
    fn test_defaults() {
        let args = Args::try_parse_from(["idmef_db", "setup"]).unwrap();
        assert_eq!(args.db, None);
        assert_eq!(args.format, OutputFormat::Table);
    }

    #[rstest]
    fn test_unknown_subcommand_rejected() {
        assert!(Args::try_parse_from(["idmef_db", "import"]).is_err());
    }
}

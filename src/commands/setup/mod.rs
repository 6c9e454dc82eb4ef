mod execute;
mod output;

use clap::Args;

/// Create the message schema without storing anything
#[derive(Args, Debug, Clone, Default, PartialEq)]
#[command(after_help = "\
Examples:
  idmef_db setup                                  # Use .idmef_db.json or the environment
  idmef_db setup --db ./alerts.sqlite             # Create schema in a SQLite file
  idmef_db setup --db postgres://u:p@host/prelude # Create schema in PostgreSQL")]
pub struct SetupCmd {}

#[cfg(test)]
mod tests {
    use crate::cli::Args;
    use clap::Parser;
    use rstest::rstest;

    crate::cli_error_test! {
        command: "setup",
        test_name: test_setup_takes_no_arguments,
        args: ["alerts"],
    }

    #[rstest]
    fn test_setup_parses() {
        let args = Args::try_parse_from(["idmef_db", "setup"]).unwrap();
        assert!(matches!(args.command, crate::commands::Command::Setup(_)));
    }
}

mod execute;
mod output;

use clap::Args;

use crate::idmef::MessageKind;

/// Delete one message
#[derive(Args, Debug, Clone, PartialEq)]
#[command(after_help = "\
Examples:
  idmef_db delete alert 1 42         # Remove alert 42 of analyzer 1")]
pub struct DeleteCmd {
    /// Message class: alert or heartbeat
    pub kind: MessageKind,

    /// Analyzer identifier
    pub analyzerid: u64,

    /// Message identifier
    pub ident: u64,
}

#[cfg(test)]
mod tests {
    use crate::cli::Args;
    use crate::idmef::MessageKind;
    use clap::Parser;
    use rstest::rstest;

    crate::cli_option_test! {
        command: "delete",
        variant: Delete,
        test_name: test_delete_parses_ident,
        args: ["heartbeat", "7", "42"],
        field: ident,
        expected: 42,
    }

    crate::cli_option_test! {
        command: "delete",
        variant: Delete,
        test_name: test_delete_parses_kind,
        args: ["alerts", "7", "42"],
        field: kind,
        expected: MessageKind::Alert,
    }
}

mod execute;
mod output;

use clap::Args;

use crate::commands::FilterArgs;
use crate::idmef::MessageKind;

/// List message identifiers, newest first
#[derive(Args, Debug, Clone, PartialEq)]
#[command(after_help = "\
Examples:
  idmef_db list alerts                                   # Every alert identifier
  idmef_db list heartbeats --limit 10                    # Ten most recent heartbeats
  idmef_db list alerts -w 'alert.analyzerid == 42'       # Alerts from one analyzer
  idmef_db list alerts -w 'alert.classification.text ~ scan' --offset 20")]
pub struct ListCmd {
    /// Message class: alert(s) or heartbeat(s)
    pub kind: MessageKind,

    #[command(flatten)]
    pub filter: FilterArgs,

    /// Maximum number of identifiers to return
    #[arg(short, long)]
    pub limit: Option<u64>,

    /// Number of identifiers to skip
    #[arg(long)]
    pub offset: Option<u64>,
}

#[cfg(test)]
mod tests {
    use crate::cli::Args;
    use crate::idmef::MessageKind;
    use clap::Parser;
    use rstest::rstest;

    crate::cli_required_arg_test! {
        command: "list",
        test_name: test_list_requires_kind,
        required_arg: "<KIND>",
    }

    crate::cli_defaults_test! {
        command: "list",
        variant: List,
        required_args: ["alerts"],
        defaults: {
            kind: MessageKind::Alert,
            limit: None,
            offset: None,
        },
    }

    crate::cli_option_test! {
        command: "list",
        variant: List,
        test_name: test_list_heartbeats_with_limit,
        args: ["heartbeat", "--limit", "5", "--offset", "10"],
        field: limit,
        expected: Some(5),
    }

    crate::cli_option_test! {
        command: "list",
        variant: List,
        test_name: test_list_zero_limit_accepted,
        args: ["alerts", "-l", "0"],
        field: limit,
        expected: Some(0),
    }

    crate::cli_error_test! {
        command: "list",
        test_name: test_list_rejects_unknown_kind,
        args: ["events"],
    }

    crate::cli_error_test! {
        command: "list",
        test_name: test_list_rejects_bad_criterion,
        args: ["alerts", "--where", "alert.ident"],
    }

    #[rstest]
    fn test_list_collects_where_clauses() {
        let args = Args::try_parse_from([
            "idmef_db",
            "list",
            "alerts",
            "-w",
            "alert.analyzerid == 1",
            "--where",
            "alert.source is null",
        ])
        .unwrap();
        match args.command {
            crate::commands::Command::List(cmd) => assert_eq!(cmd.filter.criteria.len(), 2),
            _ => panic!("Expected List command"),
        }
    }
}

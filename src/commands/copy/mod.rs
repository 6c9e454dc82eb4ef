mod execute;
mod output;

use clap::Args;

use crate::commands::FilterArgs;
use crate::idmef::MessageKind;

/// Copy messages into another database
#[derive(Args, Debug, Clone, PartialEq)]
#[command(after_help = "\
Examples:
  idmef_db copy alerts --to ./archive.sqlite                  # Copy every alert
  idmef_db copy heartbeats --to postgres://u:p@host/prelude --limit 100
  idmef_db copy alerts --to ./scans.sqlite -w 'alert.classification.text ~ scan'

The destination schema is created when missing. Messages already present in
the destination are skipped.")]
pub struct CopyCmd {
    /// Message class: alert(s) or heartbeat(s)
    pub kind: MessageKind,

    /// Destination database URL
    #[arg(long)]
    pub to: String,

    #[command(flatten)]
    pub filter: FilterArgs,

    /// Copy at most this many messages, newest first
    #[arg(short, long)]
    pub limit: Option<u64>,
}

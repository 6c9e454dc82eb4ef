mod execute;
mod output;

use clap::Args;

use crate::commands::FilterArgs;
use crate::idmef::MessageKind;

/// Count stored messages
#[derive(Args, Debug, Clone, PartialEq)]
#[command(after_help = "\
Examples:
  idmef_db count alerts                                  # Total number of alerts
  idmef_db count heartbeats -w 'heartbeat.analyzerid == 7'")]
pub struct CountCmd {
    /// Message class: alert(s) or heartbeat(s)
    pub kind: MessageKind,

    #[command(flatten)]
    pub filter: FilterArgs,
}

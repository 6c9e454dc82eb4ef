mod execute;
mod output;

use clap::Args;

use crate::idmef::MessageKind;

/// Print one message
#[derive(Args, Debug, Clone, PartialEq)]
#[command(after_help = "\
Examples:
  idmef_db get alert 1 42                # Alert 42 of analyzer 1
  idmef_db get heartbeat 7 3 -o json     # As JSON")]
pub struct GetCmd {
    /// Message class: alert or heartbeat
    pub kind: MessageKind,

    /// Analyzer identifier
    pub analyzerid: u64,

    /// Message identifier
    pub ident: u64,
}

mod execute;
mod output;

use clap::Args;

use crate::commands::FilterArgs;

/// Project message fields into rows
#[derive(Args, Debug, Clone, PartialEq)]
#[command(after_help = "\
Selected paths:
  PATH                    a field, e.g. alert.classification.text
  FUNC(PATH)              min, max, avg, std or count over a field
  ...[/FLAG[,FLAG]]       group_by, order_asc, order_desc

Examples:
  idmef_db values alert.analyzerid alert.classification.text
  idmef_db values alert.classification.text/group_by 'count(alert.ident)/order_desc'
  idmef_db values alert.source(0).node.address --distinct --limit 20")]
pub struct ValuesCmd {
    /// Selected paths, all of the same message class
    #[arg(required = true)]
    pub paths: Vec<String>,

    #[command(flatten)]
    pub filter: FilterArgs,

    /// Drop duplicate rows
    #[arg(short, long, default_value_t = false)]
    pub distinct: bool,

    /// Maximum number of rows to return
    #[arg(short, long)]
    pub limit: Option<u64>,

    /// Number of rows to skip
    #[arg(long)]
    pub offset: Option<u64>,
}

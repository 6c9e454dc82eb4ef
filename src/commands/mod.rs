//! Command definitions and implementations.
//!
//! Each command is defined in its own module with:
//! - The command struct with clap attributes for CLI parsing
//! - An `Execute` implementation producing a serializable result
//! - An `Outputable` implementation rendering that result

mod copy;
mod count;
mod delete;
mod get;
mod list;
mod setup;
mod values;

pub use copy::CopyCmd;
pub use count::CountCmd;
pub use delete::DeleteCmd;
pub use get::GetCmd;
pub use list::ListCmd;
pub use setup::SetupCmd;
pub use values::ValuesCmd;

use std::error::Error;

use clap::{Args, Subcommand};

use crate::db::Database;
use crate::idmef::{Criteria, Criterion};
use crate::output::{OutputFormat, Outputable};

/// Trait for executing commands with command-specific result types.
pub trait Execute {
    type Output: Outputable;

    fn execute(self, db: &Database) -> Result<Self::Output, Box<dyn Error>>;
}

/// Message filter shared by the listing commands.
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct FilterArgs {
    /// Criterion `path OP value`, `path is null` or `path is not null`
    /// (repeatable, combined with AND)
    #[arg(short = 'w', long = "where", value_name = "CRITERION")]
    pub criteria: Vec<Criterion>,
}

impl FilterArgs {
    /// The criteria tree, `None` when no criterion was given.
    pub fn to_criteria(&self) -> Option<Criteria> {
        let mut iter = self.criteria.iter().cloned().map(Criteria::from);
        let first = iter.next()?;
        Some(iter.fold(first, Criteria::and))
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the message schema (safe to run on an existing database)
    Setup(SetupCmd),

    /// List message identifiers, newest first
    List(ListCmd),

    /// Count stored messages
    Count(CountCmd),

    /// Print one message
    Get(GetCmd),

    /// Delete one message
    Delete(DeleteCmd),

    /// Project message fields into rows
    Values(ValuesCmd),

    /// Copy messages into another database
    Copy(CopyCmd),
}

impl Command {
    /// Execute the command and return formatted output
    pub fn run(self, db: &Database, format: OutputFormat) -> Result<String, Box<dyn Error>> {
        match self {
            Command::Setup(cmd) => Ok(cmd.execute(db)?.format(format)),
            Command::List(cmd) => Ok(cmd.execute(db)?.format(format)),
            Command::Count(cmd) => Ok(cmd.execute(db)?.format(format)),
            Command::Get(cmd) => Ok(cmd.execute(db)?.format(format)),
            Command::Delete(cmd) => Ok(cmd.execute(db)?.format(format)),
            Command::Values(cmd) => Ok(cmd.execute(db)?.format(format)),
            Command::Copy(cmd) => Ok(cmd.execute(db)?.format(format)),
        }
    }
}

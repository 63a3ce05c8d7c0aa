//! Command dispatch: bridges CLI args -> softener calls -> output formatting.

pub mod check;
pub mod config_cmd;
pub mod set;
pub mod status;

use isoft_core::Softener;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a device-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    softener: &Softener,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Status => status::handle(softener, global).await,
        Command::Set(args) => set::handle(softener, args, global).await,
        Command::Check => check::handle(softener, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}

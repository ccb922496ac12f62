//! Command dispatch: bridges CLI args -> hub operations -> output formatting.

pub mod clients;
pub mod config_cmd;
pub mod connections;
pub mod instruments;
pub mod relationships;
pub mod search;
pub mod util;

use atelier_core::Hub;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a store-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, hub: &Hub, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Clients(args) => clients::handle(hub, args, global).await,
        Command::Instruments(args) => instruments::handle(hub, args, global).await,
        Command::Connections(args) => connections::handle(hub, args, global).await,
        Command::Relationships(args) => relationships::handle(hub, args, global).await,
        Command::Search(args) => search::handle(hub, args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Err(CliError::Internal(
            "config and completions do not need a store".into(),
        )),
    }
}

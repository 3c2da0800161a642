//! Command dispatch: bridges CLI args -> core calls -> output formatting.

pub mod config_cmd;
pub mod controls;
pub mod device;
pub mod stream;

use reolink_core::Client;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a camera-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, client: &Client, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Info => device::info(client, global).await,
        Command::Abilities(args) => device::abilities(client, args, global).await,
        Command::Channels => device::channels(client, global).await,
        Command::Time => device::time(client, global).await,
        Command::Network => device::network(client, global).await,
        Command::RtspUrl(args) => stream::rtsp_url(client, args, global).await,
        Command::Snapshot(args) => stream::snapshot(client, args, global).await,
        Command::Ir(args) => controls::ir(client, args, global).await,
        Command::Motion(args) => controls::motion(client, args, global).await,
        Command::Ptz(args) => controls::ptz(client, args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}

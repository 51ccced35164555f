//! Command dispatch: bridges CLI args -> campaign service -> output formatting.

pub mod artifacts;
pub mod config_cmd;
pub mod preview;
pub mod provision;
pub mod retire;
pub mod stats;
pub mod util;
pub mod wizard;

use remnapromo_config::Config;
use remnapromo_core::{CampaignService, Panel};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a panel-bound command to the appropriate handler.
pub async fn dispatch<P: Panel>(
    cmd: Command,
    service: &CampaignService<P>,
    cfg: &Config,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Stats => stats::handle(service, global).await,
        Command::Preview(args) => preview::handle(service, args, global).await,
        Command::Provision(args) => provision::handle(service, args, global).await,
        Command::Retire(args) => retire::handle(service, args, global).await,
        Command::Wizard(args) => wizard::handle(service, cfg, args.operator, global).await,
        // Handled before a panel connection is built
        Command::Artifacts(_) | Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}

mod cli;
mod commands;
mod config;
mod error;
mod output;

use std::path::Path;

use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use remnapromo_core::CampaignService;

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup tracing based on verbosity; the guard flushes the log file
    let guard = init_tracing(cli.global.verbose, cli.global.log_file.as_deref());
    output::apply_color_mode(cli.global.color);

    // Dispatch and handle errors with proper exit codes
    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        drop(guard);
        std::process::exit(code);
    }
}

/// `RUST_LOG` wins, then `-v`, then the `LOG_LEVEL` of older deployments.
fn env_filter(verbosity: u8) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    let level = match verbosity {
        0 => std::env::var("LOG_LEVEL").map_or_else(|_| "warn".into(), |l| l.to_ascii_lowercase()),
        1 => "info".into(),
        2 => "debug".into(),
        _ => "trace".into(),
    };
    EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new("warn"))
}

fn init_tracing(verbosity: u8, log_file: Option<&Path>) -> Option<WorkerGuard> {
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|d| !d.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .unwrap_or_else(|| std::ffi::OsStr::new("remnapromo.log"));
            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter(verbosity))
        .with(stderr_layer)
        .with(file_layer)
        .init();

    guard
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let Cli {
        mut global,
        command,
    } = cli;
    let cfg = config::load_config_or_default();
    config::apply_defaults(&mut global, &cfg);

    match command {
        // Config commands don't need a panel connection
        Command::Config(args) => commands::config_cmd::handle(args, &global),

        // Shell completions generation
        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "remnapromo", &mut std::io::stdout());
            Ok(())
        }

        // Artifact maintenance only touches the local filesystem
        Command::Artifacts(args) => commands::artifacts::handle(args, &cfg, &global).await,

        // All other commands require a panel connection
        cmd => {
            let panel = config::build_panel_config(&global, &cfg)?.connect()?;
            let service = CampaignService::new(panel, cfg.campaign_policy())
                .with_artifacts(cfg.artifact_writer()?);

            tracing::debug!(command = ?cmd, "dispatching command");
            commands::dispatch(cmd, &service, &cfg, &global).await
        }
    }
}

//! Listing artifact maintenance.

use std::path::PathBuf;

use tabled::Tabled;

use remnapromo_config::Config;

use crate::cli::{ArtifactsArgs, ArtifactsCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct DirRow {
    #[tabled(rename = "Directory")]
    dir: String,
    #[tabled(rename = "Exists")]
    exists: &'static str,
}

impl From<&PathBuf> for DirRow {
    fn from(dir: &PathBuf) -> Self {
        Self {
            dir: dir.display().to_string(),
            exists: if dir.is_dir() { "yes" } else { "no" },
        }
    }
}

pub async fn handle(args: ArtifactsArgs, cfg: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    let writer = cfg.artifact_writer()?;

    match args.command {
        ArtifactsCommand::Cleanup { days } => {
            let days = days.unwrap_or(cfg.artifacts.retention_days);
            let removed = writer.cleanup_older_than(days).await?;
            if !global.quiet {
                eprintln!("Removed {removed} listing(s) older than {days} day(s)");
            }
            Ok(())
        }

        ArtifactsCommand::Dirs => {
            let out = output::render_list(global.format(), writer.dirs(), |d| DirRow::from(d), |d| {
                d.display().to_string()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}

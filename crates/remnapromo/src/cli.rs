//! Clap derive structures for the `remnapromo` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// remnapromo -- promo campaign tooling for Remnawave panels
#[derive(Debug, Parser)]
#[command(
    name = "remnapromo",
    version,
    about = "Run promo subscription campaigns on a Remnawave panel",
    long_about = "Creates, counts and retires batches of promo subscriptions on a\n\
        Remnawave panel. Every subscription carries its campaign tag in its\n\
        username, so campaigns are discovered straight from the panel.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Panel profile to use
    #[arg(long, short = 'p', env = "REMNAPROMO_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Panel URL (overrides profile)
    #[arg(long, env = "REMNAPROMO_PANEL", global = true)]
    pub panel: Option<String>,

    /// Panel API token
    #[arg(long, env = "REMNAPROMO_TOKEN", global = true, hide_env = true)]
    pub token: Option<String>,

    /// Output format [default: from config, else table]
    #[arg(long, short = 'o', env = "REMNAPROMO_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "REMNAPROMO_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds [default: from profile, else 30]
    #[arg(long, env = "REMNAPROMO_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Also write logs to this file
    #[arg(long, env = "REMNAPROMO_LOG_FILE", global = true)]
    pub log_file: Option<PathBuf>,
}

impl GlobalOpts {
    pub fn format(&self) -> OutputFormat {
        self.output.unwrap_or(OutputFormat::Table)
    }
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show every campaign with its total/active/used counters
    #[command(alias = "ls")]
    Stats,

    /// Show the counters of one campaign
    Preview(PreviewArgs),

    /// Create a batch of promo subscriptions
    #[command(alias = "create")]
    Provision(ProvisionArgs),

    /// Delete the used subscriptions of a campaign
    #[command(alias = "cleanup-used")]
    Retire(RetireArgs),

    /// Create a campaign interactively, step by step
    Wizard(WizardArgs),

    /// Manage written subscription listings
    Artifacts(ArtifactsArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Campaign commands ────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct PreviewArgs {
    /// Campaign tag
    pub tag: String,
}

#[derive(Debug, Args)]
pub struct ProvisionArgs {
    /// Campaign tag (letters, digits, `_` and `-`)
    #[arg(long, short = 't')]
    pub tag: String,

    /// Traffic quota per subscription in GB (values <= 0 become 1 GB)
    #[arg(long, short = 'g', allow_negative_numbers = true)]
    pub traffic_gb: i64,

    /// Number of subscriptions to create
    #[arg(long, short = 'n')]
    pub count: u32,
}

#[derive(Debug, Args)]
pub struct RetireArgs {
    /// Campaign tag
    pub tag: String,
}

#[derive(Debug, Args)]
pub struct WizardArgs {
    /// Operator id checked against the admin allow-list
    #[arg(long, env = "REMNAPROMO_OPERATOR")]
    pub operator: u64,
}

// ── Artifacts ────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ArtifactsArgs {
    #[command(subcommand)]
    pub command: ArtifactsCommand,
}

#[derive(Debug, Subcommand)]
pub enum ArtifactsCommand {
    /// Delete listings older than the retention period
    Cleanup {
        /// Age in days [default: artifacts.retention_days]
        #[arg(long)]
        days: Option<u32>,
    },

    /// Show the directories listings are written to
    Dirs,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current resolved configuration
    Show,

    /// Print the config file location
    Path,

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store the API token of the active profile in the system keyring
    SetToken,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

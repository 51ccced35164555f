//! `GlobalOpts`-aware wrappers over `remnapromo_config`.
//!
//! This is the single boundary where CLI flags meet config types and turn
//! into the `PanelConfig` the core receives.

use clap::ValueEnum;
use secrecy::SecretString;

use remnapromo_config::{Config, ConfigError, Profile};
use remnapromo_core::PanelConfig;

pub use remnapromo_config::{config_path, save_config};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;

/// Load config, falling back to defaults when the file cannot be read.
pub fn load_config_or_default() -> Config {
    remnapromo_config::load_config().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "ignoring unreadable config, using defaults");
        Config::default()
    })
}

/// Fill unset flags from config defaults.
pub fn apply_defaults(global: &mut GlobalOpts, cfg: &Config) {
    if global.output.is_none() {
        global.output = OutputFormat::from_str(&cfg.defaults.output, true).ok();
    }
}

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, cfg: &Config) -> String {
    cfg.profile_name(global.profile.as_deref())
}

/// Translate the active profile + global flags into a `PanelConfig`.
///
/// Without a matching profile the panel URL and token must both come from
/// flags or their environment variables.
pub fn build_panel_config(global: &GlobalOpts, cfg: &Config) -> Result<PanelConfig, CliError> {
    let profile_name = active_profile_name(global, cfg);

    let mut profile = match cfg.profiles.get(&profile_name) {
        Some(profile) => profile.clone(),
        None => {
            if global.profile.is_some() && global.panel.is_none() {
                return Err(ConfigError::UnknownProfile { name: profile_name }.into());
            }
            let panel = global.panel.as_deref().ok_or_else(|| CliError::NoConfig {
                path: config_path().display().to_string(),
            })?;
            if global.token.is_none() {
                return Err(CliError::NoCredentials {
                    profile: profile_name,
                });
            }
            Profile::new(panel)
        }
    };

    if let Some(ref panel) = global.panel {
        profile.panel.clone_from(panel);
    }
    if global.insecure {
        profile.insecure = Some(true);
    }
    if let Some(timeout) = global.timeout {
        profile.timeout = Some(timeout);
    }

    let token = global.token.clone().map(SecretString::from);
    remnapromo_config::profile_to_panel_config(&profile, &profile_name, &cfg.defaults, token)
        .map_err(CliError::from)
}

//! Config subcommand handlers.

use std::fmt::Write as _;

use dialoguer::{Input, Select};

use remnapromo_config::{Config, Profile};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output;

use super::util::prompt_err;

const MASK: &str = "****";

// ── Helpers ─────────────────────────────────────────────────────────

/// Copy of `cfg` with every stored secret masked.
fn redacted(cfg: &Config) -> Config {
    let mut cfg = cfg.clone();
    for profile in cfg.profiles.values_mut() {
        if profile.token.is_some() {
            profile.token = Some(MASK.into());
        }
        if profile.proxy_key.is_some() {
            profile.proxy_key = Some(MASK.into());
        }
    }
    cfg
}

/// Format config for display. Expects an already redacted config.
fn format_config(cfg: &Config) -> String {
    let mut out = String::new();

    if let Some(ref default) = cfg.default_profile {
        let _ = writeln!(out, "default_profile = \"{default}\"");
    }
    let _ = writeln!(out, "\n[defaults]");
    let _ = writeln!(out, "output = \"{}\"", cfg.defaults.output);
    let _ = writeln!(out, "insecure = {}", cfg.defaults.insecure);
    let _ = writeln!(out, "timeout = {}", cfg.defaults.timeout);

    let c = &cfg.campaign;
    let _ = writeln!(out, "\n[campaign]");
    let _ = writeln!(out, "name_prefix = \"{}\"", c.name_prefix);
    let _ = writeln!(out, "max_count = {}", c.max_count);
    let _ = writeln!(out, "expiry_days = {}", c.expiry_days);
    let _ = writeln!(out, "tag_policy = \"{}\"", c.tag_policy);
    let _ = writeln!(out, "concurrency = {}", c.concurrency);
    let _ = writeln!(out, "traffic_presets_gb = {:?}", c.traffic_presets_gb);

    let a = &cfg.artifacts;
    let _ = writeln!(out, "\n[artifacts]");
    if let Some(ref dir) = a.dir {
        let _ = writeln!(out, "dir = \"{}\"", dir.display());
    }
    if let Some(ref url) = a.public_base_url {
        let _ = writeln!(out, "public_base_url = \"{url}\"");
    }
    let _ = writeln!(out, "retention_days = {}", a.retention_days);

    let _ = writeln!(out, "\n[access]");
    let _ = writeln!(out, "admin_ids = {:?}", cfg.access.admin_ids);

    let mut names: Vec<_> = cfg.profiles.keys().collect();
    names.sort();
    for name in names {
        let Some(p) = cfg.profiles.get(name) else {
            continue;
        };
        let _ = writeln!(out, "\n[profiles.{name}]");
        let _ = writeln!(out, "panel = \"{}\"", p.panel);
        if let Some(ref token) = p.token {
            let _ = writeln!(out, "token = \"{token}\"");
        }
        if let Some(ref env) = p.token_env {
            let _ = writeln!(out, "token_env = \"{env}\"");
        }
        if let Some(ref key) = p.proxy_key {
            let _ = writeln!(out, "proxy_key = \"{key}\"");
        }
        if let Some(ref env) = p.proxy_key_env {
            let _ = writeln!(out, "proxy_key_env = \"{env}\"");
        }
        if let Some(ref ca) = p.ca_cert {
            let _ = writeln!(out, "ca_cert = \"{}\"", ca.display());
        }
        if let Some(insecure) = p.insecure {
            let _ = writeln!(out, "insecure = {insecure}");
        }
        if let Some(timeout) = p.timeout {
            let _ = writeln!(out, "timeout = {timeout}");
        }
        if let Some(size) = p.page_size {
            let _ = writeln!(out, "page_size = {size}");
        }
    }

    out.trim_end().to_owned()
}

fn available_profiles(cfg: &Config) -> String {
    let mut names: Vec<_> = cfg.profiles.keys().cloned().collect();
    names.sort();
    if names.is_empty() {
        "(none)".into()
    } else {
        names.join(", ")
    }
}

fn parse_admin_ids(raw: &str) -> Result<Vec<u64>, CliError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse().map_err(|_| CliError::Validation {
                field: "admin_ids".into(),
                reason: format!("'{s}' is not a numeric operator id"),
            })
        })
        .collect()
}

/// Offer to store the token in the system keyring or return it for plaintext config.
///
/// Returns `Some(token)` if the user chose plaintext, `None` if stored in keyring.
fn prompt_token_storage(token: &str, profile_name: &str) -> Result<Option<String>, CliError> {
    let choices = &[
        "Store in system keyring (recommended)",
        "Save to config file (plaintext)",
    ];
    let selection = Select::new()
        .with_prompt("Where to store the API token?")
        .items(choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    if selection == 0 {
        remnapromo_config::store_token(profile_name, token)?;
        eprintln!("   ✓ token stored in system keyring");
        Ok(None)
    } else {
        Ok(Some(token.to_owned()))
    }
}

fn read_token() -> Result<String, CliError> {
    let token = rpassword::prompt_password("API token: ").map_err(prompt_err)?;
    if token.is_empty() {
        return Err(CliError::Validation {
            field: "token".into(),
            reason: "API token cannot be empty".into(),
        });
    }
    Ok(token)
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Init: interactive setup ─────────────────────────────────
        ConfigCommand::Init => {
            let config_path = config::config_path();
            eprintln!("remnapromo configuration");
            eprintln!("   Config path: {}\n", config_path.display());

            let profile_name: String = Input::new()
                .with_prompt("Profile name")
                .default("default".into())
                .interact_text()
                .map_err(prompt_err)?;

            let panel: String = Input::new()
                .with_prompt("Panel URL")
                .default("https://panel.example.com".into())
                .interact_text()
                .map_err(prompt_err)?;
            url::Url::parse(&panel).map_err(|e| CliError::Validation {
                field: "panel".into(),
                reason: format!("invalid URL {panel:?}: {e}"),
            })?;

            let token = read_token()?;
            let token_field = prompt_token_storage(&token, &profile_name)?;

            let admins: String = Input::new()
                .with_prompt("Operator ids allowed to run the wizard (comma separated)")
                .allow_empty(true)
                .interact_text()
                .map_err(prompt_err)?;
            let admin_ids = parse_admin_ids(&admins)?;

            let mut cfg = config::load_config_or_default();
            let mut profile = Profile::new(panel);
            profile.token = token_field;
            cfg.profiles.insert(profile_name.clone(), profile);
            cfg.default_profile = Some(profile_name.clone());
            if !admin_ids.is_empty() {
                cfg.access.admin_ids = admin_ids;
            }

            config::save_config(&cfg)?;

            eprintln!("\n✓ Configuration written to {}", config_path.display());
            eprintln!("  Active profile: {profile_name}");
            eprintln!("\n  Test it: remnapromo stats");
            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = redacted(&config::load_config_or_default());
            let out = output::render_single(global.format(), &cfg, format_config, |c| {
                c.default_profile.clone().unwrap_or_default()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Path ────────────────────────────────────────────────────
        ConfigCommand::Path => {
            println!("{}", config::config_path().display());
            Ok(())
        }

        // ── Profiles ────────────────────────────────────────────────
        ConfigCommand::Profiles => {
            let cfg = config::load_config_or_default();
            let default = cfg.default_profile.as_deref().unwrap_or("default");
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: remnapromo config init");
            } else {
                let mut names: Vec<_> = cfg.profiles.keys().collect();
                names.sort();
                for name in names {
                    let marker = if name == default { " *" } else { "" };
                    println!("{name}{marker}");
                }
            }
            Ok(())
        }

        // ── Use <name> ─────────────────────────────────────────────
        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config_or_default();
            if !cfg.profiles.contains_key(&name) {
                return Err(CliError::ProfileNotFound {
                    available: available_profiles(&cfg),
                    name,
                });
            }
            cfg.default_profile = Some(name.clone());
            config::save_config(&cfg)?;
            eprintln!("✓ Default profile set to '{name}'");
            Ok(())
        }

        // ── SetToken ────────────────────────────────────────────────
        ConfigCommand::SetToken => {
            let cfg = config::load_config_or_default();
            let profile_name = config::active_profile_name(global, &cfg);
            if !cfg.profiles.contains_key(&profile_name) {
                return Err(CliError::ProfileNotFound {
                    available: available_profiles(&cfg),
                    name: profile_name,
                });
            }

            let token = read_token()?;
            remnapromo_config::store_token(&profile_name, &token)?;
            eprintln!("✓ Token stored in system keyring for profile '{profile_name}'");
            Ok(())
        }
    }
}

//! Configuration for remnapromo.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext),
//! and translation to the runtime types of `remnapromo_core`. The CLI adds
//! `GlobalOpts`-aware wrappers on top.
//!
//! Layering, lowest to highest: built-in defaults, the config file, the
//! `REMNAWAVE_*` / `DEFAULT_UUID_PREFIX` style variables understood for
//! compatibility with existing bot deployments, then `REMNAPROMO_*`
//! variables (`__` separates nested keys, e.g.
//! `REMNAPROMO_CAMPAIGN__MAX_COUNT=50`).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use remnapromo_core::{
    AccessPolicy, CampaignPolicy, FileArtifactWriter, PanelConfig, TagPolicy, TlsVerification,
};

/// Keyring service name for stored tokens.
pub const KEYRING_SERVICE: &str = "remnapromo";

/// Overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "REMNAPROMO_CONFIG";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found in config")]
    UnknownProfile { name: String },

    #[error("no API token configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("keyring error: {0}")]
    Keyring(String),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    #[serde(default)]
    pub campaign: CampaignSettings,

    #[serde(default)]
    pub artifacts: ArtifactSettings,

    #[serde(default)]
    pub access: AccessSettings,

    /// Named panel profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            campaign: CampaignSettings::default(),
            artifacts: ArtifactSettings::default(),
            access: AccessSettings::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// `explicit`, else `default_profile`, else `"default"`.
    pub fn profile_name(&self, explicit: Option<&str>) -> String {
        explicit
            .map(ToOwned::to_owned)
            .or_else(|| self.default_profile.clone())
            .unwrap_or_else(|| "default".into())
    }

    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::UnknownProfile { name: name.into() })
    }

    pub fn campaign_policy(&self) -> CampaignPolicy {
        let c = &self.campaign;
        CampaignPolicy {
            name_prefix: c.name_prefix.clone(),
            max_count: c.max_count,
            expiry_days: c.expiry_days,
            tag_policy: c.tag_policy,
            concurrency: c.concurrency.max(1),
            traffic_presets_gb: c.traffic_presets_gb.clone(),
        }
    }

    pub fn access_policy(&self) -> AccessPolicy {
        AccessPolicy::new(self.access.admin_ids.iter().copied())
    }

    /// Artifact writer for the configured directory plus the standard fallbacks.
    pub fn artifact_writer(&self) -> Result<FileArtifactWriter, ConfigError> {
        let dir = self
            .artifacts
            .dir
            .clone()
            .unwrap_or_else(default_artifact_dir);

        let base = self
            .artifacts
            .public_base_url
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|raw| {
                url::Url::parse(raw).map_err(|e| ConfigError::Validation {
                    field: "artifacts.public_base_url".into(),
                    reason: format!("invalid URL {raw:?}: {e}"),
                })
            })
            .transpose()?;

        Ok(FileArtifactWriter::with_fallbacks(dir).with_public_base_url(base))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default)]
    pub insecure: bool,

    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            insecure: false,
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_timeout() -> u64 {
    30
}

/// `[campaign]`: naming and provisioning policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CampaignSettings {
    #[serde(default = "default_name_prefix")]
    pub name_prefix: String,

    /// Upper bound on credentials per provisioning call.
    #[serde(default = "default_max_count")]
    pub max_count: u32,

    #[serde(default = "default_expiry_days")]
    pub expiry_days: u32,

    /// `strict` or `normalize`.
    #[serde(default)]
    pub tag_policy: TagPolicy,

    /// Parallel panel calls per batch.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    #[serde(default = "default_traffic_presets")]
    pub traffic_presets_gb: Vec<i64>,
}

impl Default for CampaignSettings {
    fn default() -> Self {
        Self {
            name_prefix: default_name_prefix(),
            max_count: default_max_count(),
            expiry_days: default_expiry_days(),
            tag_policy: TagPolicy::default(),
            concurrency: default_concurrency(),
            traffic_presets_gb: default_traffic_presets(),
        }
    }
}

fn default_name_prefix() -> String {
    "promo-".into()
}
fn default_max_count() -> u32 {
    100
}
fn default_expiry_days() -> u32 {
    30
}
fn default_concurrency() -> usize {
    1
}
fn default_traffic_presets() -> Vec<i64> {
    vec![15, 30, 50, 100]
}

/// `[artifacts]`: where provisioning listings are written.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArtifactSettings {
    /// Primary directory; platform data dir when unset.
    pub dir: Option<PathBuf>,

    /// Public URL under which `dir` is served.
    pub public_base_url: Option<String>,

    /// `artifacts cleanup` removes files older than this.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

impl Default for ArtifactSettings {
    fn default() -> Self {
        Self {
            dir: None,
            public_base_url: None,
            retention_days: default_retention_days(),
        }
    }
}

fn default_retention_days() -> u32 {
    7
}

/// `[access]`: who may run the campaign wizard.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AccessSettings {
    #[serde(default)]
    pub admin_ids: Vec<u64>,
}

/// A named panel profile.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Profile {
    /// Panel base URL (e.g., "https://panel.example.com").
    pub panel: String,

    /// API token (plaintext; prefer keyring or env var).
    pub token: Option<String>,

    /// Environment variable name containing the API token.
    pub token_env: Option<String>,

    /// Reverse-proxy key sent as `X-Api-Key` (plaintext).
    pub proxy_key: Option<String>,

    /// Environment variable name containing the proxy key.
    pub proxy_key_env: Option<String>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Override insecure TLS setting.
    pub insecure: Option<bool>,

    /// Override timeout (seconds).
    pub timeout: Option<u64>,

    /// Users fetched per list page.
    pub page_size: Option<u32>,
}

impl Profile {
    pub fn new(panel: impl Into<String>) -> Self {
        Self {
            panel: panel.into(),
            token: None,
            token_env: None,
            proxy_key: None,
            proxy_key_env: None,
            ca_cert: None,
            insecure: None,
            timeout: None,
            page_size: None,
        }
    }
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "remnapromo", "remnapromo")
}

/// Resolve the config file path: `REMNAPROMO_CONFIG`, else platform conventions.
pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV).filter(|p| !p.is_empty()) {
        return PathBuf::from(path);
    }
    project_dirs().map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Default primary artifact directory.
pub fn default_artifact_dir() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback().join("artifacts"),
        |dirs| dirs.data_dir().join("artifacts"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("remnapromo");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file + environment. A missing file is not an error.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Serialized::defaults(compat_env()))
        .merge(Env::prefixed("REMNAPROMO_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if loading fails.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

/// Variables read by earlier bot deployments, mapped onto config keys.
fn compat_env() -> toml::Table {
    let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
    let mut root = toml::Table::new();

    if let Some(panel) = var("REMNAWAVE_BASE_URL") {
        let mut profile = toml::Table::new();
        profile.insert("panel".into(), panel.into());
        if let Some(token) = var("REMNAWAVE_TOKEN") {
            profile.insert("token".into(), token.into());
        }
        if let Some(key) = var("REMNAWAVE_CADDY_TOKEN") {
            profile.insert("proxy_key".into(), key.into());
        }
        let mut profiles = toml::Table::new();
        profiles.insert("default".into(), profile.into());
        root.insert("profiles".into(), profiles.into());
    }

    let mut campaign = toml::Table::new();
    if let Some(prefix) = var("DEFAULT_UUID_PREFIX") {
        campaign.insert("name_prefix".into(), prefix.into());
    }
    if let Some(raw) = var("MAX_SUBSCRIPTIONS_PER_REQUEST") {
        match raw.trim().parse::<u32>() {
            Ok(max) => {
                campaign.insert("max_count".into(), i64::from(max).into());
            }
            Err(e) => warn!(value = %raw, error = %e, "ignoring MAX_SUBSCRIPTIONS_PER_REQUEST"),
        }
    }
    if !campaign.is_empty() {
        root.insert("campaign".into(), campaign.into());
    }

    if let Some(base) = var("SUBSCRIPTION_FILE_BASE_URL") {
        let mut artifacts = toml::Table::new();
        artifacts.insert("public_base_url".into(), base.into());
        root.insert("artifacts".into(), artifacts.into());
    }

    if let Some(ids) = var("ADMIN_USER_IDS") {
        let ids: Vec<toml::Value> = ids
            .split(',')
            .filter_map(|id| id.trim().parse::<i64>().ok())
            .map(toml::Value::from)
            .collect();
        let mut access = toml::Table::new();
        access.insert("admin_ids".into(), ids.into());
        root.insert("access".into(), access.into());
    }

    root
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution (without CLI flags) ───────────────────────

fn keyring_entry(profile_name: &str, what: &str) -> Result<keyring::Entry, ConfigError> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/{what}"))
        .map_err(|e| ConfigError::Keyring(e.to_string()))
}

/// Resolve the API token from the credential chain (no CLI flag step).
pub fn resolve_token(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    // 1. Profile's token_env → env var lookup
    if let Some(ref env_name) = profile.token_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Ok(entry) = keyring_entry(profile_name, "token") {
        if let Ok(secret) = entry.get_password() {
            return Ok(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    if let Some(ref token) = profile.token {
        return Ok(SecretString::from(token.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Resolve the optional proxy key: env var, keyring, then plaintext.
pub fn resolve_proxy_key(profile: &Profile, profile_name: &str) -> Option<SecretString> {
    if let Some(val) = profile
        .proxy_key_env
        .as_deref()
        .and_then(|name| std::env::var(name).ok())
    {
        return Some(SecretString::from(val));
    }
    if let Some(secret) = keyring_entry(profile_name, "proxy-key")
        .ok()
        .and_then(|entry| entry.get_password().ok())
    {
        return Some(SecretString::from(secret));
    }
    profile.proxy_key.clone().map(SecretString::from)
}

/// Store a token in the system keyring under `<profile>/token`.
pub fn store_token(profile_name: &str, token: &str) -> Result<(), ConfigError> {
    keyring_entry(profile_name, "token")?
        .set_password(token)
        .map_err(|e| ConfigError::Keyring(e.to_string()))
}

/// Build a `PanelConfig` from a profile; `token` skips the credential chain.
pub fn profile_to_panel_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
    token: Option<SecretString>,
) -> Result<PanelConfig, ConfigError> {
    let url: url::Url = profile.panel.parse().map_err(|_| ConfigError::Validation {
        field: "panel".into(),
        reason: format!("invalid URL: {}", profile.panel),
    })?;

    let token = match token {
        Some(token) => token,
        None => resolve_token(profile, profile_name)?,
    };

    let tls = if profile.insecure.unwrap_or(defaults.insecure) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    let mut config = PanelConfig::new(url, token);
    config.proxy_key = resolve_proxy_key(profile, profile_name);
    config.tls = tls;
    config.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    if let Some(size) = profile.page_size {
        config.page_size = size.max(1);
    }
    Ok(config)
}

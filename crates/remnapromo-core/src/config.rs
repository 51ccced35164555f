// ── Runtime configuration ──
//
// These types describe *how* to reach the panel and *what* a campaign looks
// like. They carry credential data and policy, but never touch disk.
// The CLI builds them from remnapromo-config and hands them in.

use std::time::Duration;

use remnapromo_api::{PanelAuth, PanelClient, TlsMode, TransportConfig};
use secrecy::SecretString;
use url::Url;

use crate::error::CoreError;
use crate::tag::TagPolicy;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (self-signed panels).
    DangerAcceptInvalid,
}

/// Configuration for connecting to a single panel.
#[derive(Debug, Clone)]
pub struct PanelConfig {
    /// Panel URL (e.g., `https://panel.example.com`).
    pub url: Url,
    /// Panel API token.
    pub token: SecretString,
    /// Optional reverse-proxy key sent as `X-Api-Key`.
    pub proxy_key: Option<SecretString>,
    pub tls: TlsVerification,
    /// Request timeout for every panel call.
    pub timeout: Duration,
    /// Page size used when listing users.
    pub page_size: u32,
}

impl PanelConfig {
    pub fn new(url: Url, token: SecretString) -> Self {
        Self {
            url,
            token,
            proxy_key: None,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            page_size: remnapromo_api::panel::client::DEFAULT_PAGE_SIZE,
        }
    }

    /// Build the HTTP client for this panel.
    pub fn connect(&self) -> Result<PanelClient, CoreError> {
        let transport = TransportConfig {
            tls: match &self.tls {
                TlsVerification::SystemDefaults => TlsMode::System,
                TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
                TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
            },
            timeout: self.timeout,
        };
        let auth = PanelAuth {
            token: self.token.clone(),
            proxy_key: self.proxy_key.clone(),
        };

        let client = PanelClient::new(self.url.as_str(), &auth, &transport)?;
        Ok(client.with_page_size(self.page_size))
    }
}

/// Campaign-wide policy constants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CampaignPolicy {
    /// Prefix of every generated credential name.
    pub name_prefix: String,
    /// Upper bound on `count` per provisioning call.
    pub max_count: u32,
    /// Days until a provisioned credential expires.
    pub expiry_days: u32,
    pub tag_policy: TagPolicy,
    /// Parallel panel calls per batch; 1 is strictly sequential.
    pub concurrency: usize,
    /// Traffic choices offered by the campaign wizard, in GB.
    pub traffic_presets_gb: Vec<i64>,
}

impl Default for CampaignPolicy {
    fn default() -> Self {
        Self {
            name_prefix: "promo-".into(),
            max_count: 100,
            expiry_days: 30,
            tag_policy: TagPolicy::default(),
            concurrency: 1,
            traffic_presets_gb: vec![15, 30, 50, 100],
        }
    }
}

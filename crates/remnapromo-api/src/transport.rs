// Shared transport configuration for building the panel's reqwest::Client.
//
// TLS mode, request timeout and the authentication headers all live here so
// the client module only deals with URLs and payloads.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};

use crate::error::Error;

const USER_AGENT: &str = concat!("remnapromo/", env!("CARGO_PKG_VERSION"));

/// TLS verification mode (api-level mirror of core's TlsVerification).
#[derive(Debug, Clone)]
pub enum TlsMode {
    /// Use the system certificate store.
    System,
    /// Use a custom CA certificate from the given PEM file.
    CustomCa(PathBuf),
    /// Accept any certificate (self-signed panels on a private network).
    DangerAcceptInvalid,
}

/// Credentials injected as default headers on every request.
#[derive(Debug, Clone)]
pub struct PanelAuth {
    /// Panel API token, sent as `Authorization: Bearer <token>`.
    pub token: SecretString,
    /// Optional reverse-proxy key, sent as `X-Api-Key`.
    pub proxy_key: Option<SecretString>,
}

impl PanelAuth {
    fn headers(&self) -> Result<HeaderMap, Error> {
        let mut headers = HeaderMap::new();

        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", self.token.expose_secret()))
            .map_err(|e| Error::InvalidToken {
                message: format!("invalid token header value: {e}"),
            })?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);

        if let Some(ref key) = self.proxy_key {
            let mut value =
                HeaderValue::from_str(key.expose_secret()).map_err(|e| Error::InvalidToken {
                    message: format!("invalid proxy key header value: {e}"),
                })?;
            value.set_sensitive(true);
            headers.insert("X-Api-Key", value);
        }

        Ok(headers)
    }
}

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tls: TlsMode,
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls: TlsMode::System,
            timeout: Duration::from_secs(30),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` carrying the panel auth headers.
    pub fn build_client(&self, auth: &PanelAuth) -> Result<reqwest::Client, Error> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .default_headers(auth.headers()?);

        match &self.tls {
            TlsMode::System => {}
            TlsMode::CustomCa(path) => {
                let cert_pem = std::fs::read(path)
                    .map_err(|e| Error::Tls(format!("failed to read CA cert: {e}")))?;
                let cert = reqwest::Certificate::from_pem(&cert_pem)
                    .map_err(|e| Error::Tls(format!("invalid CA cert: {e}")))?;
                builder = builder.add_root_certificate(cert);
            }
            TlsMode::DangerAcceptInvalid => {
                builder = builder.danger_accept_invalid_certs(true);
            }
        }

        builder
            .build()
            .map_err(|e| Error::Tls(format!("failed to build HTTP client: {e}")))
    }
}

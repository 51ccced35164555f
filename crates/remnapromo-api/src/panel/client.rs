// Hand-crafted async HTTP client for the Remnawave panel API.
//
// Base path: /api/
// Auth: `Authorization: Bearer <token>` (plus optional `X-Api-Key` for
// panels sitting behind an authenticating reverse proxy)

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use super::models::{self, CreateUserRequest, PanelUser};
use crate::Error;
use crate::transport::{PanelAuth, TransportConfig};

/// Page size used when walking `GET /api/users`.
pub const DEFAULT_PAGE_SIZE: u32 = 250;

// ── Error response shape from the panel ──────────────────────────────

#[derive(serde::Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    message: Option<String>,
    #[serde(default, alias = "errorCode")]
    code: Option<String>,
}

// ── Client ───────────────────────────────────────────────────────────

/// Async client for the panel's user endpoints.
///
/// All methods strip the `{"response": ...}` envelope before the caller
/// sees the payload.
pub struct PanelClient {
    http: reqwest::Client,
    base_url: Url,
    page_size: u32,
}

impl PanelClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build from a panel URL, credentials and transport config.
    pub fn new(
        base_url: &str,
        auth: &PanelAuth,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client(auth)?;
        let base_url = Self::normalize_base_url(base_url)?;
        Ok(Self {
            http,
            base_url,
            page_size: DEFAULT_PAGE_SIZE,
        })
    }

    /// Wrap an existing `reqwest::Client` (caller manages auth headers).
    pub fn from_reqwest(base_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        let base_url = Self::normalize_base_url(base_url)?;
        Ok(Self {
            http,
            base_url,
            page_size: DEFAULT_PAGE_SIZE,
        })
    }

    /// Override the page size used by [`list_all_users`](Self::list_all_users).
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// The panel base URL (always ends with `/api/`).
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build the base URL with a trailing `/api/`.
    ///
    /// `https://panel.example.com` and `https://panel.example.com/api` both
    /// become `https://panel.example.com/api/`.
    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;
        let path = url.path().trim_end_matches('/').to_owned();

        if path.ends_with("/api") {
            url.set_path(&format!("{path}/"));
        } else {
            url.set_path(&format!("{path}/api/"));
        }

        Ok(url)
    }

    // ── URL builder ──────────────────────────────────────────────────

    fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    async fn get_value(&self, path: &str, params: &[(&str, String)]) -> Result<Value, Error> {
        let url = self.url(path)?;
        debug!("GET {url} params={params:?}");

        let resp = self.http.get(url).query(params).send().await?;
        Self::handle_response(resp).await
    }

    async fn post_value<B: Serialize + Sync>(&self, path: &str, body: &B) -> Result<Value, Error> {
        let url = self.url(path)?;
        debug!("POST {url}");

        let resp = self.http.post(url).json(body).send().await?;
        Self::handle_response(resp).await
    }

    async fn delete_value(&self, path: &str) -> Result<Value, Error> {
        let url = self.url(path)?;
        debug!("DELETE {url}");

        let resp = self.http.delete(url).send().await?;
        Self::handle_response(resp).await
    }

    // ── Response handling ────────────────────────────────────────────

    async fn handle_response(resp: reqwest::Response) -> Result<Value, Error> {
        let status = resp.status();
        if !status.is_success() {
            return Err(Self::parse_error(status, resp).await);
        }

        let body = resp.text().await?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| {
            let preview: String = body.chars().take(200).collect();
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body,
            }
        })
    }

    async fn parse_error(status: reqwest::StatusCode, resp: reqwest::Response) -> Error {
        let raw = resp.text().await.unwrap_or_default();

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Error::Authentication {
                message: format!("panel rejected the API token (HTTP {status})"),
            };
        }

        if let Ok(err) = serde_json::from_str::<ErrorResponse>(&raw) {
            Error::Panel {
                status: status.as_u16(),
                message: err.message.unwrap_or_else(|| status.to_string()),
                code: err.code,
            }
        } else {
            Error::Panel {
                status: status.as_u16(),
                message: if raw.is_empty() {
                    status.to_string()
                } else {
                    raw.chars().take(200).collect()
                },
                code: None,
            }
        }
    }

    fn decode<T: DeserializeOwned>(value: &Value) -> Result<T, Error> {
        T::deserialize(value).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body: value.to_string(),
        })
    }

    fn decode_user(body: Value) -> Result<PanelUser, Error> {
        let record = models::single_record(body).ok_or(Error::MissingPayload { what: "a user" })?;
        Self::decode(&record)
    }

    // ━━ Public API ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    // ── Listing ──────────────────────────────────────────────────────

    /// Fetch one page of users.
    ///
    /// Returns the decoded users and the panel's `total` counter if present.
    /// Records that fail to decode are skipped with a warning.
    pub async fn list_users(
        &self,
        start: u64,
        size: u32,
    ) -> Result<(Vec<PanelUser>, Option<u64>), Error> {
        let body = self
            .get_value(
                "users",
                &[("start", start.to_string()), ("size", size.to_string())],
            )
            .await?;

        let total = models::total_count(&body);
        let users = models::user_records(body)
            .into_iter()
            .filter_map(|raw| match serde_json::from_value::<PanelUser>(raw) {
                Ok(user) => Some(user),
                Err(e) => {
                    warn!(error = %e, "skipping undecodable user record");
                    None
                }
            })
            .collect();

        Ok((users, total))
    }

    /// Walk every page of `GET /api/users`.
    ///
    /// Stops on a short page, an empty page, or once `total` is reached.
    /// A panel that ignores `start`/`size` is detected by a page larger than
    /// requested, or by a repeat of the previous page's first record.
    pub async fn list_all_users(&self) -> Result<Vec<PanelUser>, Error> {
        let mut all = Vec::new();
        let mut start: u64 = 0;
        let page_size = u64::from(self.page_size);
        let mut previous_first: Option<String> = None;

        loop {
            let (page, total) = self.list_users(start, self.page_size).await?;
            let received = u64::try_from(page.len()).unwrap_or(u64::MAX);
            let first = page.first().and_then(|u| u.uuid.clone());

            if first.is_some() && first == previous_first {
                warn!(start, "panel repeated the previous page, paging ignored");
                break;
            }
            all.extend(page);

            let seen = u64::try_from(all.len()).unwrap_or(u64::MAX);
            if received > page_size {
                warn!(received, page_size, "panel returned more than a page, paging ignored");
                break;
            }
            if received == 0 || received < page_size || total.is_some_and(|t| seen >= t) {
                break;
            }

            start += received;
            previous_first = first;
        }

        debug!(count = all.len(), "listed panel users");
        Ok(all)
    }

    // ── Lookup ───────────────────────────────────────────────────────

    /// `GET /api/users/{uuid}`
    pub async fn get_user_by_uuid(&self, uuid: &str) -> Result<PanelUser, Error> {
        let body = self.get_value(&format!("users/{uuid}"), &[]).await?;
        Self::decode_user(body)
    }

    /// `GET /api/users/by-short-uuid/{shortUuid}`
    pub async fn get_user_by_short_uuid(&self, short_uuid: &str) -> Result<PanelUser, Error> {
        let body = self
            .get_value(&format!("users/by-short-uuid/{short_uuid}"), &[])
            .await?;
        Self::decode_user(body)
    }

    /// `GET /api/users/by-username/{username}`
    pub async fn get_user_by_username(&self, username: &str) -> Result<PanelUser, Error> {
        let body = self
            .get_value(&format!("users/by-username/{username}"), &[])
            .await?;
        Self::decode_user(body)
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// `POST /api/users`
    pub async fn create_user(&self, request: &CreateUserRequest) -> Result<PanelUser, Error> {
        debug!(username = %request.username, "creating user");
        let body = self.post_value("users", request).await?;
        Self::decode_user(body)
    }

    /// `DELETE /api/users/{uuid}`
    ///
    /// Some panel releases answer `{"response": {"isDeleted": false}}` with
    /// HTTP 200 instead of an error status; that is reported as an error.
    pub async fn delete_user(&self, uuid: &str) -> Result<(), Error> {
        let body = self.delete_value(&format!("users/{uuid}")).await?;
        let deleted = body
            .pointer("/response/isDeleted")
            .or_else(|| body.get("isDeleted"))
            .and_then(Value::as_bool);

        if deleted == Some(false) {
            return Err(Error::Panel {
                status: 200,
                message: format!("panel refused to delete user {uuid}"),
                code: None,
            });
        }
        Ok(())
    }
}

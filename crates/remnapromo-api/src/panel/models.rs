// Panel API request and response types
//
// The panel's payloads have drifted across releases: envelopes differ between
// endpoints, counters sometimes arrive as strings, and traffic counters moved
// into a nested `userTraffic` object. Fields use `#[serde(default)]`
// liberally and unknown fields are kept in `extra`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// ── Status enums ─────────────────────────────────────────────────────

/// Lifecycle status of a panel user.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStatus {
    #[default]
    Active,
    Disabled,
    Limited,
    Expired,
    /// Any status this client does not know about.
    #[serde(other)]
    Unknown,
}

/// How the panel resets a user's traffic counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrafficLimitStrategy {
    #[default]
    NoReset,
    Day,
    Week,
    Month,
}

// ── User ─────────────────────────────────────────────────────────────

/// Nested traffic counters returned by newer panel releases.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserTraffic {
    #[serde(default, deserialize_with = "lenient_u64")]
    pub used_traffic_bytes: u64,
}

/// A user record as returned by the panel.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelUser {
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub short_uuid: Option<String>,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub status: UserStatus,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub used_traffic_bytes: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub traffic_limit_bytes: u64,
    #[serde(default)]
    pub user_traffic: Option<UserTraffic>,
    #[serde(default)]
    pub expire_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub subscription_url: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
    /// Catch-all for undocumented fields.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl PanelUser {
    /// Consumed traffic, preferring the top-level counter and falling back
    /// to the nested `userTraffic` object.
    pub fn used_traffic(&self) -> u64 {
        if self.used_traffic_bytes > 0 {
            return self.used_traffic_bytes;
        }
        self.user_traffic
            .as_ref()
            .map_or(0, |t| t.used_traffic_bytes)
    }

    /// The subscription link, ignoring empty strings.
    pub fn subscription_link(&self) -> Option<&str> {
        self.subscription_url.as_deref().filter(|s| !s.is_empty())
    }
}

// ── Create request ───────────────────────────────────────────────────

/// Body for `POST /api/users`.
///
/// Two shapes are used: [`full`](Self::full) sets every field the bot cares
/// about, [`minimal`](Self::minimal) keeps only the fields every panel
/// release accepts (`username`, `expireAt`, `trafficLimitBytes`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub username: String,
    pub expire_at: DateTime<Utc>,
    pub traffic_limit_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub traffic_limit_strategy: Option<TrafficLimitStrategy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<UserStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activate_all_inbounds: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl CreateUserRequest {
    /// The authoritative shape: active, never-resetting quota, all inbounds,
    /// panel-side tag set.
    pub fn full(
        username: impl Into<String>,
        expire_at: DateTime<Utc>,
        traffic_limit_bytes: u64,
        tag: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            expire_at,
            traffic_limit_bytes,
            traffic_limit_strategy: Some(TrafficLimitStrategy::NoReset),
            status: Some(UserStatus::Active),
            activate_all_inbounds: Some(true),
            tag: Some(tag.into()),
        }
    }

    /// The fallback shape: required fields plus the quota.
    pub fn minimal(
        username: impl Into<String>,
        expire_at: DateTime<Utc>,
        traffic_limit_bytes: u64,
    ) -> Self {
        Self {
            username: username.into(),
            expire_at,
            traffic_limit_bytes,
            traffic_limit_strategy: None,
            status: None,
            activate_all_inbounds: None,
            tag: None,
        }
    }

    /// Strip everything but the required fields.
    pub fn to_minimal(&self) -> Self {
        Self::minimal(
            self.username.clone(),
            self.expire_at,
            self.traffic_limit_bytes,
        )
    }
}

// ── Envelope handling ────────────────────────────────────────────────

/// Pull the user array out of a list response.
///
/// Tried in order: `response.users`, `users`, `response` (bare array), a bare
/// top-level array. Anything else yields an empty list.
pub(crate) fn user_records(body: Value) -> Vec<Value> {
    let mut body = body;
    if let Some(Value::Array(users)) = body.pointer_mut("/response/users").map(Value::take) {
        return users;
    }
    if let Some(Value::Array(users)) = body.get_mut("users").map(Value::take) {
        return users;
    }
    if let Some(Value::Array(users)) = body.get_mut("response").map(Value::take) {
        return users;
    }
    match body {
        Value::Array(users) => users,
        _ => Vec::new(),
    }
}

/// The `total` counter of a paginated list response, when present.
pub(crate) fn total_count(body: &Value) -> Option<u64> {
    body.pointer("/response/total")
        .or_else(|| body.get("total"))
        .and_then(Value::as_u64)
}

/// Pull a single record out of `{"response": {...}}` or a bare object.
pub(crate) fn single_record(body: Value) -> Option<Value> {
    match body {
        Value::Object(mut map) => match map.remove("response") {
            Some(inner @ Value::Object(_)) => Some(inner),
            Some(_) => None,
            None => Some(Value::Object(map)),
        },
        _ => None,
    }
}

// ── Lenient number decoding ──────────────────────────────────────────

/// Accept a byte counter as an integer, float, numeric string, or null.
fn lenient_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f > 0.0).map(f64_to_u64))
            .unwrap_or(0),
        Value::String(s) => s.trim().parse::<u64>().unwrap_or(0),
        _ => 0,
    })
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::as_conversions
)]
fn f64_to_u64(f: f64) -> u64 {
    f as u64
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn user_records_prefers_nested_response_users() {
        let body = json!({ "response": { "users": [{ "username": "a" }], "total": 1 } });
        assert_eq!(user_records(body).len(), 1);
    }

    #[test]
    fn user_records_accepts_top_level_users_and_bare_arrays() {
        assert_eq!(user_records(json!({ "users": [{}, {}] })).len(), 2);
        assert_eq!(user_records(json!({ "response": [{}] })).len(), 1);
        assert_eq!(user_records(json!([{}, {}, {}])).len(), 3);
    }

    #[test]
    fn user_records_is_empty_for_unknown_shapes() {
        assert!(user_records(json!({ "response": null })).is_empty());
        assert!(user_records(json!({ "data": [] })).is_empty());
        assert!(user_records(Value::Null).is_empty());
    }

    #[test]
    fn single_record_unwraps_response() {
        let rec = single_record(json!({ "response": { "uuid": "u1" } })).unwrap();
        assert_eq!(rec["uuid"], "u1");
        let bare = single_record(json!({ "uuid": "u2" })).unwrap();
        assert_eq!(bare["uuid"], "u2");
        assert!(single_record(json!({ "response": [] })).is_none());
    }

    #[test]
    fn panel_user_decodes_string_counters_and_nested_traffic() {
        let user: PanelUser = serde_json::from_value(json!({
            "uuid": "u1",
            "username": "promo-abcd1234-spring",
            "status": "LIMITED",
            "trafficLimitBytes": "1073741824",
            "userTraffic": { "usedTrafficBytes": 2048 }
        }))
        .unwrap();

        assert_eq!(user.status, UserStatus::Limited);
        assert_eq!(user.traffic_limit_bytes, 1_073_741_824);
        assert_eq!(user.used_traffic(), 2048);
    }

    #[test]
    fn panel_user_defaults_missing_status_to_active() {
        let user: PanelUser = serde_json::from_value(json!({ "username": "x" })).unwrap();
        assert_eq!(user.status, UserStatus::Active);
        assert_eq!(user.used_traffic(), 0);
    }

    #[test]
    fn unknown_status_is_preserved_as_unknown() {
        let user: PanelUser =
            serde_json::from_value(json!({ "username": "x", "status": "ON_HOLD" })).unwrap();
        assert_eq!(user.status, UserStatus::Unknown);
    }

    #[test]
    fn minimal_request_omits_optional_fields() {
        let expire = DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let body = serde_json::to_value(CreateUserRequest::minimal("u", expire, 5)).unwrap();
        assert_eq!(
            body,
            json!({
                "username": "u",
                "expireAt": "2026-01-01T00:00:00Z",
                "trafficLimitBytes": 5
            })
        );
    }

    #[test]
    fn full_request_carries_strategy_status_and_tag() {
        let expire = Utc::now();
        let body = serde_json::to_value(CreateUserRequest::full("u", expire, 5, "SPRING")).unwrap();
        assert_eq!(body["trafficLimitStrategy"], "NO_RESET");
        assert_eq!(body["status"], "ACTIVE");
        assert_eq!(body["activateAllInbounds"], true);
        assert_eq!(body["tag"], "SPRING");
    }
}

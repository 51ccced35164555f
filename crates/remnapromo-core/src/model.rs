// ── Campaign domain types ──
//
// `Credential` is the core's view of a panel user. Campaign counters,
// provisioning outcomes and retirement reports are derived values that are
// recomputed on every call and never cached.

use std::fmt;

use chrono::{DateTime, Utc};
use remnapromo_api::{PanelUser, UserStatus};
use serde::Serialize;

use crate::artifact::ArtifactRef;

// ── Credential ───────────────────────────────────────────────────────

/// One provisioned access record on the panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Credential {
    /// Panel uuid. Absent on records the panel returned without one.
    pub id: Option<String>,
    pub short_id: Option<String>,
    pub name: String,
    pub created_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    /// Traffic quota in bytes; 0 means unlimited.
    pub quota_bytes: u64,
    pub used_bytes: u64,
    pub status: UserStatus,
    pub link: Option<String>,
}

impl Credential {
    pub fn usage(&self) -> UsageState {
        classify(self)
    }
}

impl From<PanelUser> for Credential {
    fn from(user: PanelUser) -> Self {
        let used_bytes = user.used_traffic();
        let link = user.subscription_link().map(ToOwned::to_owned);
        Self {
            id: user.uuid.filter(|s| !s.is_empty()),
            short_id: user.short_uuid.filter(|s| !s.is_empty()),
            name: user.username,
            created_at: user.created_at,
            expires_at: user.expire_at,
            quota_bytes: user.traffic_limit_bytes,
            used_bytes,
            status: user.status,
            link,
        }
    }
}

// ── Usage classification ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum UsageState {
    Active,
    Used,
}

/// Used iff the panel no longer reports it active, or a finite quota is spent.
/// A zero quota is unlimited and never counts as spent.
pub fn classify(credential: &Credential) -> UsageState {
    let exhausted = credential.quota_bytes > 0 && credential.used_bytes >= credential.quota_bytes;
    if credential.status != UserStatus::Active || exhausted {
        UsageState::Used
    } else {
        UsageState::Active
    }
}

// ── Campaign counters ────────────────────────────────────────────────

/// Per-tag counters. `total == active + used` always holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TagStats {
    pub total: u64,
    pub active: u64,
    pub used: u64,
}

impl TagStats {
    pub fn record(&mut self, state: UsageState) {
        self.total += 1;
        match state {
            UsageState::Active => self.active += 1,
            UsageState::Used => self.used += 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

impl std::ops::AddAssign for TagStats {
    fn add_assign(&mut self, rhs: Self) {
        self.total += rhs.total;
        self.active += rhs.active;
        self.used += rhs.used;
    }
}

/// A campaign row: tag plus its counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CampaignSummary {
    pub tag: String,
    #[serde(flatten)]
    pub stats: TagStats,
}

// ── Provisioning ─────────────────────────────────────────────────────

/// Input to a provisioning batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisionRequest {
    pub tag: String,
    /// Whole gigabytes; values <= 0 are raised to 1.
    pub traffic_gb: i64,
    pub count: u32,
}

/// The distributable link for one created credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AccessLink {
    Resolved(String),
    /// The credential exists but no link could be read back; carries its name.
    Placeholder(String),
}

impl AccessLink {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}

impl fmt::Display for AccessLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolved(url) => f.write_str(url),
            Self::Placeholder(name) => write!(f, "User created: {name} (no subscription URL)"),
        }
    }
}

/// Which create-request shape the panel accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CreateShape {
    Full,
    Minimal,
}

/// Per-credential result of a provisioning batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ItemOutcome {
    Created {
        name: String,
        id: Option<String>,
        shape: CreateShape,
        link: AccessLink,
    },
    Failed {
        name: String,
        reason: String,
    },
}

impl ItemOutcome {
    pub fn link(&self) -> Option<&AccessLink> {
        match self {
            Self::Created { link, .. } => Some(link),
            Self::Failed { .. } => None,
        }
    }
}

/// Everything a caller needs to distribute a batch.
#[derive(Debug, Clone, Serialize)]
pub struct ProvisionReport {
    pub tag: String,
    pub quota_bytes: u64,
    pub expires_at: DateTime<Utc>,
    pub requested: u32,
    /// One entry per attempt, in submission order.
    pub outcomes: Vec<ItemOutcome>,
    /// Absent when nothing was created or the write failed.
    pub artifact: Option<ArtifactRef>,
}

impl ProvisionReport {
    /// Links and placeholders for every created credential, in order.
    pub fn links(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .filter_map(ItemOutcome::link)
            .map(ToString::to_string)
            .collect()
    }

    pub fn created(&self) -> usize {
        self.outcomes.iter().filter(|o| o.link().is_some()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.created()
    }

    pub fn placeholders(&self) -> usize {
        self.outcomes
            .iter()
            .filter_map(ItemOutcome::link)
            .filter(|l| !l.is_resolved())
            .count()
    }
}

// ── Retirement ───────────────────────────────────────────────────────

/// Outcome of retiring the used credentials of one tag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RetireReport {
    pub tag: String,
    /// Credentials carrying the tag.
    pub total: u64,
    /// Of those, classified as used.
    pub used: u64,
    pub deleted: u64,
    /// Used credentials without a panel id.
    pub skipped: u64,
    /// Delete calls the panel rejected.
    pub failed: u64,
    /// Set when the directory could not be listed; counts are then zero.
    pub scan_error: Option<String>,
}

impl RetireReport {
    /// `(deleted, total)`.
    pub fn counts(&self) -> (u64, u64) {
        (self.deleted, self.total)
    }
}

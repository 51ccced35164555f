// ── Campaign-creation conversation ──
//
// An operator builds a campaign in four steps: tag, traffic preset, count,
// confirmation. Drafts live in a `SessionStore` keyed by operator id; only
// allow-listed operators may start one. Drafts are dropped on confirmation
// or cancellation and never expire on their own.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::CampaignPolicy;
use crate::error::CoreError;
use crate::model::ProvisionRequest;

/// Caller identity (a chat user id, an operator number, ...).
pub type OperatorId = u64;

// ── Draft ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WizardStep {
    Tag,
    Traffic,
    Count,
    Confirm,
}

/// Answers collected so far.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CampaignDraft {
    pub tag: Option<String>,
    pub traffic_gb: Option<i64>,
    pub count: Option<u32>,
}

impl CampaignDraft {
    /// The step waiting for input.
    pub fn step(&self) -> WizardStep {
        match (&self.tag, self.traffic_gb, self.count) {
            (None, _, _) => WizardStep::Tag,
            (Some(_), None, _) => WizardStep::Traffic,
            (Some(_), Some(_), None) => WizardStep::Count,
            (Some(_), Some(_), Some(_)) => WizardStep::Confirm,
        }
    }

    /// The finished request, once every answer is in.
    pub fn to_request(&self) -> Option<ProvisionRequest> {
        Some(ProvisionRequest {
            tag: self.tag.clone()?,
            traffic_gb: self.traffic_gb?,
            count: self.count?,
        })
    }
}

// ── Store ────────────────────────────────────────────────────────────

/// Per-operator draft storage.
///
/// One in-flight draft per operator is assumed; different operators never
/// contend.
pub trait SessionStore: Send + Sync {
    fn get(&self, operator: OperatorId) -> Option<CampaignDraft>;
    fn put(&self, operator: OperatorId, draft: CampaignDraft);
    /// Remove and return the draft, if any.
    fn clear(&self, operator: OperatorId) -> Option<CampaignDraft>;
}

/// Process-local store backed by a `DashMap`.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    sessions: Arc<DashMap<OperatorId, CampaignDraft>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, operator: OperatorId) -> Option<CampaignDraft> {
        self.sessions.get(&operator).map(|d| d.value().clone())
    }

    fn put(&self, operator: OperatorId, draft: CampaignDraft) {
        self.sessions.insert(operator, draft);
    }

    fn clear(&self, operator: OperatorId) -> Option<CampaignDraft> {
        self.sessions.remove(&operator).map(|(_, d)| d)
    }
}

// ── Access ───────────────────────────────────────────────────────────

/// Operators allowed to manage campaigns. Empty means nobody.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessPolicy {
    admins: HashSet<OperatorId>,
}

impl AccessPolicy {
    pub fn new(admins: impl IntoIterator<Item = OperatorId>) -> Self {
        Self {
            admins: admins.into_iter().collect(),
        }
    }

    pub fn is_allowed(&self, operator: OperatorId) -> bool {
        self.admins.contains(&operator)
    }
}

// ── Wizard ───────────────────────────────────────────────────────────

/// What the front-end should ask next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum WizardPrompt {
    AskTag,
    AskTraffic {
        tag: String,
        presets: Vec<i64>,
    },
    AskCount {
        tag: String,
        traffic_gb: i64,
        max: u32,
    },
    Confirm(ProvisionRequest),
}

/// Drives one draft per operator through the campaign questions.
///
/// Invalid answers leave the draft at its current step so the question can
/// be asked again.
pub struct CampaignWizard<S> {
    store: S,
    access: AccessPolicy,
    policy: CampaignPolicy,
}

impl<S: SessionStore> CampaignWizard<S> {
    pub fn new(store: S, access: AccessPolicy, policy: CampaignPolicy) -> Self {
        Self {
            store,
            access,
            policy,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn authorize(&self, operator: OperatorId) -> Result<(), CoreError> {
        if self.access.is_allowed(operator) {
            Ok(())
        } else {
            Err(CoreError::Unauthorized { operator })
        }
    }

    fn draft_at(&self, operator: OperatorId, step: WizardStep) -> Result<CampaignDraft, CoreError> {
        self.authorize(operator)?;
        let draft = self
            .store
            .get(operator)
            .ok_or(CoreError::NoSession { operator })?;

        if draft.step() == step {
            Ok(draft)
        } else {
            Err(CoreError::UnexpectedInput {
                expected: expected_input(draft.step()),
            })
        }
    }

    /// The operator's current draft, if any.
    pub fn draft(&self, operator: OperatorId) -> Option<CampaignDraft> {
        self.store.get(operator)
    }

    /// Begin a fresh draft, discarding any previous one.
    pub fn start(&self, operator: OperatorId) -> Result<WizardPrompt, CoreError> {
        self.authorize(operator)?;
        self.store.put(operator, CampaignDraft::default());
        debug!(operator, "campaign draft started");
        Ok(WizardPrompt::AskTag)
    }

    pub fn submit_tag(&self, operator: OperatorId, raw: &str) -> Result<WizardPrompt, CoreError> {
        let mut draft = self.draft_at(operator, WizardStep::Tag)?;
        let tag = self.policy.tag_policy.apply(raw)?;

        draft.tag = Some(tag.clone());
        self.store.put(operator, draft);
        Ok(WizardPrompt::AskTraffic {
            tag,
            presets: self.policy.traffic_presets_gb.clone(),
        })
    }

    pub fn choose_traffic(&self, operator: OperatorId, gb: i64) -> Result<WizardPrompt, CoreError> {
        let mut draft = self.draft_at(operator, WizardStep::Traffic)?;
        if !self.policy.traffic_presets_gb.contains(&gb) {
            return Err(CoreError::InvalidTraffic {
                gb,
                presets: self
                    .policy
                    .traffic_presets_gb
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        }

        draft.traffic_gb = Some(gb);
        let tag = draft.tag.clone().unwrap_or_default();
        self.store.put(operator, draft);
        Ok(WizardPrompt::AskCount {
            tag,
            traffic_gb: gb,
            max: self.policy.max_count,
        })
    }

    /// Accepts free text; it must be a whole number in `1..=max_count`.
    pub fn submit_count(&self, operator: OperatorId, raw: &str) -> Result<WizardPrompt, CoreError> {
        let mut draft = self.draft_at(operator, WizardStep::Count)?;
        let max = self.policy.max_count;

        let value: i64 = raw.trim().parse().map_err(|_| CoreError::UnexpectedInput {
            expected: "a whole number",
        })?;
        let count = u32::try_from(value)
            .ok()
            .filter(|c| (1..=max).contains(c))
            .ok_or(CoreError::InvalidCount { count: value, max })?;

        draft.count = Some(count);
        let request = draft
            .to_request()
            .ok_or(CoreError::Internal("draft incomplete after count".into()))?;
        self.store.put(operator, draft);
        Ok(WizardPrompt::Confirm(request))
    }

    /// Hand over the finished request and drop the draft.
    pub fn confirm(&self, operator: OperatorId) -> Result<ProvisionRequest, CoreError> {
        let draft = self.draft_at(operator, WizardStep::Confirm)?;
        let request = draft
            .to_request()
            .ok_or(CoreError::Internal("draft incomplete at confirmation".into()))?;
        self.store.clear(operator);
        info!(operator, tag = %request.tag, count = request.count, "campaign draft confirmed");
        Ok(request)
    }

    /// Drop the draft. Returns whether one existed.
    pub fn cancel(&self, operator: OperatorId) -> bool {
        let existed = self.store.clear(operator).is_some();
        if existed {
            debug!(operator, "campaign draft cancelled");
        }
        existed
    }
}

fn expected_input(step: WizardStep) -> &'static str {
    match step {
        WizardStep::Tag => "a campaign tag",
        WizardStep::Traffic => "a traffic preset",
        WizardStep::Count => "a count",
        WizardStep::Confirm => "confirmation",
    }
}

// remnapromo-core: campaign tagging, directory scans, bulk provisioning and
// retirement on top of remnapromo-api.

pub mod artifact;
pub mod config;
pub mod directory;
pub mod error;
pub mod model;
pub mod panel;
pub mod provision;
pub mod retire;
pub mod service;
pub mod session;
pub mod tag;

#[cfg(any(test, feature = "test-support"))]
pub mod mocks;

// ── Primary re-exports ──────────────────────────────────────────────
pub use artifact::{ArtifactRef, ArtifactWriter, FileArtifactWriter};
pub use config::{CampaignPolicy, PanelConfig, TlsVerification};
pub use directory::Snapshot;
pub use error::CoreError;
pub use model::{
    AccessLink, CampaignSummary, CreateShape, Credential, ItemOutcome, ProvisionReport,
    ProvisionRequest, RetireReport, TagStats, UsageState, classify,
};
pub use panel::Panel;
pub use service::CampaignService;
pub use session::{
    AccessPolicy, CampaignDraft, CampaignWizard, MemorySessionStore, OperatorId, SessionStore,
    WizardPrompt, WizardStep,
};
pub use tag::{MAX_TAG_LEN, PrefixCodec, TagCodec, TagPolicy, is_valid_tag, normalize_tag};

// ── Campaign service ──
//
// Facade over the panel, the tag codec, the campaign policy and the artifact
// writer. Front-ends talk to this type only.

use std::collections::BTreeMap;

use chrono::Utc;
use tracing::{info, warn};

use crate::artifact::{ArtifactWriter, FileArtifactWriter};
use crate::config::CampaignPolicy;
use crate::directory::Snapshot;
use crate::error::CoreError;
use crate::model::{CampaignSummary, ProvisionReport, ProvisionRequest, RetireReport, TagStats};
use crate::panel::Panel;
use crate::provision::{self, Batch};
use crate::retire;
use crate::tag::{PrefixCodec, TagCodec, TagPolicy, normalize_tag};

pub struct CampaignService<P, W = FileArtifactWriter, C = PrefixCodec> {
    panel: P,
    codec: C,
    policy: CampaignPolicy,
    artifacts: Option<W>,
}

impl<P: Panel> CampaignService<P> {
    /// Prefix codec from `policy.name_prefix`, no artifact writer.
    pub fn new(panel: P, policy: CampaignPolicy) -> Self {
        Self {
            panel,
            codec: PrefixCodec::new(policy.name_prefix.clone()),
            policy,
            artifacts: None,
        }
    }
}

impl<P, W, C> CampaignService<P, W, C>
where
    P: Panel,
    W: ArtifactWriter,
    C: TagCodec,
{
    pub fn with_artifacts<W2: ArtifactWriter>(self, writer: W2) -> CampaignService<P, W2, C> {
        CampaignService {
            panel: self.panel,
            codec: self.codec,
            policy: self.policy,
            artifacts: Some(writer),
        }
    }

    pub fn with_codec<C2: TagCodec>(self, codec: C2) -> CampaignService<P, W, C2> {
        CampaignService {
            panel: self.panel,
            codec,
            policy: self.policy,
            artifacts: self.artifacts,
        }
    }

    pub fn panel(&self) -> &P {
        &self.panel
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    pub fn policy(&self) -> &CampaignPolicy {
        &self.policy
    }

    // Lookups follow the same casing rule as creation so a normalized
    // campaign can be found by the text the operator typed.
    fn lookup_tag(&self, raw: &str) -> String {
        match self.policy.tag_policy {
            TagPolicy::Strict => raw.to_owned(),
            TagPolicy::Normalize => normalize_tag(raw),
        }
    }

    // ── Directory queries ────────────────────────────────────────────

    /// One listing of the panel. Fails if the list call fails.
    pub async fn snapshot(&self) -> Result<Snapshot, CoreError> {
        Snapshot::scan(&self.panel).await
    }

    pub async fn tag_stats(&self) -> Result<BTreeMap<String, TagStats>, CoreError> {
        Ok(self.snapshot().await?.tag_stats(&self.codec))
    }

    /// Every campaign, sorted by tag.
    pub async fn campaigns(&self) -> Result<Vec<CampaignSummary>, CoreError> {
        Ok(self
            .tag_stats()
            .await?
            .into_iter()
            .map(|(tag, stats)| CampaignSummary { tag, stats })
            .collect())
    }

    pub async fn tag_preview(&self, tag: &str) -> Result<TagStats, CoreError> {
        let tag = self.lookup_tag(tag);
        Ok(self.snapshot().await?.tag_preview(&self.codec, &tag))
    }

    // ── Provisioning ─────────────────────────────────────────────────

    /// Check a request without touching the panel; returns it with the
    /// tag policy applied.
    pub fn validate(&self, request: &ProvisionRequest) -> Result<ProvisionRequest, CoreError> {
        let tag = self.policy.tag_policy.apply(&request.tag)?;
        let max = self.policy.max_count;
        if !(1..=max).contains(&request.count) {
            return Err(CoreError::InvalidCount {
                count: i64::from(request.count),
                max,
            });
        }
        Ok(ProvisionRequest {
            tag,
            ..request.clone()
        })
    }

    /// Create `request.count` credentials under one tag.
    ///
    /// Only validation errors are returned. Panel failures shorten the link
    /// list; an artifact failure leaves `artifact` empty.
    pub async fn provision(&self, request: &ProvisionRequest) -> Result<ProvisionReport, CoreError> {
        let request = self.validate(request)?;

        let now = Utc::now();
        let batch = Batch {
            tag: &request.tag,
            quota_bytes: provision::quota_bytes(request.traffic_gb),
            expires_at: provision::expiry_from(now, self.policy.expiry_days),
            count: request.count,
            concurrency: self.policy.concurrency,
        };
        info!(
            tag = %request.tag,
            count = request.count,
            quota_bytes = batch.quota_bytes,
            "provisioning campaign"
        );

        let outcomes = provision::provision_batch(&self.panel, &self.codec, &batch).await;

        let mut report = ProvisionReport {
            tag: request.tag.clone(),
            quota_bytes: batch.quota_bytes,
            expires_at: batch.expires_at,
            requested: request.count,
            outcomes,
            artifact: None,
        };

        let links = report.links();
        if let (Some(writer), false) = (&self.artifacts, links.is_empty()) {
            match writer.write_listing(&request.tag, now, &links).await {
                Ok(artifact) => report.artifact = Some(artifact),
                Err(e) => warn!(tag = %request.tag, error = %e, "listing artifact not written"),
            }
        }

        Ok(report)
    }

    // ── Retirement ───────────────────────────────────────────────────

    /// Delete every used credential under `tag`. See [`retire::retire_used`].
    pub async fn retire_used(&self, tag: &str) -> RetireReport {
        let tag = self.lookup_tag(tag);
        retire::retire_used(&self.panel, &self.codec, &tag, self.policy.concurrency).await
    }
}

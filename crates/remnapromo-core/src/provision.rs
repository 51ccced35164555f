// ── Bulk provisioning ──
//
// Each credential is created independently: a failure is recorded as an
// `ItemOutcome::Failed` and the batch carries on. The panel's accepted
// create shape has varied across releases, so the full shape is tried first
// and the minimal one exactly once after it.

use chrono::{DateTime, TimeDelta, Utc};
use futures_util::StreamExt;
use futures_util::stream;
use remnapromo_api::{CreateUserRequest, PanelUser};
use tracing::{debug, info, warn};

use crate::error::CoreError;
use crate::model::{AccessLink, CreateShape, ItemOutcome};
use crate::panel::Panel;
use crate::tag::TagCodec;

/// Bytes in one gigabyte of quota (binary, as the panel counts).
pub const BYTES_PER_GB: u64 = 1024 * 1024 * 1024;

/// Quota in bytes for `gb` whole gigabytes. Non-positive input becomes 1 GB,
/// since 0 would mean unlimited on the panel.
pub fn quota_bytes(gb: i64) -> u64 {
    let gb = match u64::try_from(gb) {
        Ok(gb) if gb > 0 => gb,
        _ => {
            warn!(requested_gb = gb, "non-positive traffic limit, using 1 GB");
            1
        }
    };
    gb.saturating_mul(BYTES_PER_GB)
}

/// Expiry timestamp `days` after `now`.
pub fn expiry_from(now: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    now + TimeDelta::days(i64::from(days))
}

/// Parameters shared by every item of one batch.
#[derive(Debug, Clone)]
pub struct Batch<'a> {
    pub tag: &'a str,
    pub quota_bytes: u64,
    pub expires_at: DateTime<Utc>,
    pub count: u32,
    pub concurrency: usize,
}

/// Create `batch.count` credentials; outcomes come back in submission order.
pub async fn provision_batch<P, C>(panel: &P, codec: &C, batch: &Batch<'_>) -> Vec<ItemOutcome>
where
    P: Panel + ?Sized,
    C: TagCodec + ?Sized,
{
    let outcomes: Vec<ItemOutcome> = stream::iter(0..batch.count)
        .map(|_| {
            let name = codec.generate_name(batch.tag);
            provision_one(panel, name, batch)
        })
        .buffered(batch.concurrency.max(1))
        .collect()
        .await;

    let created = outcomes.iter().filter(|o| o.link().is_some()).count();
    info!(
        tag = batch.tag,
        requested = batch.count,
        created,
        failed = outcomes.len() - created,
        "provisioning batch finished"
    );
    outcomes
}

async fn provision_one<P: Panel + ?Sized>(panel: &P, name: String, batch: &Batch<'_>) -> ItemOutcome {
    let request = CreateUserRequest::full(&name, batch.expires_at, batch.quota_bytes, batch.tag);

    match create_with_fallback(panel, &request).await {
        Ok((user, shape)) => {
            let link = resolve_link(panel, &name, &user).await;
            ItemOutcome::Created {
                id: user.uuid.filter(|s| !s.is_empty()),
                name,
                shape,
                link,
            }
        }
        Err(e) => {
            warn!(username = %name, error = %e, "credential creation failed");
            ItemOutcome::Failed {
                name,
                reason: e.to_string(),
            }
        }
    }
}

/// Full shape, then the minimal shape once. Any error triggers the fallback:
/// a rejected shape and a transient failure look the same from here.
async fn create_with_fallback<P: Panel + ?Sized>(
    panel: &P,
    request: &CreateUserRequest,
) -> Result<(PanelUser, CreateShape), CoreError> {
    match panel.create_user(request).await {
        Ok(user) => Ok((user, CreateShape::Full)),
        Err(first) => {
            debug!(username = %request.username, error = %first, "full create shape rejected, retrying minimal");
            let user = panel.create_user(&request.to_minimal()).await?;
            Ok((user, CreateShape::Minimal))
        }
    }
}

/// Read the user back (by uuid, short uuid, then username) for its link.
///
/// Falls back to the link in the create response, then to a placeholder.
async fn resolve_link<P: Panel + ?Sized>(panel: &P, name: &str, created: &PanelUser) -> AccessLink {
    if let Some(uuid) = created.uuid.as_deref().filter(|s| !s.is_empty()) {
        match panel.get_user_by_uuid(uuid).await {
            Ok(user) => {
                if let Some(link) = user.subscription_link() {
                    return AccessLink::Resolved(link.to_owned());
                }
            }
            Err(e) => debug!(username = name, uuid, error = %e, "lookup by uuid failed"),
        }
    }

    if let Some(short) = created.short_uuid.as_deref().filter(|s| !s.is_empty()) {
        match panel.get_user_by_short_uuid(short).await {
            Ok(user) => {
                if let Some(link) = user.subscription_link() {
                    return AccessLink::Resolved(link.to_owned());
                }
            }
            Err(e) => debug!(username = name, short_uuid = short, error = %e, "lookup by short uuid failed"),
        }
    }

    match panel.get_user_by_username(name).await {
        Ok(user) => {
            if let Some(link) = user.subscription_link() {
                return AccessLink::Resolved(link.to_owned());
            }
        }
        Err(e) => debug!(username = name, error = %e, "lookup by username failed"),
    }

    if let Some(link) = created.subscription_link() {
        return AccessLink::Resolved(link.to_owned());
    }

    warn!(username = name, "no subscription link could be resolved");
    AccessLink::Placeholder(name.to_owned())
}

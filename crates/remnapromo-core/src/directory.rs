// ── Remote user directory scan ──
//
// The panel only exposes a flat user list, so every tag query lists
// everything and groups client-side. A `Snapshot` is one such listing;
// stats and previews taken from the same snapshot always agree.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::CoreError;
use crate::model::{Credential, TagStats};
use crate::panel::Panel;
use crate::tag::TagCodec;

/// Fetch every user and convert it to a [`Credential`].
pub async fn list_all_credentials<P: Panel + ?Sized>(
    panel: &P,
) -> Result<Vec<Credential>, CoreError> {
    let users = panel.list_users().await?;
    Ok(users.into_iter().map(Credential::from).collect())
}

/// Group credentials by extracted tag and count them.
///
/// Names that do not follow the codec's convention are ignored.
pub fn aggregate<'a, C, I>(codec: &C, credentials: I) -> BTreeMap<String, TagStats>
where
    C: TagCodec + ?Sized,
    I: IntoIterator<Item = &'a Credential>,
{
    let mut stats: BTreeMap<String, TagStats> = BTreeMap::new();
    for credential in credentials {
        if let Some(tag) = codec.extract_tag(&credential.name) {
            stats.entry(tag).or_default().record(credential.usage());
        }
    }
    stats
}

/// One listing of the panel's users.
#[derive(Debug, Clone)]
pub struct Snapshot {
    credentials: Vec<Credential>,
    taken_at: DateTime<Utc>,
}

impl Snapshot {
    /// List the panel. A failed list call is an error, never an empty snapshot.
    pub async fn scan<P: Panel + ?Sized>(panel: &P) -> Result<Self, CoreError> {
        let credentials = list_all_credentials(panel).await?;
        debug!(count = credentials.len(), "directory scanned");
        Ok(Self::from_credentials(credentials))
    }

    pub fn from_credentials(credentials: Vec<Credential>) -> Self {
        Self {
            credentials,
            taken_at: Utc::now(),
        }
    }

    pub fn credentials(&self) -> &[Credential] {
        &self.credentials
    }

    pub fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }

    /// Counters for every tag present.
    pub fn tag_stats<C: TagCodec + ?Sized>(&self, codec: &C) -> BTreeMap<String, TagStats> {
        aggregate(codec, &self.credentials)
    }

    /// Counters for one tag; all zero when the tag is absent.
    pub fn tag_preview<C: TagCodec + ?Sized>(&self, codec: &C, tag: &str) -> TagStats {
        aggregate(codec, self.tagged(codec, tag))
            .remove(tag)
            .unwrap_or_default()
    }

    /// Credentials whose extracted tag equals `tag`.
    pub fn tagged<'a, C: TagCodec + ?Sized>(
        &'a self,
        codec: &'a C,
        tag: &'a str,
    ) -> impl Iterator<Item = &'a Credential> + 'a {
        self.credentials
            .iter()
            .filter(move |c| codec.extract_tag(&c.name).as_deref() == Some(tag))
    }
}

//! Mock implementations for unit testing without a real panel.
//!
//! Enabled with the `test-support` feature:
//!
//! ```toml
//! [dev-dependencies]
//! remnapromo-core = { path = "...", features = ["test-support"] }
//! ```

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use remnapromo_api::{CreateUserRequest, PanelUser, UserStatus};

use crate::artifact::{ArtifactRef, ArtifactWriter};
use crate::error::CoreError;
use crate::panel::Panel;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

fn rejected(message: impl Into<String>) -> CoreError {
    CoreError::Api {
        message: message.into(),
        code: None,
        status: Some(400),
    }
}

// ── MockPanel ────────────────────────────────────────────────────────

#[derive(Default)]
struct PanelState {
    users: Vec<PanelUser>,
    create_calls: Vec<CreateUserRequest>,
    lookups: Vec<String>,
    deleted: Vec<String>,
    /// Distinct usernames seen by `create_user`, in first-seen order.
    credential_order: Vec<String>,
    fail_credentials: HashSet<usize>,
    fail_deletes: HashSet<String>,
    reject_full_shape: bool,
    fail_list: bool,
    fail_lookups: bool,
    omit_links: bool,
    /// `(step, count)`: credential `i` waits `step * (count - i)` before answering.
    stagger: Option<(Duration, usize)>,
    next_id: usize,
}

/// In-memory panel that records every call.
///
/// Created users get `mock-<n>` / `short-mock-<n>` ids and a subscription link
/// unless [`omit_links`](Self::omit_links) is set.
#[derive(Clone, Default)]
pub struct MockPanel {
    state: Arc<Mutex<PanelState>>,
}

impl MockPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: impl IntoIterator<Item = PanelUser>) -> Self {
        let panel = Self::new();
        lock(&panel.state).users.extend(users);
        panel
    }

    /// Fail every create call for the n-th (0-based) credential of a batch.
    pub fn fail_credentials(&self, indices: impl IntoIterator<Item = usize>) {
        lock(&self.state).fail_credentials.extend(indices);
    }

    /// Reject create calls that carry the full parameter shape.
    pub fn reject_full_shape(&self) {
        lock(&self.state).reject_full_shape = true;
    }

    pub fn fail_list(&self) {
        lock(&self.state).fail_list = true;
    }

    pub fn fail_lookups(&self) {
        lock(&self.state).fail_lookups = true;
    }

    /// Create users without a subscription link.
    pub fn omit_links(&self) {
        lock(&self.state).omit_links = true;
    }

    /// Answer create calls for earlier credentials later than for later ones.
    pub fn stagger_creates(&self, step: Duration, count: usize) {
        lock(&self.state).stagger = Some((step, count));
    }

    /// Distinct usernames passed to `create_user`, in first-seen order.
    pub fn credential_order(&self) -> Vec<String> {
        lock(&self.state).credential_order.clone()
    }

    pub fn fail_delete(&self, uuid: impl Into<String>) {
        lock(&self.state).fail_deletes.insert(uuid.into());
    }

    pub fn create_calls(&self) -> Vec<CreateUserRequest> {
        lock(&self.state).create_calls.clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        lock(&self.state).deleted.clone()
    }

    /// Every lookup performed, as `uuid:<id>`, `short:<id>` or `name:<name>`.
    pub fn lookups(&self) -> Vec<String> {
        lock(&self.state).lookups.clone()
    }

    pub fn users(&self) -> Vec<PanelUser> {
        lock(&self.state).users.clone()
    }

    fn find(&self, key: String, pred: impl Fn(&PanelUser) -> bool) -> Result<PanelUser, CoreError> {
        let mut state = lock(&self.state);
        state.lookups.push(key.clone());
        if state.fail_lookups {
            return Err(CoreError::Api {
                message: "lookup unavailable".into(),
                code: None,
                status: Some(503),
            });
        }
        state
            .users
            .iter()
            .find(|u| pred(u))
            .cloned()
            .ok_or(CoreError::UserNotFound { identifier: key })
    }
}

/// A panel user for seeding a [`MockPanel`].
pub fn panel_user(uuid: &str, username: &str, status: UserStatus, quota: u64, used: u64) -> PanelUser {
    PanelUser {
        uuid: Some(uuid.to_owned()),
        short_uuid: Some(format!("short-{uuid}")),
        username: username.to_owned(),
        status,
        used_traffic_bytes: used,
        traffic_limit_bytes: quota,
        subscription_url: Some(format!("https://sub.example.com/{uuid}")),
        ..PanelUser::default()
    }
}

impl Panel for MockPanel {
    async fn list_users(&self) -> Result<Vec<PanelUser>, CoreError> {
        let state = lock(&self.state);
        if state.fail_list {
            return Err(CoreError::ConnectionFailed {
                url: "mock://panel".into(),
                reason: "connection refused".into(),
            });
        }
        Ok(state.users.clone())
    }

    async fn create_user(&self, request: &CreateUserRequest) -> Result<PanelUser, CoreError> {
        let (index, delay) = {
            let mut state = lock(&self.state);
            state.create_calls.push(request.clone());

            let seen = state
                .credential_order
                .iter()
                .position(|n| n == &request.username);
            let index = match seen {
                Some(i) => i,
                None => {
                    state.credential_order.push(request.username.clone());
                    state.credential_order.len() - 1
                }
            };
            let delay = state.stagger.map(|(step, count)| {
                step * u32::try_from(count.saturating_sub(index)).unwrap_or(u32::MAX)
            });
            (index, delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = lock(&self.state);

        if state.fail_credentials.contains(&index) {
            return Err(rejected(format!("create {} refused", request.username)));
        }
        if state.reject_full_shape && request.tag.is_some() {
            return Err(rejected("unknown field: tag"));
        }

        state.next_id += 1;
        let id = format!("mock-{}", state.next_id);
        let mut user = panel_user(
            &id,
            &request.username,
            UserStatus::Active,
            request.traffic_limit_bytes,
            0,
        );
        user.expire_at = Some(request.expire_at);
        user.tag.clone_from(&request.tag);
        if state.omit_links {
            user.subscription_url = None;
        }
        state.users.push(user.clone());
        Ok(user)
    }

    async fn get_user_by_uuid(&self, uuid: &str) -> Result<PanelUser, CoreError> {
        self.find(format!("uuid:{uuid}"), |u| u.uuid.as_deref() == Some(uuid))
    }

    async fn get_user_by_short_uuid(&self, short_uuid: &str) -> Result<PanelUser, CoreError> {
        self.find(format!("short:{short_uuid}"), |u| {
            u.short_uuid.as_deref() == Some(short_uuid)
        })
    }

    async fn get_user_by_username(&self, username: &str) -> Result<PanelUser, CoreError> {
        self.find(format!("name:{username}"), |u| u.username == username)
    }

    async fn delete_user(&self, uuid: &str) -> Result<(), CoreError> {
        let mut state = lock(&self.state);
        if state.fail_deletes.contains(uuid) {
            return Err(rejected(format!("delete {uuid} refused")));
        }
        state.users.retain(|u| u.uuid.as_deref() != Some(uuid));
        state.deleted.push(uuid.to_owned());
        Ok(())
    }
}

// ── MockArtifactWriter ───────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct WrittenListing {
    pub tag: String,
    pub created_at: DateTime<Utc>,
    pub links: Vec<String>,
}

/// Records listings instead of writing files; can be told to fail.
#[derive(Clone, Default)]
pub struct MockArtifactWriter {
    written: Arc<Mutex<Vec<WrittenListing>>>,
    fail: bool,
}

impl MockArtifactWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn written(&self) -> Vec<WrittenListing> {
        lock(&self.written).clone()
    }
}

impl ArtifactWriter for MockArtifactWriter {
    async fn write_listing(
        &self,
        tag: &str,
        created_at: DateTime<Utc>,
        links: &[String],
    ) -> Result<ArtifactRef, CoreError> {
        if self.fail {
            return Err(CoreError::Artifact {
                message: "disk full".into(),
            });
        }
        lock(&self.written).push(WrittenListing {
            tag: tag.to_owned(),
            created_at,
            links: links.to_vec(),
        });
        Ok(ArtifactRef {
            path: format!("/mock/promo_{tag}.txt").into(),
            url: None,
        })
    }
}

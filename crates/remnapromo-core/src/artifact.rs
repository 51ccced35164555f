// ── Listing artifacts ──
//
// Every provisioning batch writes a plain-text file listing its links:
//
//   # Promo Campaign: <tag>
//   # Created: <YYYY-mm-dd HH:MM:SS>
//   # Total subscriptions: <n>
//
//   # Subscription Links:
//
//   <one link per line>
//
// Where the file lands (and whether it is served over HTTP) is the writer's
// business; the provisioning routine only needs a reference back.

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::CoreError;

/// File name prefix shared by every listing artifact.
pub const ARTIFACT_PREFIX: &str = "promo_";

/// Where a listing ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactRef {
    pub path: PathBuf,
    /// Public link, when the writer knows how the directory is served.
    pub url: Option<String>,
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.url {
            Some(url) => f.write_str(url),
            None => write!(f, "{}", self.path.display()),
        }
    }
}

/// Durably stores the links of one provisioning batch.
pub trait ArtifactWriter: Send + Sync {
    fn write_listing(
        &self,
        tag: &str,
        created_at: DateTime<Utc>,
        links: &[String],
    ) -> impl Future<Output = Result<ArtifactRef, CoreError>> + Send;
}

/// `promo_<tag>_<YYYYmmdd_HHMMSS>.txt`
pub fn artifact_file_name(tag: &str, created_at: DateTime<Utc>) -> String {
    let local = created_at.with_timezone(&Local);
    format!(
        "{ARTIFACT_PREFIX}{tag}_{}.txt",
        local.format("%Y%m%d_%H%M%S")
    )
}

/// Render the listing body.
pub fn render_listing(tag: &str, created_at: DateTime<Utc>, links: &[String]) -> String {
    let local = created_at.with_timezone(&Local);
    let mut lines = vec![
        format!("# Promo Campaign: {tag}"),
        format!("# Created: {}", local.format("%Y-%m-%d %H:%M:%S")),
        format!("# Total subscriptions: {}", links.len()),
        String::new(),
        "# Subscription Links:".to_owned(),
        String::new(),
    ];
    lines.extend(links.iter().cloned());
    lines.join("\n")
}

// ── File-backed writer ───────────────────────────────────────────────

/// Writes listings to the first usable directory of a fallback chain.
#[derive(Debug, Clone)]
pub struct FileArtifactWriter {
    dirs: Vec<PathBuf>,
    public_base_url: Option<Url>,
}

impl FileArtifactWriter {
    /// `dirs` are tried in order; at least one should be writable.
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self {
            dirs,
            public_base_url: None,
        }
    }

    /// `primary` first, then the system temp dir and the working directory.
    pub fn with_fallbacks(primary: PathBuf) -> Self {
        let mut dirs = vec![primary, std::env::temp_dir().join("remnapromo")];
        if let Ok(cwd) = std::env::current_dir() {
            dirs.push(cwd.join("subscription_files"));
        }
        Self::new(dirs)
    }

    /// Links become `<base>/<file name>` instead of a local path.
    pub fn with_public_base_url(mut self, base: Option<Url>) -> Self {
        self.public_base_url = base.map(|mut url| {
            if !url.path().ends_with('/') {
                let path = format!("{}/", url.path());
                url.set_path(&path);
            }
            url
        });
        self
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    fn public_url(&self, file_name: &str) -> Option<String> {
        let base = self.public_base_url.as_ref()?;
        base.join(file_name).ok().map(String::from)
    }

    async fn write_into(dir: &Path, file_name: &str, body: &str) -> std::io::Result<PathBuf> {
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(file_name);
        tokio::fs::write(&path, body).await?;

        let written = tokio::fs::metadata(&path).await?.len();
        if written != u64::try_from(body.len()).unwrap_or(u64::MAX) {
            return Err(std::io::Error::other(format!(
                "short write: {written} of {} bytes",
                body.len()
            )));
        }
        Ok(path)
    }

    /// Delete listing artifacts older than `days` from every directory.
    ///
    /// Returns how many files were removed. Missing directories are skipped.
    pub async fn cleanup_older_than(&self, days: u32) -> Result<usize, CoreError> {
        let cutoff = SystemTime::now()
            .checked_sub(Duration::from_secs(u64::from(days) * 24 * 60 * 60))
            .unwrap_or(SystemTime::UNIX_EPOCH);

        let mut removed = 0;
        for dir in &self.dirs {
            removed += Self::cleanup_dir(dir, cutoff).await?;
        }
        if removed > 0 {
            info!(removed, days, "cleaned up old listing artifacts");
        }
        Ok(removed)
    }

    async fn cleanup_dir(dir: &Path, cutoff: SystemTime) -> Result<usize, CoreError> {
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => {
                return Err(CoreError::Artifact {
                    message: format!("cannot read {}: {e}", dir.display()),
                });
            }
        };

        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await.map_err(|e| CoreError::Artifact {
            message: format!("cannot read {}: {e}", dir.display()),
        })? {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if !name.starts_with(ARTIFACT_PREFIX) || !name.ends_with(".txt") {
                continue;
            }

            let Ok(meta) = entry.metadata().await else {
                continue;
            };
            let stale = meta.is_file() && meta.modified().is_ok_and(|m| m < cutoff);
            if !stale {
                continue;
            }

            match tokio::fs::remove_file(entry.path()).await {
                Ok(()) => {
                    debug!(file = %name, "removed stale artifact");
                    removed += 1;
                }
                Err(e) => warn!(file = %name, error = %e, "could not remove stale artifact"),
            }
        }
        Ok(removed)
    }
}

impl ArtifactWriter for FileArtifactWriter {
    async fn write_listing(
        &self,
        tag: &str,
        created_at: DateTime<Utc>,
        links: &[String],
    ) -> Result<ArtifactRef, CoreError> {
        let file_name = artifact_file_name(tag, created_at);
        let body = render_listing(tag, created_at, links);

        let mut last_error = None;
        for dir in &self.dirs {
            match Self::write_into(dir, &file_name, &body).await {
                Ok(path) => {
                    info!(path = %path.display(), count = links.len(), "saved listing artifact");
                    return Ok(ArtifactRef {
                        url: self.public_url(&file_name),
                        path,
                    });
                }
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "artifact directory unusable, trying next");
                    last_error = Some(e);
                }
            }
        }

        Err(CoreError::Artifact {
            message: last_error.map_or_else(
                || "no artifact directory configured".into(),
                |e| e.to_string(),
            ),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn links() -> Vec<String> {
        vec![
            "https://sub.example.com/a".to_owned(),
            "https://sub.example.com/b".to_owned(),
        ]
    }

    #[test]
    fn listing_has_header_then_links() {
        let body = render_listing("summer", Utc::now(), &links());
        let lines: Vec<&str> = body.lines().collect();

        assert_eq!(lines[0], "# Promo Campaign: summer");
        assert!(lines[1].starts_with("# Created: "));
        assert_eq!(lines[2], "# Total subscriptions: 2");
        assert_eq!(lines[3], "");
        assert_eq!(lines[4], "# Subscription Links:");
        assert_eq!(lines[5], "");
        assert_eq!(&lines[6..], &["https://sub.example.com/a", "https://sub.example.com/b"]);
    }

    #[test]
    fn file_name_carries_tag_and_timestamp() {
        let name = artifact_file_name("black-friday", Utc::now());
        assert!(name.starts_with("promo_black-friday_"));
        assert!(name.ends_with(".txt"));
        // promo_ + tag + _ + YYYYmmdd_HHMMSS + .txt
        assert_eq!(name.len(), "promo_black-friday_".len() + 15 + 4);
    }

    #[tokio::test]
    async fn writes_to_first_usable_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("not-a-dir");
        std::fs::write(&blocker, "x").unwrap();
        let good = tmp.path().join("artifacts");

        let writer = FileArtifactWriter::new(vec![blocker.join("nested"), good.clone()]);
        let artifact = writer
            .write_listing("summer", Utc::now(), &links())
            .await
            .unwrap();

        assert!(artifact.path.starts_with(&good));
        assert_eq!(artifact.url, None);
        let body = std::fs::read_to_string(&artifact.path).unwrap();
        assert!(body.ends_with("https://sub.example.com/b"));
    }

    #[tokio::test]
    async fn public_base_url_turns_file_into_link() {
        let tmp = tempfile::tempdir().unwrap();
        let writer = FileArtifactWriter::new(vec![tmp.path().to_path_buf()])
            .with_public_base_url(Some(Url::parse("https://files.example.com/promo").unwrap()));

        let artifact = writer.write_listing("winter", Utc::now(), &links()).await.unwrap();
        let url = artifact.url.clone().unwrap();

        assert!(url.starts_with("https://files.example.com/promo/promo_winter_"));
        assert_eq!(artifact.to_string(), url);
    }

    #[tokio::test]
    async fn fails_when_no_directory_is_usable() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("file");
        std::fs::write(&blocker, "x").unwrap();

        let writer = FileArtifactWriter::new(vec![blocker.join("sub")]);
        let err = writer
            .write_listing("summer", Utc::now(), &links())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Artifact { .. }));
    }

    #[tokio::test]
    async fn cleanup_removes_only_stale_artifacts() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path();

        let stale = dir.join("promo_old_20200101_000000.txt");
        let fresh = dir.join("promo_new_20990101_000000.txt");
        let unrelated = dir.join("notes.txt");
        for path in [&stale, &fresh, &unrelated] {
            std::fs::write(path, "x").unwrap();
        }
        let ten_days_ago = SystemTime::now() - Duration::from_secs(10 * 24 * 60 * 60);
        for path in [&stale, &unrelated] {
            std::fs::File::options()
                .write(true)
                .open(path)
                .unwrap()
                .set_modified(ten_days_ago)
                .unwrap();
        }

        let writer = FileArtifactWriter::new(vec![dir.to_path_buf(), dir.join("missing")]);
        let removed = writer.cleanup_older_than(7).await.unwrap();

        assert_eq!(removed, 1);
        assert!(!stale.exists());
        assert!(fresh.exists());
        assert!(unrelated.exists());
    }
}

use futures_util::StreamExt;
use futures_util::stream;
use tracing::{info, warn};

use crate::directory::Snapshot;
use crate::model::{RetireReport, UsageState};
use crate::panel::Panel;
use crate::tag::TagCodec;

/// Delete every used credential carrying `tag`.
///
/// Never fails: a failed scan yields a zero report with `scan_error` set, and
/// each delete is isolated from the others. Active credentials are never
/// passed to the panel's delete call.
pub async fn retire_used<P, C>(panel: &P, codec: &C, tag: &str, concurrency: usize) -> RetireReport
where
    P: Panel + ?Sized,
    C: TagCodec + ?Sized,
{
    let mut report = RetireReport {
        tag: tag.to_owned(),
        ..RetireReport::default()
    };

    let snapshot = match Snapshot::scan(panel).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!(tag, error = %e, "directory scan failed, nothing retired");
            report.scan_error = Some(e.to_string());
            return report;
        }
    };

    let mut targets = Vec::new();
    for credential in snapshot.tagged(codec, tag) {
        report.total += 1;
        if credential.usage() == UsageState::Active {
            continue;
        }
        report.used += 1;
        match credential.id.as_deref() {
            Some(id) => targets.push((id, credential.name.as_str())),
            None => {
                warn!(username = %credential.name, "used credential has no id, skipping");
                report.skipped += 1;
            }
        }
    }

    let results: Vec<bool> = stream::iter(targets)
        .map(|(id, name)| async move {
            match panel.delete_user(id).await {
                Ok(()) => true,
                Err(e) => {
                    warn!(username = name, uuid = id, error = %e, "delete failed");
                    false
                }
            }
        })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    for deleted in results {
        if deleted {
            report.deleted += 1;
        } else {
            report.failed += 1;
        }
    }

    info!(
        tag,
        total = report.total,
        used = report.used,
        deleted = report.deleted,
        "retirement finished"
    );
    report
}

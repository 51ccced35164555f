//! Retirement: delete the used subscriptions of a campaign.

use remnapromo_core::{CampaignService, CampaignSummary, Panel, RetireReport};

use crate::cli::{GlobalOpts, RetireArgs};
use crate::error::CliError;
use crate::output;

use super::{preview, util};

fn detail(report: &RetireReport) -> String {
    let (deleted, total) = report.counts();
    let mut lines = vec![format!(
        "Deleted {} of {total} subscription(s) in campaign '{}'",
        output::ok(&deleted.to_string()),
        report.tag
    )];
    if report.skipped > 0 {
        lines.push(format!("Skipped:  {} (no panel id)", report.skipped));
    }
    if report.failed > 0 {
        lines.push(format!(
            "Failed:   {}",
            output::bad(&report.failed.to_string())
        ));
    }
    lines.join("\n")
}

fn plain(report: &RetireReport) -> String {
    let (deleted, total) = report.counts();
    format!("{deleted}\t{total}")
}

pub async fn handle<P: Panel>(
    service: &CampaignService<P>,
    args: RetireArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let stats = service.tag_preview(&args.tag).await?;
    if !global.quiet {
        let summary = CampaignSummary {
            tag: args.tag.clone(),
            stats,
        };
        eprintln!("{}\n", preview::detail(&summary));
    }

    if stats.used > 0 {
        let prompt = format!(
            "Delete {} used subscription(s) from campaign '{}'?",
            stats.used, args.tag
        );
        if !util::confirm(&prompt, "retire", global.yes)? {
            return Ok(());
        }
    }

    let mut report = service.retire_used(&args.tag).await;
    if let Some(reason) = report.scan_error.take() {
        return Err(CliError::ScanFailed {
            tag: report.tag,
            reason,
        });
    }

    let out = output::render_single(global.format(), &report, detail, plain);
    output::print_output(&out, global.quiet);
    Ok(())
}

//! Counters of a single campaign.

use remnapromo_core::{CampaignService, CampaignSummary, Panel};

use crate::cli::{GlobalOpts, PreviewArgs};
use crate::error::CliError;
use crate::output;

pub(crate) fn detail(summary: &CampaignSummary) -> String {
    if summary.stats.is_empty() {
        return format!("No subscriptions found for campaign '{}'.", summary.tag);
    }
    [
        format!("Campaign: {}", output::bold(&summary.tag)),
        format!("Total:    {}", summary.stats.total),
        format!("Active:   {}", output::ok(&summary.stats.active.to_string())),
        format!("Used:     {}", output::warn(&summary.stats.used.to_string())),
    ]
    .join("\n")
}

fn plain(summary: &CampaignSummary) -> String {
    format!(
        "{}\t{}\t{}",
        summary.stats.total, summary.stats.active, summary.stats.used
    )
}

pub async fn handle<P: Panel>(
    service: &CampaignService<P>,
    args: PreviewArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let stats = service.tag_preview(&args.tag).await?;
    let summary = CampaignSummary {
        tag: args.tag,
        stats,
    };
    let out = output::render_single(global.format(), &summary, detail, plain);
    output::print_output(&out, global.quiet);
    Ok(())
}

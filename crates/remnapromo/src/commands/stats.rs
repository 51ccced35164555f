//! Campaign statistics: every tag with its counters plus a totals row.

use serde::Serialize;
use tabled::Tabled;

use remnapromo_core::{CampaignService, CampaignSummary, Panel, TagStats};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct StatsRow {
    #[tabled(rename = "Campaign")]
    tag: String,
    #[tabled(rename = "Total")]
    total: u64,
    #[tabled(rename = "Active")]
    active: u64,
    #[tabled(rename = "Used")]
    used: u64,
}

impl StatsRow {
    fn new(tag: &str, stats: TagStats) -> Self {
        Self {
            tag: tag.to_owned(),
            total: stats.total,
            active: stats.active,
            used: stats.used,
        }
    }
}

#[derive(Serialize)]
struct StatsView {
    campaigns: Vec<CampaignSummary>,
    totals: TagStats,
}

impl StatsView {
    fn new(campaigns: Vec<CampaignSummary>) -> Self {
        let mut totals = TagStats::default();
        for campaign in &campaigns {
            totals += campaign.stats;
        }
        Self { campaigns, totals }
    }
}

fn detail(view: &StatsView) -> String {
    if view.campaigns.is_empty() {
        return "No promo campaigns found.".into();
    }
    let mut rows: Vec<StatsRow> = view
        .campaigns
        .iter()
        .map(|c| StatsRow::new(&c.tag, c.stats))
        .collect();
    rows.push(StatsRow::new("TOTAL", view.totals));
    output::render_table(&rows)
}

fn plain(view: &StatsView) -> String {
    view.campaigns
        .iter()
        .map(|c| format!("{}\t{}\t{}\t{}", c.tag, c.stats.total, c.stats.active, c.stats.used))
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle<P: Panel>(
    service: &CampaignService<P>,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let view = StatsView::new(service.campaigns().await?);
    let out = output::render_single(global.format(), &view, detail, plain);
    output::print_output(&out, global.quiet);
    Ok(())
}

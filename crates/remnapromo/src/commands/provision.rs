//! Bulk provisioning: create a batch of tagged subscriptions.

use std::fmt::Write as _;

use remnapromo_core::{CampaignService, Panel, ProvisionReport, ProvisionRequest};

use crate::cli::{GlobalOpts, ProvisionArgs};
use crate::error::CliError;
use crate::output;

use super::util;

fn detail(report: &ProvisionReport) -> String {
    let mut out = String::new();
    let created = report.created();

    let _ = writeln!(out, "Campaign: {}", output::bold(&report.tag));
    let _ = writeln!(
        out,
        "Quota:    {} per subscription",
        util::format_bytes(report.quota_bytes)
    );
    let _ = writeln!(
        out,
        "Expires:  {}",
        report.expires_at.format("%Y-%m-%d %H:%M UTC")
    );

    let tally = format!("{created}/{}", report.requested);
    let tally = if created == usize::try_from(report.requested).unwrap_or(usize::MAX) {
        output::ok(&tally)
    } else {
        output::warn(&tally)
    };
    let _ = writeln!(out, "Created:  {tally}");

    if report.failed() > 0 {
        let _ = writeln!(out, "Failed:   {}", output::bad(&report.failed().to_string()));
    }
    if report.placeholders() > 0 {
        let _ = writeln!(
            out,
            "No link:  {} (created, but the panel returned no subscription URL)",
            report.placeholders()
        );
    }
    match report.artifact {
        Some(ref artifact) => {
            let _ = writeln!(out, "Listing:  {artifact}");
        }
        None if created > 0 => {
            let _ = writeln!(out, "Listing:  {}", output::warn("not written"));
        }
        None => {}
    }

    let links = report.links();
    if !links.is_empty() {
        let _ = writeln!(out, "\nSubscription links:");
        for link in &links {
            let _ = writeln!(out, "  {link}");
        }
    }

    out.trim_end().to_owned()
}

fn plain(report: &ProvisionReport) -> String {
    report.links().join("\n")
}

/// Run a validated batch and print its report. Shared with the wizard.
pub async fn run<P: Panel>(
    service: &CampaignService<P>,
    request: &ProvisionRequest,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let request = service.validate(request)?;

    let bar = util::spinner(
        global,
        format!(
            "Creating {} subscription(s) for {}",
            request.count, request.tag
        ),
    );
    let report = service.provision(&request).await;
    bar.finish_and_clear();
    let report = report?;

    let out = output::render_single(global.format(), &report, detail, plain);
    output::print_output(&out, global.quiet);

    if report.created() == 0 {
        return Err(CliError::NothingCreated {
            tag: report.tag,
            requested: report.requested,
        });
    }
    Ok(())
}

pub async fn handle<P: Panel>(
    service: &CampaignService<P>,
    args: ProvisionArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let request = ProvisionRequest {
        tag: args.tag,
        traffic_gb: args.traffic_gb,
        count: args.count,
    };
    run(service, &request, global).await
}

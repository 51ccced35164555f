//! Interactive campaign creation.
//!
//! Each answer goes through `CampaignWizard`, which owns validation and the
//! per-operator draft. A rejected answer re-asks the same question.

use dialoguer::{Input, Select};

use remnapromo_config::Config;
use remnapromo_core::{
    CampaignService, CampaignWizard, CoreError, MemorySessionStore, OperatorId, Panel,
    ProvisionRequest, WizardPrompt,
};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::{provision, util};

type Wizard = CampaignWizard<MemorySessionStore>;

enum Step {
    Ask(WizardPrompt),
    Confirmed,
    Cancelled,
}

/// Keep the current question when the answer was rejected as invalid.
fn or_retry(answer: Result<WizardPrompt, CoreError>, current: WizardPrompt) -> Result<Step, CliError> {
    match answer {
        Ok(next) => Ok(Step::Ask(next)),
        Err(e) if e.is_validation() => {
            eprintln!("  {}", output::warn(&e.to_string()));
            Ok(Step::Ask(current))
        }
        Err(e) => Err(e.into()),
    }
}

fn ask(wizard: &Wizard, operator: OperatorId, prompt: WizardPrompt, yes: bool) -> Result<Step, CliError> {
    match prompt {
        WizardPrompt::AskTag => {
            let raw: String = Input::new()
                .with_prompt("Campaign tag (letters, digits, _ and -)")
                .interact_text()
                .map_err(util::prompt_err)?;
            or_retry(wizard.submit_tag(operator, &raw), WizardPrompt::AskTag)
        }

        WizardPrompt::AskTraffic { tag, presets } => {
            if presets.is_empty() {
                return Err(CliError::Validation {
                    field: "campaign.traffic_presets_gb".into(),
                    reason: "no traffic presets configured".into(),
                });
            }
            let items: Vec<String> = presets.iter().map(|gb| format!("{gb} GB")).collect();
            let choice = Select::new()
                .with_prompt(format!("Traffic per subscription for {tag}"))
                .items(&items)
                .default(0)
                .interact()
                .map_err(util::prompt_err)?;
            let gb = presets.get(choice).copied().unwrap_or_default();
            or_retry(
                wizard.choose_traffic(operator, gb),
                WizardPrompt::AskTraffic { tag, presets },
            )
        }

        WizardPrompt::AskCount {
            tag,
            traffic_gb,
            max,
        } => {
            let raw: String = Input::new()
                .with_prompt(format!("How many subscriptions (1-{max})"))
                .interact_text()
                .map_err(util::prompt_err)?;
            or_retry(
                wizard.submit_count(operator, &raw),
                WizardPrompt::AskCount {
                    tag,
                    traffic_gb,
                    max,
                },
            )
        }

        WizardPrompt::Confirm(request) => {
            eprintln!(
                "\n  Campaign: {}\n  Traffic:  {} GB each\n  Count:    {}\n",
                output::bold(&request.tag),
                request.traffic_gb,
                request.count
            );
            if util::confirm("Create these subscriptions?", "wizard", yes)? {
                Ok(Step::Confirmed)
            } else {
                Ok(Step::Cancelled)
            }
        }
    }
}

/// Walk the questions until the draft is confirmed. `None` means cancelled.
fn converse(
    wizard: &Wizard,
    operator: OperatorId,
    yes: bool,
) -> Result<Option<ProvisionRequest>, CliError> {
    let mut prompt = wizard.start(operator)?;
    loop {
        match ask(wizard, operator, prompt, yes)? {
            Step::Ask(next) => prompt = next,
            Step::Confirmed => return Ok(Some(wizard.confirm(operator)?)),
            Step::Cancelled => return Ok(None),
        }
    }
}

pub async fn handle<P: Panel>(
    service: &CampaignService<P>,
    cfg: &Config,
    operator: OperatorId,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let wizard = CampaignWizard::new(
        MemorySessionStore::new(),
        cfg.access_policy(),
        service.policy().clone(),
    );

    // Drop any draft left behind by a cancelled or failed conversation.
    let outcome = converse(&wizard, operator, global.yes);
    wizard.cancel(operator);

    match outcome? {
        Some(request) => provision::run(service, &request, global).await,
        None => {
            if !global.quiet {
                eprintln!("Campaign cancelled.");
            }
            Ok(())
        }
    }
}

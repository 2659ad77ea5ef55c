use super::cores::load_region;
use crate::AccountArgs;
use crate::backend::Backend;
use anyhow::Context;
use apgate_cloud::{CloudError, SelectableOption};
use apgate_config::WorkflowConfig;
use apgate_core::Reconciliation;
use colored::Colorize;

pub async fn handle(
    backend: &Backend,
    config: &WorkflowConfig,
    account: &AccountArgs,
    region: &str,
    core: &str,
) -> anyhow::Result<()> {
    let mut workflow = backend.workflow(account.account_ref(), config)?;
    load_region(&mut workflow, region).await?;

    let verdict = workflow.select_core(&SelectableOption::plain(core))?;
    println!("{} {}", "Verdict:".bold(), verdict.label().cyan());

    match verdict {
        Reconciliation::Reuse(access_point) => {
            println!(
                "{} {} ({})",
                "✓ Reusing access point".green(),
                access_point.id.as_deref().unwrap_or("-").cyan(),
                access_point.name
            );
            let configuration = workflow.aggregate().config();
            println!("{}", serde_json::to_string_pretty(configuration)?);
            Ok(())
        }
        Reconciliation::RequiresCreation { core, seed } => {
            println!(
                "{} {}",
                "No access point wraps".yellow(),
                core.name().cyan()
            );
            println!("{}", "Seed configuration for the create flow:".dimmed());
            println!("{}", serde_json::to_string_pretty(&seed)?);
            Ok(())
        }
        Reconciliation::Invalid(reason) => Err(CloudError::ReconciliationInvalid(reason))
            .with_context(|| format!("Core '{}' was rejected", core)),
    }
}

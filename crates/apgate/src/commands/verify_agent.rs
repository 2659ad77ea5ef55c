use crate::AccountArgs;
use crate::backend::Backend;
use apgate_config::WorkflowConfig;
use apgate_core::PollOutcome;
use colored::Colorize;

pub async fn handle(
    backend: &Backend,
    config: &WorkflowConfig,
    account: &AccountArgs,
    rule: &str,
    units: u32,
) -> anyhow::Result<()> {
    let workflow = backend.workflow(account.account_ref(), config)?;
    println!(
        "{} {} ({} unit(s))",
        "Waiting for agents of rule".blue(),
        rule.cyan(),
        units.max(1)
    );

    let outcome = workflow.verify_agent(rule, units).await?;
    match &outcome {
        PollOutcome::Succeeded => {
            println!("{}", "✓ All agents reported in".green().bold());
        }
        other => {
            println!("{} {}", "✗ Agent verification".red(), other);
        }
    }
    outcome.into_result()?;
    Ok(())
}

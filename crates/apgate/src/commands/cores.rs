use super::select_value;
use crate::AccountArgs;
use crate::backend::Backend;
use apgate_cloud::{AccessPointCore, FieldId};
use apgate_config::WorkflowConfig;
use apgate_core::{CoreOption, GatewayWorkflow};
use colored::Colorize;

/// Select `region` and load the access points and cores listed there
pub(super) async fn load_region(
    workflow: &mut GatewayWorkflow,
    region: &str,
) -> anyhow::Result<Vec<CoreOption>> {
    workflow.start().await;
    select_value(workflow, FieldId::Region, region).await?;
    workflow.refresh_access_points().await?;
    workflow.refresh_cores().await?;
    Ok(workflow.core_options())
}

pub async fn handle(
    backend: &Backend,
    config: &WorkflowConfig,
    account: &AccountArgs,
    region: &str,
) -> anyhow::Result<()> {
    let mut workflow = backend.workflow(account.account_ref(), config)?;
    println!(
        "{} {}",
        "Listing core resources in".blue(),
        region.cyan()
    );
    let options = load_region(&mut workflow, region).await?;

    println!();
    if options.is_empty() {
        println!("{}", "No core resources found".dimmed());
        return Ok(());
    }

    println!(
        "{}",
        format!(
            "{:<20} {:<12} {:<16} {}",
            "NAME", "STATE", "ACCESS POINT", "ID"
        )
        .bold()
    );
    println!("{}", "─".repeat(90).dimmed());

    for option in &options {
        let state = match &option.core {
            AccessPointCore::Provisioned(_) => "provisioned",
            AccessPointCore::Submitted { .. } => "submitted",
            AccessPointCore::Unknown { .. } => "unknown",
        };
        let linked = match &option.linked {
            Some(ap) if option.errored => format!(
                "{} ({})",
                ap.id.as_deref().unwrap_or("-"),
                ap.status
            )
            .red()
            .to_string(),
            Some(ap) => format!("{} ({})", ap.id.as_deref().unwrap_or("-"), ap.status)
                .green()
                .to_string(),
            None => "-".dimmed().to_string(),
        };
        println!(
            "{:<20} {:<12} {:<16} {}",
            option.core.name().cyan(),
            state,
            linked,
            option.core.selection_value()
        );
    }

    let errored = options.iter().filter(|o| o.errored).count();
    if errored > 0 {
        println!();
        println!(
            "{}",
            format!("{} core(s) are wrapped by an errored access point", errored).yellow()
        );
    }
    Ok(())
}

pub mod cores;
pub mod options;
pub mod provision;
pub mod reconcile;
pub mod verify_agent;

use crate::AccountArgs;
use apgate_cloud::{CloudAccountRef, FieldId};
use apgate_core::{CascadeResolver, FieldStatus, GatewayWorkflow};
use colored::Colorize;

impl AccountArgs {
    pub fn account_ref(&self) -> CloudAccountRef {
        CloudAccountRef::new(&self.account, self.provider)
    }
}

/// Parse `field=value`
pub fn parse_assignment(raw: &str) -> anyhow::Result<(FieldId, String)> {
    let (field, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow::anyhow!("Expected FIELD=VALUE, got '{}'", raw))?;
    let value = value.trim();
    if value.is_empty() {
        anyhow::bail!("No value given for '{}'", field);
    }
    Ok((field.parse()?, value.to_string()))
}

/// Select `value` for `field`, failing if the cascade cannot offer it
pub async fn select_value(
    workflow: &mut GatewayWorkflow,
    field: FieldId,
    value: &str,
) -> anyhow::Result<()> {
    let Some(selection) = workflow.cascade().selection(field) else {
        anyhow::bail!(
            "{} has no '{}' field",
            workflow.adapter().display_name(),
            field
        );
    };
    if selection.status == FieldStatus::Error {
        anyhow::bail!(
            "Options for {} could not be loaded: {}",
            field,
            selection.error.as_deref().unwrap_or("unknown error")
        );
    }
    workflow.select(field, Some(value.to_string())).await?;
    Ok(())
}

pub fn print_cascade(cascade: &CascadeResolver) {
    println!(
        "{}",
        format!("{:<16} {:<8} {:<28} {}", "FIELD", "STATUS", "VALUE", "OPTIONS").bold()
    );
    println!("{}", "─".repeat(80).dimmed());

    for selection in cascade.selections() {
        let status = match selection.status {
            FieldStatus::Loaded => selection.status.to_string().green(),
            FieldStatus::Error => selection.status.to_string().red(),
            FieldStatus::Loading => selection.status.to_string().yellow(),
            FieldStatus::Idle => selection.status.to_string().dimmed(),
        };
        let value = selection.value.as_deref().unwrap_or("-");
        let options = if let Some(error) = &selection.error {
            error.red().to_string()
        } else if selection.status == FieldStatus::Idle {
            "waiting for upstream selection".dimmed().to_string()
        } else if selection.options.is_empty() {
            "(none)".dimmed().to_string()
        } else {
            selection
                .options
                .iter()
                .map(|o| o.value.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        };
        println!(
            "{:<16} {:<8} {:<28} {}",
            selection.field_id.to_string().cyan(),
            status,
            value,
            options
        );
    }
}

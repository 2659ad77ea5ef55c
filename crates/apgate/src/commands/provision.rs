use crate::AccountArgs;
use crate::backend::Backend;
use apgate_cloud::{FieldId, ParentSelections};
use apgate_config::WorkflowConfig;
use apgate_core::{GatewayWorkflow, ProvisioningReport};
use clap::Args;
use colored::Colorize;

#[derive(Args)]
pub struct ProvisionArgs {
    #[command(flatten)]
    pub account: AccountArgs,
    /// Access point name
    #[arg(short, long)]
    pub name: String,
    #[arg(short, long)]
    pub region: String,
    #[arg(long)]
    pub vpc: Option<String>,
    /// Subnet id (repeatable)
    #[arg(long = "subnet")]
    pub subnets: Vec<String>,
    /// Security group id (repeatable)
    #[arg(long = "security-group")]
    pub security_groups: Vec<String>,
    #[arg(long)]
    pub certificate: Option<String>,
    #[arg(long)]
    pub hosted_zone: Option<String>,
    #[arg(long)]
    pub host_name: Option<String>,
    #[arg(long)]
    pub resource_group: Option<String>,
    #[arg(long)]
    pub zone: Option<String>,
    #[arg(long)]
    pub public_ip: Option<String>,
    /// Import this existing load balancer instead of creating one
    #[arg(long)]
    pub core: Option<String>,
    /// Expected number of units; scales the timeout
    #[arg(long, default_value_t = 1)]
    pub units: u32,
    /// Edit the access point with this id instead of creating one
    #[arg(long, value_name = "ID")]
    pub edit: Option<String>,
}

impl ProvisionArgs {
    /// Values for the cascade, one per field
    fn selections(&self) -> ParentSelections {
        let mut values = ParentSelections::new();
        values.insert(FieldId::Region, self.region.clone());
        let single = [
            (FieldId::Vpc, self.vpc.as_ref()),
            (FieldId::Subnet, self.subnets.first()),
            (FieldId::SecurityGroup, self.security_groups.first()),
            (FieldId::Certificate, self.certificate.as_ref()),
            (FieldId::HostedZone, self.hosted_zone.as_ref()),
            (FieldId::ResourceGroup, self.resource_group.as_ref()),
            (FieldId::Zone, self.zone.as_ref()),
            (FieldId::PublicIp, self.public_ip.as_ref()),
        ];
        for (field, value) in single {
            if let Some(value) = value {
                values.insert(field, value.clone());
            }
        }
        values
    }
}

/// Fail when the cascade dropped or cannot offer a requested value
fn check_selections(
    workflow: &GatewayWorkflow,
    args: &ProvisionArgs,
    requested: &ParentSelections,
) -> anyhow::Result<()> {
    let cascade = workflow.cascade();
    for (field, value) in requested {
        let Some(selection) = cascade.selection(*field) else {
            anyhow::bail!(
                "{} access points have no {} field",
                workflow.adapter().display_name(),
                field
            );
        };
        if let Some(error) = &selection.error {
            anyhow::bail!("Options for {} could not be loaded: {}", field, error);
        }
        if selection.value.as_deref() != Some(value.as_str()) {
            anyhow::bail!("'{}' is not an available {}", value, field);
        }
    }

    let extra = [
        (FieldId::Subnet, &args.subnets),
        (FieldId::SecurityGroup, &args.security_groups),
    ];
    for (field, values) in extra {
        if let Some(selection) = cascade.selection(field) {
            if let Some(missing) = values.iter().find(|v| !selection.has_option(v)) {
                anyhow::bail!("'{}' is not an available {}", missing, field);
            }
        }
    }
    Ok(())
}

fn print_report(report: &ProvisioningReport) {
    println!();
    println!(
        "{:<14} {}",
        "ACCESS POINT".bold(),
        report.access_point_id.cyan()
    );
    if let Some(ap) = &report.access_point {
        println!("{:<14} {}", "NAME".bold(), ap.name);
        println!("{:<14} {}", "STATUS".bold(), ap.status);
        if !ap.host_name.is_empty() {
            println!("{:<14} {}", "HOST".bold(), ap.host_name);
        }
    }
    println!("{:<14} {}", "OUTCOME".bold(), report.outcome);
}

pub async fn handle(
    backend: &Backend,
    config: &WorkflowConfig,
    args: &ProvisionArgs,
) -> anyhow::Result<()> {
    let mut workflow = backend.workflow(args.account.account_ref(), config)?;

    let requested = args.selections();
    workflow.preset(&requested).await;
    check_selections(&workflow, args, &requested)?;

    let mut ap_config = workflow.draft_config(&args.name);
    if !args.subnets.is_empty() {
        ap_config.subnets = args.subnets.clone();
    }
    if !args.security_groups.is_empty() {
        ap_config.security_groups = args.security_groups.clone();
    }
    ap_config.host_name = args.host_name.clone();
    ap_config.core_id = args.core.clone();

    let report = match &args.edit {
        Some(id) => {
            println!(
                "{} {} ({})",
                "Editing access point".blue(),
                id.cyan(),
                args.name
            );
            workflow
                .edit_access_point(id, &ap_config, args.units)
                .await?
        }
        None => {
            println!(
                "{} {}",
                "Creating access point".blue(),
                args.name.cyan()
            );
            workflow.create_access_point(&ap_config, args.units).await?
        }
    };

    print_report(&report);
    report.outcome.clone().into_result()?;

    println!();
    println!("{}", "✓ Access point is ready".green().bold());
    if let Ok(rule) = workflow.aggregate().to_rule_payload() {
        println!("{}", serde_json::to_string_pretty(&rule)?);
    }
    Ok(())
}

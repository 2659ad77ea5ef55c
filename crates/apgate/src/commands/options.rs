use super::{parse_assignment, print_cascade, select_value};
use crate::AccountArgs;
use crate::backend::Backend;
use apgate_cloud::FieldId;
use apgate_config::WorkflowConfig;
use apgate_core::GatewayWorkflow;
use colored::Colorize;
use tokio::io::{AsyncBufReadExt, BufReader};

pub async fn handle(
    backend: &Backend,
    config: &WorkflowConfig,
    account: &AccountArgs,
    selections: &[String],
    follow: Option<FieldId>,
) -> anyhow::Result<()> {
    let assignments = selections
        .iter()
        .map(|raw| parse_assignment(raw))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let mut workflow = backend.workflow(account.account_ref(), config)?;
    println!(
        "{} {} ({})",
        "Resolving options for".blue(),
        account.account.cyan(),
        workflow.adapter().display_name()
    );

    workflow.start().await;
    for (field, value) in &assignments {
        select_value(&mut workflow, *field, value).await?;
    }

    match follow {
        Some(field) => follow_stdin(&mut workflow, field).await,
        None => {
            println!();
            print_cascade(workflow.cascade());
            Ok(())
        }
    }
}

/// Select each settled line typed on stdin and reprint the cascade
async fn follow_stdin(workflow: &mut GatewayWorkflow, field: FieldId) -> anyhow::Result<()> {
    if workflow.cascade().selection(field).is_none() {
        anyhow::bail!(
            "{} has no '{}' field",
            workflow.adapter().display_name(),
            field
        );
    }

    let (tx, mut input) = workflow.input_channel(64);
    tracing::debug!(
        "Following {} with a {}ms quiet period",
        field,
        input.quiet_period().as_millis()
    );
    let reader = tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if !line.is_empty() && tx.send(line.to_string()).await.is_err() {
                break;
            }
        }
        Ok::<_, std::io::Error>(())
    });

    while let Some(result) = workflow.select_from_input(field, &mut input).await {
        result?;
        println!();
        print_cascade(workflow.cascade());
    }
    reader.await??;
    Ok(())
}

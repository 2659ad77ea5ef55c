mod backend;
mod commands;

use apgate_cloud::{CloudError, FieldId, ProviderKind};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "apgate")]
#[command(about = "Provision cloud access points for cost-optimisation rules", long_about = None)]
struct Cli {
    /// Use a fixture cloud stored in this JSON file instead of the platform API
    #[arg(long, global = true, env = "APGATE_FIXTURE")]
    fixture: Option<PathBuf>,
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

/// Cloud account selection shared by every workflow command
#[derive(Args, Clone)]
pub struct AccountArgs {
    /// Cloud provider (aws, azure, gcp)
    #[arg(short, long)]
    pub provider: ProviderKind,
    /// Cloud account (connector) id
    #[arg(short, long)]
    pub account: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the cascade fields and print their options
    Options {
        #[command(flatten)]
        account: AccountArgs,
        /// Select a value, e.g. --set region=us-east-1 (applied in order)
        #[arg(long = "set", value_name = "FIELD=VALUE")]
        selections: Vec<String>,
        /// Read typed values for this field from stdin, one per line
        #[arg(long, value_name = "FIELD")]
        follow: Option<FieldId>,
    },
    /// List selectable core resources of a region
    Cores {
        #[command(flatten)]
        account: AccountArgs,
        #[arg(short, long)]
        region: String,
    },
    /// Decide whether a core resource can be reused
    Reconcile {
        #[command(flatten)]
        account: AccountArgs,
        #[arg(short, long)]
        region: String,
        /// Core resource id (ARN, gateway id) or submitted access point id
        #[arg(long)]
        core: String,
    },
    /// Create or edit an access point and wait until it is ready
    Provision(commands::provision::ProvisionArgs),
    /// Wait until the agents of a rule report in
    #[command(name = "verify-agent")]
    VerifyAgent {
        #[command(flatten)]
        account: AccountArgs,
        /// Rule name
        #[arg(long)]
        rule: String,
        /// Expected number of agent units
        #[arg(long, default_value_t = 1)]
        units: u32,
    },
    /// Show version information
    Version,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if matches!(cli.command, Commands::Version) {
        println!("apgate {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    init_tracing(cli.verbose);

    let (config, config_path) = apgate_config::load()?;
    if let Some(path) = &config_path {
        tracing::debug!("Using config {}", path.display());
    }
    let backend = backend::Backend::open(cli.fixture.as_deref(), &config).await?;

    let result = match cli.command {
        Commands::Options {
            account,
            selections,
            follow,
        } => commands::options::handle(&backend, &config, &account, &selections, follow).await,
        Commands::Cores { account, region } => {
            commands::cores::handle(&backend, &config, &account, &region).await
        }
        Commands::Reconcile {
            account,
            region,
            core,
        } => commands::reconcile::handle(&backend, &config, &account, &region, &core).await,
        Commands::Provision(args) => commands::provision::handle(&backend, &config, &args).await,
        Commands::VerifyAgent {
            account,
            rule,
            units,
        } => commands::verify_agent::handle(&backend, &config, &account, &rule, units).await,
        Commands::Version => Ok(()),
    };

    backend.persist().await?;
    if let Err(e) = &result {
        let retriable = e
            .chain()
            .filter_map(|cause| cause.downcast_ref::<CloudError>())
            .any(CloudError::is_retriable);
        if retriable {
            eprintln!("The platform may recover; running the command again can succeed.");
        }
    }
    result
}

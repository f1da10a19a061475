use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use shipping_labels::config::{ShippingLabelsConfig, CONFIG_FILE_NAME};
use shipping_labels::{init_telemetry, run_scenario, Scenario};

#[derive(Parser)]
#[command(name = "shipping-labels")]
#[command(about = "Drive the shipping label creation workflow from scripted sessions")]
#[command(long_about = "Runs the shipping label creation state machine against scripted \
                       collaborators and prints every side effect the UI would receive, \
                       one JSON document per line.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scripted label creation session
    Simulate {
        /// Scenario file (JSON)
        #[arg(long, short = 's')]
        scenario: PathBuf,
        /// Also print the transition history after the run
        #[arg(long)]
        history: bool,
    },
    /// Inspect or create the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
    /// Write the default configuration to shipping-labels.toml
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let env_loaded = ShippingLabelsConfig::load_env_file(Path::new("."))?;
    let config = ShippingLabelsConfig::load()?;
    init_telemetry(&config.observability)?;
    if env_loaded {
        tracing::info!("Loaded environment variables from .env file");
    }

    match cli.command {
        Commands::Simulate { scenario, history } => simulate(&scenario, history, &config).await,
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                print!("{}", toml::to_string_pretty(&config)?);
                Ok(())
            }
            ConfigAction::Init { force } => init_config_file(force),
        },
    }
}

async fn simulate(path: &Path, history: bool, config: &ShippingLabelsConfig) -> Result<()> {
    let scenario = Scenario::from_file(path)?;
    let order_id = scenario.order_id.clone();

    let report = match run_scenario(scenario, &config.workflow).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!(order_id = %order_id, error = %e, "Scenario aborted");
            return Err(e.into());
        }
    };

    for effect in &report.effects {
        println!("{}", serde_json::to_string(effect)?);
    }
    if history {
        for record in &report.history {
            println!("{}", serde_json::to_string(record)?);
        }
    }

    tracing::info!(
        order_id = %order_id,
        final_state = %report.final_state,
        effects = report.effects.len(),
        "Scenario finished"
    );
    Ok(())
}

fn init_config_file(force: bool) -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);
    if path.exists() && !force {
        bail!("{} already exists, use --force to overwrite", CONFIG_FILE_NAME);
    }
    ShippingLabelsConfig::default().save_to_file(path)?;
    println!("Wrote {}", CONFIG_FILE_NAME);
    Ok(())
}

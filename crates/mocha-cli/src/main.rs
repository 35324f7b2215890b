mod cmd;
mod output;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use mocha_core::config::ProtocolConfig;
use mocha_core::ledger::memory::MemoryLedger;
use mocha_core::scenario::ScenarioFile;
use std::path::{Path, PathBuf};

const DEFAULT_SCENARIO: &str = "mocha-scenario.yaml";

#[derive(Parser)]
#[command(
    name = "mocha",
    about = "Coffee-farm tree investments — inspect farms, quote costs, run investment sessions",
    version,
    propagate_version = true
)]
struct Cli {
    /// Scenario file describing the ledger fixture
    #[arg(long, global = true, env = "MOCHA_SCENARIO")]
    scenario: Option<PathBuf>,

    /// Protocol config file (defaults are used when omitted)
    #[arg(long, global = true, env = "MOCHA_CONFIG")]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List farms on the ledger
    Farms,

    /// Show one farm in detail
    Farm { id: u64 },

    /// Quote cost and approval amount for a tree count
    Quote { trees: u64 },

    /// Run one investment session to a terminal state
    Invest {
        /// Target farm id
        #[arg(long)]
        farm: u64,
        /// Number of trees to purchase
        #[arg(long)]
        trees: u64,
    },

    /// Start the HTTP read server over the scenario ledger
    Serve {
        #[arg(long, default_value_t = 4270)]
        port: u16,
    },
}

fn load_config(path: Option<&Path>) -> anyhow::Result<ProtocolConfig> {
    match path {
        Some(path) => ProtocolConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => Ok(ProtocolConfig::default()),
    }
}

fn load_ledger(config: &ProtocolConfig, path: Option<&Path>) -> anyhow::Result<MemoryLedger> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => {
            let default = PathBuf::from(DEFAULT_SCENARIO);
            if !default.exists() {
                bail!(
                    "no scenario file: pass --scenario or create {DEFAULT_SCENARIO} in the \
                     working directory"
                );
            }
            default
        }
    };
    let scenario = ScenarioFile::load(&path)
        .with_context(|| format!("failed to load scenario from {}", path.display()))?;
    Ok(scenario.build(config))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    config.validate().context("invalid protocol config")?;

    match cli.command {
        Commands::Farms => {
            let ledger = load_ledger(&config, cli.scenario.as_deref())?;
            cmd::farms::list(&ledger, cli.json)
        }
        Commands::Farm { id } => {
            let ledger = load_ledger(&config, cli.scenario.as_deref())?;
            cmd::farms::show(&ledger, id, cli.json)
        }
        Commands::Quote { trees } => cmd::quote::run(&config, trees, cli.json),
        Commands::Invest { farm, trees } => {
            let ledger = load_ledger(&config, cli.scenario.as_deref())?;
            cmd::invest::run(&config, &ledger, farm, trees, cli.json)
        }
        Commands::Serve { port } => {
            let ledger = load_ledger(&config, cli.scenario.as_deref())?;
            cmd::serve::run(&config, ledger, port)
        }
    }
}

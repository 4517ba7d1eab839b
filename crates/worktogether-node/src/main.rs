use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use worktogether_node::{logging, run_simulation, NodeConfig, WorkTogetherEngine};
use worktogether_types::{AccountAddress, TokenAmount};

const DEFAULT_CONFIG_PATH: &str = "./worktogether.toml";

#[derive(Parser)]
#[command(name = "worktogether")]
#[command(about = "WorkTogether - issue bounties and staking lotteries", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbosity level (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Output path for the configuration
        #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
        output: PathBuf,
    },

    /// Run a full bounty and lottery round against a simulated chain
    Simulate {
        /// Number of contributors entering the pool
        #[arg(short, long, default_value = "4")]
        entrants: u64,

        /// Reward funded into the pool
        #[arg(short, long, default_value = "1000")]
        reward: u64,

        /// Also swap a batch of fees into the dividend pool
        #[arg(long)]
        with_fees: bool,
    },
}

fn load_config(path: Option<&Path>) -> Result<NodeConfig> {
    let mut config = match path {
        Some(path) => NodeConfig::from_file(path)?,
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            NodeConfig::from_file(Path::new(DEFAULT_CONFIG_PATH))?
        }
        None => NodeConfig::default(),
    };
    config.apply_env_overrides();
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Init { output } = &cli.command {
        NodeConfig::default().save_to_file(output)?;
        println!("Wrote default configuration to {}", output.display());
        return Ok(());
    }

    let config = load_config(cli.config.as_deref())?;

    if let Err(e) = logging::init_logging(&config.logging, cli.verbose) {
        eprintln!("Failed to initialize logging: {}", e);
        let log_level = match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        };

        tracing_subscriber::registry()
            .with(tracing_subscriber::EnvFilter::new(
                std::env::var("RUST_LOG").unwrap_or_else(|_| format!("worktogether={}", log_level)),
            ))
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    match cli.command {
        Commands::Init { .. } => Ok(()),
        Commands::Simulate {
            entrants,
            reward,
            with_fees,
        } => {
            let admin = AccountAddress::derive("admin", 0);
            info!(admin = %admin, entrants, reward, with_fees, "🚀 Starting simulation");

            let engine = WorkTogetherEngine::new(config, admin).await?;
            let report = run_simulation(&engine, entrants, TokenAmount::from_units(reward), with_fees)
                .await?;
            let json = serde_json::to_string_pretty(&report).context("serializing report")?;
            println!("{}", json);
            Ok(())
        }
    }
}

//! rota daemon — entry point for running a rota node.

use clap::Parser;
use rota_node::{NodeConfig, RotaNode};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rota-daemon", about = "rota delegated-proof-of-stake node daemon")]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings are
    /// used as the base; CLI flags and env vars override them.
    #[arg(long, env = "ROTA_CONFIG")]
    config: Option<PathBuf>,

    /// Forging secret for this node's delegate identity. Omit to run a
    /// non-forging relay node.
    #[arg(long, env = "ROTA_FORGING_SECRET")]
    forging_secret: Option<String>,

    /// Known peer addresses (comma-separated: "1.2.3.4:4202,5.6.7.8:4202").
    #[arg(long, env = "ROTA_PEERS", value_delimiter = ',')]
    peers: Vec<String>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "ROTA_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "ROTA_LOG_FORMAT")]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Run the node.
    Run,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => NodeConfig::from_toml_file(path)?,
        None => NodeConfig::default(),
    };
    if cli.forging_secret.is_some() {
        config.forging_secret = cli.forging_secret.clone();
    }
    if !cli.peers.is_empty() {
        config.peers = cli.peers.clone();
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.log_format = format.clone();
    }

    rota_utils::init_tracing(&config.log_level, config.json_logs());
    if let Some(path) = &cli.config {
        tracing::info!(path = %path.display(), "loaded config file");
    }

    match cli.command {
        Command::Run => run(config).await,
    }
}

async fn run(config: NodeConfig) -> anyhow::Result<()> {
    let node = RotaNode::new(&config)?;
    let handle = node.handle();

    let node_task = tokio::spawn(node.start());

    tokio::signal::ctrl_c().await?;
    tracing::info!("interrupt received, shutting down");
    handle.shutdown();

    node_task.await??;
    Ok(())
}

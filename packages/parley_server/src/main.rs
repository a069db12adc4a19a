use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::prelude::*;

mod broadcast;
mod config;
mod participant;
mod registry;
mod server;


use crate::config::{FileConfig, ParleyConfig, ServerConfig, load_config};
use crate::server::{ChatServer, ServerOptions};

#[derive(Parser)]
#[command(name = "parley")]
#[command(about = "Broadcast chat server")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Custom data directory (defaults to ~/.parley)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the chat server in the foreground
    Serve(ServeArgs),
}

#[derive(Parser)]
struct ServeArgs {
    /// Port to listen on (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Host to bind to (overrides config)
    #[arg(short = 'b', long)]
    host: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ParleyConfig::new(cli.data_dir.clone())?;

    match cli.command {
        Commands::Serve(args) => run_server(args, config).await,
    }
}

async fn run_server(args: ServeArgs, config: ParleyConfig) -> Result<()> {
    // Setup logging
    let default_directive = if args.debug {
        "parley=debug,info"
    } else {
        "parley=info,warn"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(env_filter)
        .init();

    info!("Starting Parley chat server");

    let file_config: FileConfig = load_config(&config.data_dir)
        .extract()
        .context("invalid configuration")?;
    let mut server_config = ServerConfig::from_file(&file_config.server);

    // CLI flags sit above config.toml and env vars
    if let Some(host) = args.host {
        server_config.host = host;
    }
    if let Some(port) = args.port {
        server_config.port = port;
    }

    let addr = server_config.bind_addr()?;
    let server = ChatServer::serve(addr, ServerOptions::default()).await?;
    info!("Listening on {}", server.local_addr());

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    info!("Shutting down");
    server.shutdown().await;

    Ok(())
}

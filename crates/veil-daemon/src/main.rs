//! # veil-daemon
//!
//! Runs one Veil role per process:
//! - `veil-daemon db-server` — mutual-TLS record service
//! - `veil-daemon gateway` — HTTP gateway in front of the db-server
//! - `veil-daemon probe` — reconnecting client that greets the db-server

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

use veil_daemon::gateway::{self, GatewayState};
use veil_daemon::{run_probe, DaemonConfig, RecordServer, RecordService, UpstreamClient};

/// Veil: identity-authorized, policy-redacted record access.
#[derive(Parser)]
#[command(name = "veil-daemon", version, about)]
struct Cli {
    /// Path to the configuration file.
    #[arg(long, default_value = "veil.toml")]
    config: PathBuf,

    /// Append logs to this file instead of stderr.
    #[arg(long)]
    log: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve records over mutual TLS.
    DbServer {
        /// Listen address (overrides [db_server].listen).
        #[arg(long)]
        addr: Option<String>,
    },
    /// Serve the HTTP gateway.
    Gateway {
        /// Listen address (overrides [gateway].listen).
        #[arg(long)]
        addr: Option<String>,
    },
    /// Connect to the db-server, retrying until it answers, and log its replies.
    Probe,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log.as_deref(), cli.json_logs)?;

    let config = DaemonConfig::load(&cli.config)?;
    tracing::info!(config = %cli.config.display(), "configuration loaded");

    match cli.command {
        Commands::DbServer { addr } => start_db_server(&config, addr).await,
        Commands::Gateway { addr } => start_gateway(&config, addr).await,
        Commands::Probe => start_probe(&config).await,
    }
}

fn init_logging(log: Option<&Path>, json: bool) -> Result<()> {
    let filter = EnvFilter::from_default_env()
        .add_directive("veil_daemon=info".parse()?)
        .add_directive("veil_tls=info".parse()?)
        .add_directive("veil_policy=info".parse()?)
        .add_directive("veil_redact=info".parse()?);

    let writer = match log {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("unable to open log file {}", path.display()))?;
            BoxMakeWriter::new(Mutex::new(file))
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

async fn start_db_server(config: &DaemonConfig, addr: Option<String>) -> Result<()> {
    let material = config.tls_material()?;
    let identity = material.local_identity()?;
    let client = config.policy_client();

    let tls = veil_tls::server_config(&material, config.authorizer(&client))?;
    let service = RecordService::new(
        config.record_source(),
        config.redactor(&client),
        config.policy_timeout(),
    );
    let listen = addr.unwrap_or_else(|| config.db_server.listen.clone());
    let server = RecordServer::bind(listen.as_str(), tls, config.handshake_timeout(), service).await?;

    tracing::info!(%identity, policy = %client.source_name(), "starting db-server");
    server.run().await?;
    Ok(())
}

async fn start_gateway(config: &DaemonConfig, addr: Option<String>) -> Result<()> {
    let material = config.tls_material()?;
    let identity = material.local_identity()?;
    let client = config.policy_client();

    let dialer = config.dialer(&material, config.authorizer(&client))?;
    let state = GatewayState {
        upstream: UpstreamClient::new(dialer, config.upstream.address.as_str(), config.io_timeout()),
        local_identity: identity.clone(),
    };

    let listen = addr.unwrap_or_else(|| config.gateway.listen.clone());
    let listener = tokio::net::TcpListener::bind(&listen)
        .await
        .with_context(|| format!("unable to listen on {}", listen))?;

    tracing::info!(%identity, upstream = %config.upstream.address, "starting gateway");
    gateway::serve(listener, gateway::router(state)).await?;
    Ok(())
}

async fn start_probe(config: &DaemonConfig) -> Result<()> {
    let material = config.tls_material()?;
    let identity = material.local_identity()?;
    let client = config.policy_client();
    let dialer = config.dialer(&material, config.authorizer(&client))?;

    tracing::info!(%identity, upstream = %config.upstream.address, "starting probe");
    let received = run_probe(&dialer, &config.upstream.address, &config.retry_policy()).await?;
    tracing::info!(received, "probe finished");
    Ok(())
}

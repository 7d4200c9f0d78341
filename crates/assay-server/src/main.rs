//! Assay server binary
//!
//! Usage:
//!   assay-server                         # serve with defaults and env credentials
//!   assay-server --config assay.yaml     # serve with a config file
//!   assay-server validate --input a.json # check an answer offline

use anyhow::Context;
use assay_grounding::{GroundednessValidator, ValidationInput};
use assay_server::{AppContext, ServerConfig, logging};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tokio::net::TcpListener;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "assay-server")]
#[command(about = "Grounded assistant gateway with provider failover", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to configuration file (YAML or TOML)
    #[arg(short, long, value_name = "FILE", env = "ASSAY_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Override the listen host
    #[arg(long, global = true)]
    host: Option<String>,

    /// Override the listen port
    #[arg(short, long, global = true)]
    port: Option<u16>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server (default if no command specified)
    Serve,

    /// Score an answer against tool results and print the report as JSON
    Validate {
        /// JSON file with `answer`, `tool_calls` and `tool_results`
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ServerConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => ServerConfig::default(),
    };
    config.merge_env();
    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::Validate { input } => validate(&config, &input),
    }
}

async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    logging::init(&config.logging)?;
    info!("🚀 Starting Assay server");

    let ctx = AppContext::from_config(config).context("no usable completion backend")?;
    info!(
        primary = %ctx.gateway.primary_kind(),
        fallback = ?ctx.gateway.fallback_kind(),
        "Provider gateway ready"
    );

    let addr = ctx.config.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;

    info!("");
    info!("✅ Assay listening on http://{}", addr);
    info!("   Assistant:");
    info!("   - Streaming (SSE):    http://{}/v1/assistant/stream", addr);
    info!("   - Single response:    http://{}/v1/assistant/complete", addr);
    info!("   - Grounding check:    http://{}/v1/grounding/validate", addr);
    info!("   Observability:");
    info!("   - Health check:       http://{}/healthz", addr);
    info!("   - Readiness check:    http://{}/readyz", addr);
    info!("   - Prometheus metrics: http://{}/metrics", addr);
    info!("");

    axum::serve(listener, ctx.router())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

fn validate(config: &ServerConfig, input: &Path) -> anyhow::Result<()> {
    let contents = std::fs::read_to_string(input)
        .with_context(|| format!("reading {}", input.display()))?;
    let input: ValidationInput =
        serde_json::from_str(&contents).context("parsing validation input")?;

    let validator = GroundednessValidator::new(config.grounding.clone())?;
    let report = validator.validate_input(&input);

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Wait for shutdown signal (SIGINT or SIGTERM)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

//! relay - MCP tool-orchestration host
//!
//! Connects to the configured MCP servers, builds the tool registry, and
//! exposes the chat orchestrator either as a stdin REPL or behind an HTTP
//! endpoint.

use anyhow::Result;
use clap::{Parser, Subcommand};
use relay_core::HostConfig;
use relay_host::ChatOrchestrator;
use relay_mcp::{ConnectionParams, McpClient};
use relay_model::GroqModel;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "relay", version, about = "MCP tool-orchestration host")]
struct Cli {
    /// Path to config.toml (searched upward from the cwd if omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive chat loop on stdin/stdout
    Chat,
    /// Serve the HTTP chat endpoint
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => HostConfig::load_from(path)?,
        None => HostConfig::load()?,
    };

    let orchestrator = build_orchestrator(&config).await?;

    match cli.command {
        Command::Chat => chat_loop(orchestrator).await,
        Command::Serve => serve(orchestrator, &config).await,
    }
}

async fn build_orchestrator(config: &HostConfig) -> Result<ChatOrchestrator> {
    let api_key = config.model.api_key.clone().ok_or_else(|| {
        anyhow::anyhow!("No model API key configured (set GROQ_API_KEY or [model].api_key)")
    })?;

    let mut model = GroqModel::new(api_key, config.model.model_name.clone());
    if let Some(base_url) = &config.model.base_url {
        model = model.with_base_url(base_url.clone());
    }

    let mut orchestrator = ChatOrchestrator::builder()
        .model(Arc::new(model))
        .options(&config.host)
        .build()?;

    if config.mcp_servers.is_empty() {
        tracing::warn!("No MCP servers configured, the model will answer without tools");
    }

    for server in &config.mcp_servers {
        tracing::info!(server = %server.name(), "Connecting to server");
        let client = McpClient::connect(server.name(), ConnectionParams::from(server)).await?;
        orchestrator.add_transport(Arc::new(client)).await?;
    }

    Ok(orchestrator)
}

async fn chat_loop(mut orchestrator: ChatOrchestrator) -> Result<()> {
    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    let mut stdout = tokio::io::stdout();

    println!("\nRelay host started!");
    println!("Type your message.");

    loop {
        stdout.write_all(b"\nQuery: ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let query = line.trim();
        if query.is_empty() {
            continue;
        }

        // A failed turn is reported to the user, not fatal for the loop
        match orchestrator.process_query(query).await {
            Ok(answer) => println!("\n{answer}"),
            Err(e) => eprintln!("\nerror: {e}"),
        }
    }

    orchestrator.shutdown().await;
    Ok(())
}

async fn serve(orchestrator: ChatOrchestrator, config: &HostConfig) -> Result<()> {
    let orchestrator = Arc::new(Mutex::new(orchestrator));
    let router = relay_server::create_router(orchestrator.clone());
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "Serving chat endpoint");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    orchestrator.lock().await.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}

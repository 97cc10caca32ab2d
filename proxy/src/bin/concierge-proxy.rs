use anyhow::Context;
use clap::Parser;
use concierge_core::client::GeminiClient;
use concierge_core::config::UnifiedConfig;
use concierge_proxy::config::ProxySettings;
use concierge_proxy::http_server::{self, AppState};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "concierge-proxy", about = "Chat proxy for the storefront concierge widget")]
struct Args {
    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// API key for the hosted model; overrides GEMINI_API_KEY and the config file
    #[arg(short = 'k', long)]
    api_key: Option<String>,

    /// Model to relay to
    #[arg(short = 'o', long)]
    model: Option<String>,

    /// Base URL of the generative-language API
    #[arg(long)]
    api_base_url: Option<String>,

    /// HTTP server address
    #[arg(long)]
    http_addr: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Both paths apply the environment (and `.env`) over the file
    let unified = match &args.config {
        Some(path) => UnifiedConfig::load_explicit(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => UnifiedConfig::load(),
    };

    let mut settings = ProxySettings::from(&unified.proxy);
    if let Some(api_key) = args.api_key {
        settings.api_key = Some(api_key);
    }
    if let Some(model) = args.model {
        settings.model_name = model;
    }
    if let Some(base_url) = args.api_base_url {
        settings.api_base_url = base_url;
    }

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting concierge proxy");
    if settings.api_key().is_none() {
        warn!("No API key configured; chat requests will fail until one is set");
    }

    let addr = match args.http_addr {
        Some(addr) => addr,
        None => settings
            .http_bind_addr
            .parse()
            .with_context(|| format!("Invalid bind address {}", settings.http_bind_addr))?,
    };

    let client = GeminiClient::new(Some(settings.api_base_url.clone()), Some(settings.model_name.clone()))
        .context("Failed to initialize model client")?;
    info!(model = %settings.model_name, "Initialized model client");

    let state = AppState::new(settings, Arc::new(client));
    http_server::run_server(state, addr).await?;

    info!("Concierge proxy shutting down");
    Ok(())
}

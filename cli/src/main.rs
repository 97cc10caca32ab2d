use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use concierge_core::config::{get_default_data_dir, UnifiedConfig};
use concierge_widget::storage::FileStorage;
use concierge_widget::{ChatController, HttpTransport, ProfileStore, StaticPage, WidgetSettings};
use std::sync::Arc;
use tracing::{info, warn};

mod app;
mod camera;
mod cli;
mod logging;
mod output;

use crate::camera::ImageFileCamera;
use crate::cli::Args;
use crate::logging::log_error;
use crate::output::{print_usage_instructions, TerminalView};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    // Load unified configuration
    let config = UnifiedConfig::load();

    let log_level = if args.verbose {
        "debug".to_string()
    } else {
        config.cli.log_level.clone().unwrap_or_else(|| "warn".to_string())
    };
    logging::init(&log_level);

    if !args.interactive && args.prompt.is_none() {
        print_usage_instructions();
        return Ok(());
    }

    let mut settings = WidgetSettings::from(&config.widget);
    if let Some(proxy_url) = args.proxy_url {
        settings.proxy_url = proxy_url;
    }

    let storage_dir = match args.storage_dir.or_else(|| config.cli.storage_dir.clone()) {
        Some(dir) => dir,
        None => get_default_data_dir().context("Failed to resolve data directory")?,
    };
    let storage = FileStorage::open(&storage_dir)
        .with_context(|| format!("Failed to open storage at {}", storage_dir.display()))?;
    let profile = ProfileStore::open(Arc::new(storage), settings.storage_namespace.clone())
        .context("Failed to load visitor profile")?;

    let page = match args.page.or_else(|| config.cli.page_file.clone()) {
        Some(path) => match StaticPage::load(&path) {
            Ok(page) => page,
            Err(e) => {
                log_error(&format!("Failed to load page {}: {}", path.display(), e));
                warn!("Continuing without page content");
                StaticPage::default()
            }
        },
        None => StaticPage::default(),
    };

    let transport = HttpTransport::new(settings.proxy_url.clone())
        .context("Failed to initialize HTTP client")?;
    info!(endpoint = %transport.endpoint(), "Using chat proxy");

    let camera = ImageFileCamera::new();
    let mut controller = ChatController::new(
        settings,
        profile,
        Arc::new(page),
        Arc::new(transport),
        Box::new(TerminalView::new().with_user_echo(!args.interactive)),
    )
    .with_camera(Arc::new(camera.clone()));

    controller.start();

    if args.interactive {
        if let Err(e) = app::run_interactive_chat(&mut controller, &camera).await {
            log_error(&format!("Error in interactive chat: {}", e));
            eprintln!("{}", format!("Interactive chat failed: {}", e).red());
        }
    } else if let Some(prompt) = args.prompt {
        if let Err(e) = app::run_single_query(prompt, &mut controller).await {
            log_error(&format!("Error processing prompt: {}", e));
        }
    }

    Ok(())
}

use clap::Parser;
use std::path::PathBuf;

/// Terminal front-end for the storefront concierge
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Message to send to the concierge
    #[arg(index = 1)] // Positional argument
    pub prompt: Option<String>,

    /// Enter interactive chat mode
    #[arg(short, long, default_value_t = false)]
    pub interactive: bool,

    /// Page description (TOML or JSON) standing in for the storefront markup
    #[arg(long)]
    pub page: Option<PathBuf>,

    /// Chat proxy endpoint
    #[arg(long, env = "CONCIERGE_PROXY_URL")]
    pub proxy_url: Option<String>,

    /// Directory holding the visitor id and profile
    #[arg(long)]
    pub storage_dir: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

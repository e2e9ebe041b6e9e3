use std::path::PathBuf;

use clap::Parser;

/// Polls a claims dashboard for data changes and refreshes it.
#[derive(Debug, Default, Parser)]
#[command(name = "data_monitor", version)]
pub struct Cli {
    /// RON settings file.
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Server root, e.g. http://127.0.0.1:8000
    #[arg(long)]
    pub base_url: Option<String>,

    /// Milliseconds between change checks.
    #[arg(long)]
    pub interval_ms: Option<u64>,

    /// Only notify on change; never call the reload endpoint.
    #[arg(long)]
    pub no_auto_reload: bool,

    /// Navigation path of the mirrored page, e.g. /dashboard/claims/
    #[arg(long)]
    pub path: Option<String>,

    #[arg(long)]
    pub csrf_token: Option<String>,

    /// Session cookie string forwarded to the server.
    #[arg(long)]
    pub cookie: Option<String>,

    #[arg(long)]
    pub log_level: Option<String>,
}

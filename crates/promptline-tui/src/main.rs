//! Terminal client for a prompt-driven conversation backend.

use anyhow::{Context, ensure};
use clap::Parser;
use log::{debug, info};
use promptline_config::PromptlineConfig;
use promptline_core::ConversationSession;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;

/// Command-line options for the TUI client.
#[derive(Parser)]
#[command(name = "promptline", version)]
struct Cli {
    /// Optional path to a promptline.json5 config file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Actor id sent with every prompt request
    #[arg(long)]
    actor: Option<String>,
    /// Backend base URL, overriding the config
    #[arg(long)]
    base_url: Option<String>,
    /// Append logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

/// Entry point for the promptline TUI client.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut logger = env_logger::builder();
    logger.format_timestamp_millis().parse_default_env();
    if let Some(path) = cli.log_file.as_ref() {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open log file {}", path.display()))?;
        logger.target(env_logger::Target::Pipe(Box::new(file)));
    }
    let _ = logger.try_init();

    info!(
        "starting promptline (config_set={}, actor_set={}, base_url_set={})",
        cli.config.is_some(),
        cli.actor.is_some(),
        cli.base_url.is_some()
    );
    let mut config = if let Some(path) = cli.config.as_ref() {
        info!("loading config from path: {}", path.display());
        PromptlineConfig::load_from_path(path).context("failed to load config")?
    } else {
        let cwd = std::env::current_dir().context("cwd")?;
        info!("loading layered config from cwd: {}", cwd.display());
        let layered =
            PromptlineConfig::load_layered(&cwd).context("failed to load layered config")?;
        debug!("layered config loaded (layers={})", layered.layers.len());
        layered.config
    };
    if let Some(base_url) = cli.base_url {
        ensure!(
            base_url.starts_with("http://") || base_url.starts_with("https://"),
            "--base-url must be an http(s) URL"
        );
        config.backend.base_url = base_url;
    }

    let session = Arc::new(ConversationSession::builder(config).build());
    let (identity, _) = watch::channel(cli.actor);
    promptline_tui::run(session, identity).await
}

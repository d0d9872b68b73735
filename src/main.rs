//! hvc - command-line client for the hospital value accounting API
//!
//! Restores the stored session, runs one subcommand and exits.

mod cli;
mod commands;
mod config;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use hospital_value_client::http::{ApiClient, ReqwestTransport};
use hospital_value_client::session::{AppContext, ConsoleNotifier, FileStore};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    // Load configuration
    let mut config = config::Config::from_env()?;
    if let Some(api_url) = cli.api_url.clone() {
        config.api_url = api_url.trim_end_matches('/').to_string();
    }

    std::fs::create_dir_all(&config.logs_dir).ok();

    // File appender for persistent logs (daily rotation)
    let file_appender = RollingFileAppender::new(Rotation::DAILY, &config.logs_dir, "hvc.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    // Console shows warnings only, unless HVC_CONSOLE_LOG says otherwise
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,hospital_value_client=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_filter(
            tracing_subscriber::EnvFilter::new(std::env::var("HVC_CONSOLE_LOG").unwrap_or_else(|_| "warn".into())),
        ))
        .with(config.log_json.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking.clone())
        }))
        .with((!config.log_json).then(|| {
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking.clone())
                .with_ansi(false)
        }))
        .init();

    debug!(api_url = %config.api_url, "Configuration loaded");

    let store = FileStore::open(&config.state_dir)
        .with_context(|| format!("Failed to open state dir {}", config.state_dir.display()))?;
    let ctx = AppContext::restore(Arc::new(store), Arc::new(ConsoleNotifier), config.redirect_delay)?;
    info!(logged_in = ctx.is_logged_in(), "Session restored");

    let transport = ReqwestTransport::new(&config.api_url, config.timeout)?;
    let client = ApiClient::new(Arc::new(transport), Arc::new(ctx)).with_long_timeout(config.long_timeout);

    commands::run(&client, cli.command).await
}

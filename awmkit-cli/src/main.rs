//! `awmkit` command-line tool: tag management, key administration,
//! watermark embed/detect, evidence review, and a Prometheus exporter,
//! all wired to `awmkit-core`.

mod cli;
mod commands;
mod config;
mod evidence_backend;
mod file_backend;

use std::sync::Arc;

use clap::Parser;
use tokio::signal;

use awmkit_core::metrics::{MetricsRegistry, run_prometheus_http_server};
use cli::{Cli, Command};
use config::CliConfig;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "awmkit_cli=info,awmkit_core=info".to_string()),
        )
        .init();

    if let Err(e) = run().await {
        eprintln!("fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), String> {
    let cli = Cli::parse();
    let defaults = CliConfig::default();
    let keys_path = cli.keys_path.unwrap_or(defaults.keys_path);
    let evidence_path = cli.evidence_path.unwrap_or(defaults.evidence_path);

    let result = match cli.command {
        Command::Tag { action } => commands::run_tag(action),
        Command::Key { action } => commands::run_key(action, keys_path),
        Command::Embed {
            input,
            output,
            identity,
            key_slot,
            layout,
            audiowmark_bin,
            strength,
        } => commands::run_embed(
            input,
            output,
            identity,
            key_slot,
            layout.into(),
            audiowmark_bin,
            strength,
            keys_path,
        ),
        Command::Detect {
            input,
            layout,
            audiowmark_bin,
            fingerprint_url,
        } => commands::run_detect(
            input,
            layout.into(),
            audiowmark_bin,
            fingerprint_url,
            keys_path,
            evidence_path,
        ),
        Command::Evidence { action } => commands::run_evidence(action, evidence_path),
        Command::ServeMetrics { listen_addr } => {
            return serve_metrics(&listen_addr).await;
        }
    };

    result.map_err(|e| e.to_string())
}

async fn serve_metrics(listen_addr: &str) -> Result<(), String> {
    let addr = listen_addr
        .parse()
        .map_err(|e| format!("invalid listen address {listen_addr}: {e}"))?;

    let metrics = Arc::new(
        MetricsRegistry::new().map_err(|e| format!("failed to initialise metrics registry: {e}"))?,
    );

    tracing::info!("metrics exporter listening on http://{addr}/metrics");

    let server = tokio::spawn(run_prometheus_http_server(metrics, addr));

    tokio::select! {
        result = server => {
            result
                .map_err(|e| format!("metrics server task panicked: {e}"))?
                .map_err(|e| format!("metrics HTTP server error: {e}"))?;
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received");
        }
    }

    Ok(())
}

/// Waits for Ctrl-C and returns, used for graceful shutdown.
async fn shutdown_signal() {
    let _ = signal::ctrl_c().await;
}

//! `obs2vts` - OBS scene transitions to VTube Studio hotkeys
//!
//! This binary is the thin shell around the bridge: it parses flags,
//! sets up logging, loads (or creates) the config file, and hands a
//! shutdown-signal future to the orchestrator. Fatal startup errors
//! exit with status 1; a signal-driven shutdown exits with 0.

use std::future::Future;

use anyhow::{Context, Result};
use clap::Parser;
use console::Style;

use crate::cli::Cli;
use obs2vts_core::bridge::{Bridge, BridgeContext};
use obs2vts_core::config::Config;
use obs2vts_core::vts::{TokenStore, DEFAULT_TOKEN_FILE};

mod cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = Config::load_or_create(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    config.apply_overrides(&cli.overrides());

    let ctx = BridgeContext {
        config,
        token_store: TokenStore::new(DEFAULT_TOKEN_FILE),
    };
    let shutdown = shutdown_signal()?;

    if let Err(e) = Bridge::new(ctx).run(shutdown).await {
        eprintln!("{} {e}", Style::new().red().bold().apply_to("Fatal:"));
        std::process::exit(1);
    }
    log::info!("Goodbye.");
    Ok(())
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_secs()
        .init();
}

/// Resolves on ctrl-c or SIGTERM.
#[cfg(unix)]
fn shutdown_signal() -> Result<impl Future<Output = ()>> {
    use tokio::signal::unix::{signal, SignalKind};
    let mut terminate =
        signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?;
    Ok(async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = terminate.recv() => {}
        }
        log::info!("Shutdown signal received.");
    })
}

/// Resolves on ctrl-c.
#[cfg(not(unix))]
fn shutdown_signal() -> Result<impl Future<Output = ()>> {
    Ok(async {
        let _ = tokio::signal::ctrl_c().await;
        log::info!("Shutdown signal received.");
    })
}

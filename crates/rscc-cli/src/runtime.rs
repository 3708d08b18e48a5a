//! Wiring shared by the session commands

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use rscc_core::config::{self, RsccConfig, SupporterStore};
use rscc_services::{ProcessServiceFactory, ShellCommandRunner};
use rscc_session::{ConnectionOrchestrator, SessionPhase};

/// Config file path, honoring `--config`
pub fn config_file(config_path: Option<&PathBuf>) -> PathBuf {
    config_path
        .cloned()
        .unwrap_or_else(config::default_config_path)
}

/// Load the configuration, falling back to defaults when no file exists
pub fn load_app_config(config_path: Option<&PathBuf>) -> Result<RsccConfig> {
    if let Some(path) = config_path {
        return config::load_config(path)
            .with_context(|| format!("Failed to load config from {:?}", path));
    }

    let default_path = config::default_config_path();
    if default_path.exists() {
        Ok(config::load_config(&default_path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config from {:?}: {}", default_path, e);
            RsccConfig::default()
        }))
    } else {
        tracing::info!("Using default configuration");
        Ok(RsccConfig::default())
    }
}

/// Address book stored next to the config file
pub fn supporter_store(config_path: Option<&PathBuf>) -> SupporterStore {
    match config_path.and_then(|p| p.parent()) {
        Some(dir) => SupporterStore::in_dir(dir),
        None => SupporterStore::default_location(),
    }
}

/// Orchestrator driving the real external programs
pub fn build_orchestrator(config: RsccConfig) -> Result<Arc<ConnectionOrchestrator>> {
    let factory = Arc::new(ProcessServiceFactory::from_config(&config));
    let runner = Arc::new(ShellCommandRunner::new());
    let orchestrator =
        ConnectionOrchestrator::new(config, runner, factory).context("Invalid configuration")?;
    Ok(Arc::new(orchestrator))
}

/// Token cancelled on Ctrl+C or SIGTERM
pub fn shutdown_token() -> CancellationToken {
    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();

    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => {
                    tracing::warn!("Failed to install SIGTERM handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                tracing::info!("Received Ctrl+C, shutting down...");
            }
            _ = terminate => {
                tracing::info!("Received SIGTERM, shutting down...");
            }
        }

        cancel_clone.cancel();
    });

    cancel
}

/// Wait until the session stops being active or shutdown is requested.
///
/// The process flags are refreshed once per second.
pub async fn wait_while_active(orchestrator: &ConnectionOrchestrator, shutdown: &CancellationToken) {
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => return,
            _ = ticker.tick() => {
                orchestrator.refresh();
                if orchestrator.state().phase() != SessionPhase::Active {
                    tracing::info!("Session ended");
                    return;
                }
            }
        }
    }
}

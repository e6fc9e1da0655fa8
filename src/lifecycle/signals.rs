//! OS signal handling.
//!
//! # Responsibilities
//! - Wait for SIGINT (Ctrl-C) or SIGTERM and trigger graceful shutdown
//! - Reload the configuration file on SIGHUP
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - SIGHUP triggers config reload, not shutdown
//! - A failed reload is logged and the running routes stay in place

use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::watcher::reload;
use crate::config::ProxyConfig;
use crate::lifecycle::Shutdown;

/// Resolve once Ctrl-C or SIGTERM arrives.
pub async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl-C"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }
}

/// Trigger `shutdown` on the first termination signal.
pub fn spawn_shutdown_listener(shutdown: Shutdown) -> JoinHandle<()> {
    tokio::spawn(async move {
        wait_for_signal().await;
        shutdown.trigger();
    })
}

/// Reload `path` on every SIGHUP, sending valid configs to `tx`.
#[cfg(unix)]
pub fn spawn_reload_listener(
    path: PathBuf,
    tx: mpsc::UnboundedSender<ProxyConfig>,
) -> std::io::Result<JoinHandle<()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = signal(SignalKind::hangup())?;
    Ok(tokio::spawn(async move {
        while hangup.recv().await.is_some() {
            tracing::info!(path = ?path, "Received SIGHUP, reloading configuration");
            if !reload(&path, &tx) && tx.is_closed() {
                break;
            }
        }
    }))
}

#[cfg(not(unix))]
pub fn spawn_reload_listener(
    _path: PathBuf,
    _tx: mpsc::UnboundedSender<ProxyConfig>,
) -> std::io::Result<JoinHandle<()>> {
    Ok(tokio::spawn(async {}))
}

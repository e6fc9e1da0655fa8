//! Configuration file watcher for hot reload.

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::ProxyConfig;
use crate::observability::metrics;

/// A watcher that monitors the configuration file for changes.
///
/// Every change that loads and validates is sent as a whole new
/// `ProxyConfig`; broken edits are logged and dropped so the running route
/// table stays in place.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<ProxyConfig>,
}

impl ConfigWatcher {
    /// Create a new ConfigWatcher.
    ///
    /// Returns the watcher and a receiver for configuration updates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<ProxyConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        (Self::with_sender(path, update_tx), update_rx)
    }

    /// Create a watcher feeding an existing update channel.
    pub fn with_sender(path: &Path, update_tx: mpsc::UnboundedSender<ProxyConfig>) -> Self {
        Self {
            path: path.to_path_buf(),
            update_tx,
        }
    }

    /// Start watching the file. The returned handle must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx.clone();
        let path = self.path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        tracing::info!("Config file change detected, reloading...");
                        reload(&path, &tx);
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}

/// Load `path` and forward the result to `tx`. Returns whether a new
/// configuration was sent.
pub fn reload(path: &Path, tx: &mpsc::UnboundedSender<ProxyConfig>) -> bool {
    match load_config(path) {
        Ok(new_config) => {
            metrics::record_config_reload(true);
            tx.send(new_config).is_ok()
        }
        Err(e) => {
            metrics::record_config_reload(false);
            tracing::error!("Failed to reload config: {}. Keeping current configuration.", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_reload_sends_only_valid_configs() {
        let path = std::env::temp_dir().join(format!("gateway-reload-{}.toml", uuid::Uuid::new_v4()));
        let (tx, mut rx) = mpsc::unbounded_channel();

        fs::write(&path, "[[routes]]\nname = \"a\"\nflow = [ { respond = {} } ]\n").unwrap();
        assert!(reload(&path, &tx));
        assert_eq!(rx.try_recv().unwrap().routes[0].name, "a");

        fs::write(&path, "[[routes]]\nname = \"a\"\nflow = []\n").unwrap();
        assert!(!reload(&path, &tx));
        assert!(rx.try_recv().is_err());

        fs::remove_file(path).unwrap();
    }
}

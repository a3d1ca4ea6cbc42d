//! Configuration file watcher for hot reload.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::{parse_config, ConfigError};
use crate::config::schema::GatewayConfig;

/// A watcher that monitors the configuration file for changes.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<GatewayConfig>,
}

impl ConfigWatcher {
    /// Create a new ConfigWatcher.
    ///
    /// Returns the watcher and a receiver for configuration updates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<GatewayConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching the file. The returned watcher must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx.clone();
        let path = self.path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                    tracing::info!(path = ?path, "Config file change detected, reloading");
                    if let Some(config) = reload(&path) {
                        let _ = tx.send(config);
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "Watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}

/// Re-read `path`. Returns `None` (after logging why) when the new file cannot be
/// used, in which case the running configuration stays in force.
fn reload(path: &Path) -> Option<GatewayConfig> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            tracing::error!(path = ?path, error = %e, "Failed to read config file");
            return None;
        }
    };

    match parse_config(&content) {
        Ok(config) => {
            tracing::info!(
                credentials = config.credentials.len(),
                allowed_addresses = config.admission.allowed_addresses.len(),
                "Reloaded configuration accepted"
            );
            Some(config)
        }
        Err(ConfigError::Validation(errors)) => {
            for error in &errors {
                tracing::error!(path = ?path, error = %error, "Invalid reloaded configuration");
            }
            tracing::warn!(count = errors.len(), "Keeping current configuration");
            None
        }
        Err(e) => {
            tracing::error!(path = ?path, error = %e, "Failed to parse reloaded configuration");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(name: &str, content: &str) -> PathBuf {
        let file = format!("admission-gateway-{}-{name}.toml", std::process::id());
        let path = std::env::temp_dir().join(file);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_reload_accepts_valid_file() {
        let path = write_config(
            "valid",
            r#"
            [admission]
            allowed_addresses = ["10.0.0.5"]

            [[credentials]]
            access_key = "zlx"
            secret_key = "abcdefgh"
            "#,
        );
        let config = reload(&path).unwrap();
        assert_eq!(config.admission.allowed_addresses, vec!["10.0.0.5".to_string()]);
        assert_eq!(config.credentials.len(), 1);
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_reload_rejects_invalid_file() {
        let path = write_config(
            "invalid",
            r#"
            [admission]
            allowed_addresses = []
            replay_window_secs = 0
            "#,
        );
        assert!(reload(&path).is_none());
        std::fs::remove_file(path).unwrap();

        let path = write_config("garbage", "this is [not toml");
        assert!(reload(&path).is_none());
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_reload_missing_file() {
        assert!(reload(Path::new("/nonexistent/admission-gateway.toml")).is_none());
    }
}

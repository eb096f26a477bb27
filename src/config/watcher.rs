//! Configuration file watcher for hot reload.
//!
//! The parent directory is watched rather than the file itself so that
//! editors which save by renaming a temp file over the original keep
//! triggering reloads. Only configurations that parse, validate and differ
//! from the last one published are forwarded.

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::ResilienceConfig;

/// Publishes validated configuration changes for one file.
pub struct ConfigWatcher {
    path: PathBuf,
    last: Arc<Mutex<ResilienceConfig>>,
    update_tx: mpsc::UnboundedSender<ResilienceConfig>,
}

impl ConfigWatcher {
    /// `current` is the configuration already in effect; reloads that
    /// produce an identical configuration are dropped.
    pub fn new(
        path: &Path,
        current: ResilienceConfig,
    ) -> (Self, mpsc::UnboundedReceiver<ResilienceConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                last: Arc::new(Mutex::new(current)),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching. Keep the returned watcher alive for as long as
    /// updates are wanted.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let directory = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file_name = self.path.file_name().map(|n| n.to_os_string());

        let path = self.path.clone();
        let last = self.last.clone();
        let tx = self.update_tx.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if touches(&event, file_name.as_ref()) => {
                    if let Some(config) = reload_if_changed(&path, &last) {
                        let _ = tx.send(config);
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&directory, RecursiveMode::NonRecursive)?;

        tracing::info!(path = %self.path.display(), "Config watcher started");
        Ok(watcher)
    }
}

/// Whether `event` writes or replaces the watched file.
fn touches(event: &Event, file_name: Option<&OsString>) -> bool {
    let relevant = matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Any
    );
    relevant
        && event
            .paths
            .iter()
            .any(|p| p.file_name().map(|n| n.to_os_string()).as_ref() == file_name)
}

/// Load `path` and return it when it is valid and differs from `last`.
fn reload_if_changed(path: &Path, last: &Mutex<ResilienceConfig>) -> Option<ResilienceConfig> {
    let config = match load_config(path) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Config reload failed, keeping current configuration");
            return None;
        }
    };

    let mut last = match last.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    if *last == config {
        tracing::debug!("Config file touched without changes");
        return None;
    }

    tracing::info!(endpoints = config.endpoints.len(), "Config change detected");
    *last = config.clone();
    Some(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, ModifyKind, RemoveKind};
    use std::fs;

    const ONE_ENDPOINT: &str = r#"
        [[endpoints]]
        kind = "rpc"
        address = "https://rpc-a.example.org"
    "#;

    fn temp_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("rpc-failover-watch-{}-{}.toml", tag, std::process::id()))
    }

    #[test]
    fn test_touches_only_the_watched_file() {
        let name = Some(OsString::from("rpc-failover.toml"));
        let hit = Event::new(EventKind::Modify(ModifyKind::Any))
            .add_path(PathBuf::from("/etc/app/rpc-failover.toml"));
        let other = Event::new(EventKind::Create(CreateKind::File))
            .add_path(PathBuf::from("/etc/app/other.toml"));
        let removed = Event::new(EventKind::Remove(RemoveKind::File))
            .add_path(PathBuf::from("/etc/app/rpc-failover.toml"));

        assert!(touches(&hit, name.as_ref()));
        assert!(!touches(&other, name.as_ref()));
        assert!(!touches(&removed, name.as_ref()));
    }

    #[test]
    fn test_unchanged_config_is_not_republished() {
        let path = temp_path("unchanged");
        fs::write(&path, ONE_ENDPOINT).unwrap();
        let current = load_config(&path).unwrap();
        let last = Mutex::new(current);

        assert!(reload_if_changed(&path, &last).is_none());

        fs::write(
            &path,
            format!("{}\n[[endpoints]]\nkind = \"rpc\"\naddress = \"https://rpc-b.example.org\"\n", ONE_ENDPOINT),
        )
        .unwrap();
        let changed = reload_if_changed(&path, &last).unwrap();
        assert_eq!(changed.endpoints.len(), 2);
        assert!(reload_if_changed(&path, &last).is_none());

        fs::remove_file(&path).unwrap_or_default();
    }

    #[test]
    fn test_invalid_config_is_dropped() {
        let path = temp_path("invalid");
        fs::write(&path, "[retry]\nmax_attempts_per_endpoint = 0\n").unwrap();
        let last = Mutex::new(ResilienceConfig::default());

        assert!(reload_if_changed(&path, &last).is_none());
        assert_eq!(*last.lock().unwrap(), ResilienceConfig::default());

        fs::remove_file(&path).unwrap_or_default();
    }
}

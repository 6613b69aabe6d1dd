//! Configuration file watcher for hot reload.
//!
//! # Design Decisions
//! - Watch the parent directory, not the file. Editors that save through a
//!   rename and Kubernetes ConfigMap mounts (a `..data` symlink swap) replace
//!   the inode, and a watch on the file itself dies with the old one
//! - Bursts of events are coalesced before the file is read, so a save that
//!   truncates and then writes is loaded once
//! - Unchanged content is not re-sent
//! - Only configurations that pass validation are forwarded; a broken edit
//!   leaves the running route table untouched

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::parse_config;
use crate::config::schema::ProxyConfig;

/// Quiet period after the last event before the file is read.
const SETTLE: Duration = Duration::from_millis(200);

/// Watches one configuration file and sends every new valid config.
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
        let watcher = Self {
            path: path.to_path_buf(),
            update_tx,
        };
        (watcher, update_rx)
    }

    /// Start watching. Must be called inside a Tokio runtime.
    ///
    /// The returned handle must be kept alive; dropping it stops the watch
    /// and the reload task.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file_name = self.path.file_name().map(OsString::from).ok_or_else(|| {
            notify::Error::generic("config path has no file name").add_path(self.path.clone())
        })?;

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if concerns_config(&event, &file_name) => {
                    let _ = event_tx.send(());
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        let last_applied = fs::read_to_string(&self.path).ok();
        tokio::spawn(reload_loop(self.path.clone(), event_rx, self.update_tx, last_applied));

        tracing::info!(path = %self.path.display(), dir = %dir.display(), "Config watcher started");
        Ok(watcher)
    }
}

/// True if `event` may have changed the watched file.
fn concerns_config(event: &Event, file_name: &OsString) -> bool {
    let relevant_kind = matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) | EventKind::Any
    );
    relevant_kind
        && event.paths.iter().any(|p| {
            p.file_name().is_some_and(|name| {
                name == file_name.as_os_str() || name.to_string_lossy().starts_with("..")
            })
        })
}

async fn reload_loop(
    path: PathBuf,
    mut events: mpsc::UnboundedReceiver<()>,
    updates: mpsc::UnboundedSender<ProxyConfig>,
    mut last_applied: Option<String>,
) {
    while events.recv().await.is_some() {
        tokio::time::sleep(SETTLE).await;
        while events.try_recv().is_ok() {}

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Config file unreadable, keeping current route table");
                continue;
            }
        };
        if last_applied.as_deref() == Some(content.as_str()) {
            tracing::debug!(path = %path.display(), "Config file unchanged");
            continue;
        }

        tracing::info!(path = %path.display(), "Config file change detected, reloading");
        match parse_config(&content) {
            Ok(config) => {
                last_applied = Some(content);
                if updates.send(config).is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Rejected config reload, keeping current route table");
            }
        }
    }
}

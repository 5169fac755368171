//! Privacy flag store: one persisted boolean plus change notifications.
//!
//! `true` means fully disengage (detach the watcher, destroy overlays);
//! `false` means engage. A missing file reads as engaged. External edits to
//! the file are picked up by a filesystem watcher and broadcast on the same
//! channel as local `set` calls.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use thiserror::Error;
use tokio::sync::watch;
use tracing::debug;

#[derive(Debug, Error)]
pub enum PrivacyError {
    #[error("privacy store io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("privacy store watch error: {0}")]
    Watch(String),
}

impl From<notify::Error> for PrivacyError {
    fn from(e: notify::Error) -> Self {
        PrivacyError::Watch(e.to_string())
    }
}

fn read_flag(path: &Path) -> Option<bool> {
    let raw = fs::read_to_string(path).ok()?;
    raw.trim().parse::<bool>().ok()
}

pub struct PrivacyStore {
    path: PathBuf,
    tx: Arc<watch::Sender<bool>>,
    _watcher: RecommendedWatcher,
}

impl PrivacyStore {
    /// Open (creating parent directories as needed) and start watching for
    /// external changes.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PrivacyError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let initial = read_flag(&path).unwrap_or(false);
        let (tx, _rx) = watch::channel(initial);
        let tx = Arc::new(tx);

        let cb_tx = tx.clone();
        let cb_path = path.clone();
        let file_name = path.file_name().map(|n| n.to_os_string());
        let mut watcher =
            notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
                let Ok(event) = res else { return };
                let ours = match &file_name {
                    Some(name) => event
                        .paths
                        .iter()
                        .any(|p| p.file_name() == Some(name.as_os_str())),
                    None => true,
                };
                if !ours {
                    return;
                }
                let value = read_flag(&cb_path).unwrap_or(false);
                cb_tx.send_if_modified(|current| {
                    if *current != value {
                        *current = value;
                        true
                    } else {
                        false
                    }
                });
            })?;

        // Watch the parent directory so atomic replace-writes are seen too.
        let watch_root = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| path.clone());
        watcher.watch(&watch_root, RecursiveMode::NonRecursive)?;

        debug!(path = %path.display(), initial, "privacy store opened");
        Ok(Self {
            path,
            tx,
            _watcher: watcher,
        })
    }

    /// Current flag value. `true` = paused.
    pub fn get(&self) -> bool {
        *self.tx.borrow()
    }

    /// Receiver the engine subscribes to.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    /// Persist and broadcast a new value.
    pub fn set(&self, paused: bool) -> Result<(), PrivacyError> {
        fs::write(&self.path, if paused { "true" } else { "false" })?;
        self.tx.send_if_modified(|current| {
            if *current != paused {
                *current = paused;
                true
            } else {
                false
            }
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_reads_as_engaged() {
        let dir = tempfile::tempdir().unwrap();
        let store = PrivacyStore::open(dir.path().join("privacy")).unwrap();
        assert!(!store.get());
    }

    #[test]
    fn set_persists_and_broadcasts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("privacy");
        let store = PrivacyStore::open(&path).unwrap();
        let rx = store.subscribe();

        store.set(true).unwrap();
        assert!(store.get());
        assert!(*rx.borrow());
        assert_eq!(fs::read_to_string(&path).unwrap(), "true");

        // Reopening sees the persisted value.
        drop(store);
        let reopened = PrivacyStore::open(&path).unwrap();
        assert!(reopened.get());
    }

    #[test]
    fn garbage_content_reads_as_engaged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("privacy");
        fs::write(&path, "maybe?").unwrap();
        let store = PrivacyStore::open(&path).unwrap();
        assert!(!store.get());
    }
}

//! Configuration file watcher for hot reload.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};

use crate::config::reload::ReloadHandle;

/// Turns changes to the configuration file into reload triggers.
///
/// The watcher never loads the file itself; it only queues a request on the
/// reload controller, like SIGHUP does.
pub struct ConfigWatcher {
    path: PathBuf,
    reload: ReloadHandle,
}

impl ConfigWatcher {
    pub fn new(path: &Path, reload: ReloadHandle) -> Self {
        Self {
            path: path.to_path_buf(),
            reload,
        }
    }

    /// Start watching the file in a background thread.
    ///
    /// Watching stops when the returned watcher is dropped.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let reload = self.reload.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        tracing::info!("Config file change detected, reloading...");
                        reload.trigger();
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

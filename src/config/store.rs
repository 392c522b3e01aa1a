//! Shared, hot-swappable configuration.
//!
//! Readers take an `Arc<Config>` snapshot without locking; the reload
//! controller is the only writer and replaces the whole value at once.

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::config::schema::Config;

/// Currently active configuration.
///
/// Cloning is cheap and every clone observes the same generation.
#[derive(Debug, Clone)]
pub struct SafeConfig {
    inner: Arc<ArcSwap<Config>>,
}

impl SafeConfig {
    pub fn new(config: Config) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(config)),
        }
    }

    /// Snapshot of the active configuration.
    pub fn get(&self) -> Arc<Config> {
        self.inner.load_full()
    }

    /// Publish a new configuration to all subsequent readers.
    pub fn replace(&self, config: Config) {
        self.inner.store(Arc::new(config));
    }
}

impl Default for SafeConfig {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{Module, ProberKind};

    fn generation(n: usize) -> Config {
        let mut config = Config::default();
        for i in 0..n {
            config
                .modules
                .insert(format!("gen{n}_{i}"), Module::new(ProberKind::Tcp));
        }
        config
    }

    #[test]
    fn test_snapshot_survives_replace() {
        let store = SafeConfig::new(generation(1));
        let before = store.get();
        store.replace(generation(2));

        assert!(before.module("gen1_0").is_some());
        assert!(store.get().module("gen2_1").is_some());
        assert!(store.get().module("gen1_0").is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_readers_never_see_mixed_generations() {
        let store = SafeConfig::new(generation(1));

        let writer = {
            let store = store.clone();
            tokio::spawn(async move {
                for n in 1..=50 {
                    store.replace(generation(n));
                    tokio::task::yield_now().await;
                }
            })
        };

        let mut readers = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            readers.push(tokio::spawn(async move {
                for _ in 0..200 {
                    let snapshot = store.get();
                    let n = snapshot.modules.len();
                    let prefix = format!("gen{n}_");
                    assert!(snapshot.modules.keys().all(|k| k.starts_with(&prefix)));
                    tokio::task::yield_now().await;
                }
            }));
        }

        writer.await.unwrap();
        for reader in readers {
            reader.await.unwrap();
        }
    }
}

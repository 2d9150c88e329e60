//! Background sweep of expired cache entries.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use super::CacheStore;

/// Handle to a running sweeper task.
///
/// The task stops when [`stop`](Self::stop) is awaited or when the handle
/// is dropped.
#[derive(Debug)]
pub struct SweeperHandle {
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl SweeperHandle {
    /// Whether the sweeper task is still running.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Signal shutdown and wait for the task to finish.
    pub async fn stop(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            warn!("Cache sweeper ended abnormally: {}", e);
        }
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

pub(super) fn spawn(store: CacheStore, period: Duration) -> SweeperHandle {
    let (shutdown, mut shutdown_rx) = watch::channel(false);

    if period.is_zero() {
        warn!("Cache sweep interval is zero, sweeper disabled");
        return SweeperHandle {
            shutdown,
            task: None,
        };
    }

    let task = tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // First tick fires immediately
        ticker.tick().await;

        info!("Cache sweeper started (interval: {:?})", period);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = store.sweep_expired().await;
                    if removed > 0 {
                        debug!("Cache sweep removed {} expired entries", removed);
                    }
                }
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Cache sweeper stopped");
    });

    SweeperHandle {
        shutdown,
        task: Some(task),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{TimeDelta, Utc};

    use crate::cache::{CacheBackend, CacheConfig, CacheEntry, CacheStore, MemoryBackend};

    use super::*;

    fn setup() -> (CacheStore, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        let store = CacheStore::new(
            backend.clone(),
            &CacheConfig::with_ttl(Duration::from_secs(5)),
        );
        (store, backend)
    }

    #[tokio::test]
    async fn test_sweeper_evicts_expired_entries() {
        let (store, backend) = setup();
        backend
            .upsert(CacheEntry::at("stale", b"1".to_vec(), Utc::now() - TimeDelta::seconds(60)))
            .await
            .unwrap();
        store.store("fresh", &2).await;

        let handle = store.start_sweeper(Duration::from_millis(20));
        assert!(handle.is_running());

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(backend.keys(), vec!["fresh".to_string()]);

        handle.stop().await;
    }

    #[tokio::test]
    async fn test_sweeper_leaves_fresh_entries() {
        let (store, backend) = setup();
        store.store("a", &1).await;
        store.store("b", &2).await;

        let handle = store.start_sweeper(Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(60)).await;
        handle.stop().await;

        assert_eq!(backend.keys(), vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn test_stop_ends_task() {
        let (store, backend) = setup();
        let handle = store.start_sweeper(Duration::from_millis(10));
        handle.stop().await;

        // Nothing sweeps after stop
        backend
            .upsert(CacheEntry::at("stale", Vec::new(), Utc::now() - TimeDelta::seconds(60)))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(backend.keys(), vec!["stale".to_string()]);
    }

    #[tokio::test]
    async fn test_zero_interval_disables_sweeper() {
        let (store, _) = setup();
        let handle = store.start_sweeper(Duration::ZERO);
        assert!(!handle.is_running());
        handle.stop().await;
    }
}

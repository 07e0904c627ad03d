//! Read-through cache with expiry and single-flight refresh
//!
//! Shared across concurrent runs. Readers get the cached value while it is
//! fresh. On expiry exactly one caller refreshes; the others return the
//! stale value immediately, or, when nothing is cached yet, wait a bounded
//! time for the in-flight refresh before loading themselves.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::{timeout, Instant};
use tracing::{debug, warn};

struct Entry<T> {
    value: Arc<T>,
    expires_at: Instant,
}

/// Cache of one value with a time-to-live
pub struct RefreshCache<T> {
    ttl: Duration,
    max_wait: Duration,
    entry: RwLock<Option<Entry<T>>>,
    refresh: Mutex<()>,
}

impl<T: Send + Sync> RefreshCache<T> {
    /// Empty cache
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            max_wait: Duration::from_secs(5),
            entry: RwLock::new(None),
            refresh: Mutex::new(()),
        }
    }

    /// Bound on how long a caller waits for someone else's refresh
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    async fn lookup(&self) -> Option<(Arc<T>, bool)> {
        self.entry
            .read()
            .await
            .as_ref()
            .map(|e| (Arc::clone(&e.value), Instant::now() < e.expires_at))
    }

    async fn store(&self, value: T) -> Arc<T> {
        let value = Arc::new(value);
        *self.entry.write().await = Some(Entry {
            value: Arc::clone(&value),
            expires_at: Instant::now() + self.ttl,
        });
        value
    }

    /// Drop the cached value; the next read refreshes
    pub async fn invalidate(&self) {
        *self.entry.write().await = None;
    }

    /// Cached value if fresh, otherwise refresh through `loader`
    ///
    /// A failed refresh keeps serving the stale value when there is one.
    pub async fn get_or_refresh<F, Fut, E>(&self, loader: F) -> Result<Arc<T>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let stale = match self.lookup().await {
            Some((value, true)) => return Ok(value),
            Some((value, false)) => Some(value),
            None => None,
        };

        let _guard = match self.refresh.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                if let Some(value) = stale {
                    debug!("Refresh in flight; serving stale value");
                    return Ok(value);
                }
                match timeout(self.max_wait, self.refresh.lock()).await {
                    Ok(guard) => {
                        if let Some((value, true)) = self.lookup().await {
                            return Ok(value);
                        }
                        guard
                    }
                    Err(_) => {
                        warn!("Timed out waiting for in-flight refresh; loading directly");
                        let value = loader().await?;
                        return Ok(self.store(value).await);
                    }
                }
            }
        };

        // Another caller may have refreshed between our lookup and the lock
        if let Some((value, true)) = self.lookup().await {
            return Ok(value);
        }

        match loader().await {
            Ok(value) => Ok(self.store(value).await),
            Err(e) => match stale {
                Some(value) => {
                    warn!("Refresh failed, serving stale value: {}", e);
                    Ok(value)
                }
                None => Err(e),
            },
        }
    }
}

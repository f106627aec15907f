use crate::config::ForgetfulConfig;
use crate::error::{FilterError, Result};
use crate::filter::{FilterStats, ForgetfulFilter, TickOutcome};
use crate::resize::ResizeOutcome;
use crate::traits::{BulkForgetfulFilterOps, ForgetfulFilterOps};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A [`ForgetfulFilter`] behind one exclusive lock, cheap to clone.
///
/// Refresh, resize and insert all take the write lock, so windows are never
/// rotated or resized in the middle of an insert.
#[derive(Clone)]
pub struct SharedForgetfulFilter {
    inner: Arc<RwLock<ForgetfulFilter>>,
}

impl SharedForgetfulFilter {
    pub fn new(config: ForgetfulConfig) -> Result<Self> {
        Ok(Self::from(ForgetfulFilter::new(config)?))
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, ForgetfulFilter>> {
        self.inner.read().map_err(|_| {
            FilterError::LockError(
                "Failed to acquire read lock on filter".to_string(),
            )
        })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, ForgetfulFilter>> {
        self.inner.write().map_err(|_| {
            FilterError::LockError(
                "Failed to acquire write lock on filter".to_string(),
            )
        })
    }

    pub fn stats(&self) -> Result<FilterStats> {
        Ok(self.read()?.stats())
    }

    /// Runs `f` against the filter under the read lock.
    pub fn with_filter<R>(
        &self,
        f: impl FnOnce(&ForgetfulFilter) -> R,
    ) -> Result<R> {
        let guard = self.read()?;
        Ok(f(&guard))
    }

    /// Spawns a task that ticks the filter every `period`.
    ///
    /// Must be called from within a tokio runtime. The task stops when the
    /// lock is poisoned; abort the returned handle to stop it earlier.
    #[cfg(feature = "runtime")]
    pub fn spawn_refresher(
        &self,
        period: std::time::Duration,
    ) -> Result<tokio::task::JoinHandle<()>> {
        use tokio::time::{MissedTickBehavior, interval};
        use tracing::{debug, error};

        if period.is_zero() {
            return Err(FilterError::InvalidConfig(
                "Refresher period must be greater than 0".into(),
            ));
        }

        let filter = self.clone();
        Ok(tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match ForgetfulFilterOps::tick(&filter) {
                    Ok(outcome) if outcome.refreshed > 0 => {
                        debug!(?outcome, "background refresh");
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!(error = %e, "refresher stopped");
                        break;
                    }
                }
            }
        }))
    }
}

impl From<ForgetfulFilter> for SharedForgetfulFilter {
    fn from(filter: ForgetfulFilter) -> Self {
        Self {
            inner: Arc::new(RwLock::new(filter)),
        }
    }
}

impl ForgetfulFilterOps for SharedForgetfulFilter {
    fn insert(&self, key: u64) -> Result<()> {
        self.write()?.insert(key);
        Ok(())
    }

    fn contains(&self, key: u64) -> Result<bool> {
        Ok(self.read()?.contains(key))
    }

    fn contains_any(&self, key: u64) -> Result<bool> {
        Ok(self.read()?.contains_any(key))
    }

    fn clear(&self) -> Result<()> {
        self.write()?.clear();
        Ok(())
    }

    fn tick(&self) -> Result<TickOutcome> {
        Ok(self.write()?.tick())
    }

    fn maybe_resize(&self) -> Result<ResizeOutcome> {
        Ok(self.write()?.maybe_resize())
    }
}

impl BulkForgetfulFilterOps for SharedForgetfulFilter {
    fn insert_bulk(&self, keys: &[u64]) -> Result<()> {
        self.write()?.insert_bulk(keys);
        Ok(())
    }

    fn contains_bulk(&self, keys: &[u64]) -> Result<Vec<bool>> {
        Ok(self.read()?.contains_bulk(keys))
    }
}

impl std::fmt::Debug for SharedForgetfulFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.inner.try_read() {
            Ok(filter) => write!(f, "SharedForgetfulFilter({filter:?})"),
            Err(_) => write!(f, "SharedForgetfulFilter(<locked>)"),
        }
    }
}

use crate::error::Result;
use crate::filter::TickOutcome;
use crate::resize::ResizeOutcome;
use std::time::Duration;

/// Core operations for a forgetful filter shared between threads
pub trait ForgetfulFilterOps {
    /// Insert a key into the future and present windows
    fn insert(&self, key: u64) -> Result<()>;

    /// Check a key with the correlated (adjacent windows) rule
    fn contains(&self, key: u64) -> Result<bool>;

    /// Check a key with the any-window rule
    fn contains_any(&self, key: u64) -> Result<bool>;

    /// Empty all windows
    fn clear(&self) -> Result<()>;

    /// Refresh if the interval elapsed and run the resize controller
    fn tick(&self) -> Result<TickOutcome>;

    /// Run one resize control tick now
    fn maybe_resize(&self) -> Result<ResizeOutcome>;
}

/// Bulk operations, performed under a single lock acquisition
pub trait BulkForgetfulFilterOps {
    fn insert_bulk(&self, keys: &[u64]) -> Result<()>;
    fn contains_bulk(&self, keys: &[u64]) -> Result<Vec<bool>>;
}

/// Statistics for a forgetful filter
pub trait ForgetfulFilterStats {
    fn window_count(&self) -> usize;
    fn refresh_interval(&self) -> Duration;
    fn total_insert_count(&self) -> u64;
    fn effective_fpr(&self) -> f64;
    fn target_fpr(&self) -> f64;
}

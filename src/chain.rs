//! Windowed chain of Bloom filters.
//!
//! Position 0 is the *future* window, position 1 the *present* window and
//! positions `2..N` are *past* windows in ascending age. Every insert writes
//! to both future and present, so a key always occupies two adjacent windows
//! until the older of the two is evicted.
use crate::bloom::BitFilter;
use crate::error::{FilterError, Result};
use crate::hash::window_seed;
use crate::params::FilterParameters;
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::debug;

pub const MIN_WINDOWS: usize = 3;
pub const FUTURE: usize = 0;
pub const PRESENT: usize = 1;
pub const PAST_START: usize = 2;
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(3);

pub struct WindowChain {
    params: FilterParameters,
    // Ring of windows; front is the future window
    windows: VecDeque<BitFilter>,
    generation: u64,
    refresh_interval: Duration,
    last_refresh: Instant,
    refresh_count: u64,
}

impl WindowChain {
    pub fn new(
        window_count: usize,
        table_bits: u64,
        hash_count: u32,
    ) -> Result<Self> {
        let params = FilterParameters::with_shape(table_bits, hash_count)?;
        Self::from_parameters(window_count, &params)
    }

    pub fn from_parameters(
        window_count: usize,
        params: &FilterParameters,
    ) -> Result<Self> {
        if window_count < MIN_WINDOWS {
            return Err(FilterError::InvalidTopology {
                window_count,
                minimum: MIN_WINDOWS,
            });
        }
        params.validate()?;

        let mut chain = Self {
            params: params.clone(),
            windows: VecDeque::with_capacity(window_count),
            generation: 0,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            last_refresh: Instant::now(),
            refresh_count: 0,
        };
        for _ in 0..window_count {
            let window = chain.fresh_window();
            chain.windows.push_back(window);
        }

        debug!(
            window_count,
            table_bits = params.table_bits,
            hash_count = params.hash_count,
            "window chain initialized"
        );
        Ok(chain)
    }

    pub fn with_refresh_interval(mut self, refresh_interval: Duration) -> Self {
        self.refresh_interval = refresh_interval;
        self
    }

    fn next_seed(&mut self) -> u64 {
        let seed = window_seed(self.params.seed, self.generation);
        self.generation += 1;
        seed
    }

    fn fresh_window(&mut self) -> BitFilter {
        let seed = self.next_seed();
        BitFilter::with_seed(&self.params, seed)
    }

    /// Inserts `key` into the future and present windows.
    pub fn insert(&mut self, key: u64) {
        self.windows[FUTURE].insert(key);
        self.windows[PRESENT].insert(key);
    }

    /// Ages the chain by one epoch.
    ///
    /// Every window moves one step toward the past end, the oldest window's
    /// contents are dropped and a fresh empty window becomes the future. The
    /// evicted filter's allocation is reused, so no bit array is copied.
    pub fn refresh(&mut self) {
        let seed = self.next_seed();
        if let Some(mut oldest) = self.windows.pop_back() {
            oldest.reseed(seed);
            self.windows.push_front(oldest);
        }
        self.refresh_count += 1;
        debug!(refresh_count = self.refresh_count, "window chain refreshed");
    }

    /// Refreshes once for every `refresh_interval` elapsed since the last
    /// refresh and returns the number of epochs aged.
    ///
    /// Catch-up is capped at the window count, after which every window has
    /// been replaced anyway.
    pub fn refresh_if_due(&mut self, now: Instant) -> usize {
        let elapsed = now.saturating_duration_since(self.last_refresh);
        if self.refresh_interval.is_zero() || elapsed < self.refresh_interval {
            return 0;
        }

        let due = elapsed.as_nanos() / self.refresh_interval.as_nanos();
        let epochs = usize::try_from(due)
            .unwrap_or(usize::MAX)
            .min(self.windows.len());
        for _ in 0..epochs {
            self.refresh();
        }
        self.last_refresh = now;
        epochs
    }

    /// Grows by appending empty windows at the past end, or shrinks by
    /// dropping the oldest windows.
    pub fn resize_to(&mut self, new_count: usize) -> Result<()> {
        if new_count < MIN_WINDOWS {
            return Err(FilterError::BelowMinimum {
                requested: new_count,
                minimum: MIN_WINDOWS,
            });
        }

        let old_count = self.windows.len();
        if new_count > old_count {
            self.windows.reserve(new_count - old_count);
            while self.windows.len() < new_count {
                let window = self.fresh_window();
                self.windows.push_back(window);
            }
        } else {
            self.windows.truncate(new_count);
        }

        debug!(old_count, new_count, "window chain resized");
        Ok(())
    }

    /// Empties every window without changing the topology.
    pub fn clear(&mut self) {
        for window in self.windows.iter_mut() {
            window.clear();
        }
    }

    pub fn window(&self, index: usize) -> Result<&BitFilter> {
        self.windows.get(index).ok_or(FilterError::WindowOutOfRange {
            index,
            window_count: self.windows.len(),
        })
    }

    pub fn windows(&self) -> impl ExactSizeIterator<Item = &BitFilter> {
        self.windows.iter()
    }

    pub fn window_count(&self) -> usize {
        self.windows.len()
    }

    /// Index of the oldest window.
    pub fn past_end(&self) -> usize {
        self.windows.len() - 1
    }

    pub fn params(&self) -> &FilterParameters {
        &self.params
    }

    pub fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }

    pub fn set_refresh_interval(&mut self, refresh_interval: Duration) {
        self.refresh_interval = refresh_interval;
    }

    pub fn last_refresh(&self) -> Instant {
        self.last_refresh
    }

    /// Restarts the refresh clock without aging the chain.
    pub fn mark_refreshed(&mut self, now: Instant) {
        self.last_refresh = now;
    }

    pub fn refresh_count(&self) -> u64 {
        self.refresh_count
    }

    /// Bytes held by the bit arrays of all windows.
    pub fn memory_bytes(&self) -> u64 {
        self.params.window_bytes() * self.windows.len() as u64
    }
}

impl std::fmt::Debug for WindowChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "WindowChain {{ window_count: {}, table_bits: {}, hash_count: {}, refresh_interval: {:?}, refresh_count: {} }}",
            self.windows.len(),
            self.params.table_bits,
            self.params.hash_count,
            self.refresh_interval,
            self.refresh_count
        )
    }
}

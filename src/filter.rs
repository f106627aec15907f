use crate::chain::WindowChain;
use crate::classifier::{FprMeasurement, MembershipClassifier};
use crate::config::ForgetfulConfig;
use crate::error::Result;
use crate::estimator::{WindowStats, dumb_fpr, effective_fpr_with, window_stats};
use crate::resize::{ResizeController, ResizeOutcome};
use crate::traits::ForgetfulFilterStats;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::debug;

/// What a single [`ForgetfulFilter::tick_at`] did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickOutcome {
    /// Epochs aged by this tick
    pub refreshed: usize,
    /// Result of the control tick, when one ran
    pub resize: Option<ResizeOutcome>,
}

/// Point-in-time view of a filter
#[derive(Clone, Debug, Serialize)]
pub struct FilterStats {
    pub window_count: usize,
    pub table_bits: u64,
    pub hash_count: u32,
    pub refresh_interval: Duration,
    pub refresh_count: u64,
    pub insert_count: u64,
    pub memory_bytes: u64,
    pub effective_fpr: f64,
    pub dumb_fpr: f64,
    pub target_fpr: f64,
    pub windows: Vec<WindowStats>,
}

/// A window chain driven by the wall clock, with optional adaptive resizing.
///
/// Every insert first ages the chain if a refresh is due. After each refresh
/// the resize controller runs once against the configured target rate, when
/// `adaptive` is set.
pub struct ForgetfulFilter {
    config: ForgetfulConfig,
    chain: WindowChain,
    controller: ResizeController,
    insert_count: u64,
}

impl ForgetfulFilter {
    pub fn new(config: ForgetfulConfig) -> Result<Self> {
        config.validate()?;

        let params = config.filter_parameters()?;
        let chain =
            WindowChain::from_parameters(config.initial_window_count, &params)?
                .with_refresh_interval(config.refresh_interval);
        let controller = ResizeController::new(config.resize_policy.clone())?;

        Ok(Self {
            config,
            chain,
            controller,
            insert_count: 0,
        })
    }

    pub fn insert(&mut self, key: u64) {
        self.insert_at(key, Instant::now());
    }

    pub fn insert_at(&mut self, key: u64, now: Instant) {
        self.tick_at(now);
        self.chain.insert(key);
        self.insert_count += 1;
    }

    pub fn insert_bulk(&mut self, keys: &[u64]) {
        self.tick_at(Instant::now());
        for &key in keys {
            self.chain.insert(key);
        }
        self.insert_count += keys.len() as u64;
    }

    /// Correlated rule, honouring the configured oldest-window policy.
    pub fn contains(&self, key: u64) -> bool {
        self.classifier().contains_correlated(key)
    }

    pub fn contains_any(&self, key: u64) -> bool {
        self.chain.contains_any(key)
    }

    pub fn contains_bulk(&self, keys: &[u64]) -> Vec<bool> {
        let classifier = self.classifier();
        keys.iter()
            .map(|&key| classifier.contains_correlated(key))
            .collect()
    }

    pub fn tick(&mut self) -> TickOutcome {
        self.tick_at(Instant::now())
    }

    pub fn tick_at(&mut self, now: Instant) -> TickOutcome {
        let refreshed = self.chain.refresh_if_due(now);
        if refreshed == 0 {
            return TickOutcome::default();
        }

        let resize = self.config.adaptive.then(|| self.maybe_resize());
        debug!(refreshed, ?resize, "filter tick");
        TickOutcome { refreshed, resize }
    }

    /// Ages the chain by one epoch regardless of the clock.
    pub fn refresh(&mut self) {
        self.chain.refresh();
    }

    /// Runs one control tick against the configured target rate.
    pub fn maybe_resize(&mut self) -> ResizeOutcome {
        let estimate = self.effective_fpr();
        self.controller.tick_with_estimate(
            &mut self.chain,
            estimate,
            self.config.target_fpr,
        )
    }

    pub fn effective_fpr(&self) -> f64 {
        effective_fpr_with(&self.chain, self.config.oldest_window)
    }

    pub fn dumb_fpr(&self) -> f64 {
        dumb_fpr(&self.chain)
    }

    pub fn classifier(&self) -> MembershipClassifier<'_> {
        self.chain
            .classifier()
            .with_oldest_policy(self.config.oldest_window)
    }

    /// Measures both rules over keys that were never inserted.
    pub fn measure<I>(&self, keys: I) -> Result<FprMeasurement>
    where
        I: IntoIterator<Item = u64>,
    {
        self.classifier().measure(keys)
    }

    pub fn clear(&mut self) {
        self.chain.clear();
        self.chain.mark_refreshed(Instant::now());
        self.insert_count = 0;
    }

    pub fn stats(&self) -> FilterStats {
        let params = self.chain.params();
        FilterStats {
            window_count: self.chain.window_count(),
            table_bits: params.table_bits,
            hash_count: params.hash_count,
            refresh_interval: self.chain.refresh_interval(),
            refresh_count: self.chain.refresh_count(),
            insert_count: self.insert_count,
            memory_bytes: self.chain.memory_bytes(),
            effective_fpr: self.effective_fpr(),
            dumb_fpr: self.dumb_fpr(),
            target_fpr: self.config.target_fpr,
            windows: window_stats(&self.chain),
        }
    }

    pub fn chain(&self) -> &WindowChain {
        &self.chain
    }

    pub fn config(&self) -> &ForgetfulConfig {
        &self.config
    }
}

impl ForgetfulFilterStats for ForgetfulFilter {
    fn window_count(&self) -> usize {
        self.chain.window_count()
    }

    fn refresh_interval(&self) -> Duration {
        self.chain.refresh_interval()
    }

    fn total_insert_count(&self) -> u64 {
        self.insert_count
    }

    fn effective_fpr(&self) -> f64 {
        ForgetfulFilter::effective_fpr(self)
    }

    fn target_fpr(&self) -> f64 {
        self.config.target_fpr
    }
}

impl std::fmt::Debug for ForgetfulFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ForgetfulFilter {{ chain: {:?}, target_fpr: {}, adaptive: {}, insert_count: {} }}",
            self.chain,
            self.config.target_fpr,
            self.config.adaptive,
            self.insert_count
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ForgetfulConfigBuilder;

    fn filter(adaptive: bool) -> ForgetfulFilter {
        let config = ForgetfulConfigBuilder::default()
            .table_bits(1 << 16)
            .hash_count(3)
            .refresh_interval(Duration::from_secs(10))
            .adaptive(adaptive)
            .build()
            .expect("Unable to build ForgetfulConfig");
        ForgetfulFilter::new(config).expect("Failed to create ForgetfulFilter")
    }

    #[test]
    fn test_insert_at_ages_by_clock() {
        let mut filter = filter(false);
        let start = filter.chain().last_refresh();

        filter.insert_at(1, start);
        assert!(filter.contains(1));

        // Three epochs later the key has left a three-window chain
        filter.insert_at(2, start + Duration::from_secs(30));
        assert!(!filter.contains_any(1));
        assert!(filter.contains(2));
        assert_eq!(filter.chain().refresh_count(), 3);
    }

    #[test]
    fn test_tick_without_refresh_skips_control() {
        let mut filter = filter(true);
        let start = filter.chain().last_refresh();
        assert_eq!(
            filter.tick_at(start + Duration::from_secs(1)),
            TickOutcome::default()
        );
    }

    #[test]
    fn test_tick_runs_control_after_refresh() {
        let mut filter = filter(true);
        let start = filter.chain().last_refresh();
        let outcome = filter.tick_at(start + Duration::from_secs(10));
        assert_eq!(outcome.refreshed, 1);
        // An empty 3-window chain wants to shrink but cannot
        assert_eq!(outcome.resize, Some(ResizeOutcome::BelowMinimum));
        assert_eq!(filter.chain().window_count(), 3);
    }

    #[test]
    fn test_clear_resets_counts() {
        let mut filter = filter(false);
        filter.insert_bulk(&[1, 2, 3]);
        assert_eq!(filter.total_insert_count(), 3);
        filter.clear();
        assert_eq!(filter.total_insert_count(), 0);
        assert!(!filter.contains_any(1));
    }

    #[test]
    fn test_stats_snapshot() {
        let mut filter = filter(false);
        filter.insert_bulk(&[10, 20]);
        let stats = filter.stats();
        assert_eq!(stats.window_count, 3);
        assert_eq!(stats.table_bits, 1 << 16);
        assert_eq!(stats.insert_count, 2);
        assert_eq!(stats.windows.len(), 3);
        assert!(stats.effective_fpr > 0.0);
        assert_eq!(filter.contains_bulk(&[10, 20]), vec![true, true]);
    }
}

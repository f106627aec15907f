//! AIMD resizing of a [`WindowChain`].
//!
//! When the effective false positive rate approaches the target the window
//! count is multiplied and the refresh interval shortened; when it falls well
//! below the target one window is dropped and the interval lengthened.
use crate::chain::{MIN_WINDOWS, WindowChain};
use crate::error::{FilterError, Result};
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_GROW_THRESHOLD: f64 = 0.8;
pub const DEFAULT_SHRINK_THRESHOLD: f64 = 0.5;

#[derive(Clone, Debug, PartialEq, Builder, Serialize, Deserialize)]
#[builder(pattern = "owned")]
pub struct ResizePolicy {
    /// Grow when `effective_fpr >= grow_threshold * target`
    #[builder(default = "DEFAULT_GROW_THRESHOLD")]
    pub grow_threshold: f64,

    /// Shrink when `effective_fpr <= shrink_threshold * target`
    #[builder(default = "DEFAULT_SHRINK_THRESHOLD")]
    pub shrink_threshold: f64,

    /// Multiplier applied to the window count on growth
    #[builder(default = "2")]
    pub growth_factor: usize,

    /// Windows removed on each shrink
    #[builder(default = "1")]
    pub shrink_step: usize,

    /// Refresh interval adjustment per resize
    #[builder(default = "Duration::from_secs(1)")]
    pub interval_step: Duration,

    #[builder(default = "Duration::from_secs(1)")]
    pub min_refresh_interval: Duration,

    #[builder(default = "Duration::from_secs(60 * 60)")]
    pub max_refresh_interval: Duration,

    #[builder(default = "1024")]
    pub max_window_count: usize,
}

impl Default for ResizePolicy {
    fn default() -> Self {
        Self {
            grow_threshold: DEFAULT_GROW_THRESHOLD,
            shrink_threshold: DEFAULT_SHRINK_THRESHOLD,
            growth_factor: 2,
            shrink_step: 1,
            interval_step: Duration::from_secs(1),
            min_refresh_interval: Duration::from_secs(1),
            max_refresh_interval: Duration::from_secs(60 * 60),
            max_window_count: 1024,
        }
    }
}

impl ResizePolicy {
    pub fn validate(&self) -> Result<()> {
        if !(self.shrink_threshold > 0.0
            && self.shrink_threshold < self.grow_threshold)
        {
            return Err(FilterError::InvalidConfig(format!(
                "shrink threshold ({}) must be > 0 and below the grow threshold ({})",
                self.shrink_threshold, self.grow_threshold
            )));
        }
        if !self.grow_threshold.is_finite() {
            return Err(FilterError::InvalidConfig(
                "grow threshold must be finite".into(),
            ));
        }
        if self.growth_factor < 2 {
            return Err(FilterError::InvalidConfig(
                "growth factor must be at least 2".into(),
            ));
        }
        if self.shrink_step == 0 {
            return Err(FilterError::InvalidConfig(
                "shrink step must be greater than 0".into(),
            ));
        }
        if self.min_refresh_interval.is_zero()
            || self.min_refresh_interval > self.max_refresh_interval
        {
            return Err(FilterError::InvalidConfig(
                "refresh interval bounds must satisfy 0 < min <= max".into(),
            ));
        }
        if self.max_window_count < MIN_WINDOWS {
            return Err(FilterError::InvalidConfig(format!(
                "max window count must be at least {MIN_WINDOWS}"
            )));
        }
        Ok(())
    }
}

/// What the controller wants to do for a given estimate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResizeDecision {
    Grow,
    Shrink,
    Hold,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ResizeOutcome {
    Grew,
    Shrunk,
    Unchanged,
    /// Shrinking would leave fewer than three windows; nothing was changed.
    BelowMinimum,
}

#[derive(Clone, Debug, Default)]
pub struct ResizeController {
    policy: ResizePolicy,
}

impl ResizeController {
    pub fn new(policy: ResizePolicy) -> Result<Self> {
        policy.validate()?;
        Ok(Self { policy })
    }

    pub fn policy(&self) -> &ResizePolicy {
        &self.policy
    }

    pub fn decide(&self, effective_fpr: f64, target_fpr: f64) -> ResizeDecision {
        if !(target_fpr > 0.0 && target_fpr.is_finite()) {
            return ResizeDecision::Hold;
        }
        if effective_fpr >= self.policy.grow_threshold * target_fpr {
            ResizeDecision::Grow
        } else if effective_fpr <= self.policy.shrink_threshold * target_fpr {
            ResizeDecision::Shrink
        } else {
            ResizeDecision::Hold
        }
    }

    /// One control tick using the chain's own effective FPR.
    pub fn tick(&self, chain: &mut WindowChain, target_fpr: f64) -> ResizeOutcome {
        let estimate = chain.effective_fpr();
        self.tick_with_estimate(chain, estimate, target_fpr)
    }

    pub fn tick_with_estimate(
        &self,
        chain: &mut WindowChain,
        effective_fpr: f64,
        target_fpr: f64,
    ) -> ResizeOutcome {
        let decision = self.decide(effective_fpr, target_fpr);
        debug!(effective_fpr, target_fpr, ?decision, "resize control tick");

        match decision {
            ResizeDecision::Grow => self.grow(chain),
            ResizeDecision::Shrink => self.shrink(chain),
            ResizeDecision::Hold => ResizeOutcome::Unchanged,
        }
    }

    fn grow(&self, chain: &mut WindowChain) -> ResizeOutcome {
        let current = chain.window_count();
        let target = current
            .saturating_mul(self.policy.growth_factor)
            .min(self.policy.max_window_count);
        if target <= current {
            warn!(
                window_count = current,
                max_window_count = self.policy.max_window_count,
                "window chain already at maximum size"
            );
            return ResizeOutcome::Unchanged;
        }
        if chain.resize_to(target).is_err() {
            return ResizeOutcome::BelowMinimum;
        }

        let interval = chain.refresh_interval();
        let shortened = interval
            .saturating_sub(self.policy.interval_step)
            .max(self.policy.min_refresh_interval)
            .min(interval);
        chain.set_refresh_interval(shortened);

        info!(
            from = current,
            to = target,
            refresh_interval = ?shortened,
            "window chain grown"
        );
        ResizeOutcome::Grew
    }

    fn shrink(&self, chain: &mut WindowChain) -> ResizeOutcome {
        let current = chain.window_count();
        let target = match current.checked_sub(self.policy.shrink_step) {
            Some(target) if target >= MIN_WINDOWS => target,
            _ => {
                debug!(window_count = current, "shrink refused at minimum size");
                return ResizeOutcome::BelowMinimum;
            }
        };
        if chain.resize_to(target).is_err() {
            return ResizeOutcome::BelowMinimum;
        }

        let interval = chain.refresh_interval();
        let lengthened = interval
            .saturating_add(self.policy.interval_step)
            .min(self.policy.max_refresh_interval)
            .max(interval);
        chain.set_refresh_interval(lengthened);

        info!(
            from = current,
            to = target,
            refresh_interval = ?lengthened,
            "window chain shrunk"
        );
        ResizeOutcome::Shrunk
    }
}

impl WindowChain {
    /// Runs one control tick with the default [`ResizePolicy`].
    pub fn maybe_resize(&mut self, target_fpr: f64) -> ResizeOutcome {
        ResizeController::default().tick(self, target_fpr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_thresholds() {
        let controller = ResizeController::default();
        assert_eq!(controller.decide(0.008, 0.01), ResizeDecision::Grow);
        assert_eq!(controller.decide(0.02, 0.01), ResizeDecision::Grow);
        assert_eq!(controller.decide(0.005, 0.01), ResizeDecision::Shrink);
        assert_eq!(controller.decide(0.0, 0.01), ResizeDecision::Shrink);
        assert_eq!(controller.decide(0.006, 0.01), ResizeDecision::Hold);
        assert_eq!(controller.decide(0.5, f64::NAN), ResizeDecision::Hold);
        assert_eq!(controller.decide(0.5, 0.0), ResizeDecision::Hold);
    }

    #[test]
    fn test_policy_builder_defaults() {
        let policy = ResizePolicyBuilder::default().build().unwrap();
        assert_eq!(policy, ResizePolicy::default());
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn test_policy_validation() {
        let inverted = ResizePolicyBuilder::default()
            .grow_threshold(0.4)
            .shrink_threshold(0.5)
            .build()
            .unwrap();
        assert!(ResizeController::new(inverted).is_err());

        let flat = ResizePolicyBuilder::default()
            .growth_factor(1)
            .build()
            .unwrap();
        assert!(flat.validate().is_err());

        let tiny = ResizePolicyBuilder::default()
            .max_window_count(2)
            .build()
            .unwrap();
        assert!(tiny.validate().is_err());
    }

    #[test]
    fn test_grow_respects_max_window_count() {
        let policy = ResizePolicyBuilder::default()
            .max_window_count(5)
            .build()
            .unwrap();
        let controller = ResizeController::new(policy).unwrap();
        let mut chain = WindowChain::new(3, 1024, 3).unwrap();

        assert_eq!(
            controller.tick_with_estimate(&mut chain, 1.0, 0.01),
            ResizeOutcome::Grew
        );
        assert_eq!(chain.window_count(), 5);
        assert_eq!(
            controller.tick_with_estimate(&mut chain, 1.0, 0.01),
            ResizeOutcome::Unchanged
        );
        assert_eq!(chain.window_count(), 5);
    }

    #[test]
    fn test_interval_bounds() {
        let controller = ResizeController::default();
        let mut chain = WindowChain::new(3, 1024, 3)
            .unwrap()
            .with_refresh_interval(Duration::from_millis(1500));

        controller.tick_with_estimate(&mut chain, 1.0, 0.01);
        assert_eq!(chain.refresh_interval(), Duration::from_secs(1));
        controller.tick_with_estimate(&mut chain, 1.0, 0.01);
        assert_eq!(chain.refresh_interval(), Duration::from_secs(1));

        controller.tick_with_estimate(&mut chain, 0.0, 0.01);
        assert_eq!(chain.refresh_interval(), Duration::from_secs(2));
    }
}

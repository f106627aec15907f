//! Analytic false positive estimates computed from window occupancy alone.
use crate::bloom::BitFilter;
use crate::chain::WindowChain;
use crate::classifier::OldestWindowPolicy;
use serde::Serialize;

/// Effective false positive rate of the smart rule.
///
/// Windows are treated as independent events following the same adjacency
/// structure as the rule itself:
/// `fpp(0)·fpp(1) + Σ fpp(j)·fpp(j+1) + fpp(oldest)`.
pub fn effective_fpr(chain: &WindowChain) -> f64 {
    effective_fpr_with(chain, OldestWindowPolicy::Hit)
}

pub fn effective_fpr_with(
    chain: &WindowChain,
    oldest: OldestWindowPolicy,
) -> f64 {
    let fpps: Vec<f64> =
        chain.windows().map(BitFilter::fpp_from_occupancy).collect();

    let pairs: f64 = fpps.windows(2).map(|pair| pair[0] * pair[1]).sum();
    match (oldest, fpps.last()) {
        (OldestWindowPolicy::Hit, Some(last)) => pairs + last,
        _ => pairs,
    }
}

/// Estimated false positive rate of the dumb rule, `1 - Π(1 - fpp(i))`.
pub fn dumb_fpr(chain: &WindowChain) -> f64 {
    1.0 - chain
        .windows()
        .map(|window| 1.0 - window.fpp_from_occupancy())
        .product::<f64>()
}

/// Occupancy snapshot of one window.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WindowStats {
    pub index: usize,
    pub ones: u64,
    pub occupancy: f64,
    pub fpp: f64,
}

pub fn window_stats(chain: &WindowChain) -> Vec<WindowStats> {
    chain
        .windows()
        .enumerate()
        .map(|(index, window)| WindowStats {
            index,
            ones: window.ones(),
            occupancy: window.occupancy(),
            fpp: window.fpp_from_occupancy(),
        })
        .collect()
}

impl WindowChain {
    pub fn effective_fpr(&self) -> f64 {
        effective_fpr(self)
    }

    pub fn dumb_fpr(&self) -> f64 {
        dumb_fpr(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_chain_estimates_zero() {
        let chain = WindowChain::new(4, 6250, 3).unwrap();
        assert_eq!(chain.effective_fpr(), 0.0);
        assert_eq!(chain.dumb_fpr(), 0.0);
    }

    #[test]
    fn test_effective_fpr_matches_formula() {
        let mut chain = WindowChain::new(4, 6250, 3).unwrap();
        for key in 0..500 {
            chain.insert(key);
        }
        chain.refresh();
        for key in 500..800 {
            chain.insert(key);
        }

        let f: Vec<f64> = chain.windows().map(|w| w.fpp_from_occupancy()).collect();
        let expected = f[0] * f[1] + f[1] * f[2] + f[2] * f[3] + f[3];
        assert!((chain.effective_fpr() - expected).abs() < 1e-12);

        let ignored = effective_fpr_with(&chain, OldestWindowPolicy::Ignore);
        assert!((ignored - (expected - f[3])).abs() < 1e-12);
    }

    #[test]
    fn test_oldest_window_term_dominates_once_aged() {
        let mut chain = WindowChain::new(3, 6250, 3).unwrap();
        for key in 0..1000 {
            chain.insert(key);
        }
        chain.refresh();
        chain.refresh();
        // Only the oldest window holds data
        let oldest = chain.window(2).unwrap().fpp_from_occupancy();
        assert!(oldest > 0.0);
        assert!((chain.effective_fpr() - oldest).abs() < 1e-12);
        assert!((chain.dumb_fpr() - oldest).abs() < 1e-12);
    }

    #[test]
    fn test_window_stats() {
        let mut chain = WindowChain::new(3, 6250, 3).unwrap();
        chain.insert(1);
        let stats = window_stats(&chain);
        assert_eq!(stats.len(), 3);
        assert!(stats[0].ones > 0);
        assert_eq!(stats[2].ones, 0);
        assert_eq!(stats[2].fpp, 0.0);
    }
}

//! Membership rules over a [`WindowChain`].
//!
//! The *dumb* rule accepts a key when any window contains it. The *smart*
//! rule accepts a key only when two temporally adjacent windows both contain
//! it, checked from the future end toward the past end, with the oldest
//! window allowed to count on its own since it has no older partner.
use crate::chain::{PAST_START, PRESENT, WindowChain};
use crate::error::{FilterError, Result};
use serde::{Deserialize, Serialize};

/// How the smart rule treats a hit in the oldest window with no
/// corroborating younger neighbour.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OldestWindowPolicy {
    /// A lone hit in the oldest window is a hit. Keys stay visible for the
    /// full lifetime of the chain.
    #[default]
    Hit,
    /// A lone hit in the oldest window is ignored. Keys become invisible one
    /// refresh earlier, in exchange for a lower false positive rate.
    Ignore,
}

/// Which clause of the smart rule accepted a key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CorrelatedMatch {
    FuturePresent,
    PresentPast,
    /// Adjacent past windows `(j, j + 1)`.
    PastPair(usize),
    OldestAlone,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClassificationResult {
    TrueNegative,
    /// Only the dumb rule accepted the key.
    FalsePositiveDumb,
    /// The smart rule accepted the key, and therefore the dumb rule as well.
    FalsePositiveSmart,
}

#[derive(Clone, Copy, Debug)]
pub struct MembershipClassifier<'a> {
    chain: &'a WindowChain,
    oldest: OldestWindowPolicy,
}

impl<'a> MembershipClassifier<'a> {
    pub fn new(chain: &'a WindowChain) -> Self {
        Self {
            chain,
            oldest: OldestWindowPolicy::default(),
        }
    }

    pub fn with_oldest_policy(mut self, oldest: OldestWindowPolicy) -> Self {
        self.oldest = oldest;
        self
    }

    pub fn contains_any(&self, key: u64) -> bool {
        self.chain.windows().any(|window| window.contains(key))
    }

    pub fn contains_correlated(&self, key: u64) -> bool {
        self.match_correlated(key).is_some()
    }

    /// Evaluates the smart rule and reports the first clause that matched.
    pub fn match_correlated(&self, key: u64) -> Option<CorrelatedMatch> {
        let mut windows = self.chain.windows().enumerate();
        let (_, future) = windows.next()?;
        let mut previous = future.contains(key);

        for (index, window) in windows {
            let current = window.contains(key);
            if previous && current {
                return Some(match index {
                    PRESENT => CorrelatedMatch::FuturePresent,
                    PAST_START => CorrelatedMatch::PresentPast,
                    _ => CorrelatedMatch::PastPair(index - 1),
                });
            }
            previous = current;
        }

        // `previous` now holds the oldest window's answer
        match self.oldest {
            OldestWindowPolicy::Hit if previous => {
                Some(CorrelatedMatch::OldestAlone)
            }
            _ => None,
        }
    }

    /// Classifies a key that is known never to have been inserted.
    pub fn classify(&self, key: u64) -> ClassificationResult {
        if self.contains_correlated(key) {
            ClassificationResult::FalsePositiveSmart
        } else if self.contains_any(key) {
            ClassificationResult::FalsePositiveDumb
        } else {
            ClassificationResult::TrueNegative
        }
    }

    /// Counts false positives of both rules over keys that were never
    /// inserted.
    pub fn measure<I>(&self, keys: I) -> Result<FprMeasurement>
    where
        I: IntoIterator<Item = u64>,
    {
        let mut measurement = FprMeasurement::default();
        for key in keys {
            measurement.record(self.classify(key));
        }
        if measurement.queries == 0 {
            return Err(FilterError::EmptyQuerySet);
        }
        Ok(measurement)
    }
}

/// False positive counts of both rules over one query set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FprMeasurement {
    queries: u64,
    dumb_false_positives: u64,
    smart_false_positives: u64,
}

impl FprMeasurement {
    fn record(&mut self, result: ClassificationResult) {
        self.queries += 1;
        match result {
            ClassificationResult::TrueNegative => {}
            ClassificationResult::FalsePositiveDumb => {
                self.dumb_false_positives += 1;
            }
            ClassificationResult::FalsePositiveSmart => {
                self.dumb_false_positives += 1;
                self.smart_false_positives += 1;
            }
        }
    }

    pub fn queries(&self) -> u64 {
        self.queries
    }

    pub fn dumb_false_positives(&self) -> u64 {
        self.dumb_false_positives
    }

    pub fn smart_false_positives(&self) -> u64 {
        self.smart_false_positives
    }

    /// Dumb-rule false positive rate, `0.0` when nothing was queried.
    pub fn dumb_rate(&self) -> f64 {
        self.rate(self.dumb_false_positives)
    }

    /// Smart-rule false positive rate, `0.0` when nothing was queried.
    pub fn smart_rate(&self) -> f64 {
        self.rate(self.smart_false_positives)
    }

    fn rate(&self, false_positives: u64) -> f64 {
        if self.queries == 0 {
            return 0.0;
        }
        false_positives as f64 / self.queries as f64
    }
}

impl WindowChain {
    /// Dumb rule: any window contains `key`.
    pub fn contains_any(&self, key: u64) -> bool {
        MembershipClassifier::new(self).contains_any(key)
    }

    /// Smart rule: two adjacent windows contain `key`, or the oldest window
    /// does on its own.
    pub fn contains_correlated(&self, key: u64) -> bool {
        MembershipClassifier::new(self).contains_correlated(key)
    }

    pub fn classifier(&self) -> MembershipClassifier<'_> {
        MembershipClassifier::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Shape large enough that a handful of keys never collide in practice
    fn chain(window_count: usize) -> WindowChain {
        WindowChain::new(window_count, 1 << 16, 3).unwrap()
    }

    #[test]
    fn test_fresh_insert_matches_future_present() {
        let mut chain = chain(4);
        chain.insert(1);
        assert_eq!(
            chain.classifier().match_correlated(1),
            Some(CorrelatedMatch::FuturePresent)
        );
    }

    #[test]
    fn test_clause_progression_through_refreshes() {
        let mut chain = chain(5);
        chain.insert(1);
        let expected = [
            Some(CorrelatedMatch::FuturePresent),
            Some(CorrelatedMatch::PresentPast),
            Some(CorrelatedMatch::PastPair(2)),
            Some(CorrelatedMatch::PastPair(3)),
            Some(CorrelatedMatch::OldestAlone),
            None,
        ];
        for clause in expected {
            assert_eq!(chain.classifier().match_correlated(1), clause);
            chain.refresh();
        }
    }

    #[test]
    fn test_oldest_alone_ignored() {
        let mut chain = chain(3);
        chain.insert(9);
        chain.refresh();
        chain.refresh();
        // Only the oldest window still holds the key
        assert!(chain.contains_any(9));
        assert!(chain.contains_correlated(9));
        assert!(
            !chain
                .classifier()
                .with_oldest_policy(OldestWindowPolicy::Ignore)
                .contains_correlated(9)
        );
    }

    #[test]
    fn test_classify_empty_chain() {
        let chain = chain(3);
        assert_eq!(
            chain.classifier().classify(3),
            ClassificationResult::TrueNegative
        );
    }

    #[test]
    fn test_measure_empty_query_set() {
        let chain = chain(3);
        assert_eq!(
            chain.classifier().measure(std::iter::empty()),
            Err(FilterError::EmptyQuerySet)
        );
    }

    #[test]
    fn test_measurement_counts() {
        let mut m = FprMeasurement::default();
        m.record(ClassificationResult::TrueNegative);
        m.record(ClassificationResult::FalsePositiveDumb);
        m.record(ClassificationResult::FalsePositiveSmart);
        m.record(ClassificationResult::TrueNegative);
        assert_eq!(m.queries(), 4);
        assert_eq!(m.dumb_false_positives(), 2);
        assert_eq!(m.smart_false_positives(), 1);
        assert_eq!(m.dumb_rate(), 0.5);
        assert_eq!(m.smart_rate(), 0.25);
    }

    #[test]
    fn test_empty_measurement_rates_are_zero() {
        let m = FprMeasurement::default();
        assert_eq!(m.dumb_rate(), 0.0);
        assert_eq!(m.smart_rate(), 0.0);
        assert!(!m.dumb_rate().is_nan());
    }
}

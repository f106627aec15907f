//! Forgetful Bloom Filter: approximate "was X seen recently?" membership with
//! bounded memory.
//!
//! HowTo:
//!    * Windows: the filter is a chain of N >= 3 Bloom filters, each standing
//!      for one epoch: `future`, `present`, then `past_1 .. past_end`.
//!    * Rotation: every refresh interval the chain ages by one epoch. Windows
//!      shift toward the past end, the oldest one is dropped and an empty
//!      window becomes the new future.
//!
//! Insertion:
//!     * A key is written into both the future and the present window, so it
//!       always lives in two adjacent windows until the older one is evicted.
//! Query:
//!     * Dumb rule: the key is present if any window contains it.
//!     * Smart rule: the key is present if two adjacent windows contain it, or
//!       the oldest window does on its own. A random collision rarely hits the
//!       same adjacent pair, so this rule has a much lower false positive rate.
//! Resizing:
//!     * The effective false positive rate is estimated from window occupancy
//!       in O(N). Near the target the window count is doubled and the refresh
//!       interval shortened; well below it one window is dropped and the
//!       interval lengthened.
//!
//! ```
//! use forgetful_bloom_rs::WindowChain;
//!
//! let mut chain = WindowChain::new(3, 6250, 3).unwrap();
//! chain.insert(42);
//! assert!(chain.contains_correlated(42));
//!
//! for _ in 0..3 {
//!     chain.refresh();
//! }
//! assert!(!chain.contains_any(42));
//! ```

mod bloom;
mod chain;
mod classifier;
mod config;
mod error;
mod estimator;
mod filter;
mod hash;
mod params;
mod resize;
mod shared;
mod traits;

pub use bloom::BitFilter;
pub use chain::{
    DEFAULT_REFRESH_INTERVAL, FUTURE, MIN_WINDOWS, PAST_START, PRESENT,
    WindowChain,
};
pub use classifier::{
    ClassificationResult, CorrelatedMatch, FprMeasurement,
    MembershipClassifier, OldestWindowPolicy,
};
pub use config::{
    ForgetfulConfig, ForgetfulConfigBuilder, ForgetfulConfigBuilderError,
};
pub use error::{FilterError, Result};
pub use estimator::{
    WindowStats, dumb_fpr, effective_fpr, effective_fpr_with, window_stats,
};
pub use filter::{FilterStats, ForgetfulFilter, TickOutcome};
pub use hash::{
    HashFunction, default_hash_function, expected_fpp, optimal_bit_vector_size,
    optimal_num_hashes, window_seed,
};
pub use params::{
    DEFAULT_FALSE_POSITIVE_PROBABILITY, DEFAULT_PROJECTED_ELEMENT_COUNT,
    DEFAULT_SEED, FilterParameters,
};
pub use resize::{
    DEFAULT_GROW_THRESHOLD, DEFAULT_SHRINK_THRESHOLD, ResizeController,
    ResizeDecision, ResizeOutcome, ResizePolicy, ResizePolicyBuilder,
    ResizePolicyBuilderError,
};
pub use shared::SharedForgetfulFilter;
pub use traits::{
    BulkForgetfulFilterOps, ForgetfulFilterOps, ForgetfulFilterStats,
};

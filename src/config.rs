use crate::chain::{DEFAULT_REFRESH_INTERVAL, MIN_WINDOWS};
use crate::classifier::OldestWindowPolicy;
use crate::error::{FilterError, Result};
use crate::params::{
    DEFAULT_FALSE_POSITIVE_PROBABILITY, DEFAULT_PROJECTED_ELEMENT_COUNT,
    DEFAULT_SEED, FilterParameters,
};
use crate::resize::ResizePolicy;
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Configuration of a [`ForgetfulFilter`](crate::ForgetfulFilter).
#[derive(Clone, Debug, PartialEq, Builder, Serialize, Deserialize)]
#[builder(pattern = "owned")]
pub struct ForgetfulConfig {
    /// Elements each window is expected to hold
    #[builder(default = "DEFAULT_PROJECTED_ELEMENT_COUNT")]
    pub projected_element_count: u64,

    /// Per-window false positive probability used to size the windows
    #[builder(default = "DEFAULT_FALSE_POSITIVE_PROBABILITY")]
    pub false_positive_probability: f64,

    /// Explicit window size in bits, overrides the derived size
    #[builder(default, setter(strip_option))]
    pub table_bits: Option<u64>,

    /// Explicit hash count, overrides the derived count
    #[builder(default, setter(strip_option))]
    pub hash_count: Option<u32>,

    #[builder(default = "DEFAULT_SEED")]
    pub seed: u64,

    #[builder(default = "MIN_WINDOWS")]
    pub initial_window_count: usize,

    #[builder(default = "DEFAULT_REFRESH_INTERVAL")]
    pub refresh_interval: Duration,

    /// Effective false positive rate the resize controller steers toward
    #[builder(default = "0.01")]
    pub target_fpr: f64,

    /// Run the resize controller after every refresh
    #[builder(default = "true")]
    pub adaptive: bool,

    #[builder(default)]
    pub resize_policy: ResizePolicy,

    #[builder(default)]
    pub oldest_window: OldestWindowPolicy,
}

impl Default for ForgetfulConfig {
    fn default() -> Self {
        Self {
            projected_element_count: DEFAULT_PROJECTED_ELEMENT_COUNT,
            false_positive_probability: DEFAULT_FALSE_POSITIVE_PROBABILITY,
            table_bits: None,
            hash_count: None,
            seed: DEFAULT_SEED,
            initial_window_count: MIN_WINDOWS,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            target_fpr: 0.01,
            adaptive: true,
            resize_policy: ResizePolicy::default(),
            oldest_window: OldestWindowPolicy::default(),
        }
    }
}

impl ForgetfulConfig {
    pub fn validate(&self) -> Result<()> {
        if self.initial_window_count < MIN_WINDOWS {
            return Err(FilterError::InvalidTopology {
                window_count: self.initial_window_count,
                minimum: MIN_WINDOWS,
            });
        }
        if self.table_bits.is_some() != self.hash_count.is_some() {
            return Err(FilterError::InvalidConfig(
                "table_bits and hash_count must be given together".into(),
            ));
        }
        if self.refresh_interval.is_zero() {
            return Err(FilterError::InvalidConfig(
                "Refresh interval must be greater than 0".into(),
            ));
        }
        if !(self.target_fpr > 0.0 && self.target_fpr < 1.0) {
            return Err(FilterError::InvalidConfig(format!(
                "Target false positive rate must be between 0 and 1, got {}",
                self.target_fpr
            )));
        }
        if self.initial_window_count > self.resize_policy.max_window_count {
            return Err(FilterError::InvalidConfig(format!(
                "initial window count {} exceeds the maximum of {}",
                self.initial_window_count, self.resize_policy.max_window_count
            )));
        }
        self.resize_policy.validate()?;
        self.filter_parameters().map(|_| ())
    }

    /// Window shape: explicit when `table_bits`/`hash_count` are set,
    /// derived from the element count and probability otherwise.
    pub fn filter_parameters(&self) -> Result<FilterParameters> {
        let params = match (self.table_bits, self.hash_count) {
            (Some(table_bits), Some(hash_count)) => {
                FilterParameters::with_shape(table_bits, hash_count)?
            }
            _ => FilterParameters::optimal(
                self.projected_element_count,
                self.false_positive_probability,
            )?,
        };
        Ok(params.with_seed(self.seed))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `FBF_*` variables from the process environment and `.env`.
    #[cfg(feature = "env")]
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a configuration from a variable lookup; missing variables keep
    /// their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let policy_defaults = defaults.resize_policy.clone();

        let config = Self {
            projected_element_count: parse_var(
                &lookup,
                "FBF_PROJECTED_ELEMENT_COUNT",
                defaults.projected_element_count,
            )?,
            false_positive_probability: parse_var(
                &lookup,
                "FBF_FALSE_POSITIVE_PROBABILITY",
                defaults.false_positive_probability,
            )?,
            table_bits: parse_optional_var(&lookup, "FBF_TABLE_BITS")?,
            hash_count: parse_optional_var(&lookup, "FBF_HASH_COUNT")?,
            seed: parse_var(&lookup, "FBF_SEED", defaults.seed)?,
            initial_window_count: parse_var(
                &lookup,
                "FBF_WINDOW_COUNT",
                defaults.initial_window_count,
            )?,
            refresh_interval: Duration::from_millis(parse_var(
                &lookup,
                "FBF_REFRESH_INTERVAL_MS",
                defaults.refresh_interval.as_millis() as u64,
            )?),
            target_fpr: parse_var(&lookup, "FBF_TARGET_FPR", defaults.target_fpr)?,
            adaptive: parse_var(&lookup, "FBF_ADAPTIVE", defaults.adaptive)?,
            resize_policy: ResizePolicy {
                grow_threshold: parse_var(
                    &lookup,
                    "FBF_GROW_THRESHOLD",
                    policy_defaults.grow_threshold,
                )?,
                shrink_threshold: parse_var(
                    &lookup,
                    "FBF_SHRINK_THRESHOLD",
                    policy_defaults.shrink_threshold,
                )?,
                max_window_count: parse_var(
                    &lookup,
                    "FBF_MAX_WINDOW_COUNT",
                    policy_defaults.max_window_count,
                )?,
                ..policy_defaults
            },
            oldest_window: defaults.oldest_window,
        };
        config.validate()?;
        Ok(config)
    }
}

fn parse_var<F, T>(lookup: &F, var_name: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    Ok(parse_optional_var(lookup, var_name)?.unwrap_or(default))
}

fn parse_optional_var<F, T>(lookup: &F, var_name: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Some(value) = lookup(var_name) else {
        return Ok(None);
    };
    let parsed = value.trim().parse::<T>();
    match parsed {
        Ok(parsed) => Ok(Some(parsed)),
        Err(e) => Err(FilterError::EnvParseError {
            var_name: var_name.to_string(),
            error: e.to_string(),
            value,
        }),
    }
}

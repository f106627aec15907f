use crate::error::{FilterError, Result};
use crate::hash::{
    HashFunction, default_hash_function, optimal_bit_vector_size,
    optimal_num_hashes,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PROJECTED_ELEMENT_COUNT: u64 = 10_000;
pub const DEFAULT_FALSE_POSITIVE_PROBABILITY: f64 = 0.0001;
pub const DEFAULT_SEED: u64 = 0xA5A5_A5A5;

/// Shape shared by every window of a chain.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FilterParameters {
    /// Sizing inputs, `None` when the shape was given explicitly
    pub projected_element_count: Option<u64>,
    pub false_positive_probability: Option<f64>,
    pub table_bits: u64,
    pub hash_count: u32,
    pub seed: u64,
    #[serde(skip, default = "default_hash")]
    pub hash_function: HashFunction,
}

fn default_hash() -> HashFunction {
    default_hash_function
}

impl FilterParameters {
    /// Derives table size and hash count from `n` and target probability `p`.
    pub fn optimal(
        projected_element_count: u64,
        false_positive_probability: f64,
    ) -> Result<Self> {
        if projected_element_count == 0 {
            return Err(FilterError::InvalidParameters(
                "projected element count must be > 0".into(),
            ));
        }
        if !(false_positive_probability > 0.0
            && false_positive_probability < 1.0)
        {
            return Err(FilterError::InvalidParameters(format!(
                "false positive probability must be in (0, 1), got {false_positive_probability}"
            )));
        }

        let table_bits = optimal_bit_vector_size(
            projected_element_count,
            false_positive_probability,
        );
        let hash_count = optimal_num_hashes(projected_element_count, table_bits);

        let params = Self {
            projected_element_count: Some(projected_element_count),
            false_positive_probability: Some(false_positive_probability),
            table_bits,
            hash_count,
            seed: DEFAULT_SEED,
            hash_function: default_hash_function,
        };
        params.validate()?;
        Ok(params)
    }

    /// Uses a caller-supplied table size and hash count.
    pub fn with_shape(table_bits: u64, hash_count: u32) -> Result<Self> {
        let params = Self {
            projected_element_count: None,
            false_positive_probability: None,
            table_bits,
            hash_count,
            seed: DEFAULT_SEED,
            hash_function: default_hash_function,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_hash_function(mut self, hash_function: HashFunction) -> Self {
        self.hash_function = hash_function;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.table_bits == 0 {
            return Err(FilterError::InvalidParameters(
                "table_bits must be > 0".into(),
            ));
        }
        if self.hash_count == 0 {
            return Err(FilterError::InvalidParameters(
                "hash_count must be >= 1".into(),
            ));
        }
        if usize::try_from(self.table_bits).is_err() {
            return Err(FilterError::InvalidParameters(format!(
                "table_bits {} does not fit in memory",
                self.table_bits
            )));
        }
        Ok(())
    }

    /// Bytes used by one window's bit array.
    pub fn window_bytes(&self) -> u64 {
        self.table_bits.div_ceil(8)
    }
}

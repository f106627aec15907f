use thiserror::Error;

pub type Result<T> = std::result::Result<T, FilterError>;

#[derive(Error, Debug, PartialEq)]
pub enum FilterError {
    #[error("Invalid filter parameters: {0}")]
    InvalidParameters(String),

    #[error(
        "Filter shape mismatch: {table_bits} bits/{hash_count} hashes \
         vs {other_table_bits} bits/{other_hash_count} hashes"
    )]
    ShapeMismatch {
        table_bits: u64,
        hash_count: u32,
        other_table_bits: u64,
        other_hash_count: u32,
    },

    #[error("Invalid topology: {window_count} windows, at least {minimum} required")]
    InvalidTopology { window_count: usize, minimum: usize },

    #[error("Window count {requested} is below the minimum of {minimum}")]
    BelowMinimum { requested: usize, minimum: usize },

    #[error("Window out of range: {index} >= {window_count}")]
    WindowOutOfRange { index: usize, window_count: usize },

    #[error("False positive rate requested over an empty query set")]
    EmptyQuerySet,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to parse environment variable {var_name}: value '{value}' - {error}")]
    EnvParseError {
        var_name: String,
        value: String,
        error: String,
    },

    #[error("Lock error: {0}")]
    LockError(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for FilterError {
    fn from(err: serde_json::Error) -> Self {
        FilterError::Serialization(err.to_string())
    }
}

//! Error types for PDP
//!
//! Field-level coercion failures never show up here: the cleaner turns them
//! into nulls and counts them. Everything below is either a configuration
//! problem caught before work starts or a structural violation that must
//! reach the caller untouched.

use thiserror::Error;

/// Result type alias for PDP operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Main error type for pipeline operations
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Integrity violation
    #[error("Integrity violation: {0}")]
    Integrity(#[from] IntegrityError),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Invalid configuration values
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Time window is empty or inverted
    #[error("Invalid time window: end {end} is not after start {start}")]
    InvalidWindow { start: String, end: String },

    /// No purchase statuses configured
    #[error("Status weight set is empty")]
    EmptyStatusSet,

    /// A status weight is negative, NaN, or all weights are zero
    #[error("Invalid weight for status '{status}': {weight}")]
    InvalidWeight { status: String, weight: f64 },

    /// Row count must be positive
    #[error("Row count must be positive, got {0}")]
    NonPositiveRowCount(usize),

    /// Identity pool size must be positive
    #[error("Pool size for {pool} must be positive")]
    InvalidPoolSize { pool: &'static str },

    /// Session duration bounds are unusable
    #[error("Invalid session duration: {0}")]
    InvalidDuration(String),

    /// A probability is outside [0, 1]
    #[error("Rate '{name}' must be within [0, 1], got {value}")]
    InvalidRate { name: &'static str, value: f64 },

    /// Price range is empty or non-positive
    #[error("Invalid price range: [{min}, {max}]")]
    InvalidPriceRange { min: f64, max: f64 },

    /// Band thresholds must be strictly increasing
    #[error("Thresholds for {name} must be strictly increasing")]
    UnorderedThresholds { name: &'static str },

    /// Report name not recognized
    #[error("Unknown report: '{0}'")]
    UnknownReport(String),
}

/// Structural invariant violations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IntegrityError {
    /// Two fact rows share a session id
    #[error("Duplicate session_id {session_id} for user {user_id} at {login_time}")]
    DuplicateSessionId {
        session_id: String,
        user_id: String,
        login_time: String,
    },

    /// A dimension table would contain the same natural key twice
    #[error("Duplicate key '{key}' in {table}")]
    DuplicateDimensionKey { table: &'static str, key: String },
}

/// Errors raised at the storage boundary
#[derive(Error, Debug)]
pub enum StorageError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Row could not be (de)serialized
    #[error("Serialization error in table {table}: {message}")]
    Serialization { table: &'static str, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PipelineError::Integrity(IntegrityError::DuplicateSessionId {
            session_id: "abc123".to_string(),
            user_id: "u-1".to_string(),
            login_time: "2024-01-01T10:00:00".to_string(),
        });
        let msg = format!("{}", err);
        assert!(msg.contains("abc123"));
        assert!(msg.contains("u-1"));
    }

    #[test]
    fn test_error_conversion() {
        let config_err = ConfigError::UnknownReport("retention".to_string());
        let err: PipelineError = config_err.into();
        assert!(matches!(err, PipelineError::Config(ConfigError::UnknownReport(_))));
        assert!(format!("{}", err).contains("retention"));
    }
}

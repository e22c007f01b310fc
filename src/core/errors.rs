//! CFG-prefixed error types with structured error codes.

use thiserror::Error;

/// Shared `Result` alias for the crate.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Top-level error type for the configuration store.
///
/// Per the store's error-handling policy, this is only ever surfaced to a
/// caller from [`Config::new`](crate::core::config::Config::new) when the
/// supplied defaults fail to parse. Every other failure mode (malformed
/// overwrites, a rejected path, storage I/O) is swallowed at the API
/// boundary and only observable through logs.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("[CFG-1001] invalid default document: {details}")]
    InvalidDefaults { details: String },

    #[error("[CFG-1002] invalid overwrites document: {details}")]
    InvalidOverwrites { details: String },

    #[error("[CFG-2001] storage write failure: {details}")]
    StorageWrite { details: String },

    #[error("[CFG-2002] storage read failure: {details}")]
    StorageRead { details: String },
}

impl ConfigError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidDefaults { .. } => "CFG-1001",
            Self::InvalidOverwrites { .. } => "CFG-1002",
            Self::StorageWrite { .. } => "CFG-2001",
            Self::StorageRead { .. } => "CFG-2002",
        }
    }

    /// Whether retrying might resolve the failure.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::StorageWrite { .. } | Self::StorageRead { .. })
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::InvalidDefaults {
            details: value.to_string(),
        }
    }
}

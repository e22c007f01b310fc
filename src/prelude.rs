//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use strata_config::prelude::*;
//! ```

// Core
pub use crate::core::config::{Config, Token};
pub use crate::core::errors::{ConfigError, Result};

// Value model
pub use crate::value::Value;

// Executors
pub use crate::executor::{DelayedAsyncExecutor, Executor, ImmediateExecutor};

// Storage
pub use crate::storage::{FileOverwritesStorage, MemoryOverwritesStorage, OverwritesStorage};

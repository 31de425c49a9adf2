//! Application configuration and constants.
//!
//! This module provides:
//! - Configuration constants (cache lifetime, thresholds, retry limits)
//! - The comparison task configuration and its validation
//! - CLI option types and parsing

mod constants;
mod types;

// Re-export all constants
pub use constants::*;
pub(crate) use types::site_identity;
pub use types::{
    ComparisonConfiguration, LogFormat, LogLevel, Opt, RetrySettings, SiteComparePair,
};

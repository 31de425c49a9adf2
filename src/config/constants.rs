//! Configuration constants.
//!
//! This module defines the fixed operational parameters of the comparison engine:
//! cache lifetime, classification thresholds, retry backoff and the system
//! libraries that are never compared.

use std::time::Duration;

/// Maximum age of a cached catalog snapshot (48 hours).
/// Snapshots older than this are ignored and the library is scanned again.
pub const SCAN_CACHE_MAX_AGE: Duration = Duration::from_secs(48 * 60 * 60);

/// A target copy smaller than this percentage of the source size is flagged as a size issue.
/// The comparison is strict: exactly 30% is not an issue.
pub const SIZE_ISSUE_PERCENT: u64 = 30;

// Retry strategy
/// Delay in milliseconds before the first retry of a throttled call.
/// Doubles on each subsequent retry.
pub const RETRY_BASE_DELAY_MS: u64 = 500;
/// Maximum delay between retries in seconds
pub const RETRY_MAX_DELAY_SECS: u64 = 30;
/// Maximum number of retries after the initial attempt.
/// A call that is still throttled after this many retries fails the pair.
pub const RETRY_MAX_RETRIES: usize = 5;

/// Characters replaced with `_` by name normalization.
///
/// Mirrors the substitution third-party migration tools apply to characters
/// that are illegal on the target side.
pub const NORMALIZED_CHARACTERS: &[char] = &[
    '"', '*', ':', '<', '>', '?', '\\', '&', '#', '%', '{', '}', '~',
];

/// Replacement used for every character in [`NORMALIZED_CHARACTERS`].
pub const NORMALIZATION_REPLACEMENT: char = '_';

/// Libraries that are always excluded from comparison, regardless of configuration.
///
/// Matched case-insensitively against library titles. These are provisioning
/// and infrastructure libraries whose content differs between tenants by
/// construction.
pub const SYSTEM_LIBRARIES: &[&str] = &[
    "Form Templates",
    "Style Library",
    "Site Assets",
    "Site Collection Documents",
    "Site Collection Images",
    "Master Page Gallery",
    "Composed Looks",
    "Converted Forms",
    "List Template Gallery",
    "Solution Gallery",
    "Theme Gallery",
    "Web Part Gallery",
    "Preservation Hold Library",
    "TaxonomyHiddenList",
    "User Information List",
    "appdata",
    "appfiles",
];

/// File extension of classic and modern site pages.
pub const ASPX_EXTENSION: &str = ".aspx";

/// Default path of the SQLite result store used by the CLI.
pub const DB_PATH: &str = "./site_compare.db";

/// Connections in the result store pool. Saves are sequential per run.
pub const DB_MAX_CONNECTIONS: u32 = 4;

/// How long a write waits on a locked database before failing.
pub const DB_BUSY_TIMEOUT_SECS: u64 = 5;

/// Maximum length of an error message stored on a site result.
pub const MAX_ERROR_MESSAGE_LENGTH: usize = 2000;

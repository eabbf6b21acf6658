//! Configuration access.
//!
//! Configuration loading itself is an external concern; the coordinator
//! only needs key lookup. [`ConfigSource`] is that seam, and the typed
//! readers apply the stated defaults when a key is absent or
//! unparseable (logged at warn, never an error; admission decisions
//! must not fail on a typo'd setting).
//!
//! # Example
//!
//! ```ignore
//! use fleetmaint::config::{read_u32, InMemoryConfig, keys};
//!
//! let config = InMemoryConfig::new().with(keys::MAX_PARALLEL_TOTAL, "4");
//! let cap = read_u32(&config, keys::MAX_PARALLEL_TOTAL, 2);
//! assert_eq!(cap, 4);
//! ```

pub mod keys;

use std::collections::HashMap;
use tracing::warn;

/// Read-only key/value configuration lookup.
///
/// Implemented by the host's configuration store; [`InMemoryConfig`]
/// is provided for tests and embedded use.
pub trait ConfigSource: Send + Sync {
    /// Returns the raw string value for a key, if set.
    fn get(&self, key: &str) -> Option<String>;
}

/// Reads a boolean key, falling back to `default` when the key is
/// absent or does not parse.
pub fn read_bool(source: &dyn ConfigSource, key: &str, default: bool) -> bool {
    match source.get(key) {
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => true,
            "false" | "0" | "no" => false,
            _ => {
                warn!(key, value = %raw, default, "unparseable boolean config value, using default");
                default
            }
        },
        None => default,
    }
}

/// Reads an unsigned integer key, falling back to `default` when the
/// key is absent or does not parse.
pub fn read_u32(source: &dyn ConfigSource, key: &str, default: u32) -> u32 {
    match source.get(key) {
        Some(raw) => match raw.trim().parse::<u32>() {
            Ok(value) => value,
            Err(_) => {
                warn!(key, value = %raw, default, "unparseable integer config value, using default");
                default
            }
        },
        None => default,
    }
}

/// Simple map-backed [`ConfigSource`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryConfig {
    values: HashMap<String, String>,
}

impl InMemoryConfig {
    /// Creates an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a key/value pair, builder-style.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Sets a key/value pair in place.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }
}

impl ConfigSource for InMemoryConfig {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

//! Coordinator environment.
//!
//! [`CoordinatorEnvironment`] is the shared context handed to every
//! policy and client: configuration lookup plus activity-id minting for
//! trace correlation. The host creates one per coordinator instance.

use crate::config::ConfigSource;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counter for auto-generated activity IDs.
static ACTIVITY_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Correlation identity for one coordinator operation.
///
/// Every policy application and protocol exchange carries an activity
/// ID as a structured log field so a pass can be traced end to end.
#[derive(Clone, Hash, Eq, PartialEq)]
pub struct ActivityId(String);

impl ActivityId {
    /// Creates an activity ID with the given value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Creates a unique auto-generated activity ID.
    pub fn auto() -> Self {
        let counter = ACTIVITY_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
        Self(format!("activity-{}", counter))
    }

    /// Returns the string value of this activity ID.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ActivityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ActivityId({})", self.0)
    }
}

impl fmt::Display for ActivityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Shared per-instance environment: configuration and tracing context.
#[derive(Clone)]
pub struct CoordinatorEnvironment {
    config: Arc<dyn ConfigSource>,
}

impl CoordinatorEnvironment {
    /// Creates an environment over the given configuration source.
    pub fn new(config: Arc<dyn ConfigSource>) -> Self {
        Self { config }
    }

    /// Configuration lookup for policies and transport.
    pub fn config(&self) -> &dyn ConfigSource {
        self.config.as_ref()
    }

    /// Mints a fresh activity ID for one coordinator operation.
    pub fn new_activity(&self) -> ActivityId {
        ActivityId::auto()
    }
}

impl fmt::Debug for CoordinatorEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoordinatorEnvironment").finish_non_exhaustive()
    }
}

//! Action policy chain.
//!
//! Policies are independently testable admission-control stages. Each
//! inspects every job in the pass context and narrows the actions the
//! job may take. They run strictly in the order [`create`] constructs
//! them; later policies depend on the narrowed state and counters left
//! by earlier ones, so the chain must never run concurrently with
//! itself.
//!
//! Order:
//!
//! 1. [`AutoActionPolicy`]: operator toggles for automatic
//!    Execute/Restore progression.
//! 2. [`JobBlockingActionPolicy`]: fleet-wide and category-scoped
//!    freezes.
//! 3. [`JobThrottlingActionPolicy`]: global and per-category
//!    concurrency caps.
//! 4. [`ExternalAllowActionPolicy`]: operator manual overrides (the
//!    only stage allowed to widen permissions).
//!
//! Business denials are never errors: they are narrowed flags with the
//! reason logged. Policies return `Err` only for store read failures,
//! which abort the pass.

mod auto_action;
mod blocking;
mod overrides;
mod throttling;

pub use auto_action::AutoActionPolicy;
pub use blocking::{BlockingPolicyCache, JobBlockingActionPolicy, JobBlockingPolicy, JobBlockingPolicyStore};
pub use overrides::{AllowActionMap, AllowActionRecord, ExternalAllowActionPolicy};
pub use throttling::JobThrottlingActionPolicy;

use crate::env::{ActivityId, CoordinatorEnvironment};
use crate::model::CoordinatorContext;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Failure reported by an external policy store.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct StoreError(pub String);

/// Errors surfaced by a policy application.
///
/// Only infrastructure failures appear here. Cap overruns, freezes and
/// disabled auto-actions are ordinary outcomes expressed as narrowed
/// action flags, not errors.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// The blocking-policy store could not be read.
    #[error("blocking policy store read failed: {0}")]
    BlockingStore(#[source] StoreError),

    /// The manual-override store could not be read.
    #[error("allow-action store read failed: {0}")]
    OverrideStore(#[source] StoreError),
}

/// One stage of the admission-control chain.
#[async_trait]
pub trait ActionPolicy: Send + Sync {
    /// Short stable name, used as the audit identity on every action
    /// mutation this policy performs.
    fn name(&self) -> &'static str;

    /// Applies this policy to every job in the context.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] when an external store read fails; the
    /// pass is aborted and the context discarded.
    async fn apply(
        &self,
        activity: &ActivityId,
        ctx: &mut CoordinatorContext,
    ) -> Result<(), PolicyError>;

    /// Drops any policy-local cache.
    ///
    /// Called on leadership/role transitions so a fail-over never
    /// serves a stale decision.
    fn reset(&self) {}
}

/// Constructs the full policy chain in its fixed execution order.
///
/// The order is deliberately a single explicit list here rather than
/// scattered call sites; see the module docs for what each stage does.
pub fn create(
    env: Arc<CoordinatorEnvironment>,
    blocking_store: Arc<dyn JobBlockingPolicyStore>,
    allow_map: Arc<dyn AllowActionMap>,
) -> Vec<Box<dyn ActionPolicy>> {
    vec![
        Box::new(AutoActionPolicy::new(Arc::clone(&env))),
        Box::new(JobBlockingActionPolicy::new(blocking_store)),
        Box::new(JobThrottlingActionPolicy::new(env)),
        Box::new(ExternalAllowActionPolicy::new(allow_map)),
    ]
}

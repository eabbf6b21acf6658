//! Configuration key names and defaults.
//!
//! All keys are optional; absent or unparseable values fall back to the
//! defaults declared here. Per-category and per-action keys are built
//! with the helpers so key spelling lives in one place.

use crate::model::{ActionType, JobCategory};

/// Global cap on concurrently active jobs.
pub const MAX_PARALLEL_TOTAL: &str = "MaxParallelJobCount.Total";

/// Cap on concurrently active update-type jobs.
pub const MAX_PARALLEL_UPDATE: &str = "MaxParallelJobCount.Update";

/// Explicit controller endpoint, bypassing discovery.
pub const POLICY_AGENT_ENDPOINT: &str = "PolicyAgent.Endpoint";

/// Default for [`MAX_PARALLEL_TOTAL`].
pub const DEFAULT_MAX_PARALLEL_TOTAL: u32 = 2;

/// Default for [`MAX_PARALLEL_UPDATE`].
pub const DEFAULT_MAX_PARALLEL_UPDATE: u32 = 1;

/// Default per-category cap (every category except `Unknown`).
pub const DEFAULT_MAX_PARALLEL_CATEGORY: u32 = 1;

/// Builds the per-category concurrency cap key,
/// e.g. `MaxParallelJobCount.TenantUpdate`.
pub fn max_parallel_for_category(category: JobCategory) -> String {
    format!("MaxParallelJobCount.{}", category.config_name())
}

/// Builds the auto-progression toggle key for an action/category pair,
/// e.g. `AutoAction.Execute.TenantUpdate`. Defaults to enabled.
pub fn auto_action_key(action: ActionType, category: JobCategory) -> String {
    format!("AutoAction.{}.{}", action.label(), category.config_name())
}

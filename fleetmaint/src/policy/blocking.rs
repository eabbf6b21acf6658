//! Fleet-wide admission freezes (chain step 2).
//!
//! An operator can persist a [`JobBlockingPolicy`] value that freezes
//! admission of new jobs, blanket or scoped by category. The policy
//! value is read through [`JobBlockingPolicyStore`] and cached for the
//! life of the leadership term; [`ActionPolicy::reset`] invalidates the
//! cache so a fail-over never serves a stale freeze decision.
//!
//! A persisted value outside the known set denies everything: an
//! admission-control system must never default to "permit" on
//! uncertainty.

use super::{ActionPolicy, PolicyError, StoreError};
use crate::env::ActivityId;
use crate::model::{ActionType, CoordinatorContext, MappedTenantJob};
use async_trait::async_trait;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::RwLock;
use tracing::{error, info};

/// Operator-set fleet-wide admission gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobBlockingPolicy {
    /// No freeze active.
    BlockNone,
    /// Freeze every job.
    BlockAllJobs,
    /// Freeze every new job.
    BlockAllNewJobs,
    /// Freeze new repair-type jobs.
    BlockNewMaintenanceJob,
    /// Freeze new update-type jobs.
    BlockNewUpdateJob,
    /// Freeze new tenant updates that impact at least one node.
    BlockNewImpactfulTenantUpdateJobs,
    /// Freeze new platform updates that impact at least one node.
    BlockNewImpactfulPlatformUpdateJobs,
    /// Freeze new updates of any kind that impact at least one node.
    BlockNewImpactfulUpdateJobs,
}

impl FromStr for JobBlockingPolicy {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "BlockNone" => Ok(Self::BlockNone),
            "BlockAllJobs" => Ok(Self::BlockAllJobs),
            "BlockAllNewJobs" => Ok(Self::BlockAllNewJobs),
            "BlockNewMaintenanceJob" => Ok(Self::BlockNewMaintenanceJob),
            "BlockNewUpdateJob" => Ok(Self::BlockNewUpdateJob),
            "BlockNewImpactfulTenantUpdateJobs" => Ok(Self::BlockNewImpactfulTenantUpdateJobs),
            "BlockNewImpactfulPlatformUpdateJobs" => Ok(Self::BlockNewImpactfulPlatformUpdateJobs),
            "BlockNewImpactfulUpdateJobs" => Ok(Self::BlockNewImpactfulUpdateJobs),
            other => Err(StoreError(format!("unknown blocking policy '{other}'"))),
        }
    }
}

impl JobBlockingPolicy {
    /// Returns the freeze reason if this policy denies admitting the
    /// given job, or `None` when the job may proceed to throttling.
    fn denial_reason(self, job: &MappedTenantJob) -> Option<&'static str> {
        let category = job.category();
        let impactful = job.impacted_node_count() > 0;
        match self {
            Self::BlockNone => None,
            Self::BlockAllJobs => Some("all jobs are blocked"),
            Self::BlockAllNewJobs => Some("all new jobs are blocked"),
            Self::BlockNewMaintenanceJob => category
                .is_repair_job_type()
                .then_some("new maintenance jobs are blocked"),
            Self::BlockNewUpdateJob => category
                .is_update_job_type()
                .then_some("new update jobs are blocked"),
            Self::BlockNewImpactfulTenantUpdateJobs => (category.is_tenant_update_job_type()
                && impactful)
                .then_some("new impactful tenant update jobs are blocked"),
            Self::BlockNewImpactfulPlatformUpdateJobs => (category.is_platform_update_job_type()
                && impactful)
                .then_some("new impactful platform update jobs are blocked"),
            Self::BlockNewImpactfulUpdateJobs => (category.is_update_job_type() && impactful)
                .then_some("new impactful update jobs are blocked"),
        }
    }
}

/// Persisted store for the operator's blocking policy.
///
/// The store hands back the raw persisted string; parsing (and the
/// fail-closed handling of unrecognized values) is this module's job.
#[async_trait]
pub trait JobBlockingPolicyStore: Send + Sync {
    /// Reads the currently persisted blocking policy value.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store cannot be read.
    async fn current_policy(&self) -> Result<String, StoreError>;
}

/// Cache for the persisted blocking-policy value.
///
/// The cached value is the only cross-pass shared state in the core.
/// [`invalidate`](Self::invalidate) must be called deterministically on
/// leadership transitions.
#[derive(Debug, Default)]
pub struct BlockingPolicyCache {
    cached: RwLock<Option<String>>,
}

impl BlockingPolicyCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached value, fetching from the store on a miss.
    async fn get_or_fetch(
        &self,
        store: &dyn JobBlockingPolicyStore,
    ) -> Result<String, StoreError> {
        if let Some(value) = self.cached.read().expect("cache lock poisoned").clone() {
            return Ok(value);
        }
        let value = store.current_policy().await?;
        *self.cached.write().expect("cache lock poisoned") = Some(value.clone());
        Ok(value)
    }

    /// Drops the cached value so the next read hits the store.
    pub fn invalidate(&self) {
        *self.cached.write().expect("cache lock poisoned") = None;
    }
}

/// Denies `Prepare` for jobs frozen by the operator's blocking policy.
pub struct JobBlockingActionPolicy {
    store: Arc<dyn JobBlockingPolicyStore>,
    cache: BlockingPolicyCache,
}

impl JobBlockingActionPolicy {
    /// Creates the policy over the persisted store.
    pub fn new(store: Arc<dyn JobBlockingPolicyStore>) -> Self {
        Self {
            store,
            cache: BlockingPolicyCache::new(),
        }
    }
}

#[async_trait]
impl ActionPolicy for JobBlockingActionPolicy {
    fn name(&self) -> &'static str {
        "JobBlockingActionPolicy"
    }

    async fn apply(
        &self,
        activity: &ActivityId,
        ctx: &mut CoordinatorContext,
    ) -> Result<(), PolicyError> {
        let raw = self
            .cache
            .get_or_fetch(self.store.as_ref())
            .await
            .map_err(PolicyError::BlockingStore)?;

        match raw.parse::<JobBlockingPolicy>() {
            Ok(policy) => {
                if policy == JobBlockingPolicy::BlockNone {
                    return Ok(());
                }
                info!(activity = %activity, policy = %raw, "blocking policy active");
                let candidates: Vec<_> = ctx
                    .jobs()
                    .filter_map(|job| policy.denial_reason(job).map(|r| (job.id().clone(), r)))
                    .collect();
                for (id, reason) in candidates {
                    ctx.deny(&id, self.name(), reason, ActionType::PREPARE);
                }
            }
            Err(_) => {
                // Fail closed: an unrecognized persisted value denies
                // every job's admission rather than permitting any.
                error!(
                    activity = %activity,
                    policy = %raw,
                    "unrecognized blocking policy value, denying all job admission"
                );
                for id in ctx.job_ids() {
                    ctx.deny(
                        &id,
                        self.name(),
                        "blocking policy value is unrecognized",
                        ActionType::PREPARE,
                    );
                }
            }
        }
        Ok(())
    }

    fn reset(&self) {
        self.cache.invalidate();
    }
}

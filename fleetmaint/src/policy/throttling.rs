//! Concurrency-cap admission (chain step 3).
//!
//! Bounds how many jobs may be active at once: a global cap, a cap on
//! update-type jobs, and one cap per category (with `Unknown` pinned to
//! zero). Jobs already active count against the caps; pending jobs
//! requesting `Prepare` are then admitted greedily in category order.
//!
//! Admission is a fold over an immutable [`AdmissionCounters`]
//! accumulator: each admitted job produces the counters the next
//! candidate is judged against, which makes the "earlier admits affect
//! later admits" ordering dependency explicit and testable on its own.

use super::{ActionPolicy, PolicyError};
use crate::config::{keys, read_u32};
use crate::env::{ActivityId, CoordinatorEnvironment};
use crate::model::{ActionType, CoordinatorContext, JobCategory};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

/// Effective concurrency caps for one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct JobCaps {
    total: u32,
    update: u32,
    per_category: [u32; 5],
}

impl JobCaps {
    /// Reads the caps from configuration, applying defaults.
    ///
    /// `Unknown` is always capped at zero regardless of configuration:
    /// a job the coordinator cannot classify is never admitted.
    fn load(env: &CoordinatorEnvironment) -> Self {
        let mut per_category = [0u32; 5];
        for category in JobCategory::ALL {
            if category == JobCategory::Unknown {
                continue;
            }
            per_category[category.index()] = read_u32(
                env.config(),
                &keys::max_parallel_for_category(category),
                keys::DEFAULT_MAX_PARALLEL_CATEGORY,
            );
        }
        Self {
            total: read_u32(
                env.config(),
                keys::MAX_PARALLEL_TOTAL,
                keys::DEFAULT_MAX_PARALLEL_TOTAL,
            ),
            update: read_u32(
                env.config(),
                keys::MAX_PARALLEL_UPDATE,
                keys::DEFAULT_MAX_PARALLEL_UPDATE,
            ),
            per_category,
        }
    }
}

/// Which cap a candidate job ran into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CapExceeded {
    Total,
    Category(JobCategory),
    Update,
}

impl CapExceeded {
    fn reason(self) -> String {
        match self {
            CapExceeded::Total => "exceeds total parallel job cap".to_string(),
            CapExceeded::Category(category) => {
                format!("exceeds {} parallel job cap", category.config_name())
            }
            CapExceeded::Update => "exceeds update parallel job cap".to_string(),
        }
    }
}

/// Active-job counts a candidate is judged against.
///
/// Immutable: admitting a job returns the incremented counters instead
/// of mutating in place.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct AdmissionCounters {
    total: u32,
    update: u32,
    per_category: [u32; 5],
}

impl AdmissionCounters {
    /// Counts the jobs already active in the context.
    fn from_active_jobs(ctx: &CoordinatorContext) -> Self {
        let mut counters = Self::default();
        for job in ctx.jobs().filter(|j| j.is_active()) {
            counters = counters.bump(job.category());
        }
        counters
    }

    fn bump(mut self, category: JobCategory) -> Self {
        self.total += 1;
        self.per_category[category.index()] += 1;
        if category.is_update_job_type() {
            self.update += 1;
        }
        self
    }

    /// Judges one candidate against the caps. Admission returns the
    /// counters the next candidate must be judged against.
    ///
    /// The update cap is checked ahead of the broader caps: when an
    /// update job trips several caps at once, the reported reason is
    /// the update cap.
    fn try_admit(self, category: JobCategory, caps: &JobCaps) -> Result<Self, CapExceeded> {
        if category.is_update_job_type() && self.update >= caps.update {
            return Err(CapExceeded::Update);
        }
        if self.total >= caps.total {
            return Err(CapExceeded::Total);
        }
        if self.per_category[category.index()] >= caps.per_category[category.index()] {
            return Err(CapExceeded::Category(category));
        }
        Ok(self.bump(category))
    }
}

/// Admits pending jobs up to the configured concurrency caps; denies
/// `Prepare` for the rest with the exceeded cap as the reason.
pub struct JobThrottlingActionPolicy {
    env: Arc<CoordinatorEnvironment>,
}

impl JobThrottlingActionPolicy {
    /// Creates the policy over the shared environment.
    pub fn new(env: Arc<CoordinatorEnvironment>) -> Self {
        Self { env }
    }
}

#[async_trait]
impl ActionPolicy for JobThrottlingActionPolicy {
    fn name(&self) -> &'static str {
        "JobThrottlingActionPolicy"
    }

    async fn apply(
        &self,
        activity: &ActivityId,
        ctx: &mut CoordinatorContext,
    ) -> Result<(), PolicyError> {
        let caps = JobCaps::load(&self.env);
        let active = AdmissionCounters::from_active_jobs(ctx);
        debug!(
            activity = %activity,
            total_active = active.total,
            update_active = active.update,
            total_cap = caps.total,
            update_cap = caps.update,
            "throttling pass starting"
        );

        // Candidates: not yet active, still asking for (and allowed)
        // Prepare. Context iteration is job-id ordered, so the stable
        // category sort ties-breaks on job id.
        let mut candidates: Vec<_> = ctx
            .jobs()
            .filter(|job| {
                !job.is_active()
                    && job.pending_actions().contains(ActionType::PREPARE)
                    && job.allowed_actions().contains(ActionType::PREPARE)
            })
            .map(|job| (job.id().clone(), job.category()))
            .collect();
        candidates.sort_by_key(|(_, category)| *category);

        let mut counters = active;
        for (id, category) in candidates {
            match counters.try_admit(category, &caps) {
                Ok(next) => {
                    counters = next;
                    debug!(
                        activity = %activity,
                        job_id = %id,
                        category = category.config_name(),
                        "job admitted"
                    );
                }
                Err(cap) => {
                    let reason = cap.reason();
                    info!(
                        activity = %activity,
                        job_id = %id,
                        category = category.config_name(),
                        reason,
                        "job admission throttled"
                    );
                    ctx.deny(&id, self.name(), &reason, ActionType::PREPARE);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InMemoryConfig;
    use crate::model::{JobId, JobPhase, TenantJob};

    fn job(id: &str, job_type: &str, phase: JobPhase) -> TenantJob {
        TenantJob {
            id: JobId::new(id),
            job_type: job_type.to_string(),
            update_domain: 0,
            impacted_node_count: 1,
            phase,
            context: None,
        }
    }

    fn policy(config: InMemoryConfig) -> JobThrottlingActionPolicy {
        JobThrottlingActionPolicy::new(Arc::new(CoordinatorEnvironment::new(Arc::new(config))))
    }

    fn prepare_allowed(ctx: &CoordinatorContext, id: &str) -> bool {
        ctx.job(&JobId::new(id))
            .unwrap()
            .allowed_actions()
            .contains(ActionType::PREPARE)
    }

    #[test]
    fn test_caps_defaults() {
        let env = CoordinatorEnvironment::new(Arc::new(InMemoryConfig::new()));
        let caps = JobCaps::load(&env);
        assert_eq!(caps.total, 2);
        assert_eq!(caps.update, 1);
        assert_eq!(caps.per_category[JobCategory::Unknown.index()], 0);
        assert_eq!(caps.per_category[JobCategory::TenantUpdate.index()], 1);
    }

    #[test]
    fn test_unknown_cap_cannot_be_configured() {
        let config = InMemoryConfig::new().with("MaxParallelJobCount.Unknown", "9");
        let env = CoordinatorEnvironment::new(Arc::new(config));
        let caps = JobCaps::load(&env);
        assert_eq!(caps.per_category[JobCategory::Unknown.index()], 0);
    }

    #[test]
    fn test_counters_fold_is_incremental() {
        let caps = JobCaps {
            total: 2,
            update: 1,
            per_category: [0, 1, 1, 1, 2],
        };
        let counters = AdmissionCounters::default();
        let counters = counters.try_admit(JobCategory::TenantUpdate, &caps).unwrap();
        // Second tenant update: category cap would allow it but the
        // update cap is already consumed by the first admit.
        assert_eq!(
            counters.try_admit(JobCategory::TenantUpdate, &caps),
            Err(CapExceeded::Update)
        );
        let counters = counters
            .try_admit(JobCategory::TenantMaintenance, &caps)
            .unwrap();
        // Total cap reached.
        assert_eq!(
            counters.try_admit(JobCategory::PlatformMaintenance, &caps),
            Err(CapExceeded::Total)
        );
    }

    #[test]
    fn test_update_cap_reported_when_every_cap_is_exhausted() {
        // One maintenance job and one update already admitted under
        // total=2 / update=1 / category caps 1: the next update trips
        // all three caps at once and the update cap is the reason.
        let caps = JobCaps {
            total: 2,
            update: 1,
            per_category: [0, 1, 1, 1, 1],
        };
        let counters = AdmissionCounters::default()
            .bump(JobCategory::TenantMaintenance)
            .bump(JobCategory::TenantUpdate);
        let err = counters
            .try_admit(JobCategory::TenantUpdate, &caps)
            .unwrap_err();
        assert_eq!(err, CapExceeded::Update);
        assert_eq!(err.reason(), "exceeds update parallel job cap");
    }

    #[tokio::test]
    async fn test_scenario_maintenance_plus_two_updates() {
        // Total=2, Update=1, category caps 1 each, nothing active:
        // the maintenance job and exactly one update are admitted, the
        // other update is denied on the update cap.
        let policy = policy(InMemoryConfig::new());
        let mut ctx = CoordinatorContext::from_jobs(vec![
            job("maint", "TenantMaintenance", JobPhase::Pending),
            job("upd-a", "TenantUpdate", JobPhase::Pending),
            job("upd-b", "TenantUpdate", JobPhase::Pending),
        ]);
        policy.apply(&ActivityId::auto(), &mut ctx).await.unwrap();

        assert!(prepare_allowed(&ctx, "maint"));
        // Category order puts TenantMaintenance first; between the two
        // updates the tie-break is job-id order.
        assert!(prepare_allowed(&ctx, "upd-a"));
        assert!(!prepare_allowed(&ctx, "upd-b"));
    }

    #[tokio::test]
    async fn test_active_jobs_consume_caps() {
        let policy = policy(InMemoryConfig::new());
        let mut ctx = CoordinatorContext::from_jobs(vec![
            job("running", "TenantUpdate", JobPhase::Executing),
            job("waiting", "PlatformUpdate", JobPhase::Pending),
        ]);
        policy.apply(&ActivityId::auto(), &mut ctx).await.unwrap();
        // The active tenant update holds the single update slot.
        assert!(!prepare_allowed(&ctx, "waiting"));
    }

    #[tokio::test]
    async fn test_total_cap_zero_denies_all_pending() {
        let config = InMemoryConfig::new().with(keys::MAX_PARALLEL_TOTAL, "0");
        let policy = policy(config);
        let mut ctx = CoordinatorContext::from_jobs(vec![
            job("a", "TenantMaintenance", JobPhase::Pending),
            job("b", "PlatformMaintenance", JobPhase::Pending),
        ]);
        policy.apply(&ActivityId::auto(), &mut ctx).await.unwrap();
        assert!(!prepare_allowed(&ctx, "a"));
        assert!(!prepare_allowed(&ctx, "b"));
    }

    #[tokio::test]
    async fn test_unknown_category_never_admitted() {
        let policy = policy(InMemoryConfig::new());
        let mut ctx =
            CoordinatorContext::from_jobs(vec![job("mystery", "Defrag", JobPhase::Pending)]);
        policy.apply(&ActivityId::auto(), &mut ctx).await.unwrap();
        assert!(!prepare_allowed(&ctx, "mystery"));
    }

    #[tokio::test]
    async fn test_already_denied_jobs_do_not_consume_slots() {
        // A job stripped of Prepare by an earlier stage is not a
        // candidate and must not count against the caps.
        let policy = policy(InMemoryConfig::new().with(keys::MAX_PARALLEL_TOTAL, "1"));
        let mut ctx = CoordinatorContext::from_jobs(vec![
            job("frozen", "PlatformMaintenance", JobPhase::Pending),
            job("ready", "TenantMaintenance", JobPhase::Pending),
        ]);
        ctx.deny(
            &JobId::new("frozen"),
            "test",
            "frozen by earlier stage",
            ActionType::PREPARE,
        );
        policy.apply(&ActivityId::auto(), &mut ctx).await.unwrap();
        assert!(prepare_allowed(&ctx, "ready"));
    }

    #[tokio::test]
    async fn test_category_priority_order_wins_when_total_is_tight() {
        // Total cap of 1: the PlatformMaintenance job sorts before the
        // TenantUpdate job and takes the only slot.
        let policy = policy(InMemoryConfig::new().with(keys::MAX_PARALLEL_TOTAL, "1"));
        let mut ctx = CoordinatorContext::from_jobs(vec![
            job("a-upd", "TenantUpdate", JobPhase::Pending),
            job("z-maint", "PlatformMaintenance", JobPhase::Pending),
        ]);
        policy.apply(&ActivityId::auto(), &mut ctx).await.unwrap();
        assert!(prepare_allowed(&ctx, "z-maint"));
        assert!(!prepare_allowed(&ctx, "a-upd"));
    }
}

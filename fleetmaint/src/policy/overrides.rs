//! Operator manual overrides (chain step 4).
//!
//! An operator can persist an [`AllowActionRecord`] for a specific
//! `(job, update domain)` pair to force an action through regardless of
//! what the automatic policies decided. This is the only stage allowed
//! to widen permissions narrowed earlier in the same pass: an explicit,
//! audited escape hatch, applied through
//! [`CoordinatorContext::grant_override`].

use super::{ActionPolicy, PolicyError, StoreError};
use crate::env::ActivityId;
use crate::model::{ActionType, CoordinatorContext, JobId};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// An operator-issued override forcing actions for one job/UD pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowActionRecord {
    /// Job the override applies to.
    pub job_id: JobId,
    /// Update domain the override applies to.
    pub update_domain: u32,
    /// Actions to force-allow.
    pub actions: ActionType,
}

/// Persisted store of manual overrides, keyed by `(job, UD)`.
#[async_trait]
pub trait AllowActionMap: Send + Sync {
    /// Looks up an override for the given job and update domain.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store cannot be read.
    async fn lookup(
        &self,
        job_id: &JobId,
        update_domain: u32,
    ) -> Result<Option<AllowActionRecord>, StoreError>;
}

/// Re-grants actions named by operator overrides.
pub struct ExternalAllowActionPolicy {
    map: Arc<dyn AllowActionMap>,
}

impl ExternalAllowActionPolicy {
    /// Creates the policy over the override store.
    pub fn new(map: Arc<dyn AllowActionMap>) -> Self {
        Self { map }
    }
}

#[async_trait]
impl ActionPolicy for ExternalAllowActionPolicy {
    fn name(&self) -> &'static str {
        "ExternalAllowActionPolicy"
    }

    async fn apply(
        &self,
        activity: &ActivityId,
        ctx: &mut CoordinatorContext,
    ) -> Result<(), PolicyError> {
        // Only jobs that are waiting on something can be overridden.
        let candidates: Vec<_> = ctx
            .jobs()
            .filter(|job| !job.pending_actions().is_empty())
            .map(|job| (job.id().clone(), job.update_domain()))
            .collect();

        for (id, update_domain) in candidates {
            let record = self
                .map
                .lookup(&id, update_domain)
                .await
                .map_err(PolicyError::OverrideStore)?;
            if let Some(record) = record {
                info!(
                    activity = %activity,
                    job_id = %id,
                    update_domain,
                    actions = %record.actions,
                    "manual override grants actions"
                );
                ctx.grant_override(
                    &id,
                    self.name(),
                    "operator manual override",
                    record.actions,
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{JobPhase, TenantJob};
    use std::collections::HashMap;

    /// Map-backed override store for tests.
    struct InMemoryAllowMap {
        records: HashMap<(JobId, u32), AllowActionRecord>,
    }

    impl InMemoryAllowMap {
        fn new(records: impl IntoIterator<Item = AllowActionRecord>) -> Self {
            Self {
                records: records
                    .into_iter()
                    .map(|r| ((r.job_id.clone(), r.update_domain), r))
                    .collect(),
            }
        }
    }

    #[async_trait]
    impl AllowActionMap for InMemoryAllowMap {
        async fn lookup(
            &self,
            job_id: &JobId,
            update_domain: u32,
        ) -> Result<Option<AllowActionRecord>, StoreError> {
            Ok(self.records.get(&(job_id.clone(), update_domain)).cloned())
        }
    }

    fn job(id: &str, update_domain: u32) -> TenantJob {
        TenantJob {
            id: JobId::new(id),
            job_type: "TenantUpdate".to_string(),
            update_domain,
            impacted_node_count: 1,
            phase: JobPhase::Executing,
            context: None,
        }
    }

    #[tokio::test]
    async fn test_override_regrants_denied_action() {
        let map = InMemoryAllowMap::new(vec![AllowActionRecord {
            job_id: JobId::new("j1"),
            update_domain: 2,
            actions: ActionType::EXECUTE,
        }]);
        let policy = ExternalAllowActionPolicy::new(Arc::new(map));

        let mut ctx = CoordinatorContext::from_jobs(vec![job("j1", 2)]);
        ctx.deny(&JobId::new("j1"), "test", "auto action disabled", ActionType::EXECUTE);
        assert!(ctx.job(&JobId::new("j1")).unwrap().allowed_actions().is_empty());

        policy.apply(&ActivityId::auto(), &mut ctx).await.unwrap();
        assert!(ctx
            .job(&JobId::new("j1"))
            .unwrap()
            .allowed_actions()
            .contains(ActionType::EXECUTE));
    }

    #[tokio::test]
    async fn test_override_is_keyed_by_update_domain() {
        // Override for UD 3 must not apply to the job's current UD 2.
        let map = InMemoryAllowMap::new(vec![AllowActionRecord {
            job_id: JobId::new("j1"),
            update_domain: 3,
            actions: ActionType::EXECUTE,
        }]);
        let policy = ExternalAllowActionPolicy::new(Arc::new(map));

        let mut ctx = CoordinatorContext::from_jobs(vec![job("j1", 2)]);
        ctx.deny(&JobId::new("j1"), "test", "auto action disabled", ActionType::EXECUTE);
        policy.apply(&ActivityId::auto(), &mut ctx).await.unwrap();
        assert!(ctx.job(&JobId::new("j1")).unwrap().allowed_actions().is_empty());
    }

    #[tokio::test]
    async fn test_no_override_leaves_context_unchanged() {
        let policy = ExternalAllowActionPolicy::new(Arc::new(InMemoryAllowMap::new(vec![])));
        let mut ctx = CoordinatorContext::from_jobs(vec![job("j1", 0)]);
        policy.apply(&ActivityId::auto(), &mut ctx).await.unwrap();
        assert_eq!(
            ctx.job(&JobId::new("j1")).unwrap().allowed_actions(),
            ActionType::EXECUTE
        );
    }
}

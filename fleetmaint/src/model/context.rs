//! Per-pass coordination context.
//!
//! [`CoordinatorContext`] owns the mapped jobs for one control-loop
//! pass. Policies read jobs through iteration and narrow permissions
//! through [`deny`](CoordinatorContext::deny); the only widening path
//! is [`grant_override`](CoordinatorContext::grant_override), reserved
//! for the operator override policy. This keeps the "policies only
//! narrow" invariant structural rather than conventional.

use super::action::ActionType;
use super::job::{JobId, MappedTenantJob, TenantJob};
use std::collections::BTreeMap;

/// All mapped jobs for one pass, keyed by job identity.
///
/// Backed by a `BTreeMap` so iteration order (and therefore every
/// order-sensitive decision downstream, like the throttling tie-break)
/// is deterministic across passes.
#[derive(Debug, Default)]
pub struct CoordinatorContext {
    jobs: BTreeMap<JobId, MappedTenantJob>,
}

impl CoordinatorContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the context from the controller document's job records.
    ///
    /// Duplicate job IDs keep the last record seen, matching the
    /// controller's own last-writer document semantics.
    pub fn from_jobs(jobs: impl IntoIterator<Item = TenantJob>) -> Self {
        let jobs = jobs
            .into_iter()
            .map(MappedTenantJob::from_tenant_job)
            .map(|job| (job.id().clone(), job))
            .collect();
        Self { jobs }
    }

    /// Number of jobs in this pass.
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Whether this pass has no jobs.
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Looks up one job by identity.
    pub fn job(&self, id: &JobId) -> Option<&MappedTenantJob> {
        self.jobs.get(id)
    }

    /// Iterates jobs in job-id order.
    pub fn jobs(&self) -> impl Iterator<Item = &MappedTenantJob> {
        self.jobs.values()
    }

    /// Job IDs in iteration order. Convenient for policies that need a
    /// snapshot before mutating.
    pub fn job_ids(&self) -> Vec<JobId> {
        self.jobs.keys().cloned().collect()
    }

    /// Narrows the allowed actions of one job.
    ///
    /// Unknown job IDs are ignored; a policy can only narrow jobs the
    /// pass actually contains.
    pub fn deny(&mut self, id: &JobId, policy: &str, reason: &str, flags: ActionType) {
        if let Some(job) = self.jobs.get_mut(id) {
            job.deny_actions(policy, reason, flags);
        }
    }

    /// Re-grants action flags for one job.
    ///
    /// This is the operator escape hatch: the only path that widens a
    /// permission a prior policy narrowed in the same pass. Reserved
    /// for the manual-override policy; everything else must use
    /// [`deny`](Self::deny).
    pub fn grant_override(&mut self, id: &JobId, policy: &str, reason: &str, flags: ActionType) {
        if let Some(job) = self.jobs.get_mut(id) {
            job.allow_actions(policy, reason, flags);
        }
    }
}

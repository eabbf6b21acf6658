//! Per-pass job records.
//!
//! [`TenantJob`] is the opaque record the controller document carries
//! for each unit of maintenance work. [`MappedTenantJob`] is the
//! coordinator's per-pass working view of it: the action flags policies
//! inspect and narrow. Mapped jobs are built fresh each pass from the
//! document and discarded when the pass ends.

use super::action::ActionType;
use super::category::JobCategory;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Stable identifier for a tenant job, assigned by the controller.
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct JobId(String);

impl JobId {
    /// Creates a job ID with the given string value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the string value of this job ID.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JobId({})", self.0)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Lifecycle phase the controller reports for a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobPhase {
    /// Job is waiting for the coordinator to approve preparation.
    Pending,
    /// Job is executing maintenance on prepared nodes.
    Executing,
    /// Job is restoring completed nodes to service.
    Restoring,
}

/// Opaque per-job record from the controller document.
///
/// The coordinator never interprets this beyond its classification
/// fields; the controller owns the job's real state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantJob {
    /// Controller-assigned job identity.
    pub id: JobId,
    /// Raw job-type string; see [`JobCategory::from_job_type`].
    pub job_type: String,
    /// Update domain the current job step operates on.
    pub update_domain: u32,
    /// Number of nodes the current step would impact.
    pub impacted_node_count: u32,
    /// Lifecycle phase the controller reports.
    pub phase: JobPhase,
    /// Free-text context supplied by the controller, if any.
    pub context: Option<String>,
}

/// The coordinator's mutable per-pass view of one tenant job.
///
/// `allowed_actions` starts equal to `pending_actions` (the step the
/// job is waiting on) and is narrowed by policies as the chain runs.
/// All mutation goes through [`deny_actions`](Self::deny_actions) and
/// [`allow_actions`](Self::allow_actions) so every change is logged
/// with the invoking policy's identity.
#[derive(Debug, Clone)]
pub struct MappedTenantJob {
    id: JobId,
    tenant_job: TenantJob,
    allowed_actions: ActionType,
    pending_actions: ActionType,
    is_active: bool,
}

impl MappedTenantJob {
    /// Builds the per-pass view from a controller job record.
    ///
    /// A pending job is waiting on `Prepare`; an executing job is
    /// active and waiting on `Execute`; a restoring job is active and
    /// waiting on `Restore`.
    pub fn from_tenant_job(tenant_job: TenantJob) -> Self {
        let (pending, is_active) = match tenant_job.phase {
            JobPhase::Pending => (ActionType::PREPARE, false),
            JobPhase::Executing => (ActionType::EXECUTE, true),
            JobPhase::Restoring => (ActionType::RESTORE, true),
        };
        Self {
            id: tenant_job.id.clone(),
            tenant_job,
            allowed_actions: pending,
            pending_actions: pending,
            is_active,
        }
    }

    /// Job identity.
    pub fn id(&self) -> &JobId {
        &self.id
    }

    /// The underlying controller record.
    pub fn tenant_job(&self) -> &TenantJob {
        &self.tenant_job
    }

    /// Category derived from the controller's job-type string.
    pub fn category(&self) -> JobCategory {
        JobCategory::from_job_type(&self.tenant_job.job_type)
    }

    /// Update domain of the current job step.
    pub fn update_domain(&self) -> u32 {
        self.tenant_job.update_domain
    }

    /// Node count the current step would impact.
    pub fn impacted_node_count(&self) -> u32 {
        self.tenant_job.impacted_node_count
    }

    /// Actions currently permitted for this job.
    pub fn allowed_actions(&self) -> ActionType {
        self.allowed_actions
    }

    /// Actions the job is logically waiting on, independent of whether
    /// they are currently allowed.
    pub fn pending_actions(&self) -> ActionType {
        self.pending_actions
    }

    /// Whether the job has begun executing.
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Clears the given action flags. Logged with the denying policy's
    /// identity for auditability.
    pub(crate) fn deny_actions(&mut self, policy: &str, reason: &str, flags: ActionType) {
        let before = self.allowed_actions;
        self.allowed_actions.remove(flags);
        if before != self.allowed_actions {
            debug!(
                job_id = %self.id,
                policy,
                reason,
                denied = %flags,
                allowed = %self.allowed_actions,
                "actions denied"
            );
        }
    }

    /// Adds the given action flags. Only reachable through the
    /// context's override path; ordinary policies cannot widen.
    pub(crate) fn allow_actions(&mut self, policy: &str, reason: &str, flags: ActionType) {
        let before = self.allowed_actions;
        self.allowed_actions.insert(flags);
        if before != self.allowed_actions {
            debug!(
                job_id = %self.id,
                policy,
                reason,
                granted = %flags,
                allowed = %self.allowed_actions,
                "actions granted"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tenant_job(id: &str, job_type: &str, phase: JobPhase) -> TenantJob {
        TenantJob {
            id: JobId::new(id),
            job_type: job_type.to_string(),
            update_domain: 0,
            impacted_node_count: 1,
            phase,
            context: None,
        }
    }

    #[test]
    fn test_pending_job_requests_prepare() {
        let job = MappedTenantJob::from_tenant_job(tenant_job("j1", "TenantUpdate", JobPhase::Pending));
        assert_eq!(job.pending_actions(), ActionType::PREPARE);
        assert_eq!(job.allowed_actions(), ActionType::PREPARE);
        assert!(!job.is_active());
    }

    #[test]
    fn test_executing_job_is_active() {
        let job =
            MappedTenantJob::from_tenant_job(tenant_job("j1", "TenantUpdate", JobPhase::Executing));
        assert_eq!(job.pending_actions(), ActionType::EXECUTE);
        assert!(job.is_active());
    }

    #[test]
    fn test_restoring_job_requests_restore() {
        let job =
            MappedTenantJob::from_tenant_job(tenant_job("j1", "PlatformUpdate", JobPhase::Restoring));
        assert_eq!(job.pending_actions(), ActionType::RESTORE);
        assert!(job.is_active());
    }

    #[test]
    fn test_deny_clears_only_named_flags() {
        let mut job =
            MappedTenantJob::from_tenant_job(tenant_job("j1", "TenantUpdate", JobPhase::Pending));
        job.allow_actions("test", "seed", ActionType::EXECUTE);
        job.deny_actions("test", "unit test", ActionType::PREPARE);
        assert_eq!(job.allowed_actions(), ActionType::EXECUTE);
    }

    #[test]
    fn test_category_derived_from_job_type() {
        let job =
            MappedTenantJob::from_tenant_job(tenant_job("j1", "PlatformMaintenance", JobPhase::Pending));
        assert_eq!(job.category(), JobCategory::PlatformMaintenance);
    }
}

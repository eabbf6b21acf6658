//! Controller protocol data transfer types.
//!
//! Every request kind travels inside one [`PolicyAgentRequest`]
//! envelope with exactly one populated field, mirroring the
//! controller's single-POST-endpoint protocol. Payloads are opaque
//! binary frames; the structs here define the schema and `serde`
//! derives handle the framing.

use crate::model::{JobId, TenantJob};
use serde::{Deserialize, Serialize};

/// Infrastructure repair request for a single role instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepairRequest {
    /// Target role instance name.
    pub role_instance: String,
    /// Repair action identifier understood by the controller.
    pub action: String,
}

/// Cancels a job the controller is running.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobCancelRequest {
    pub job_id: JobId,
}

/// Rolls back an in-flight platform update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateRollbackRequest {
    pub job_id: JobId,
}

/// Suspends a job at its current step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSuspendRequest {
    pub job_id: JobId,
}

/// Resumes a previously suspended job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResumeRequest {
    pub job_id: JobId,
}

/// Verdict for one job step awaiting tenant acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStepDecision {
    /// Step is approved; the controller may proceed.
    Acknowledge,
    /// Step is not yet approved; ask again on a later document.
    Defer,
    /// Step is rejected outright.
    Fail,
}

/// Decision for a single job, keyed by job id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStepResponse {
    pub job_id: JobId,
    pub decision: JobStepDecision,
    /// Free-form operator or coordinator commentary.
    pub comment: String,
}

/// Batched job decisions bound to one document incarnation.
///
/// The controller rejects the batch if the incarnation no longer
/// matches its current document, which protects against acting on
/// stale state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResponse {
    pub document_incarnation: i64,
    pub job_step_responses: Vec<JobStepResponse>,
}

/// Envelope for all controller-bound requests.
///
/// Exactly one field is populated per POST. Absent kinds are encoded
/// as `None` so the binary frame stays positional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyAgentRequest {
    pub repair_request: Option<RepairRequest>,
    pub job_cancel_request: Option<JobCancelRequest>,
    pub update_rollback_request: Option<UpdateRollbackRequest>,
    pub job_suspend_request: Option<JobSuspendRequest>,
    pub job_resume_request: Option<JobResumeRequest>,
    pub job_response: Option<JobResponse>,
}

/// Job-coordination metadata, present only for parallel-mode tenants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParallelJobInfo {
    /// All jobs the controller currently tracks for this tenant.
    pub jobs: Vec<TenantJob>,
}

/// One snapshot of the controller's job state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyAgentDocument {
    /// Monotonically increasing document version.
    pub incarnation: i64,
    /// Absent for serial-mode tenants.
    pub job_info: Option<ParallelJobInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_default_is_empty() {
        let envelope = PolicyAgentRequest::default();
        assert!(envelope.repair_request.is_none());
        assert!(envelope.job_cancel_request.is_none());
        assert!(envelope.update_rollback_request.is_none());
        assert!(envelope.job_suspend_request.is_none());
        assert!(envelope.job_resume_request.is_none());
        assert!(envelope.job_response.is_none());
    }

    #[test]
    fn test_document_frames_through_binary_codec() {
        let document = PolicyAgentDocument {
            incarnation: 42,
            job_info: None,
        };
        let bytes = bincode::serialize(&document).unwrap();
        let decoded: PolicyAgentDocument = bincode::deserialize(&bytes).unwrap();
        assert_eq!(decoded.incarnation, 42);
        assert!(decoded.job_info.is_none());
    }
}

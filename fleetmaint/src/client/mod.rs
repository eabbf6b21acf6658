//! High-level controller client.
//!
//! [`PolicyAgentClient`] is the coordinator's sole surface for talking
//! to the fleet controller. It validates inputs, shapes typed requests
//! into the wire envelope, and delegates everything below that to the
//! transport wrapper.
//!
//! # Example
//!
//! ```ignore
//! let client = PolicyAgentClient::new(wrapper);
//! if let Some(doc) = client.get_document(&activity, &cancel).await? {
//!     // run the policy chain over doc.jobs ...
//! }
//! ```

pub mod requests;

use crate::env::ActivityId;
use crate::model::JobId;
use crate::transport::{HttpExchange, PolicyAgentServiceWrapper, TransportError};
use requests::{
    JobCancelRequest, JobResponse, JobResumeRequest, JobStepDecision, JobStepResponse,
    JobSuspendRequest, PolicyAgentDocument, PolicyAgentRequest, RepairRequest,
    UpdateRollbackRequest,
};
use std::collections::BTreeMap;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Errors surfaced by the controller client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// A job response batch was bound to a negative incarnation.
    #[error("invalid document incarnation {0}: must be non-negative")]
    InvalidIncarnation(i64),

    /// Wire-level failure, already classified by the transport.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Typed facade over the controller protocol.
pub struct PolicyAgentClient<E: HttpExchange> {
    wrapper: PolicyAgentServiceWrapper<E>,
}

impl<E: HttpExchange> PolicyAgentClient<E> {
    /// Creates a client over a resolved transport wrapper.
    pub fn new(wrapper: PolicyAgentServiceWrapper<E>) -> Self {
        Self { wrapper }
    }

    /// Access to the underlying transport wrapper.
    pub fn wrapper(&self) -> &PolicyAgentServiceWrapper<E> {
        &self.wrapper
    }

    /// Fetches the current job document, if the controller has one.
    ///
    /// Returns `Ok(None)` both when the controller has no document
    /// (HTTP 204) and when the document carries no job-coordination
    /// section: either way the tenant has nothing for this coordinator
    /// to evaluate.
    ///
    /// # Errors
    ///
    /// Propagates classified transport failures.
    pub async fn get_document(
        &self,
        activity: &ActivityId,
        cancel: &CancellationToken,
    ) -> Result<Option<PolicyAgentDocument>, ClientError> {
        let Some(document) = self.wrapper.get_document(activity, cancel).await? else {
            return Ok(None);
        };
        if document.job_info.is_none() {
            debug!(
                activity = %activity,
                incarnation = document.incarnation,
                "document carries no job info, tenant is not in parallel coordination"
            );
            return Ok(None);
        }
        Ok(Some(document))
    }

    /// Requests a repair action against one role instance.
    pub async fn request_repair(
        &self,
        activity: &ActivityId,
        role_instance: &str,
        action: &str,
        cancel: &CancellationToken,
    ) -> Result<(), ClientError> {
        info!(activity = %activity, role_instance, action, "requesting repair");
        let envelope = PolicyAgentRequest {
            repair_request: Some(RepairRequest {
                role_instance: role_instance.to_string(),
                action: action.to_string(),
            }),
            ..Default::default()
        };
        Ok(self.wrapper.post_request(activity, &envelope, cancel).await?)
    }

    /// Asks the controller to cancel a job.
    pub async fn cancel_job(
        &self,
        activity: &ActivityId,
        job_id: JobId,
        cancel: &CancellationToken,
    ) -> Result<(), ClientError> {
        info!(activity = %activity, job_id = %job_id, "requesting job cancellation");
        let envelope = PolicyAgentRequest {
            job_cancel_request: Some(JobCancelRequest { job_id }),
            ..Default::default()
        };
        Ok(self.wrapper.post_request(activity, &envelope, cancel).await?)
    }

    /// Asks the controller to roll back an in-flight update.
    pub async fn request_rollback(
        &self,
        activity: &ActivityId,
        job_id: JobId,
        cancel: &CancellationToken,
    ) -> Result<(), ClientError> {
        info!(activity = %activity, job_id = %job_id, "requesting update rollback");
        let envelope = PolicyAgentRequest {
            update_rollback_request: Some(UpdateRollbackRequest { job_id }),
            ..Default::default()
        };
        Ok(self.wrapper.post_request(activity, &envelope, cancel).await?)
    }

    /// Suspends a job at its current step.
    pub async fn suspend_job(
        &self,
        activity: &ActivityId,
        job_id: JobId,
        cancel: &CancellationToken,
    ) -> Result<(), ClientError> {
        info!(activity = %activity, job_id = %job_id, "requesting job suspension");
        let envelope = PolicyAgentRequest {
            job_suspend_request: Some(JobSuspendRequest { job_id }),
            ..Default::default()
        };
        Ok(self.wrapper.post_request(activity, &envelope, cancel).await?)
    }

    /// Resumes a previously suspended job.
    pub async fn resume_job(
        &self,
        activity: &ActivityId,
        job_id: JobId,
        cancel: &CancellationToken,
    ) -> Result<(), ClientError> {
        info!(activity = %activity, job_id = %job_id, "requesting job resumption");
        let envelope = PolicyAgentRequest {
            job_resume_request: Some(JobResumeRequest { job_id }),
            ..Default::default()
        };
        Ok(self.wrapper.post_request(activity, &envelope, cancel).await?)
    }

    /// Sends a batch of job step decisions bound to one incarnation.
    ///
    /// An empty batch is a no-op: nothing is sent, no network traffic
    /// happens, and the call succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidIncarnation`] for negative
    /// incarnations before any network activity.
    pub async fn send_job_response(
        &self,
        activity: &ActivityId,
        document_incarnation: i64,
        decisions: BTreeMap<JobId, JobStepDecision>,
        comment: &str,
        cancel: &CancellationToken,
    ) -> Result<(), ClientError> {
        if decisions.is_empty() {
            info!(activity = %activity, "no job decisions to send, skipping");
            return Ok(());
        }
        if document_incarnation < 0 {
            return Err(ClientError::InvalidIncarnation(document_incarnation));
        }

        let job_step_responses: Vec<JobStepResponse> = decisions
            .into_iter()
            .map(|(job_id, decision)| JobStepResponse {
                job_id,
                decision,
                comment: comment.to_string(),
            })
            .collect();
        debug!(
            activity = %activity,
            incarnation = document_incarnation,
            count = job_step_responses.len(),
            "sending job response batch"
        );

        let envelope = PolicyAgentRequest {
            job_response: Some(JobResponse {
                document_incarnation,
                job_step_responses,
            }),
            ..Default::default()
        };
        Ok(self.wrapper.post_request(activity, &envelope, cancel).await?)
    }
}

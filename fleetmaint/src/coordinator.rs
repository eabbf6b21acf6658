//! Coordination pass runner.
//!
//! One [`Coordinator::run_pass`] call is one complete evaluation:
//! fetch the controller's job document, map its jobs into a fresh
//! [`CoordinatorContext`], and run the policy chain over it in order.
//! Nothing is carried from one pass to the next except whatever state
//! the policies cache internally; [`Coordinator::reset`] clears that
//! too, for use after a failover or a configuration change.

use crate::client::{ClientError, PolicyAgentClient};
use crate::env::CoordinatorEnvironment;
use crate::model::CoordinatorContext;
use crate::policy::{ActionPolicy, PolicyError};
use crate::transport::HttpExchange;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Errors from one coordination pass.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Policy(#[from] PolicyError),
}

/// Result of a completed pass.
pub struct PassOutcome {
    /// Incarnation of the document the pass evaluated.
    pub incarnation: i64,
    /// Final per-job allowed actions after the full chain.
    pub context: CoordinatorContext,
}

/// Drives the fetch-map-evaluate cycle.
pub struct Coordinator<E: HttpExchange> {
    env: Arc<CoordinatorEnvironment>,
    client: PolicyAgentClient<E>,
    policies: Vec<Box<dyn ActionPolicy>>,
}

impl<E: HttpExchange> Coordinator<E> {
    pub fn new(
        env: Arc<CoordinatorEnvironment>,
        client: PolicyAgentClient<E>,
        policies: Vec<Box<dyn ActionPolicy>>,
    ) -> Self {
        Self {
            env,
            client,
            policies,
        }
    }

    /// The controller client this coordinator posts through.
    pub fn client(&self) -> &PolicyAgentClient<E> {
        &self.client
    }

    /// Runs one full evaluation pass.
    ///
    /// Returns `Ok(None)` when the client reports no document to
    /// evaluate: there is nothing to do, and that is a normal idle
    /// outcome rather than an error.
    ///
    /// # Errors
    ///
    /// Transport failures and policy store failures abort the pass;
    /// the partially narrowed context is discarded, never acted on.
    pub async fn run_pass(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Option<PassOutcome>, CoordinatorError> {
        let activity = self.env.new_activity();
        let Some(document) = self.client.get_document(&activity, cancel).await? else {
            debug!(activity = %activity, "no document this pass");
            return Ok(None);
        };

        let jobs = document.job_info.map(|info| info.jobs).unwrap_or_default();
        let mut context = CoordinatorContext::from_jobs(jobs);
        info!(
            activity = %activity,
            incarnation = document.incarnation,
            jobs = context.len(),
            "evaluating policy chain"
        );

        for policy in &self.policies {
            debug!(activity = %activity, policy = policy.name(), "applying policy");
            policy.apply(&activity, &mut context).await?;
        }

        Ok(Some(PassOutcome {
            incarnation: document.incarnation,
            context,
        }))
    }

    /// Clears all policy-held caches.
    pub fn reset(&self) {
        for policy in &self.policies {
            policy.reset();
        }
        info!("policy caches reset");
    }
}

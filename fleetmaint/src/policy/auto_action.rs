//! Auto-progression toggles (chain step 1).
//!
//! Lets an operator disable automatic progression of a specific
//! action/category pair without a code change: when
//! `AutoAction.<Action>.<Category>` is set to `false`, jobs of that
//! category lose that action for the pass. Only `Execute` and
//! `Restore` are gated here; `Prepare` admission belongs to the
//! blocking and throttling stages.

use super::{ActionPolicy, PolicyError};
use crate::config::{keys, read_bool};
use crate::env::{ActivityId, CoordinatorEnvironment};
use crate::model::{ActionType, CoordinatorContext};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Denies `Execute`/`Restore` for action/category pairs the operator
/// has switched off. All pairs default to enabled.
pub struct AutoActionPolicy {
    env: Arc<CoordinatorEnvironment>,
}

impl AutoActionPolicy {
    /// Creates the policy over the shared environment.
    pub fn new(env: Arc<CoordinatorEnvironment>) -> Self {
        Self { env }
    }
}

#[async_trait]
impl ActionPolicy for AutoActionPolicy {
    fn name(&self) -> &'static str {
        "AutoActionPolicy"
    }

    async fn apply(
        &self,
        activity: &ActivityId,
        ctx: &mut CoordinatorContext,
    ) -> Result<(), PolicyError> {
        // Snapshot before mutating: (id, category, gated actions held).
        let candidates: Vec<_> = ctx
            .jobs()
            .map(|job| (job.id().clone(), job.category(), job.allowed_actions()))
            .collect();

        for (id, category, allowed) in candidates {
            for action in [ActionType::EXECUTE, ActionType::RESTORE] {
                if !allowed.contains(action) {
                    continue;
                }
                let key = keys::auto_action_key(action, category);
                if !read_bool(self.env.config(), &key, true) {
                    info!(
                        activity = %activity,
                        job_id = %id,
                        key,
                        "automatic progression disabled by configuration"
                    );
                    ctx.deny(&id, self.name(), &format!("{key} is false"), action);
                }
            }
        }
        Ok(())
    }
}

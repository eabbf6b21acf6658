//! In-memory domain model for one coordination pass.
//!
//! The model is rebuilt from the controller document at the start of
//! every pass and carries no persisted state of its own: the controller
//! owns job identity and progress, the coordinator only decides what is
//! allowed to happen this pass.

mod action;
mod category;
mod context;
mod job;

pub use action::ActionType;
pub use category::JobCategory;
pub use context::CoordinatorContext;
pub use job::{JobId, JobPhase, MappedTenantJob, TenantJob};

//! FleetMaint - admission control and job coordination for fleet maintenance
//!
//! This library provides the coordination core that sits between a
//! tenant and its fleet controller: a chain of admission policies that
//! decides which maintenance actions may proceed each pass, and a typed
//! client for the controller's job protocol.
//!
//! # High-Level API
//!
//! One evaluation pass runs through the [`coordinator`] module:
//!
//! ```ignore
//! use fleetmaint::coordinator::Coordinator;
//!
//! let coordinator = Coordinator::new(env, client, policies);
//! if let Some(outcome) = coordinator.run_pass(&cancel).await? {
//!     // act on outcome.context: one allowed-action set per job
//! }
//! ```

pub mod client;
pub mod config;
pub mod coordinator;
pub mod env;
pub mod logging;
pub mod model;
pub mod policy;
pub mod transport;

/// Version of the FleetMaint library.
///
/// Defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

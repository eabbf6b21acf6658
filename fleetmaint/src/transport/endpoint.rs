//! Controller endpoint discovery.
//!
//! The controller endpoint comes from one of two places, in order:
//! an explicit `PolicyAgent.Endpoint` configuration value, or the
//! host-local registry's versions-endpoint entry with the fixed
//! controller path swapped in. Failure to resolve is fatal for the
//! pass: it means the host is misconfigured, and retrying would only
//! hide that.

use super::error::TransportError;
use crate::config::{keys, ConfigSource};
use reqwest::Url;
use tracing::debug;

/// Registry key holding the platform versions endpoint, whose sibling
/// is the controller endpoint.
pub const VERSIONS_ENDPOINT_KEY: &str = "Platform.VersionsEndpoint";

/// Fixed path of the controller's job document resource.
pub const POLICY_AGENT_PATH: &str = "/policyagent/jobinfo";

/// Host-local registry-like key/value store.
///
/// Supplied by the host; holds platform endpoints written by the node
/// agent at provisioning time.
pub trait HostRegistry: Send + Sync {
    /// Returns the raw string value for a key, if present.
    fn get(&self, key: &str) -> Option<String>;
}

/// Resolves the controller endpoint.
///
/// An explicit configured URI wins; otherwise the versions endpoint is
/// read from the registry and rebuilt with [`POLICY_AGENT_PATH`].
///
/// # Errors
///
/// Returns [`TransportError::Endpoint`] when neither source yields a
/// parseable URI.
pub fn resolve_endpoint(
    config: &dyn ConfigSource,
    registry: &dyn HostRegistry,
) -> Result<Url, TransportError> {
    if let Some(explicit) = config.get(keys::POLICY_AGENT_ENDPOINT) {
        let url = Url::parse(&explicit).map_err(|e| {
            TransportError::Endpoint(format!("configured endpoint '{explicit}' is invalid: {e}"))
        })?;
        debug!(endpoint = %url, "using explicitly configured controller endpoint");
        return Ok(url);
    }

    let versions = registry.get(VERSIONS_ENDPOINT_KEY).ok_or_else(|| {
        TransportError::Endpoint(format!(
            "no configured endpoint and registry key '{VERSIONS_ENDPOINT_KEY}' is absent"
        ))
    })?;
    let mut url = Url::parse(&versions).map_err(|e| {
        TransportError::Endpoint(format!("versions endpoint '{versions}' is invalid: {e}"))
    })?;
    url.set_path(POLICY_AGENT_PATH);
    url.set_query(None);
    debug!(endpoint = %url, "controller endpoint derived from versions endpoint");
    Ok(url)
}

//! HTTP exchange abstraction for testability.
//!
//! [`HttpExchange`] narrows the transport to the two verbs the
//! controller protocol uses, surfacing the raw status and body so the
//! wrapper owns status classification. [`ReqwestExchange`] is the real
//! implementation; a mock lives in the test module for dependency
//! injection.

use super::error::TransportError;
use reqwest::Url;
use std::future::Future;
use std::time::Duration;
use tracing::{trace, warn};

/// Raw result of one HTTP exchange, before classification.
#[derive(Debug, Clone)]
pub struct WireResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body bytes (may be empty).
    pub body: Vec<u8>,
}

/// Minimal HTTP surface for the controller protocol.
///
/// Implementations report only sub-HTTP failures (connect errors,
/// client-side timeouts) as `Err`; any status code that arrives is a
/// `WireResponse` for the caller to classify.
pub trait HttpExchange: Send + Sync {
    /// Issues a GET with the given per-call timeout.
    fn get(
        &self,
        url: &Url,
        timeout: Duration,
    ) -> impl Future<Output = Result<WireResponse, TransportError>> + Send;

    /// Issues a POST with explicit headers and a binary body.
    fn post(
        &self,
        url: &Url,
        headers: &[(&'static str, String)],
        body: Vec<u8>,
        timeout: Duration,
    ) -> impl Future<Output = Result<WireResponse, TransportError>> + Send;
}

/// Real exchange over a shared `reqwest` client.
///
/// The client itself carries no per-request state: headers and timeout
/// are applied by a per-call request builder, so nothing mutates shared
/// transport configuration.
#[derive(Clone)]
pub struct ReqwestExchange {
    client: reqwest::Client,
}

impl ReqwestExchange {
    /// Creates an exchange with connection pooling suitable for one
    /// coordinator instance polling a single controller endpoint.
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(2)
            .tcp_keepalive(Duration::from_secs(30))
            .build()
            .map_err(|e| TransportError::Http(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }

    fn map_send_error(e: reqwest::Error) -> TransportError {
        if e.is_timeout() {
            TransportError::Timeout(e.to_string())
        } else {
            TransportError::Http(e.to_string())
        }
    }
}

impl HttpExchange for ReqwestExchange {
    async fn get(&self, url: &Url, timeout: Duration) -> Result<WireResponse, TransportError> {
        trace!(url = %url, "GET starting");
        let response = self
            .client
            .get(url.clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(Self::map_send_error)?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| {
                warn!(url = %url, error = %e, "failed to read response body");
                TransportError::Http(format!("failed to read response body: {e}"))
            })?
            .to_vec();
        trace!(url = %url, status, bytes = body.len(), "GET complete");
        Ok(WireResponse { status, body })
    }

    async fn post(
        &self,
        url: &Url,
        headers: &[(&'static str, String)],
        body: Vec<u8>,
        timeout: Duration,
    ) -> Result<WireResponse, TransportError> {
        trace!(url = %url, bytes = body.len(), "POST starting");
        let mut request = self.client.post(url.clone()).timeout(timeout);
        for (name, value) in headers {
            request = request.header(*name, value);
        }
        let response = request
            .body(body)
            .send()
            .await
            .map_err(Self::map_send_error)?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::Http(format!("failed to read response body: {e}")))?
            .to_vec();
        trace!(url = %url, status, "POST complete");
        Ok(WireResponse { status, body })
    }
}

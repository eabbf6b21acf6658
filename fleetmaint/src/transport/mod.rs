//! Wire-level controller transport.
//!
//! [`PolicyAgentServiceWrapper`] owns endpoint discovery, the HTTP
//! exchange, and failure classification for the controller protocol.
//! Each call is one resolved exchange with a classified outcome and no
//! internal retry; the caller decides what to do with a
//! [`TransportError::Timeout`].

mod endpoint;
mod error;
pub(crate) mod http;

pub use endpoint::{resolve_endpoint, HostRegistry, POLICY_AGENT_PATH, VERSIONS_ENDPOINT_KEY};
pub use error::TransportError;
pub use http::{HttpExchange, ReqwestExchange, WireResponse};

use crate::client::requests::{PolicyAgentDocument, PolicyAgentRequest};
use crate::config::ConfigSource;
use crate::env::ActivityId;
use reqwest::Url;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default per-call exchange timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Cap on response diagnostics captured into error values.
const MAX_DIAGNOSTICS_BYTES: usize = 1024;

/// Which coordination protocol the tenant's controller speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinationMode {
    /// Could not be determined (transport failure); advisory only.
    Unknown,
    /// Document carries no job-coordination metadata.
    Serial,
    /// Document carries job-coordination metadata.
    Parallel,
}

/// Transport facade over one resolved controller endpoint.
pub struct PolicyAgentServiceWrapper<E: HttpExchange> {
    exchange: E,
    endpoint: Url,
    request_timeout: Duration,
}

impl<E: HttpExchange> PolicyAgentServiceWrapper<E> {
    /// Creates a wrapper over an already-resolved endpoint.
    pub fn new(exchange: E, endpoint: Url, request_timeout: Duration) -> Self {
        Self {
            exchange,
            endpoint,
            request_timeout,
        }
    }

    /// Creates a wrapper, resolving the endpoint from configuration or
    /// the host registry.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Endpoint`] on resolution failure;
    /// this is misconfiguration and must surface, not be retried.
    pub fn resolve(
        exchange: E,
        config: &dyn ConfigSource,
        registry: &dyn HostRegistry,
        request_timeout: Duration,
    ) -> Result<Self, TransportError> {
        let endpoint = resolve_endpoint(config, registry)?;
        Ok(Self::new(exchange, endpoint, request_timeout))
    }

    /// The resolved controller endpoint.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    #[cfg(test)]
    pub(crate) fn exchange(&self) -> &E {
        &self.exchange
    }

    /// Fetches the controller's current job document.
    ///
    /// Returns `Ok(None)` on HTTP 204: the controller has no document,
    /// which is a normal "nothing to report" condition.
    ///
    /// # Errors
    ///
    /// - [`TransportError::Timeout`] for HTTP 408/504 or a client-side
    ///   timeout (retriable by the caller).
    /// - [`TransportError::Status`] for any other non-success status.
    /// - [`TransportError::Decode`] when the body is not a document.
    /// - [`TransportError::Cancelled`] when the token fires first.
    pub async fn get_document(
        &self,
        activity: &ActivityId,
        cancel: &CancellationToken,
    ) -> Result<Option<PolicyAgentDocument>, TransportError> {
        debug!(activity = %activity, endpoint = %self.endpoint, "fetching controller document");
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(TransportError::Cancelled),
            response = self.exchange.get(&self.endpoint, self.request_timeout) => response?,
        };

        match classify_status(response.status, &response.body) {
            StatusClass::NoContent => {
                debug!(activity = %activity, "controller has no document");
                Ok(None)
            }
            StatusClass::Success => {
                let document: PolicyAgentDocument = bincode::deserialize(&response.body)
                    .map_err(|e| TransportError::Decode(e.to_string()))?;
                debug!(
                    activity = %activity,
                    incarnation = document.incarnation,
                    "controller document decoded"
                );
                Ok(Some(document))
            }
            StatusClass::Failed(err) => Err(err),
        }
    }

    /// Submits a request envelope to the controller.
    ///
    /// Headers are built per call; nothing mutates shared transport
    /// configuration.
    ///
    /// # Errors
    ///
    /// Same classification as [`get_document`](Self::get_document),
    /// plus [`TransportError::Encode`] for unserializable envelopes.
    pub async fn post_request(
        &self,
        activity: &ActivityId,
        request: &PolicyAgentRequest,
        cancel: &CancellationToken,
    ) -> Result<(), TransportError> {
        let body = bincode::serialize(request).map_err(|e| TransportError::Encode(e.to_string()))?;
        let headers = [
            ("content-type", "application/octet-stream".to_string()),
            ("content-length", body.len().to_string()),
        ];
        debug!(
            activity = %activity,
            endpoint = %self.endpoint,
            bytes = body.len(),
            "posting controller request"
        );

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(TransportError::Cancelled),
            response = self
                .exchange
                .post(&self.endpoint, &headers, body, self.request_timeout) => response?,
        };

        match classify_status(response.status, &response.body) {
            StatusClass::Success | StatusClass::NoContent => Ok(()),
            StatusClass::Failed(err) => Err(err),
        }
    }

    /// Determines which coordination protocol the tenant is configured
    /// for by inspecting the document for job-coordination metadata.
    ///
    /// Advisory only: every transport failure is swallowed (logged at
    /// warn) and reported as [`CoordinationMode::Unknown`]. This check
    /// chooses which coordinator implementation is active and must
    /// never crash the host.
    pub async fn detect_mode(
        &self,
        activity: &ActivityId,
        cancel: &CancellationToken,
    ) -> CoordinationMode {
        match self.get_document(activity, cancel).await {
            Ok(Some(document)) if document.job_info.is_some() => {
                info!(activity = %activity, "controller document carries job info: parallel mode");
                CoordinationMode::Parallel
            }
            Ok(_) => {
                info!(activity = %activity, "no job info in controller document: serial mode");
                CoordinationMode::Serial
            }
            Err(e) => {
                warn!(activity = %activity, error = %e, "mode detection failed, reporting unknown");
                CoordinationMode::Unknown
            }
        }
    }
}

/// Classified HTTP status.
enum StatusClass {
    Success,
    NoContent,
    Failed(TransportError),
}

/// Applies the shared status classification table.
fn classify_status(status: u16, body: &[u8]) -> StatusClass {
    match status {
        204 => StatusClass::NoContent,
        200..=299 => StatusClass::Success,
        408 | 504 => StatusClass::Failed(TransportError::Timeout(format!("HTTP {status}"))),
        _ => {
            let take = body.len().min(MAX_DIAGNOSTICS_BYTES);
            StatusClass::Failed(TransportError::Status {
                status,
                diagnostics: String::from_utf8_lossy(&body[..take]).into_owned(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::http::tests::MockExchange;
    use super::*;
    use crate::client::requests::{ParallelJobInfo, RepairRequest};
    use crate::model::{JobId, JobPhase, TenantJob};

    fn endpoint() -> Url {
        Url::parse("http://controller.local/policyagent/jobinfo").unwrap()
    }

    fn wrapper(mock: MockExchange) -> PolicyAgentServiceWrapper<MockExchange> {
        PolicyAgentServiceWrapper::new(mock, endpoint(), DEFAULT_REQUEST_TIMEOUT)
    }

    fn document(incarnation: i64, with_jobs: bool) -> PolicyAgentDocument {
        PolicyAgentDocument {
            incarnation,
            job_info: with_jobs.then(|| ParallelJobInfo {
                jobs: vec![TenantJob {
                    id: JobId::new("j1"),
                    job_type: "TenantUpdate".to_string(),
                    update_domain: 0,
                    impacted_node_count: 1,
                    phase: JobPhase::Pending,
                    context: None,
                }],
            }),
        }
    }

    #[tokio::test]
    async fn test_get_document_decodes_success_body() {
        let body = bincode::serialize(&document(7, true)).unwrap();
        let wrapper = wrapper(MockExchange::with_status(200, body));
        let doc = wrapper
            .get_document(&ActivityId::auto(), &CancellationToken::new())
            .await
            .unwrap()
            .expect("document expected");
        assert_eq!(doc.incarnation, 7);
        assert!(doc.job_info.is_some());
    }

    #[tokio::test]
    async fn test_no_content_is_not_an_error() {
        let wrapper = wrapper(MockExchange::with_status(204, vec![]));
        let doc = wrapper
            .get_document(&ActivityId::auto(), &CancellationToken::new())
            .await
            .unwrap();
        assert!(doc.is_none());
    }

    #[tokio::test]
    async fn test_timeout_statuses_classify_as_timeout() {
        for status in [408u16, 504] {
            let wrapper = wrapper(MockExchange::with_status(status, vec![]));
            let err = wrapper
                .get_document(&ActivityId::auto(), &CancellationToken::new())
                .await
                .unwrap_err();
            assert!(err.is_timeout(), "HTTP {status} should classify as timeout");
        }
    }

    #[tokio::test]
    async fn test_hard_error_carries_diagnostics() {
        let wrapper = wrapper(MockExchange::with_status(500, b"backend exploded".to_vec()));
        let err = wrapper
            .get_document(&ActivityId::auto(), &CancellationToken::new())
            .await
            .unwrap_err();
        match err {
            TransportError::Status { status, diagnostics } => {
                assert_eq!(status, 500);
                assert!(diagnostics.contains("backend exploded"));
            }
            other => panic!("expected Status, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_garbage_body_is_decode_error() {
        let wrapper = wrapper(MockExchange::with_status(200, b"\xff\xfe".to_vec()));
        let err = wrapper
            .get_document(&ActivityId::auto(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Decode(_)));
    }

    #[tokio::test]
    async fn test_cancelled_token_aborts_exchange() {
        let wrapper = wrapper(MockExchange::with_status(200, vec![]));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = wrapper
            .get_document(&ActivityId::auto(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Cancelled));
    }

    #[tokio::test]
    async fn test_post_sets_framing_headers() {
        let wrapper = wrapper(MockExchange::with_status(200, vec![]));
        let request = PolicyAgentRequest {
            repair_request: Some(RepairRequest {
                role_instance: "node_4".to_string(),
                action: "Reboot".to_string(),
            }),
            ..Default::default()
        };
        wrapper
            .post_request(&ActivityId::auto(), &request, &CancellationToken::new())
            .await
            .unwrap();

        let posts = wrapper.exchange.posts.lock().unwrap();
        assert_eq!(posts.len(), 1);
        let (_, body, headers) = &posts[0];
        assert!(headers
            .iter()
            .any(|(k, v)| *k == "content-type" && v == "application/octet-stream"));
        assert!(headers
            .iter()
            .any(|(k, v)| *k == "content-length" && v == &body.len().to_string()));
    }

    #[tokio::test]
    async fn test_detect_mode_parallel() {
        let body = bincode::serialize(&document(1, true)).unwrap();
        let wrapper = wrapper(MockExchange::with_status(200, body));
        let mode = wrapper
            .detect_mode(&ActivityId::auto(), &CancellationToken::new())
            .await;
        assert_eq!(mode, CoordinationMode::Parallel);
    }

    #[tokio::test]
    async fn test_detect_mode_serial_without_job_info() {
        let body = bincode::serialize(&document(1, false)).unwrap();
        let wrapper = wrapper(MockExchange::with_status(200, body));
        let mode = wrapper
            .detect_mode(&ActivityId::auto(), &CancellationToken::new())
            .await;
        assert_eq!(mode, CoordinationMode::Serial);
    }

    #[tokio::test]
    async fn test_detect_mode_serial_on_no_content() {
        let wrapper = wrapper(MockExchange::with_status(204, vec![]));
        let mode = wrapper
            .detect_mode(&ActivityId::auto(), &CancellationToken::new())
            .await;
        assert_eq!(mode, CoordinationMode::Serial);
    }

    #[tokio::test]
    async fn test_detect_mode_swallows_transport_failure() {
        let wrapper = wrapper(MockExchange::with_status(500, vec![]));
        let mode = wrapper
            .detect_mode(&ActivityId::auto(), &CancellationToken::new())
            .await;
        assert_eq!(mode, CoordinationMode::Unknown);
    }
}

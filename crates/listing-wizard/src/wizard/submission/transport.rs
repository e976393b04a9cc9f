//! Outbound transport to the listing backend.
//!
//! `ureq` is synchronous, so the HTTP implementation runs each request on
//! `tokio::task::spawn_blocking`.

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::config::SubmissionConfig;

/// Raw reply from the backend before it is interpreted as an outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub http_status: u16,
    pub body: Value,
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request to {endpoint} failed: {message}")]
    Request { endpoint: String, message: String },
    #[error("response from {endpoint} was not valid JSON: {message}")]
    Decode { endpoint: String, message: String },
    #[error("transport task aborted: {0}")]
    Join(String),
}

#[async_trait]
pub trait ListingTransport: Send + Sync + Debug {
    async fn send(&self, payload: &Value) -> Result<TransportResponse, TransportError>;
}

/// POSTs the payload as JSON to a fixed endpoint.
#[derive(Debug, Clone)]
pub struct HttpListingTransport {
    endpoint: String,
    timeout: Duration,
}

impl HttpListingTransport {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout,
        }
    }

    pub fn from_config(config: &SubmissionConfig) -> Self {
        Self::new(config.endpoint.clone(), config.timeout)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ListingTransport for HttpListingTransport {
    async fn send(&self, payload: &Value) -> Result<TransportResponse, TransportError> {
        let endpoint = self.endpoint.clone();
        let timeout = self.timeout;
        let payload = payload.clone();

        debug!(%endpoint, "posting listing payload");

        tokio::task::spawn_blocking(move || {
            // Business failures arrive with 4xx/5xx statuses and still carry a JSON body.
            let agent: ureq::Agent = ureq::Agent::config_builder()
                .timeout_global(Some(timeout))
                .http_status_as_error(false)
                .build()
                .into();

            let response = agent
                .post(&endpoint)
                .header("content-type", "application/json")
                .send_json(&payload)
                .map_err(|err| TransportError::Request {
                    endpoint: endpoint.clone(),
                    message: err.to_string(),
                })?;

            let http_status = response.status().as_u16();
            debug!(%endpoint, http_status, "listing endpoint replied");
            let body: Value =
                response
                    .into_body()
                    .read_json()
                    .map_err(|err| TransportError::Decode {
                        endpoint: endpoint.clone(),
                        message: err.to_string(),
                    })?;

            Ok(TransportResponse { http_status, body })
        })
        .await
        .map_err(|err| TransportError::Join(err.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn unreachable_endpoint_is_a_request_error() {
        // Port 9 (discard) on localhost is closed in test environments.
        let transport =
            HttpListingTransport::new("http://127.0.0.1:9/api/properties", Duration::from_secs(2));
        let error = transport
            .send(&json!({ "title": "Loft" }))
            .await
            .expect_err("nothing listens on the discard port");
        assert!(matches!(error, TransportError::Request { .. }));
    }

    #[test]
    fn from_config_copies_endpoint() {
        let transport = HttpListingTransport::from_config(&SubmissionConfig::default());
        assert_eq!(transport.endpoint(), SubmissionConfig::DEFAULT_ENDPOINT);
    }
}

//! Thin HTTP transport trait so adapters never depend on `reqwest` directly.
//!
//! Spec §6: "HTTP/REST transport to channel APIs (consumed through an
//! injected client trait)" is out of the engine's scope — this module is the
//! interface side of that boundary. Production wires [`ReqwestHttpClient`];
//! tests wire [`MockHttpClient`].

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use thiserror::Error;

/// Transport-level failure, distinct from [`crate::error::AdapterError`]:
/// adapters translate an `HttpError` plus the response body into the
/// richer, channel-semantics-aware `AdapterError`.
#[derive(Error, Debug, Clone)]
pub enum HttpError {
    /// The request could not be sent or timed out.
    #[error("request failed: {0}")]
    Request(String),
    /// The server responded with a non-2xx status.
    #[error("status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, for the adapter to inspect.
        body: String,
    },
    /// The response body could not be decoded as expected.
    #[error("decode error: {0}")]
    Decode(String),
}

/// One HTTP response, minimal enough for adapters to classify and parse.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: String,
    /// `Retry-After` header value in seconds, if present.
    pub retry_after_secs: Option<u64>,
}

/// Minimal HTTP surface adapters need: authenticated GET/POST/PUT against a
/// channel's REST API.
///
/// Dyn-compatible via `Pin<Box<dyn Future>>` rather than `async fn`, matching
/// `syncengine_core::event_store::EventStore`'s idiom, so adapters can hold
/// `Arc<dyn HttpClient>`.
pub trait HttpClient: Send + Sync {
    /// Issue a GET request with the given bearer token and query string.
    fn get(
        &self,
        url: &str,
        bearer_token: &str,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + '_>>;

    /// Issue a POST request with a JSON body.
    fn post(
        &self,
        url: &str,
        bearer_token: &str,
        body: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + '_>>;

    /// Issue a PUT request with a JSON body.
    fn put(
        &self,
        url: &str,
        bearer_token: &str,
        body: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + '_>>;
}

/// Production [`HttpClient`] backed by a shared `reqwest::Client`.
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    /// Build a client. `reqwest::Client` is itself cheaply cloneable and
    /// pools connections, so one instance should be shared across adapters.
    #[must_use]
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn send(request: reqwest::RequestBuilder) -> Result<HttpResponse, HttpError> {
        let response = request.send().await.map_err(|e| HttpError::Request(e.to_string()))?;
        let status = response.status().as_u16();
        let retry_after_secs = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());
        let body = response.text().await.map_err(|e| HttpError::Decode(e.to_string()))?;

        if !(200..300).contains(&status) {
            return Err(HttpError::Status { status, body });
        }
        Ok(HttpResponse { status, body, retry_after_secs })
    }
}

impl HttpClient for ReqwestHttpClient {
    fn get(
        &self,
        url: &str,
        bearer_token: &str,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + '_>> {
        let request = self.client.get(url).bearer_auth(bearer_token);
        Box::pin(Self::send(request))
    }

    fn post(
        &self,
        url: &str,
        bearer_token: &str,
        body: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + '_>> {
        let request = self.client.post(url).bearer_auth(bearer_token).json(&body);
        Box::pin(Self::send(request))
    }

    fn put(
        &self,
        url: &str,
        bearer_token: &str,
        body: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + '_>> {
        let request = self.client.put(url).bearer_auth(bearer_token).json(&body);
        Box::pin(Self::send(request))
    }
}

/// Scripted [`HttpClient`] for tests: each call pops the next queued
/// response (or error) regardless of method, recording every call it saw.
pub struct MockHttpClient {
    responses: Mutex<VecDeque<Result<HttpResponse, HttpError>>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl MockHttpClient {
    /// Build a mock client that will answer calls with `responses`, in
    /// order.
    #[must_use]
    pub fn new(responses: Vec<Result<HttpResponse, HttpError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Calls observed so far, as `(method, url)` pairs.
    #[must_use]
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap_or_else(std::sync::PoisonError::into_inner).clone()
    }

    fn next_response(&self) -> Result<HttpResponse, HttpError> {
        self.responses
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| Err(HttpError::Request("mock exhausted".to_string())))
    }

    fn record(&self, method: &str, url: &str) {
        self.calls
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push((method.to_string(), url.to_string()));
    }
}

impl HttpClient for MockHttpClient {
    fn get(
        &self,
        url: &str,
        _bearer_token: &str,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + '_>> {
        self.record("GET", url);
        Box::pin(async move { self.next_response() })
    }

    fn post(
        &self,
        url: &str,
        _bearer_token: &str,
        _body: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + '_>> {
        self.record("POST", url);
        Box::pin(async move { self.next_response() })
    }

    fn put(
        &self,
        url: &str,
        _bearer_token: &str,
        _body: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + '_>> {
        self.record("PUT", url);
        Box::pin(async move { self.next_response() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_client_replays_queued_responses_in_order() {
        let client = MockHttpClient::new(vec![
            Ok(HttpResponse { status: 200, body: "first".to_string(), retry_after_secs: None }),
            Ok(HttpResponse { status: 200, body: "second".to_string(), retry_after_secs: None }),
        ]);

        let first = client.get("https://example.test/a", "token").await.unwrap();
        let second = client.get("https://example.test/b", "token").await.unwrap();

        assert_eq!(first.body, "first");
        assert_eq!(second.body, "second");
        assert_eq!(client.calls().len(), 2);
    }

    #[tokio::test]
    async fn mock_client_exhaustion_is_a_request_error() {
        let client = MockHttpClient::new(vec![]);
        let result = client.get("https://example.test/a", "token").await;
        assert!(matches!(result, Err(HttpError::Request(_))));
    }
}

//! Transport boundary for remote API calls.
//!
//! The gateway only ever reads from the remote, so a request is a URL plus
//! headers. Every request goes through [`HttpTransport`], which lets tests
//! swap the network for [`MockTransport`] and assert on the exact requests
//! that were (or were not) issued.

use async_trait::async_trait;
use thiserror::Error;

/// Header name/value pairs. Lookups through [`header_get`] ignore case.
pub type HttpHeaders = Vec<(String, String)>;

/// An outbound GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: HttpHeaders,
}

impl HttpRequest {
    #[must_use]
    pub fn get(url: impl Into<String>, headers: HttpHeaders) -> Self {
        Self {
            url: url.into(),
            headers,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HttpHeaders,
    pub body: Vec<u8>,
}

impl HttpResponse {
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        header_get(&self.headers, name)
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("http transport error: {0}")]
    Transport(String),

    #[error("no mock response registered for {url}")]
    NoMockResponse { url: String },
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError>;
}

/// First header value matching `name`, case-insensitively.
#[must_use]
pub fn header_get<'a>(headers: &'a HttpHeaders, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

#[cfg(feature = "github")]
pub mod reqwest_transport {
    use std::time::Duration;

    use super::*;

    /// Real transport backed by a shared `reqwest::Client`.
    #[derive(Clone)]
    pub struct ReqwestTransport {
        client: reqwest::Client,
    }

    impl ReqwestTransport {
        pub fn with_timeout(timeout: Duration) -> Result<Self, HttpError> {
            let client = reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| HttpError::Transport(e.to_string()))?;
            Ok(Self { client })
        }
    }

    #[async_trait]
    impl HttpTransport for ReqwestTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
            let mut builder = self.client.get(&request.url);
            for (k, v) in &request.headers {
                builder = builder.header(k, v);
            }

            let resp = builder
                .send()
                .await
                .map_err(|e| HttpError::Transport(e.to_string()))?;

            let status = resp.status().as_u16();
            // Non-UTF-8 header values are never rate-limit headers; keep them empty.
            let headers: HttpHeaders = resp
                .headers()
                .iter()
                .map(|(name, value)| {
                    (
                        name.as_str().to_string(),
                        value.to_str().unwrap_or_default().to_string(),
                    )
                })
                .collect();

            let body = resp
                .bytes()
                .await
                .map_err(|e| HttpError::Transport(e.to_string()))?
                .to_vec();

            Ok(HttpResponse {
                status,
                headers,
                body,
            })
        }
    }
}

#[cfg(test)]
use std::collections::{HashMap, VecDeque};
#[cfg(test)]
use std::sync::{Arc, Mutex};

/// Replays canned responses keyed by URL.
///
/// Responses registered for the same URL are returned in FIFO order. Every
/// request is recorded, including ones that had no registered response.
#[cfg(test)]
#[derive(Clone, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

#[cfg(test)]
#[derive(Default)]
struct MockTransportInner {
    routes: HashMap<String, VecDeque<HttpResponse>>,
    requests: Vec<HttpRequest>,
}

#[cfg(test)]
impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_response(&self, url: impl Into<String>, response: HttpResponse) {
        let mut inner = self.inner.lock().expect("mock transport lock");
        inner
            .routes
            .entry(url.into())
            .or_default()
            .push_back(response);
    }

    #[must_use]
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.inner.lock().expect("mock transport lock").requests.clone()
    }
}

#[cfg(test)]
#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let mut inner = self.inner.lock().expect("mock transport lock");

        let url = request.url.clone();
        inner.requests.push(request);

        inner
            .routes
            .get_mut(&url)
            .and_then(VecDeque::pop_front)
            .ok_or(HttpError::NoMockResponse { url })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty(status: u16) -> HttpResponse {
        HttpResponse {
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    #[test]
    fn header_get_ignores_case_and_takes_first() {
        let headers: HttpHeaders = vec![
            ("X-RateLimit-Remaining".to_string(), "10".to_string()),
            ("x-ratelimit-remaining".to_string(), "9".to_string()),
        ];
        assert_eq!(header_get(&headers, "x-ratelimit-remaining"), Some("10"));
        assert_eq!(header_get(&headers, "X-RATELIMIT-REMAINING"), Some("10"));
        assert_eq!(header_get(&headers, "missing"), None);
    }

    #[test]
    fn success_covers_2xx_only() {
        assert!(empty(204).is_success());
        assert!(!empty(304).is_success());
        assert!(!empty(404).is_success());
    }

    #[tokio::test]
    async fn mock_transport_replays_in_order_and_records_requests() {
        let transport = MockTransport::new();
        let url = "https://api.example.com/repos/o/r";
        transport.push_response(url, empty(403));
        transport.push_response(url, empty(200));

        let accept = ("Accept".to_string(), "application/json".to_string());
        let req = HttpRequest::get(url, vec![accept]);
        let first = transport.send(req.clone()).await.expect("first response");
        let second = transport.send(req.clone()).await.expect("second response");

        assert_eq!(first.status, 403);
        assert_eq!(second.status, 200);
        assert_eq!(transport.requests(), vec![req.clone(), req]);
    }

    #[tokio::test]
    async fn mock_transport_errors_without_registered_response() {
        let transport = MockTransport::new();
        let err = transport
            .send(HttpRequest::get("https://api.example.com/missing", Vec::new()))
            .await
            .expect_err("missing mock should error");

        assert!(matches!(
            err,
            HttpError::NoMockResponse { ref url } if url == "https://api.example.com/missing"
        ));
        assert_eq!(transport.requests().len(), 1);
    }

    #[test]
    #[cfg(feature = "github")]
    fn reqwest_transport_builds_with_timeout() {
        let transport =
            reqwest_transport::ReqwestTransport::with_timeout(std::time::Duration::from_secs(5));
        assert!(transport.is_ok());
    }
}

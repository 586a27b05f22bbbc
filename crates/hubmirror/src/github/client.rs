//! GitHub REST client behind the [`PlatformClient`] trait.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use url::Url;

use crate::http::{HttpHeaders, HttpRequest, HttpResponse, HttpTransport, header_get};
use crate::platform::{
    self, CommitQuery, PlatformClient, PlatformCommit, PlatformRepo, QuotaGate, RateLimitInfo,
};

use super::convert::{to_platform_commit, to_platform_repo};
use super::error::GitHubError;
use super::types::{GitHubCommit, GitHubErrorBody, GitHubRepo};

/// Public GitHub API root.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Maximum page size GitHub accepts for list endpoints.
pub const PAGE_SIZE: usize = 100;

const API_VERSION: &str = "2022-11-28";
const USER_AGENT: &str = "hubmirror";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// GitHub client sharing one [`QuotaGate`] across every clone.
///
/// # Example
///
/// ```ignore
/// let client = GitHubClient::new(DEFAULT_API_URL, Some(token), Some(10))?;
/// let repo = client.get_repo("rust-lang", "rust").await?;
/// ```
#[derive(Clone)]
pub struct GitHubClient {
    api_url: String,
    token: Option<String>,
    transport: Arc<dyn HttpTransport>,
    gate: Arc<QuotaGate>,
}

impl GitHubClient {
    /// Client over a reqwest transport.
    ///
    /// `requests_per_second` enables proactive pacing in front of the quota gate.
    pub fn new(
        api_url: &str,
        token: Option<String>,
        requests_per_second: Option<u32>,
    ) -> Result<Self, GitHubError> {
        let transport = crate::http::reqwest_transport::ReqwestTransport::with_timeout(
            REQUEST_TIMEOUT,
        )
        .map_err(|e| GitHubError::Config(e.to_string()))?;
        let gate = match requests_per_second {
            Some(rps) => QuotaGate::with_pacing(rps),
            None => QuotaGate::new(),
        };
        Ok(Self::new_with_transport(
            api_url,
            token,
            gate,
            Arc::new(transport),
        ))
    }

    pub fn new_with_transport(
        api_url: &str,
        token: Option<String>,
        gate: QuotaGate,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
            transport,
            gate: Arc::new(gate),
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn parse_rate_limit_headers(headers: &HttpHeaders) -> Option<RateLimitInfo> {
        let limit = header_get(headers, "x-ratelimit-limit")?
            .parse::<usize>()
            .ok()?;
        let remaining = header_get(headers, "x-ratelimit-remaining")?
            .parse::<usize>()
            .ok()?;
        let reset_epoch = header_get(headers, "x-ratelimit-reset")?
            .parse::<i64>()
            .ok()?;
        let reset_at = chrono::DateTime::from_timestamp(reset_epoch, 0).unwrap_or_else(Utc::now);
        Some(RateLimitInfo {
            limit,
            remaining,
            reset_at,
        })
    }

    /// Forbidden (or too-many-requests) with zero remaining quota.
    fn is_quota_exhausted(response: &HttpResponse) -> bool {
        matches!(response.status, 403 | 429)
            && response.header("x-ratelimit-remaining") == Some("0")
    }

    fn headers(&self) -> HttpHeaders {
        let mut headers = vec![
            (
                "Accept".to_string(),
                "application/vnd.github+json".to_string(),
            ),
            ("User-Agent".to_string(), USER_AGENT.to_string()),
            ("X-GitHub-Api-Version".to_string(), API_VERSION.to_string()),
        ];
        if let Some(token) = &self.token {
            headers.push(("Authorization".to_string(), format!("Bearer {token}")));
        }
        headers
    }

    async fn send_once(&self, request: HttpRequest) -> Result<HttpResponse, GitHubError> {
        self.gate.acquire().await;
        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| GitHubError::Http(e.to_string()))?;

        if let Some(info) = Self::parse_rate_limit_headers(&response.headers) {
            tracing::trace!(
                remaining = info.remaining,
                limit = info.limit,
                reset_at = %info.reset_at,
                "Rate limit envelope"
            );
            self.gate.update(info);
        }
        Ok(response)
    }

    /// Send through the quota gate, retrying exactly once on a quota race.
    async fn send(&self, url: String) -> Result<HttpResponse, GitHubError> {
        let request = HttpRequest::get(url, self.headers());

        let response = self.send_once(request.clone()).await?;
        if !Self::is_quota_exhausted(&response) {
            return Ok(response);
        }

        tracing::warn!(url = %request.url, "Quota exhausted on the remote, retrying after reset");
        let response = self.send_once(request).await?;
        if Self::is_quota_exhausted(&response) {
            let reset_at = Self::parse_rate_limit_headers(&response.headers)
                .map(|info| info.reset_at)
                .unwrap_or_else(Utc::now);
            return Err(GitHubError::RateLimited { reset_at });
        }
        Ok(response)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        url: String,
        resource: &str,
    ) -> Result<T, GitHubError> {
        let response = self.send(url).await?;

        if response.status == 404 {
            return Err(GitHubError::NotFound(resource.to_string()));
        }
        if !response.is_success() {
            let message = serde_json::from_slice::<GitHubErrorBody>(&response.body)
                .map(|body| body.message)
                .unwrap_or_else(|_| String::from_utf8_lossy(&response.body).to_string());
            return Err(GitHubError::Api {
                status: response.status,
                message,
            });
        }

        Ok(serde_json::from_slice(&response.body)?)
    }

    /// API URL for `segments`, each percent-encoded as a single path segment.
    fn endpoint(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
    ) -> Result<String, GitHubError> {
        let invalid = |reason: &str| {
            GitHubError::Config(format!("invalid API URL {}: {reason}", self.api_url))
        };
        let mut url = Url::parse(&self.api_url).map_err(|e| invalid(&e.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| invalid("cannot be a base"))?
            .pop_if_empty()
            .extend(segments);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url.into())
    }

    /// Fetch every page of a list endpoint, stopping at the first short page.
    async fn get_all_pages<T: DeserializeOwned>(
        &self,
        path: &[&str],
        params: &[(&'static str, String)],
        resource: &str,
    ) -> Result<Vec<T>, GitHubError> {
        let mut items = Vec::new();
        let mut page = 1u32;

        loop {
            let mut query = vec![
                ("per_page", PAGE_SIZE.to_string()),
                ("page", page.to_string()),
            ];
            query.extend(params.iter().cloned());
            let url = self.endpoint(path, &query)?;

            let batch: Vec<T> = self.get(url, resource).await?;
            let len = batch.len();
            items.extend(batch);
            tracing::debug!(resource, page, len, total = items.len(), "Fetched page");

            if len < PAGE_SIZE {
                break;
            }
            page += 1;
        }

        Ok(items)
    }
}

#[async_trait]
impl PlatformClient for GitHubClient {
    async fn get_repo(&self, owner: &str, name: &str) -> platform::Result<PlatformRepo> {
        let resource = format!("{owner}/{name}");
        let url = self.endpoint(&["repos", owner, name], &[])?;
        let repo: GitHubRepo = self.get(url, &resource).await?;
        Ok(to_platform_repo(repo))
    }

    async fn list_user_repos(&self, username: &str) -> platform::Result<Vec<PlatformRepo>> {
        let path = ["users", username, "repos"];
        let repos: Vec<GitHubRepo> = self.get_all_pages(&path, &[], username).await?;
        Ok(repos.into_iter().map(to_platform_repo).collect())
    }

    async fn list_commits(
        &self,
        owner: &str,
        name: &str,
        query: &CommitQuery,
    ) -> platform::Result<Vec<PlatformCommit>> {
        let resource = format!("{owner}/{name}");
        let path = ["repos", owner, name, "commits"];
        let commits: Vec<GitHubCommit> = self
            .get_all_pages(&path, &query.to_params(), &resource)
            .await?;
        Ok(commits.into_iter().map(to_platform_commit).collect())
    }

    fn rate_limit(&self) -> Option<RateLimitInfo> {
        self.gate.snapshot()
    }
}

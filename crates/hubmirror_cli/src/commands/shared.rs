use std::sync::Arc;

use hubmirror::discovery::{CommitDiscoveryService, DiscoveryOptions, RepositoryDiscoveryService};
use hubmirror::github::GitHubClient;
use hubmirror::store::SqlStore;

use crate::config::Config;

/// Storage, gateway and both discovery services wired together.
pub(crate) struct Engine {
    pub store: Arc<SqlStore>,
    pub client: Arc<GitHubClient>,
    pub commits: Arc<CommitDiscoveryService>,
    pub repos: Arc<RepositoryDiscoveryService>,
}

pub(crate) async fn build_engine(
    config: &Config,
    database_url: &str,
    options: DiscoveryOptions,
) -> Result<Engine, Box<dyn std::error::Error>> {
    let db = hubmirror::connect_and_migrate(database_url).await?;
    let store = Arc::new(SqlStore::new(db));

    let token = config.github_token();
    if token.is_none() {
        tracing::warn!("No GitHub token configured, unauthenticated quota is 60 requests per hour");
    }
    let client = Arc::new(GitHubClient::new(
        &config.github.api_url,
        token,
        config.github.requests_per_second,
    )?);

    let commits = Arc::new(CommitDiscoveryService::new(
        client.clone(),
        store.clone(),
        options.clone(),
    ));
    let repos = Arc::new(RepositoryDiscoveryService::new(
        client.clone(),
        store.clone(),
        commits.clone(),
        options,
    ));

    Ok(Engine {
        store,
        client,
        commits,
        repos,
    })
}

/// Log the last observed quota, if any request was made.
pub(crate) fn log_rate_limit(client: &GitHubClient) {
    use hubmirror::PlatformClient;

    if let Some(info) = client.rate_limit() {
        tracing::info!(
            remaining = info.remaining,
            limit = info.limit,
            reset_at = %info.reset_at,
            "GitHub quota"
        );
    }
}

use hubmirror::discovery::{DiscoveryOptions, RepositoryDiscovery};
use hubmirror::store::UserStore;

use crate::commands::shared::{build_engine, log_rate_limit};
use crate::config::Config;

/// Register `username` and backfill every repository in the foreground.
pub(crate) async fn handle_discover(
    config: &Config,
    database_url: &str,
    username: &str,
    display_name: Option<&str>,
    no_pacing: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut options = config.discovery_options()?;
    if no_pacing {
        options = DiscoveryOptions {
            bulk_pacing: std::time::Duration::ZERO,
            rescan_pacing: std::time::Duration::ZERO,
            ..options
        };
    }
    let engine = build_engine(config, database_url, options).await?;

    engine.store.upsert_user(username, display_name).await?;
    let result = engine.repos.discover_all_for_user(username).await?;

    println!(
        "{username}: {} listed, {} new, {} updated, {} unchanged, {} commits stored",
        result.listed, result.inserted, result.updated, result.unchanged, result.commits_inserted
    );
    for error in &result.errors {
        println!("  failed: {error}");
    }
    log_rate_limit(&engine.client);
    Ok(())
}

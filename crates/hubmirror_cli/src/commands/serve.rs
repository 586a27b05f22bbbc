use std::future::{Future, IntoFuture};
use std::sync::Arc;

use hubmirror::service::MirrorService;
use hubmirror::tasks::{TaskManager, TaskQueue};

use crate::api;
use crate::commands::shared::{build_engine, log_rate_limit};
use crate::config::Config;
use crate::shutdown::shutdown_signal;

pub(crate) async fn handle_serve(
    config: &Config,
    database_url: &str,
    bind: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let engine = build_engine(config, database_url, config.discovery_options()?).await?;

    let addr = bind.unwrap_or_else(|| config.server.bind.clone());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    let tasks = Arc::new(TaskManager::start(
        engine.repos.clone(),
        engine.commits.clone(),
        config.task_options(),
    ));
    tasks.enqueue_rescan()?;

    let service = MirrorService::new(engine.store.clone(), tasks.clone());
    let app = api::router(service);
    tracing::info!(addr = %addr, "Server listening");

    let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());
    let report = serve_then_drain(server.into_future(), tasks.shutdown()).await?;

    let total = report.stats.total();
    tracing::info!(
        completed = total.completed,
        failed = total.failed,
        elapsed_ms = report.elapsed.as_millis(),
        "Shutdown complete"
    );
    log_rate_limit(&engine.client);
    Ok(())
}

/// Run `server` to completion, then always run `drain`.
///
/// A server error takes precedence; a drain failure alongside it is logged.
async fn serve_then_drain<T, E>(
    server: impl Future<Output = std::io::Result<()>>,
    drain: impl Future<Output = Result<T, E>>,
) -> Result<T, Box<dyn std::error::Error>>
where
    E: std::error::Error + 'static,
{
    let served = server.await;
    match &served {
        Ok(()) => tracing::info!("HTTP server stopped, draining background work"),
        Err(e) => tracing::error!(error = %e, "HTTP server failed, draining background work"),
    }

    let drained = drain.await;
    match served {
        Ok(()) => Ok(drained?),
        Err(e) => {
            if let Err(drain_err) = drained {
                tracing::error!(error = %drain_err, "Background work did not drain");
            }
            Err(e.into())
        }
    }
}

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::discovery::{CommitDiscovery, DiscoveryError, RepositoryDiscovery};

use super::TaskQueue;
use super::errors::TaskError;
use super::items::{DiscoverUser, FetchRepository, QueueKind, RescanSignal, ResetRepository};
use super::stats::{TaskStats, TaskStatsSnapshot};

/// Wait between the end of one rescan and the next.
pub const DEFAULT_RESCAN_COOLDOWN: Duration = Duration::from_secs(72 * 60 * 60);

/// How long shutdown waits for in-flight work.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOptions {
    pub rescan_cooldown: Duration,
    pub shutdown_timeout: Duration,
}

impl Default for TaskOptions {
    fn default() -> Self {
        Self {
            rescan_cooldown: DEFAULT_RESCAN_COOLDOWN,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

/// Outcome of a clean shutdown.
#[derive(Debug, Clone)]
#[must_use = "ShutdownReport carries failure counts that should be logged"]
pub struct ShutdownReport {
    pub elapsed: Duration,
    pub stats: TaskStatsSnapshot,
}

struct Senders {
    discover: UnboundedSender<DiscoverUser>,
    fetch: UnboundedSender<FetchRepository>,
    rescan: UnboundedSender<RescanSignal>,
    reset: UnboundedSender<ResetRepository>,
}

struct Shared {
    /// `None` once shutdown has begun. Dropping the senders closes the queues.
    senders: RwLock<Option<Senders>>,
    tracker: TaskTracker,
    cancel: CancellationToken,
    stats: TaskStats,
    options: TaskOptions,
    /// A cooldown timer is waiting to enqueue the next rescan.
    rescan_scheduled: AtomicBool,
}

impl Shared {
    fn send<T>(
        &self,
        kind: QueueKind,
        item: T,
        select: impl FnOnce(&Senders) -> &UnboundedSender<T>,
    ) -> Result<(), TaskError> {
        let guard = self.senders.read().unwrap_or_else(PoisonError::into_inner);
        let sent = match guard.as_ref() {
            Some(senders) => select(senders).send(item).is_ok(),
            None => false,
        };
        if !sent {
            tracing::warn!(queue = %kind, "Orchestrator shutting down, dropping work item");
            return Err(TaskError::ShuttingDown { queue: kind });
        }
        self.stats.record_enqueued(kind);
        Ok(())
    }
}

impl TaskQueue for Shared {
    fn enqueue_user_discovery(&self, username: &str) -> Result<(), TaskError> {
        let item = DiscoverUser {
            username: username.to_string(),
        };
        self.send(QueueKind::DiscoverUser, item, |s| &s.discover)
    }

    fn enqueue_repository_fetch(&self, username: &str, repo_name: &str) -> Result<(), TaskError> {
        let item = FetchRepository {
            username: username.to_string(),
            repo_name: repo_name.to_string(),
        };
        self.send(QueueKind::FetchRepository, item, |s| &s.fetch)
    }

    fn enqueue_rescan(&self) -> Result<(), TaskError> {
        self.send(QueueKind::Rescan, RescanSignal, |s| &s.rescan)
    }

    fn enqueue_reset(
        &self,
        owner: &str,
        repo_name: &str,
        target_sha: &str,
    ) -> Result<(), TaskError> {
        let item = ResetRepository {
            owner: owner.to_string(),
            repo_name: repo_name.to_string(),
            target_sha: target_sha.to_string(),
        };
        self.send(QueueKind::ResetRepository, item, |s| &s.reset)
    }
}

/// Everything a spawned task needs.
#[derive(Clone)]
struct Context {
    shared: Arc<Shared>,
    repos: Arc<dyn RepositoryDiscovery>,
    commits: Arc<dyn CommitDiscovery>,
}

impl Context {
    fn completed(&self, kind: QueueKind) {
        self.shared.stats.record_completed(kind);
    }

    /// Absence is routine and logged at info; anything else is a warning.
    fn failed(&self, kind: QueueKind, subject: &str, err: &DiscoveryError) {
        self.shared.stats.record_failed(kind);
        if err.is_not_found() {
            tracing::info!(queue = %kind, subject, error = %err, "Work item target not found");
        } else {
            tracing::warn!(queue = %kind, subject, error = %err, "Work item failed");
        }
    }
}

/// Owns the queues, their dispatchers and every task they spawn.
pub struct TaskManager {
    shared: Arc<Shared>,
}

impl TaskManager {
    /// Create the queues and spawn one dispatcher per queue.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(
        repos: Arc<dyn RepositoryDiscovery>,
        commits: Arc<dyn CommitDiscovery>,
        options: TaskOptions,
    ) -> Self {
        let (discover_tx, discover_rx) = mpsc::unbounded_channel();
        let (fetch_tx, fetch_rx) = mpsc::unbounded_channel();
        let (rescan_tx, rescan_rx) = mpsc::unbounded_channel();
        let (reset_tx, reset_rx) = mpsc::unbounded_channel();

        let shared = Arc::new(Shared {
            senders: RwLock::new(Some(Senders {
                discover: discover_tx,
                fetch: fetch_tx,
                rescan: rescan_tx,
                reset: reset_tx,
            })),
            tracker: TaskTracker::new(),
            cancel: CancellationToken::new(),
            stats: TaskStats::default(),
            options,
            rescan_scheduled: AtomicBool::new(false),
        });
        let ctx = Context {
            shared: Arc::clone(&shared),
            repos,
            commits,
        };

        let tracker = &shared.tracker;
        tracker.spawn(dispatch(ctx.clone(), QueueKind::DiscoverUser, discover_rx, discover_user));
        tracker.spawn(dispatch(
            ctx.clone(),
            QueueKind::FetchRepository,
            fetch_rx,
            fetch_repository,
        ));
        tracker.spawn(dispatch(ctx.clone(), QueueKind::Rescan, rescan_rx, rescan));
        tracker.spawn(dispatch(ctx, QueueKind::ResetRepository, reset_rx, reset_repository));

        tracing::debug!("Task orchestrator started");
        Self { shared }
    }

    pub fn stats(&self) -> TaskStatsSnapshot {
        self.shared.stats.snapshot()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shared.cancel.is_cancelled()
    }

    /// Stop accepting work, drain what was accepted and wait for every task.
    ///
    /// Queued items are still processed. Pending rescan cooldowns are
    /// cancelled. Calling this twice is harmless.
    ///
    /// # Errors
    /// Returns [`TaskError::ShutdownTimeout`] if tasks are still running after
    /// the configured shutdown timeout.
    pub async fn shutdown(&self) -> Result<ShutdownReport, TaskError> {
        let started = Instant::now();
        let senders = self
            .shared
            .senders
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        drop(senders);
        self.shared.cancel.cancel();
        self.shared.tracker.close();

        let timeout = self.shared.options.shutdown_timeout;
        let pending_before = self.shared.tracker.len();
        tracing::info!(
            pending = pending_before,
            timeout_secs = timeout.as_secs_f64(),
            "Draining task queues"
        );

        match tokio::time::timeout(timeout, self.shared.tracker.wait()).await {
            Ok(()) => {
                let report = ShutdownReport {
                    elapsed: started.elapsed(),
                    stats: self.stats(),
                };
                let total = report.stats.total();
                tracing::info!(
                    completed = total.completed,
                    failed = total.failed,
                    elapsed_ms = report.elapsed.as_millis(),
                    "Task orchestrator stopped"
                );
                Ok(report)
            }
            Err(_) => {
                let pending = self.shared.tracker.len();
                tracing::warn!(pending, "Shutdown timed out with tasks still running");
                Err(TaskError::ShutdownTimeout { timeout, pending })
            }
        }
    }
}

impl TaskQueue for TaskManager {
    fn enqueue_user_discovery(&self, username: &str) -> Result<(), TaskError> {
        self.shared.enqueue_user_discovery(username)
    }

    fn enqueue_repository_fetch(&self, username: &str, repo_name: &str) -> Result<(), TaskError> {
        self.shared.enqueue_repository_fetch(username, repo_name)
    }

    fn enqueue_rescan(&self) -> Result<(), TaskError> {
        self.shared.enqueue_rescan()
    }

    fn enqueue_reset(
        &self,
        owner: &str,
        repo_name: &str,
        target_sha: &str,
    ) -> Result<(), TaskError> {
        self.shared.enqueue_reset(owner, repo_name, target_sha)
    }
}

/// Pull items off one queue until it is closed and empty, spawning a task per item.
async fn dispatch<T, F, Fut>(ctx: Context, kind: QueueKind, mut rx: UnboundedReceiver<T>, handle: F)
where
    T: Send + 'static,
    F: Fn(Context, T) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    while let Some(item) = rx.recv().await {
        let tracker = ctx.shared.tracker.clone();
        tracker.spawn(handle(ctx.clone(), item));
    }
    tracing::debug!(queue = %kind, "Queue closed, dispatcher exiting");
}

async fn discover_user(ctx: Context, item: DiscoverUser) {
    let kind = QueueKind::DiscoverUser;
    match ctx.repos.discover_all_for_user(&item.username).await {
        Ok(result) if result.user_missing => {
            tracing::info!(username = %item.username, "User not registered, discovery skipped");
            ctx.completed(kind);
        }
        Ok(result) => {
            tracing::info!(
                username = %item.username,
                listed = result.listed,
                inserted = result.inserted,
                updated = result.updated,
                unchanged = result.unchanged,
                commits_inserted = result.commits_inserted,
                errors = result.errors.len(),
                "User discovery finished"
            );
            ctx.completed(kind);
        }
        Err(e) => ctx.failed(kind, &item.username, &e),
    }
}

async fn fetch_repository(ctx: Context, item: FetchRepository) {
    let kind = QueueKind::FetchRepository;
    let subject = format!("{}/{}", item.username, item.repo_name);
    match ctx.repos.fetch_on_demand(&item.username, &item.repo_name).await {
        Ok(tracked) => {
            tracing::info!(repository = %tracked.full_name(), "Requested repository fetched");
            ctx.completed(kind);
        }
        Err(e) => ctx.failed(kind, &subject, &e),
    }
}

async fn rescan(ctx: Context, _signal: RescanSignal) {
    let kind = QueueKind::Rescan;
    match ctx.repos.rescan_all().await {
        Ok(result) => {
            tracing::info!(
                checked = result.checked,
                updated = result.updated,
                unchanged = result.unchanged,
                commits_inserted = result.commits_inserted,
                errors = result.errors.len(),
                "Rescan finished"
            );
            ctx.completed(kind);
        }
        Err(e) => ctx.failed(kind, "all repositories", &e),
    }
    schedule_next_rescan(&ctx.shared);
}

/// Enqueue another rescan after the cooldown, unless one is already waiting.
fn schedule_next_rescan(shared: &Arc<Shared>) {
    if shared.cancel.is_cancelled() || shared.rescan_scheduled.swap(true, Ordering::AcqRel) {
        return;
    }
    let cooldown = shared.options.rescan_cooldown;
    let cancel = shared.cancel.clone();
    let shared_for_timer = Arc::clone(shared);
    tracing::debug!(cooldown_secs = cooldown.as_secs(), "Next rescan scheduled");
    shared.tracker.spawn(async move {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                tracing::debug!("Rescan cooldown cancelled");
            }
            () = tokio::time::sleep(cooldown) => {
                shared_for_timer.rescan_scheduled.store(false, Ordering::Release);
                // Fails only during shutdown, which already logged the drop.
                let _ = shared_for_timer.enqueue_rescan();
            }
        }
    });
}

async fn reset_repository(ctx: Context, item: ResetRepository) {
    let kind = QueueKind::ResetRepository;
    let subject = format!("{}/{}", item.owner, item.repo_name);
    match ctx
        .commits
        .truncate_to(&item.owner, &item.repo_name, &item.target_sha)
        .await
    {
        Ok(result) => {
            tracing::info!(
                repository = %subject,
                target_sha = %item.target_sha,
                deleted = result.deleted,
                target_found = result.target_found,
                "Commit history truncated"
            );
            ctx.completed(kind);
        }
        Err(e) => ctx.failed(kind, &subject, &e),
    }
}

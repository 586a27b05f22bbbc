use std::num::NonZeroU32;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};

use super::types::RateLimitInfo;

type GovernorRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Default proactive pacing for GitHub.
///
/// The authenticated quota is 5000 requests/hour; 10/sec still allows
/// short bursts while the quota gate handles the hourly envelope.
pub const GITHUB_DEFAULT_RPS: u32 = 10;

/// Proactive requests-per-second pacing using `governor`.
///
/// # Example
///
/// ```ignore
/// let limiter = ApiRateLimiter::new(10);
/// limiter.wait().await;
/// ```
#[derive(Clone)]
pub struct ApiRateLimiter {
    inner: Arc<GovernorRateLimiter>,
}

impl ApiRateLimiter {
    /// `requests_per_second` of zero is treated as one.
    pub fn new(requests_per_second: u32) -> Self {
        let rps = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        Self {
            inner: Arc::new(RateLimiter::direct(Quota::per_second(rps))),
        }
    }

    pub async fn wait(&self) {
        self.inner.until_ready().await;
    }
}

/// Shared quota gate for every request issued through one client.
///
/// Holds the last advertised [`RateLimitInfo`] behind a lock. Each call to
/// [`QuotaGate::acquire`] either reserves one unit of the remaining allowance
/// or, when the allowance is spent and the reset lies in the future, suspends
/// the caller until the reset. The lock is never held across an `.await`.
pub struct QuotaGate {
    state: Mutex<Option<RateLimitInfo>>,
    pacer: Option<ApiRateLimiter>,
}

impl Default for QuotaGate {
    fn default() -> Self {
        Self::new()
    }
}

impl QuotaGate {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(None),
            pacer: None,
        }
    }

    /// Gate that additionally paces requests to `requests_per_second`.
    pub fn with_pacing(requests_per_second: u32) -> Self {
        Self {
            state: Mutex::new(None),
            pacer: Some(ApiRateLimiter::new(requests_per_second)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<RateLimitInfo>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Wait until a request may be sent, then reserve it.
    pub async fn acquire(&self) {
        if let Some(pacer) = &self.pacer {
            pacer.wait().await;
        }

        if let Some((reset_at, delay)) = self.reserve(Utc::now()) {
            tracing::info!(
                %reset_at,
                wait_ms = delay.as_millis() as u64,
                "Rate limit exhausted, waiting for reset"
            );
            tokio::time::sleep(delay).await;
            self.roll_over(reset_at);
        }
    }

    /// Record the envelope from a response.
    ///
    /// Envelopes for an older window than the one already tracked are
    /// ignored, so a slow response cannot resurrect an expired allowance.
    pub fn update(&self, info: RateLimitInfo) {
        let mut state = self.lock();
        match state.as_ref() {
            Some(current) if current.reset_at > info.reset_at => {}
            _ => *state = Some(info),
        }
    }

    pub fn snapshot(&self) -> Option<RateLimitInfo> {
        *self.lock()
    }

    /// Reserve one request, or return the reset to wait for.
    fn reserve(&self, now: DateTime<Utc>) -> Option<(DateTime<Utc>, Duration)> {
        let mut state = self.lock();
        let info = state.as_mut()?;

        if info.remaining == 0 {
            if info.reset_at > now {
                let delay = (info.reset_at - now).to_std().unwrap_or_default();
                return Some((info.reset_at, delay));
            }
            // Window passed without a fresh envelope; the next response corrects it.
            info.remaining = info.limit;
        }
        info.remaining = info.remaining.saturating_sub(1);
        None
    }

    /// After sleeping through `reset_at`, open the new window for the waiter.
    fn roll_over(&self, reset_at: DateTime<Utc>) {
        let mut state = self.lock();
        if let Some(info) = state.as_mut() {
            if info.reset_at == reset_at && info.remaining == 0 {
                info.remaining = info.limit;
            }
            info.remaining = info.remaining.saturating_sub(1);
        }
    }
}

//! Request pacing for provider APIs.
//!
//! Two policies are supported, matching what the providers actually enforce:
//! a fixed minimum delay between consecutive requests, and a sliding
//! per-minute request budget. `acquire()` never fails; it only delays.

use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

/// Length of the sliding window for [`RatePolicy::PerMinute`].
const WINDOW: Duration = Duration::from_secs(60);

/// Pacing policy for outgoing requests to one provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatePolicy {
    /// At least this much time between consecutive requests
    MinInterval(Duration),
    /// At most this many requests within any trailing 60-second window
    PerMinute(u32),
}

/// Enforces a [`RatePolicy`] across sequential requests.
///
/// Called once per fetch, before its first attempt; retries within a fetch
/// pace themselves with backoff instead. Suspends the caller until the next
/// request is admissible.
pub struct RateLimiter {
    policy: RatePolicy,
    state: Mutex<LimiterState>,
}

#[derive(Debug)]
struct LimiterState {
    last_granted: Option<Instant>,
    window_start: Option<Instant>,
    window_count: u32,
}

impl RateLimiter {
    /// Create a limiter for the given policy.
    pub fn new(policy: RatePolicy) -> Self {
        Self {
            policy,
            state: Mutex::new(LimiterState {
                last_granted: None,
                window_start: None,
                window_count: 0,
            }),
        }
    }

    /// The policy this limiter enforces.
    pub fn policy(&self) -> RatePolicy {
        self.policy
    }

    /// Wait until it is safe to issue the next request.
    pub async fn acquire(&self) {
        let mut state = self.state.lock().await;
        match self.policy {
            RatePolicy::MinInterval(min_gap) => {
                if let Some(last) = state.last_granted {
                    let elapsed = last.elapsed();
                    if elapsed < min_gap {
                        let wait = min_gap - elapsed;
                        tracing::trace!(wait_ms = wait.as_millis() as u64, "rate limit pause");
                        sleep(wait).await;
                    }
                }
                state.last_granted = Some(Instant::now());
            }
            RatePolicy::PerMinute(ceiling) => {
                let now = Instant::now();
                let window_start = match state.window_start {
                    Some(start) if now.duration_since(start) < WINDOW => start,
                    _ => {
                        // Window expired or first request: start a fresh one
                        state.window_start = Some(now);
                        state.window_count = 0;
                        now
                    }
                };

                if state.window_count >= ceiling {
                    let wait = WINDOW - now.duration_since(window_start);
                    tracing::info!(
                        wait_secs = wait.as_secs_f64(),
                        ceiling = ceiling,
                        "per-minute request budget exhausted, pausing"
                    );
                    sleep(wait).await;
                    state.window_start = Some(Instant::now());
                    state.window_count = 0;
                }

                state.window_count += 1;
            }
        }
    }
}

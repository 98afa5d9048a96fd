use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

const WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug)]
struct RateLimitState {
    request_count: u32,
    window_start: Instant,
    last_request: Option<Instant>,
}

/// Cooperative throttle in front of the model provider: a rolling 60-second
/// window bounded by `requests_per_minute`, plus a minimum spacing between
/// consecutive calls. `acquire` suspends the caller until it is safe to issue
/// one request; it never rejects.
///
/// The lock is held across the sleeps on purpose: concurrent callers
/// serialize through the limiter, so the window count stays accurate no
/// matter how many requests are in flight.
#[derive(Debug)]
pub struct RateLimiter {
    requests_per_minute: u32,
    min_interval: Duration,
    state: Mutex<RateLimitState>,
}

impl RateLimiter {
    pub fn new(requests_per_minute: u32, min_interval: Duration) -> Self {
        Self {
            requests_per_minute: requests_per_minute.max(1),
            min_interval,
            state: Mutex::new(RateLimitState {
                request_count: 0,
                window_start: Instant::now(),
                last_request: None,
            }),
        }
    }

    pub async fn acquire(&self) {
        let mut state = self.state.lock().await;
        let mut now = Instant::now();

        if now.duration_since(state.window_start) >= WINDOW {
            state.request_count = 0;
            state.window_start = now;
        }

        if state.request_count >= self.requests_per_minute {
            let wait = WINDOW.saturating_sub(now.duration_since(state.window_start));
            debug!(wait_ms = wait.as_millis() as u64, "Request window full, waiting");
            tokio::time::sleep(wait).await;
            now = Instant::now();
            state.request_count = 0;
            state.window_start = now;
        }

        if let Some(last) = state.last_request {
            let since = now.duration_since(last);
            if since < self.min_interval {
                tokio::time::sleep(self.min_interval - since).await;
                now = Instant::now();
            }
        }

        state.request_count += 1;
        state.last_request = Some(now);
    }
}

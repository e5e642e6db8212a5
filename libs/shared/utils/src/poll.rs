//! Bounded polling for state that changes outside this process
//! (a patient finishing check-in on their own device, for example).

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

const MIN_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    pub interval: Duration,
    pub timeout: Duration,
}

impl PollConfig {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self {
            interval: interval.max(MIN_INTERVAL),
            timeout,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum PollOutcome<T> {
    Ready(T),
    TimedOut,
    Cancelled,
}

/// Calls `check` every `config.interval` until it yields `Some`, the timeout
/// elapses, or `cancel` fires. Errors from `check` end the loop immediately.
/// The first check runs without waiting.
pub async fn poll_until<T, E, F, Fut>(
    config: PollConfig,
    cancel: CancellationToken,
    mut check: F,
) -> Result<PollOutcome<T>, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
{
    let deadline = Instant::now() + config.timeout;
    let mut attempts: u32 = 0;

    loop {
        if cancel.is_cancelled() {
            debug!("Poll cancelled after {} attempts", attempts);
            return Ok(PollOutcome::Cancelled);
        }

        attempts += 1;
        if let Some(value) = check().await? {
            debug!("Poll satisfied after {} attempts", attempts);
            return Ok(PollOutcome::Ready(value));
        }

        let now = Instant::now();
        if now >= deadline {
            debug!("Poll timed out after {} attempts", attempts);
            return Ok(PollOutcome::TimedOut);
        }

        let wait = config.interval.min(deadline - now);
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Poll cancelled after {} attempts", attempts);
                return Ok(PollOutcome::Cancelled);
            }
            _ = sleep(wait) => {}
        }
    }
}

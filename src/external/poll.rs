//! Bounded fixed-interval polling with a hard deadline.

use std::future::Future;
use std::time::Duration;
use tokio::time::{Instant, sleep, timeout_at};
use tokio_retry::RetryIf;
use tokio_retry::strategy::FixedInterval;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_attempts: usize,
    pub interval: Duration,
}

impl PollPolicy {
    #[must_use]
    pub const fn new(max_attempts: usize, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }

    /// Longest time the attempts alone can take.
    #[must_use]
    pub fn budget(&self) -> Duration {
        self.interval * u32::try_from(self.max_attempts).unwrap_or(u32::MAX)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum PollError<E> {
    /// Every attempt ran and none produced a value.
    Exhausted,
    DeadlineExceeded,
    /// The check itself failed; polling stops at the first hard error.
    Failed(E),
}

enum Attempt<E> {
    NotYet,
    Failed(E),
}

/// Runs `check` every `policy.interval` (waiting one interval before the first
/// attempt) until it yields `Some`, fails, runs out of attempts, or `deadline` passes.
pub async fn poll_until<T, E, F, Fut>(
    policy: PollPolicy,
    deadline: Instant,
    mut check: F,
) -> Result<T, PollError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
{
    if policy.max_attempts == 0 {
        return Err(PollError::Exhausted);
    }

    let strategy = FixedInterval::new(policy.interval).take(policy.max_attempts - 1);
    let action = || {
        let attempt = check();
        async move {
            match attempt.await {
                Ok(Some(value)) => Ok(value),
                Ok(None) => Err(Attempt::NotYet),
                Err(e) => Err(Attempt::Failed(e)),
            }
        }
    };

    let polling = async {
        sleep(policy.interval).await;
        RetryIf::spawn(strategy, action, |e: &Attempt<E>| {
            matches!(e, Attempt::NotYet)
        })
        .await
    };

    match timeout_at(deadline, polling).await {
        Err(_) => Err(PollError::DeadlineExceeded),
        Ok(Ok(value)) => Ok(value),
        Ok(Err(Attempt::NotYet)) => Err(PollError::Exhausted),
        Ok(Err(Attempt::Failed(e))) => Err(PollError::Failed(e)),
    }
}

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Optional slowdown after consecutive failed polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub factor: u32,
    pub max_interval: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSchedule {
    pub interval: Duration,
    pub backoff: Option<Backoff>,
}

impl PollSchedule {
    pub fn fixed(interval: Duration) -> Self {
        Self {
            interval,
            backoff: None,
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = Some(backoff);
        self
    }

    /// Delay before the next poll, given how many polls in a row have failed.
    pub fn delay_after(&self, consecutive_failures: u32) -> Duration {
        let Some(backoff) = self.backoff else {
            return self.interval;
        };
        let ceiling = backoff.max_interval.max(self.interval);
        let mut delay = self.interval;
        for _ in 0..consecutive_failures {
            delay = delay.saturating_mul(backoff.factor.max(1));
            if delay >= ceiling {
                return ceiling;
            }
        }
        delay
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollExit {
    Terminal,
    Cancelled,
}

/// Polls `fetch` on `schedule` until `is_terminal` accepts a value or `cancel` fires.
///
/// Every result, including errors, is handed to `on_update`. The next fetch is
/// only issued after the previous one resolved, so at most one request is in
/// flight. Cancellation abandons a pending fetch.
pub async fn poll_until_terminal<T, E, F, Fut, P, U>(
    mut fetch: F,
    is_terminal: P,
    mut on_update: U,
    schedule: PollSchedule,
    cancel: CancellationToken,
) -> PollExit
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&T) -> bool,
    U: FnMut(Result<T, E>),
{
    let mut failures = 0u32;
    loop {
        let delay = schedule.delay_after(failures);
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return PollExit::Cancelled,
            _ = tokio::time::sleep(delay) => {}
        }

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return PollExit::Cancelled,
            result = fetch() => result,
        };

        let terminal = matches!(&result, Ok(value) if is_terminal(value));
        failures = if result.is_err() {
            failures.saturating_add(1)
        } else {
            0
        };
        on_update(result);
        if terminal {
            return PollExit::Terminal;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_schedule_ignores_failures() {
        let schedule = PollSchedule::fixed(Duration::from_secs(5));
        assert_eq!(schedule.delay_after(7), Duration::from_secs(5));
    }

    #[test]
    fn backoff_grows_and_caps() {
        let schedule = PollSchedule::fixed(Duration::from_secs(3)).with_backoff(Backoff {
            factor: 2,
            max_interval: Duration::from_secs(20),
        });
        assert_eq!(schedule.delay_after(0), Duration::from_secs(3));
        assert_eq!(schedule.delay_after(1), Duration::from_secs(6));
        assert_eq!(schedule.delay_after(2), Duration::from_secs(12));
        assert_eq!(schedule.delay_after(3), Duration::from_secs(20));
        assert_eq!(schedule.delay_after(40), Duration::from_secs(20));
    }
}

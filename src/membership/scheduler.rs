use crate::timers::{Clock, RealClock};
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

pub trait JobHandle: Send + Sync {
    /// Stops future runs. A run already in progress completes.
    fn cancel(&self);
}

pub trait JobScheduler: Send + Sync {
    /// Runs `job` every `period`, first after one period has elapsed.
    fn schedule_recurring(&self, name: &str, period: Duration, job: Box<dyn FnMut() + Send>) -> Box<dyn JobHandle>;
}

/// Runs each recurring job on its own tokio task. Must be used from within a runtime.
pub struct TokioJobScheduler<C: Clock = RealClock> {
    logger: slog::Logger,
    clock: C,
}

impl TokioJobScheduler {
    pub fn new(logger: slog::Logger) -> Self {
        TokioJobScheduler {
            logger,
            clock: RealClock,
        }
    }
}

impl<C: Clock> TokioJobScheduler<C> {
    #[cfg(test)]
    pub(crate) fn with_clock(logger: slog::Logger, clock: C) -> Self {
        TokioJobScheduler { logger, clock }
    }
}

struct TokioJobHandle {
    token: CancellationToken,
}

impl JobHandle for TokioJobHandle {
    fn cancel(&self) {
        self.token.cancel();
    }
}

impl<C: Clock + Send + Sync + 'static> JobScheduler for TokioJobScheduler<C> {
    fn schedule_recurring(
        &self,
        name: &str,
        period: Duration,
        mut job: Box<dyn FnMut() + Send>,
    ) -> Box<dyn JobHandle> {
        let token = CancellationToken::new();
        let task_token = token.clone();
        let mut clock = self.clock.clone();
        let logger = self.logger.new(slog::o!("job" => name.to_string()));

        tokio::task::spawn(async move {
            slog::debug!(logger, "Scheduled every {:?}", period);
            let mut next_run = clock.now() + period;
            loop {
                tokio::select! {
                    _ = task_token.cancelled() => break,
                    _ = clock.sleep_until(next_run) => {}
                }
                if task_token.is_cancelled() {
                    break;
                }

                job();
                next_run += period;
            }
            slog::debug!(logger, "Cancelled");
        });

        Box::new(TokioJobHandle { token })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timers::mocked_clock;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    async fn wait_for_runs(runs: &AtomicUsize, expected: usize) {
        for _ in 0..500 {
            if runs.load(Ordering::SeqCst) >= expected {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
        }
        assert_eq!(runs.load(Ordering::SeqCst), expected);
    }

    #[tokio::test]
    async fn recurring_job_runs_every_period_until_cancelled() {
        // -- setup --
        let period = Duration::from_millis(100);
        let (mock_clock, mut controller) = mocked_clock();
        let logger = slog::Logger::root(slog::Discard, slog::o!());
        let scheduler = TokioJobScheduler::with_clock(logger, mock_clock);
        let runs = Arc::new(AtomicUsize::new(0));
        let job_runs = runs.clone();

        // -- execute & verify --
        let handle = scheduler.schedule_recurring(
            "counter",
            period,
            Box::new(move || {
                job_runs.fetch_add(1, Ordering::SeqCst);
            }),
        );
        tokio::task::yield_now().await;

        // 1. Nothing before the first period.
        controller.advance(period / 2);
        wait_for_runs(&runs, 0).await;

        // 2. Once per period.
        for expected in 1..=3 {
            controller.advance(period);
            wait_for_runs(&runs, expected).await;
        }

        // 3. No more runs after cancel.
        handle.cancel();
        tokio::task::yield_now().await;
        controller.advance(period * 2);
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }
}

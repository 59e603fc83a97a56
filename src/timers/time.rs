use tokio::time::Instant;

/// Time source for the retry timer and the job scheduler. Tests swap in `MockClock` so that
/// deadlines are crossed by hand instead of by waiting.
#[async_trait::async_trait]
pub(crate) trait Clock: Clone {
    fn now(&self) -> Instant;
    async fn sleep_until(&mut self, deadline: Instant);
}

#[derive(Copy, Clone)]
pub(crate) struct RealClock;

#[async_trait::async_trait]
impl Clock for RealClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep_until(&mut self, deadline: Instant) {
        tokio::time::sleep_until(deadline).await;
    }
}

#[cfg(test)]
pub(crate) use mock::mocked_clock;

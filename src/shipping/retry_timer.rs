use crate::shipping::shipper_actor::ShipperEvent;
use crate::timers::{Clock, RealClock};
use tokio::sync::{mpsc, watch};
use tokio::time::{Duration, Instant};

/// Deadline for the shipper's outstanding send.
pub(crate) trait RetryTimer: Send {
    /// (Re)starts the countdown from now.
    fn arm(&mut self);
    fn disarm(&mut self);
}

pub(crate) struct RetryTimerHandle<C: Clock = RealClock> {
    deadline: watch::Sender<Option<Instant>>,
    retry_timeout: Duration,
    clock: C,
}

struct RetryTimerTask<C: Clock> {
    deadline: watch::Receiver<Option<Instant>>,
    actor_client: mpsc::WeakSender<ShipperEvent>,
    clock: C,
}

impl RetryTimerHandle {
    pub(crate) fn spawn_timer_task(retry_timeout: Duration, actor_client: mpsc::WeakSender<ShipperEvent>) -> Self {
        // Add minimal logic in this constructor, as it is untested.
        let (task, handle) = RetryTimerTask::new(retry_timeout, actor_client, RealClock);
        tokio::task::spawn(task.run());

        handle
    }
}

impl<C: Clock + Send + Sync + 'static> RetryTimer for RetryTimerHandle<C> {
    fn arm(&mut self) {
        let deadline = self.clock.now() + self.retry_timeout;
        let _ = self.deadline.send(Some(deadline));
    }

    fn disarm(&mut self) {
        let _ = self.deadline.send(None);
    }
}

impl<C: Clock + Send + Sync + 'static> RetryTimerTask<C> {
    fn new(
        retry_timeout: Duration,
        actor_client: mpsc::WeakSender<ShipperEvent>,
        clock: C,
    ) -> (Self, RetryTimerHandle<C>) {
        let (tx, rx) = watch::channel(None);

        let task = RetryTimerTask {
            deadline: rx,
            actor_client,
            clock: clock.clone(),
        };
        let handle = RetryTimerHandle {
            deadline: tx,
            retry_timeout,
            clock,
        };

        (task, handle)
    }

    async fn run(mut self) {
        loop {
            let current_deadline = *self.deadline.borrow_and_update();
            match current_deadline {
                None => {
                    // Disarmed. Wait to be armed, or exit once the handle is dropped.
                    if self.deadline.changed().await.is_err() {
                        return;
                    }
                }
                Some(wake_time) => {
                    tokio::select! {
                        biased;
                        changed = self.deadline.changed() => {
                            if changed.is_err() {
                                return;
                            }
                            // Re-armed or disarmed while sleeping.
                            continue;
                        }
                        _ = self.clock.sleep_until(wake_time) => {}
                    }
                    if *self.deadline.borrow() != Some(wake_time) {
                        continue;
                    }

                    match self.actor_client.upgrade() {
                        Some(sender) => {
                            let _ = sender.send(ShipperEvent::Timeout).await;
                        }
                        None => return,
                    }

                    // Fire once per arming. The shipper re-arms when it resends.
                    if self.deadline.changed().await.is_err() {
                        return;
                    }
                }
            }
        }
    }
}

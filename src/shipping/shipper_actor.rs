use crate::commitlog::{Index, Log, Term};
use crate::consensus::{LeaderContext, MemberId, Outbound, RaftLogEntry};
use crate::options::ReplicationOptionsValidated;
use crate::shipping::log_shipper::LogShipper;
use crate::shipping::retry_timer::{RetryTimer, RetryTimerHandle};
use std::sync::Arc;
use tokio::sync::mpsc;

// Deep enough that a burst of appends doesn't block the leader's append path.
const SHIPPER_QUEUE_SIZE: usize = 256;

#[derive(Debug)]
pub(crate) enum ShipperEvent {
    Start(LeaderContext),
    Mismatch {
        remote_append_index: Option<Index>,
        leader_context: LeaderContext,
    },
    Match {
        match_index: Option<Index>,
        leader_context: LeaderContext,
    },
    NewEntries {
        base_index: Option<Index>,
        base_term: Term,
        entries: Vec<RaftLogEntry>,
        leader_context: LeaderContext,
    },
    CommitUpdate(LeaderContext),
    Timeout,
    Stop,
}

/// Sending half of one shipper's queue.
pub(crate) struct ShipperClient {
    sender: mpsc::Sender<ShipperEvent>,
}

impl ShipperClient {
    pub(crate) async fn send(&self, event: ShipperEvent) {
        // Only fails once the actor exited, which only happens after `Stop`.
        let _ = self.sender.send(event).await;
    }
}

/// Runs one `LogShipper` on its own task, so every event for a follower is handled in order.
pub(crate) struct ShipperActor<L: Log<RaftLogEntry>, T: RetryTimer> {
    receiver: mpsc::Receiver<ShipperEvent>,
    shipper: LogShipper<L, T>,
}

pub(crate) fn spawn<L>(
    logger: slog::Logger,
    myself: MemberId,
    follower: MemberId,
    log: Arc<L>,
    outbound: Arc<dyn Outbound>,
    options: &ReplicationOptionsValidated,
) -> ShipperClient
where
    L: Log<RaftLogEntry> + 'static,
{
    let (tx, rx) = mpsc::channel(SHIPPER_QUEUE_SIZE);
    let timer = RetryTimerHandle::spawn_timer_task(options.retry_timeout, tx.downgrade());
    let shipper = LogShipper::new(logger, myself, follower, log, outbound, timer, options);

    let actor = ShipperActor { receiver: rx, shipper };
    tokio::task::spawn(actor.run_event_loop());

    ShipperClient { sender: tx }
}

impl<L: Log<RaftLogEntry>, T: RetryTimer> ShipperActor<L, T> {
    pub(crate) async fn run_event_loop(mut self) {
        while let Some(event) = self.receiver.recv().await {
            if let ShipperEvent::Stop = event {
                self.shipper.stop();
                return;
            }
            self.handle_event(event);
        }
    }

    // This must NOT be async. Sends go through `Outbound`, which never blocks.
    fn handle_event(&mut self, event: ShipperEvent) {
        match event {
            ShipperEvent::Start(leader_context) => self.shipper.start(leader_context),
            ShipperEvent::Mismatch {
                remote_append_index,
                leader_context,
            } => self.shipper.on_mismatch(remote_append_index, leader_context),
            ShipperEvent::Match {
                match_index,
                leader_context,
            } => self.shipper.on_match(match_index, leader_context),
            ShipperEvent::NewEntries {
                base_index,
                base_term,
                entries,
                leader_context,
            } => self
                .shipper
                .on_new_entries(base_index, base_term, entries, leader_context),
            ShipperEvent::CommitUpdate(leader_context) => self.shipper.on_commit_update(leader_context),
            ShipperEvent::Timeout => self.shipper.on_timeout(),
            ShipperEvent::Stop => self.shipper.stop(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commitlog::InMemoryLog;
    use crate::consensus::RaftMessage;
    use crate::shipping::test_utils::{FakeTimer, RecordingOutbound};

    #[tokio::test]
    async fn events_are_applied_in_order_until_stop() {
        // -- setup --
        let logger = slog::Logger::root(slog::Discard, slog::o!());
        let log = Arc::new(InMemoryLog::new(logger.clone()));
        log.append(RaftLogEntry::new(Term::new(1), vec![1])).unwrap();
        let outbound = Arc::new(RecordingOutbound::new());
        let timer = FakeTimer::new();
        let shipper = LogShipper::new(
            logger,
            MemberId::new("leader"),
            MemberId::new("follower"),
            log,
            outbound.clone(),
            timer.clone(),
            &ReplicationOptionsValidated::default(),
        );
        let (tx, rx) = mpsc::channel(10);
        let actor = ShipperActor { receiver: rx, shipper };
        let client = ShipperClient { sender: tx };
        let ctx = LeaderContext::new(Term::new(1), None);

        // -- execute --
        let join_handle = tokio::task::spawn(actor.run_event_loop());
        client.send(ShipperEvent::Start(ctx)).await;
        client
            .send(ShipperEvent::Match {
                match_index: Some(Index::new(1)),
                leader_context: ctx,
            })
            .await;
        client.send(ShipperEvent::Stop).await;

        // -- verify --
        join_handle.await.unwrap();
        let messages = outbound.take_all();
        assert!(matches!(messages.as_slice(), [RaftMessage::AppendEntriesRequest(_)]));
        assert!(!timer.is_armed());
    }

    #[tokio::test]
    async fn spawned_shipper_stops_on_request() {
        let logger = slog::Logger::root(slog::Discard, slog::o!());
        let log: Arc<InMemoryLog<RaftLogEntry>> = Arc::new(InMemoryLog::new(logger.clone()));
        let outbound = Arc::new(RecordingOutbound::new());
        let client = spawn(
            logger,
            MemberId::new("leader"),
            MemberId::new("follower"),
            log,
            outbound.clone(),
            &ReplicationOptionsValidated::default(),
        );

        client.send(ShipperEvent::Start(LeaderContext::new(Term::new(1), None))).await;
        client.send(ShipperEvent::Stop).await;
        client.sender.closed().await;

        let messages = outbound.take_all_with_recipient();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].0, MemberId::new("follower"));
    }
}

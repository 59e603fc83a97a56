use crate::commitlog::Index;
use crate::consensus::MemberId;
use crate::membership::scheduler::{JobHandle, JobScheduler};
use crate::options::ReplicationOptionsValidated;
use crate::timers::SharedOption;
use std::collections::{BTreeSet, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::oneshot;
use tokio::time::Duration;

/// Read-only view of the local raft state.
pub trait ReadableRaftState: Send + Sync {
    fn myself(&self) -> MemberId;
    fn voting_members(&self) -> BTreeSet<MemberId>;
    /// Commit index last advertised by the leader. `None` until we have heard from one.
    fn leader_commit(&self) -> Option<Index>;
    fn commit_index(&self) -> Option<Index>;
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MembershipWaiterError {
    #[error("Store id mismatch: local store is {local}, cluster store is {remote}")]
    MismatchedStoreId { local: String, remote: String },

    #[error("Catch-up evaluation was abandoned before completing")]
    Abandoned,
}

type CatchupResult = Result<bool, MembershipWaiterError>;

/// Decides when a joining member has replicated enough of the log to become a voter.
pub struct MembershipWaiter {
    logger: slog::Logger,
    myself: MemberId,
    scheduler: Arc<dyn JobScheduler>,
    max_catchup_lag: Duration,
    catchup_rounds_behind: usize,
}

pub struct CatchupHandle {
    pub future: CatchupFuture,
    pub mismatch_listener: MismatchedStoreListener,
}

impl MembershipWaiter {
    pub fn new(
        logger: slog::Logger,
        myself: MemberId,
        scheduler: Arc<dyn JobScheduler>,
        options: &ReplicationOptionsValidated,
    ) -> Self {
        MembershipWaiter {
            logger,
            myself,
            scheduler,
            max_catchup_lag: options.max_catchup_lag,
            catchup_rounds_behind: options.catchup_rounds_behind,
        }
    }

    /// Evaluates catch-up every `max_catchup_lag` until it succeeds or the listener reports a
    /// mismatched store. Either way the recurring evaluation is cancelled exactly once.
    pub fn wait_until_caught_up_member(&self, raft_state: Arc<dyn ReadableRaftState>) -> CatchupHandle {
        let (tx, rx) = oneshot::channel();
        let completion = Arc::new(Completion {
            sender: SharedOption::with(tx),
            job: SharedOption::new(),
            completed: AtomicBool::new(false),
        });

        let mut evaluator = Evaluator::new(
            self.logger.new(slog::o!("member" => self.myself.to_string())),
            raft_state,
            self.catchup_rounds_behind,
            completion.clone(),
        );
        let job = self.scheduler.schedule_recurring(
            "membership-catchup",
            self.max_catchup_lag,
            Box::new(move || evaluator.evaluate()),
        );
        completion.attach_job(job);

        CatchupHandle {
            future: CatchupFuture { rx },
            mismatch_listener: MismatchedStoreListener { completion },
        }
    }
}

struct Completion {
    sender: SharedOption<oneshot::Sender<CatchupResult>>,
    job: SharedOption<Box<dyn JobHandle>>,
    completed: AtomicBool,
}

impl Completion {
    /// First caller wins. Later calls are no-ops.
    fn complete(&self, result: CatchupResult) {
        if let Some(sender) = self.sender.take() {
            let _ = sender.send(result);
            self.completed.store(true, Ordering::SeqCst);
            self.cancel_job();
        }
    }

    fn attach_job(&self, job: Box<dyn JobHandle>) {
        self.job.replace(job);
        // Completed before we could attach.
        if self.completed.load(Ordering::SeqCst) {
            self.cancel_job();
        }
    }

    fn cancel_job(&self) {
        if let Some(job) = self.job.take() {
            job.cancel();
        }
    }

    fn is_completed(&self) -> bool {
        !self.sender.is_some()
    }
}

struct Evaluator {
    logger: slog::Logger,
    raft_state: Arc<dyn ReadableRaftState>,
    rounds_behind: usize,
    // Leader commit samples, oldest first. At most `rounds_behind` of them.
    leader_commits: VecDeque<Option<Index>>,
    completion: Arc<Completion>,
}

impl Evaluator {
    fn new(
        logger: slog::Logger,
        raft_state: Arc<dyn ReadableRaftState>,
        rounds_behind: usize,
        completion: Arc<Completion>,
    ) -> Self {
        let mut leader_commits = VecDeque::with_capacity(rounds_behind + 1);
        leader_commits.push_back(raft_state.leader_commit());

        Evaluator {
            logger,
            raft_state,
            rounds_behind,
            leader_commits,
            completion,
        }
    }

    fn evaluate(&mut self) {
        if self.completion.is_completed() {
            return;
        }

        if !self.raft_state.voting_members().contains(&self.raft_state.myself()) {
            slog::info!(self.logger, "Not yet a voting member, waiting");
            return;
        }

        // Compare against a stale sample so a leader that keeps committing can still be caught.
        let target = self.leader_commits.front().copied().flatten();
        let current_leader_commit = self.raft_state.leader_commit();
        self.leader_commits.push_back(current_leader_commit);
        while self.leader_commits.len() > self.rounds_behind {
            self.leader_commits.pop_front();
        }

        let local_commit = self.raft_state.commit_index();
        let caught_up = target.is_some() && local_commit >= target;
        if caught_up {
            slog::info!(
                self.logger,
                "Caught up: local commit {:?}, leader commit {:?}",
                local_commit,
                target
            );
            self.completion.complete(Ok(true));
        } else {
            slog::info!(
                self.logger,
                "Still catching up: local commit {:?}, leader commit {:?}",
                local_commit,
                target
            );
        }
    }
}

/// Resolves once the member has caught up, or fails on a mismatched store.
pub struct CatchupFuture {
    rx: oneshot::Receiver<CatchupResult>,
}

impl Future for CatchupFuture {
    type Output = CatchupResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let rx = Pin::new(&mut self.rx);

        match rx.poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(MembershipWaiterError::Abandoned)),
        }
    }
}

/// Fails the catch-up early when the cluster turns out to hold a different store.
#[derive(Clone)]
pub struct MismatchedStoreListener {
    completion: Arc<Completion>,
}

impl MismatchedStoreListener {
    pub fn on_mismatched_store(&self, local: impl Into<String>, remote: impl Into<String>) {
        self.completion.complete(Err(MembershipWaiterError::MismatchedStoreId {
            local: local.into(),
            remote: remote.into(),
        }));
    }
}

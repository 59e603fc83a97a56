use crate::commitlog::{Index, Log, LogError, Term};
use crate::consensus::{
    AppendEntriesRequest, LeaderContext, LogCompactionInfo, MemberId, Outbound, RaftLogEntry, RaftMessage,
};
use crate::options::ReplicationOptionsValidated;
use crate::shipping::retry_timer::RetryTimer;
use std::cmp;
use std::sync::Arc;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Mode {
    /// The follower's log diverges somewhere. Single-entry probes walk back until it agrees.
    Mismatch,
    /// The follower lags. One bounded batch in flight at a time.
    Catchup,
    /// The follower is at the head. New entries go out as they are appended.
    Pipeline,
}

/// Replication driver for a single follower.
///
/// Not thread safe on purpose: all events for one follower must be delivered from a single task
/// (see `ShipperActor`).
pub(crate) struct LogShipper<L: Log<RaftLogEntry>, T: RetryTimer> {
    logger: slog::Logger,
    myself: MemberId,
    follower: MemberId,
    log: Arc<L>,
    outbound: Arc<dyn Outbound>,
    timer: T,

    catchup_batch_size: u64,
    max_allowed_shipping_lag: u64,
    timeouts_before_mismatch: u32,

    mode: Mode,
    // Index of the last entry sent, or the prev index of the last (empty) request sent.
    last_sent_index: Option<Index>,
    last_sent_term: Term,
    match_index: Option<Index>,
    consecutive_timeouts: u32,
    last_leader_context: Option<LeaderContext>,
}

impl<L: Log<RaftLogEntry>, T: RetryTimer> LogShipper<L, T> {
    pub(crate) fn new(
        logger: slog::Logger,
        myself: MemberId,
        follower: MemberId,
        log: Arc<L>,
        outbound: Arc<dyn Outbound>,
        timer: T,
        options: &ReplicationOptionsValidated,
    ) -> Self {
        LogShipper {
            logger,
            myself,
            follower,
            log,
            outbound,
            timer,
            catchup_batch_size: options.catchup_batch_size,
            max_allowed_shipping_lag: options.max_allowed_shipping_lag,
            timeouts_before_mismatch: options.timeouts_before_mismatch,
            mode: Mode::Mismatch,
            last_sent_index: None,
            last_sent_term: Term::default(),
            match_index: None,
            consecutive_timeouts: 0,
            last_leader_context: None,
        }
    }

    /// Opens with an empty append at the head of the log. The follower either matches it or tells
    /// us how far its log goes.
    pub(crate) fn start(&mut self, leader_context: LeaderContext) {
        slog::info!(self.logger, "Starting log shipper to {:?}", self.follower);
        self.last_leader_context = Some(leader_context);
        self.mode = Mode::Mismatch;
        self.match_index = None;
        self.send_head_probe(leader_context);
    }

    pub(crate) fn stop(&mut self) {
        slog::info!(self.logger, "Stopping log shipper to {:?}", self.follower);
        self.timer.disarm();
    }

    fn send_head_probe(&mut self, leader_context: LeaderContext) {
        let append_index = self.log.append_index();
        match self.read_term(append_index) {
            Ok(term) => {
                self.send_append(append_index, term, vec![], leader_context);
                self.timer.arm();
            }
            Err(LogError::Pruned { .. }) => self.send_compaction_info(leader_context),
            Err(e) => {
                slog::error!(self.logger, "Failed to read head of log: {}", e);
                self.timer.arm();
            }
        }
    }

    pub(crate) fn on_mismatch(&mut self, last_remote_append_index: Option<Index>, leader_context: LeaderContext) {
        self.last_leader_context = Some(leader_context);
        self.consecutive_timeouts = 0;
        if self.mode != Mode::Mismatch {
            slog::info!(
                self.logger,
                "Mismatch in mode {:?} from {:?}, moving to Mismatch",
                self.mode,
                self.follower
            );
            self.mode = Mode::Mismatch;
        }
        self.match_index = None;

        let preceding = self.last_sent_index.and_then(|i| i.checked_minus(1));
        let candidate = cmp::min(cmp::min(preceding, last_remote_append_index), self.log.append_index());
        self.send_probe(candidate.unwrap_or_else(Index::start_index), leader_context);
    }

    pub(crate) fn on_match(&mut self, new_match_index: Option<Index>, leader_context: LeaderContext) {
        self.last_leader_context = Some(leader_context);
        self.consecutive_timeouts = 0;

        if self.mode != Mode::Mismatch && new_match_index < self.match_index {
            slog::debug!(
                self.logger,
                "Ignoring stale match {:?}, already matched {:?}",
                new_match_index,
                self.match_index
            );
            return;
        }
        let progressed = new_match_index > self.match_index;
        self.match_index = new_match_index;
        if new_match_index > self.last_sent_index {
            // The follower already had these, e.g. after installing a snapshot.
            self.last_sent_index = new_match_index;
            self.last_sent_term = self.read_term(new_match_index).unwrap_or_default();
        }

        match self.mode {
            Mode::Mismatch | Mode::Catchup => {
                if self.match_index == self.last_sent_index {
                    self.send_next_batch(leader_context);
                }
            }
            Mode::Pipeline => {
                if self.match_index == self.last_sent_index {
                    self.timer.disarm();
                    if self.log.append_index() > self.last_sent_index {
                        self.send_next_batch(leader_context);
                    }
                } else if progressed {
                    // Still responsive, so the countdown restarts for what remains outstanding.
                    self.timer.arm();
                }
            }
        }
    }

    pub(crate) fn on_new_entries(
        &mut self,
        base_index: Option<Index>,
        base_term: Term,
        entries: Vec<RaftLogEntry>,
        leader_context: LeaderContext,
    ) {
        self.last_leader_context = Some(leader_context);
        if self.mode != Mode::Pipeline || entries.is_empty() {
            return;
        }

        if self.last_sent_index == base_index && self.last_sent_term == base_term {
            if Index::distance(self.match_index, base_index) > self.max_allowed_shipping_lag {
                slog::info!(
                    self.logger,
                    "{:?} is lagging {} entries behind, moving to Catchup",
                    self.follower,
                    Index::distance(self.match_index, base_index)
                );
                self.mode = Mode::Catchup;
                return;
            }

            let nothing_outstanding = self.match_index == self.last_sent_index;
            self.send_append(base_index, base_term, entries, leader_context);
            if nothing_outstanding {
                self.timer.arm();
            }
        } else if self.last_sent_index > base_index {
            slog::debug!(
                self.logger,
                "Ignoring new entries after {:?}, already sent up to {:?}",
                base_index,
                self.last_sent_index
            );
        } else {
            slog::info!(
                self.logger,
                "Gap before new entries after {:?} (last sent {:?}), moving to Catchup",
                base_index,
                self.last_sent_index
            );
            self.mode = Mode::Catchup;
            if self.match_index == self.last_sent_index {
                self.send_next_batch(leader_context);
            }
        }
    }

    /// Propagates a new commit index with an empty append when there is nothing else to send.
    pub(crate) fn on_commit_update(&mut self, leader_context: LeaderContext) {
        self.last_leader_context = Some(leader_context);
        if self.mode == Mode::Pipeline && self.match_index == self.last_sent_index {
            self.send_append(self.last_sent_index, self.last_sent_term, vec![], leader_context);
        }
    }

    pub(crate) fn on_timeout(&mut self) {
        let leader_context = match self.last_leader_context {
            Some(leader_context) => leader_context,
            None => return,
        };
        if self.mode != Mode::Mismatch && self.match_index >= self.last_sent_index {
            return;
        }

        match self.mode {
            Mode::Pipeline => {
                slog::info!(self.logger, "Timed out in Pipeline, {:?} moving to Catchup", self.follower);
                self.mode = Mode::Catchup;
                self.consecutive_timeouts = 1;
                self.resend_outstanding(leader_context);
            }
            Mode::Catchup => {
                self.consecutive_timeouts += 1;
                if self.consecutive_timeouts >= self.timeouts_before_mismatch {
                    slog::info!(
                        self.logger,
                        "{} consecutive timeouts in Catchup, {:?} moving to Mismatch",
                        self.consecutive_timeouts,
                        self.follower
                    );
                    self.mode = Mode::Mismatch;
                    self.match_index = None;
                    self.consecutive_timeouts = 0;
                    self.send_probe_at_last_sent(leader_context);
                } else {
                    self.resend_outstanding(leader_context);
                }
            }
            Mode::Mismatch => {
                self.send_probe_at_last_sent(leader_context);
            }
        }
    }

    pub(crate) fn mode(&self) -> Mode {
        self.mode
    }

    #[cfg(test)]
    pub(crate) fn match_index(&self) -> Option<Index> {
        self.match_index
    }

    #[cfg(test)]
    pub(crate) fn last_sent_index(&self) -> Option<Index> {
        self.last_sent_index
    }

    fn send_probe_at_last_sent(&mut self, leader_context: LeaderContext) {
        match self.last_sent_index {
            Some(last_sent_index) => self.send_probe(last_sent_index, leader_context),
            None => self.send_head_probe(leader_context),
        }
    }

    /// Sends entry `candidate` alone, preceded by the term of `candidate - 1`, so the follower's
    /// usual append check tells us whether we agree up to `candidate - 1`.
    fn send_probe(&mut self, candidate: Index, leader_context: LeaderContext) {
        if self.is_pruned(Some(candidate)) {
            self.send_compaction_info(leader_context);
            return;
        }
        if self.log.append_index() < Some(candidate) {
            // Nothing to probe with. An empty append at the head asks the same question.
            self.send_head_probe(leader_context);
            return;
        }

        let prev_index = candidate.checked_minus(1);
        let read = self
            .read_term(prev_index)
            .and_then(|prev_term| Ok((prev_term, self.log.read(candidate)?)));
        match read {
            Ok((prev_term, Some(entry))) => {
                self.send_append(prev_index, prev_term, vec![entry], leader_context);
                self.timer.arm();
            }
            Ok((_, None)) => {
                slog::warn!(self.logger, "Entry {:?} vanished from the log before probing", candidate);
                self.timer.arm();
            }
            Err(LogError::Pruned { .. }) => self.send_compaction_info(leader_context),
            Err(e) => {
                slog::error!(self.logger, "Failed to read probe {:?}: {}", candidate, e);
                self.timer.arm();
            }
        }
    }

    fn send_next_batch(&mut self, leader_context: LeaderContext) {
        let append_index = self.log.append_index();
        if append_index <= self.match_index {
            if self.mode != Mode::Pipeline {
                slog::info!(self.logger, "{:?} caught up, moving to Pipeline", self.follower);
            }
            self.mode = Mode::Pipeline;
            self.timer.disarm();
            return;
        }

        let start = Index::after(self.match_index);
        let max_entries = cmp::min(self.catchup_batch_size, self.max_allowed_shipping_lag);
        let end = cmp::min(append_index, Some(start.plus(max_entries - 1)));
        if self.send_range(start, end, leader_context) {
            let next_mode = if end == append_index { Mode::Pipeline } else { Mode::Catchup };
            if next_mode != self.mode {
                slog::info!(self.logger, "{:?} moving from {:?} to {:?}", self.follower, self.mode, next_mode);
            }
            self.mode = next_mode;
        }
    }

    fn resend_outstanding(&mut self, leader_context: LeaderContext) {
        let start = Index::after(self.match_index);
        let end = cmp::min(self.last_sent_index, Some(start.plus(self.catchup_batch_size - 1)));
        self.send_range(start, end, leader_context);
    }

    /// Sends `[start ..= end]`. Returns whether anything was sent.
    fn send_range(&mut self, start: Index, end: Option<Index>, leader_context: LeaderContext) -> bool {
        if self.is_pruned(Some(start)) {
            self.send_compaction_info(leader_context);
            return false;
        }

        let prev_index = start.checked_minus(1);
        let entries = self
            .read_term(prev_index)
            .and_then(|prev_term| Ok((prev_term, self.read_entries(start, end)?)));
        match entries {
            Ok((_, entries)) if entries.is_empty() => {
                slog::warn!(self.logger, "No entries to send from {:?}", start);
                false
            }
            Ok((prev_term, entries)) => {
                self.send_append(prev_index, prev_term, entries, leader_context);
                self.timer.arm();
                true
            }
            Err(LogError::Pruned { .. }) => {
                self.send_compaction_info(leader_context);
                false
            }
            Err(e) => {
                slog::error!(self.logger, "Failed to read entries from {:?}: {}", start, e);
                self.timer.arm();
                false
            }
        }
    }

    fn read_entries(&self, start: Index, end: Option<Index>) -> Result<Vec<RaftLogEntry>, LogError> {
        let mut entries = Vec::with_capacity(Index::distance(start.checked_minus(1), end) as usize);
        let mut index = start;
        while Some(index) <= end {
            match self.log.read(index)? {
                Some(entry) => entries.push(entry),
                // Truncated underneath us. Send what we have.
                None => break,
            }
            index = index.plus(1);
        }

        Ok(entries)
    }

    fn read_term(&self, index: Option<Index>) -> Result<Term, LogError> {
        match index {
            None => Ok(Term::default()),
            Some(index) => Ok(self.log.read_entry_term(index)?.unwrap_or_default()),
        }
    }

    fn is_pruned(&self, index: Option<Index>) -> bool {
        match self.log.prev_index() {
            Some(prev_index) => index <= Some(prev_index),
            None => false,
        }
    }

    fn send_append(
        &mut self,
        prev_log_index: Option<Index>,
        prev_log_term: Term,
        entries: Vec<RaftLogEntry>,
        leader_context: LeaderContext,
    ) {
        let request = AppendEntriesRequest {
            from: self.myself.clone(),
            leader_term: leader_context.term,
            prev_log_index,
            prev_log_term,
            entries,
            leader_commit: leader_context.commit_index,
        };

        self.last_sent_index = request.last_index();
        self.last_sent_term = request.entries.last().map(|e| e.term).unwrap_or(prev_log_term);
        slog::trace!(
            self.logger,
            "Sending {} entries after {:?} to {:?}",
            request.entries.len(),
            prev_log_index,
            self.follower
        );
        self.outbound
            .send(&self.follower, RaftMessage::AppendEntriesRequest(request));
    }

    fn send_compaction_info(&mut self, leader_context: LeaderContext) {
        let pruned_index = self.log.prev_index();
        slog::info!(
            self.logger,
            "Entries for {:?} are pruned, sending compaction info up to {:?}",
            self.follower,
            pruned_index
        );

        // The follower answers a compaction notice from the pruned index onwards.
        self.mode = Mode::Mismatch;
        self.last_sent_index = pruned_index;
        self.last_sent_term = self.read_term(pruned_index).unwrap_or_default();
        self.outbound.send(
            &self.follower,
            RaftMessage::LogCompactionInfo(LogCompactionInfo {
                from: self.myself.clone(),
                leader_term: leader_context.term,
                pruned_index,
            }),
        );
        self.timer.arm();
    }
}

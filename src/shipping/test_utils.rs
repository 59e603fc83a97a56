use crate::commitlog::{Index, Term};
use crate::consensus::{AppendEntriesRequest, AppendEntriesResponse, MemberId, Outbound, RaftMessage};
use crate::shipping::retry_timer::RetryTimer;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub(crate) struct RecordingOutbound {
    sent: Mutex<Vec<(MemberId, RaftMessage)>>,
}

impl RecordingOutbound {
    pub(crate) fn new() -> Self {
        RecordingOutbound {
            sent: Mutex::new(vec![]),
        }
    }

    pub(crate) fn take_all_with_recipient(&self) -> Vec<(MemberId, RaftMessage)> {
        std::mem::take(&mut *self.sent.lock().unwrap())
    }

    pub(crate) fn take_all(&self) -> Vec<RaftMessage> {
        self.take_all_with_recipient().into_iter().map(|(_, m)| m).collect()
    }

    pub(crate) fn take_requests(&self) -> Vec<AppendEntriesRequest> {
        self.take_all()
            .into_iter()
            .map(|message| match message {
                RaftMessage::AppendEntriesRequest(request) => request,
                other => panic!("Expected append entries request, got {:?}", other),
            })
            .collect()
    }

    pub(crate) fn take_single_request(&self) -> AppendEntriesRequest {
        let mut requests = self.take_requests();
        assert_eq!(requests.len(), 1, "Expected exactly one request, got {:?}", requests);
        requests.remove(0)
    }
}

impl Outbound for RecordingOutbound {
    fn send(&self, to: &MemberId, message: RaftMessage) {
        self.sent.lock().unwrap().push((to.clone(), message));
    }
}

#[derive(Clone)]
pub(crate) struct FakeTimer {
    armed: Arc<AtomicBool>,
    arm_count: Arc<AtomicUsize>,
}

impl FakeTimer {
    pub(crate) fn new() -> Self {
        FakeTimer {
            armed: Arc::new(AtomicBool::new(false)),
            arm_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn is_armed(&self) -> bool {
        self.armed.load(Ordering::SeqCst)
    }

    /// How many times the countdown was (re)started.
    pub(crate) fn arm_count(&self) -> usize {
        self.arm_count.load(Ordering::SeqCst)
    }
}

impl RetryTimer for FakeTimer {
    fn arm(&mut self) {
        self.armed.store(true, Ordering::SeqCst);
        self.arm_count.fetch_add(1, Ordering::SeqCst);
    }

    fn disarm(&mut self) {
        self.armed.store(false, Ordering::SeqCst);
    }
}

/// Follower side of append entries, reduced to the log consistency check.
pub(crate) struct SimulatedFollower {
    terms: Vec<u64>,
    accepted: Vec<u64>,
}

impl SimulatedFollower {
    pub(crate) fn new(terms: &[u64]) -> Self {
        SimulatedFollower {
            terms: terms.to_vec(),
            accepted: vec![],
        }
    }

    pub(crate) fn handle(&mut self, request: &AppendEntriesRequest) -> AppendEntriesResponse {
        let prev = Index::to_u64(request.prev_log_index) as usize;
        let agrees = prev == 0 || (prev <= self.terms.len() && self.terms[prev - 1] == request.prev_log_term.as_u64());
        if !agrees {
            return self.response(false, None);
        }

        for (offset, entry) in request.entries.iter().enumerate() {
            let position = prev + offset;
            if position < self.terms.len() && self.terms[position] != entry.term.as_u64() {
                self.terms.truncate(position);
            }
            if position >= self.terms.len() {
                self.terms.push(entry.term.as_u64());
            }
            self.accepted.push(position as u64 + 1);
        }

        self.response(true, request.last_index())
    }

    fn response(&self, success: bool, match_index: Option<Index>) -> AppendEntriesResponse {
        AppendEntriesResponse {
            from: MemberId::new("follower"),
            term: Term::default(),
            success,
            match_index,
            append_index: Index::from_u64(self.terms.len() as u64),
        }
    }

    pub(crate) fn terms(&self) -> Vec<u64> {
        self.terms.clone()
    }

    pub(crate) fn accepted_indexes(&self) -> Vec<u64> {
        self.accepted.clone()
    }
}

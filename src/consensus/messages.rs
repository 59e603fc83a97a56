use crate::commitlog::{Index, Term};
use crate::consensus::{MemberId, RaftLogEntry};

#[derive(Clone, Debug, PartialEq)]
pub enum RaftMessage {
    AppendEntriesRequest(AppendEntriesRequest),
    AppendEntriesResponse(AppendEntriesResponse),
    LogCompactionInfo(LogCompactionInfo),
}

impl RaftMessage {
    pub fn from(&self) -> &MemberId {
        match self {
            RaftMessage::AppendEntriesRequest(request) => &request.from,
            RaftMessage::AppendEntriesResponse(response) => &response.from,
            RaftMessage::LogCompactionInfo(info) => &info.from,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AppendEntriesRequest {
    pub from: MemberId,
    pub leader_term: Term,
    // `None` when the first entry is the first entry of the log. The term is then `Term::default()`.
    pub prev_log_index: Option<Index>,
    pub prev_log_term: Term,
    pub entries: Vec<RaftLogEntry>,
    pub leader_commit: Option<Index>,
}

impl AppendEntriesRequest {
    /// Index of the last entry carried by this request, or of `prev_log_index` for an empty one.
    pub fn last_index(&self) -> Option<Index> {
        match self.entries.len() {
            0 => self.prev_log_index,
            n => Some(Index::after(self.prev_log_index).plus(n as u64 - 1)),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AppendEntriesResponse {
    pub from: MemberId,
    pub term: Term,
    pub success: bool,
    // Highest index known to agree with the leader. Only meaningful on success.
    pub match_index: Option<Index>,
    // Highest index present in the follower's log, agreeing or not.
    pub append_index: Option<Index>,
}

/// Tells a follower that the leader's log no longer holds anything at or below `pruned_index`.
#[derive(Clone, Debug, PartialEq)]
pub struct LogCompactionInfo {
    pub from: MemberId,
    pub leader_term: Term,
    pub pruned_index: Option<Index>,
}

use crate::commitlog::{Index, Term};
use std::fmt;

/// Opaque identifier of a cluster member.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MemberId(String);

impl MemberId {
    pub fn new(id: impl Into<String>) -> Self {
        MemberId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Debug for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The leader's view at the time an event was raised.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LeaderContext {
    pub term: Term,
    pub commit_index: Option<Index>,
}

impl LeaderContext {
    pub fn new(term: Term, commit_index: Option<Index>) -> Self {
        LeaderContext { term, commit_index }
    }
}

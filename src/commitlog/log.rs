use std::convert::TryFrom;
use std::{fmt, io};

#[derive(Copy, Clone, PartialOrd, PartialEq, Ord, Eq, Hash)]
struct U64NonZero(u64);

impl U64NonZero {
    fn new(val: u64) -> Self {
        assert_ne!(val, 0);
        U64NonZero(val)
    }
}

/// Position of an entry in a `Log`, starting at 1.
///
/// There is no index 0. "No entry" is modeled as `Option<Index>::None`, and because `None`
/// orders before every `Some`, `Option<Index>` can be compared directly.
#[derive(Copy, Clone, PartialOrd, PartialEq, Ord, Eq, Hash)]
pub struct Index(U64NonZero);

impl Index {
    pub fn new(index: u64) -> Self {
        Index(U64NonZero::new(index))
    }

    pub fn start_index() -> Self {
        Self::new(1)
    }

    /// Wire and storage formats use 0 for "no entry".
    pub fn from_u64(index: u64) -> Option<Self> {
        match index {
            0 => None,
            index => Some(Self::new(index)),
        }
    }

    pub fn to_u64(opt_index: Option<Index>) -> u64 {
        opt_index.map(|i| i.as_u64()).unwrap_or(0)
    }

    pub fn as_u64(&self) -> u64 {
        self.0 .0
    }

    pub fn plus(&self, delta: u64) -> Index {
        Index::new(self.as_u64() + delta)
    }

    pub fn checked_minus(&self, delta: u64) -> Option<Index> {
        let new_value = self.as_u64().saturating_sub(delta);
        if new_value > 0 {
            Some(Index::new(new_value))
        } else {
            None
        }
    }

    /// The index right after `opt_index`, where `None` means "before the first entry".
    pub fn after(opt_index: Option<Index>) -> Index {
        match opt_index {
            None => Index::start_index(),
            Some(index) => index.plus(1),
        }
    }

    /// Number of entries in `(from, to]`. Zero if `to <= from`.
    pub fn distance(from: Option<Index>, to: Option<Index>) -> u64 {
        Self::to_u64(to).saturating_sub(Self::to_u64(from))
    }
}

impl fmt::Debug for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0 .0)
    }
}

/// Raft leadership term an entry was created in.
#[derive(Copy, Clone, Default, PartialOrd, PartialEq, Ord, Eq, Hash)]
pub struct Term(u64);

impl Term {
    pub fn new(term: u64) -> Self {
        Term(term)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Replicated log read by every shipper on the leader. The first entry lands at
/// `Index::start_index()`.
///
/// A prefix of the log can be pruned. Entries at or below `prev_index()` no longer exist, but the
/// log remembers the term of the entry at `prev_index()`, so the entry right after it can still be
/// replicated with its preceding term.
///
/// Methods take `&self`. The leader's append path is the only writer, while every follower's
/// shipper reads concurrently, and a prune may land between any two reads.
pub trait Log<E: Entry>: Send + Sync {
    /// Writes `entry` at `next_index()` and returns that index.
    fn append(&self, entry: E) -> Result<Index, LogError>;

    /// Read log entry at specified index. `Ok(None)` if nothing has been appended there yet,
    /// `Err(LogError::Pruned)` if it was pruned.
    fn read(&self, index: Index) -> Result<Option<E>, LogError>;

    /// Read only the term of the entry at `index`. Unlike `read()`, this succeeds for
    /// `prev_index()`.
    fn read_entry_term(&self, index: Index) -> Result<Option<Term>, LogError>;

    /// Deletes anything starting at `index` and later.
    fn truncate(&self, index: Index) -> Result<(), LogError>;

    /// Drops every entry at or below `safe_index` (clamped to the append index) and returns the
    /// resulting `prev_index()`.
    fn prune(&self, safe_index: Index) -> Result<Option<Index>, LogError>;

    /// Index of the latest appended entry.
    fn append_index(&self) -> Option<Index>;

    /// Index of the latest pruned entry.
    fn prev_index(&self) -> Option<Index>;

    /// Where the next `append()` lands.
    fn next_index(&self) -> Index {
        Index::after(self.append_index())
    }
}

/// Anything storable in a `Log`: it knows its term and converts to and from raw bytes.
pub trait Entry: Clone + Into<Vec<u8>> + TryFrom<Vec<u8>, Error = io::Error> {
    fn term(&self) -> Term;
}

#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("Entry {index:?} has been pruned, log now starts after {prev_index:?}")]
    Pruned { index: Index, prev_index: Index },

    #[error("Entry {index:?} could not be decoded: {source}")]
    Corrupt { index: Index, source: io::Error },
}

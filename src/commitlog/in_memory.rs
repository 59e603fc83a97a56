use crate::commitlog::{Entry, Index, Log, LogError, Term};
use std::collections::VecDeque;
use std::convert::TryFrom;
use std::marker::PhantomData;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

// Holds the log in RAM. Good enough to exercise replication, not durable across restarts.
pub struct InMemoryLog<E: Entry> {
    logger: slog::Logger,
    inner: RwLock<Inner>,
    _pd: PhantomData<fn() -> E>,
}

struct Inner {
    // We don't *need* to convert these to bytes. We could just hold the original entry in memory,
    // but we want to exercise the conversion logic.
    //
    // `entries[0]` is the entry at `prev_index + 1`.
    entries: VecDeque<Vec<u8>>,
    prev_index: Option<Index>,
    prev_term: Term,
}

impl Inner {
    fn append_index(&self) -> Option<Index> {
        let appended = Index::to_u64(self.prev_index) + self.entries.len() as u64;
        Index::from_u64(appended)
    }

    fn offset(&self, index: Index) -> usize {
        (index.as_u64() - Index::to_u64(self.prev_index) - 1) as usize
    }

    fn check_not_pruned(&self, index: Index) -> Result<(), LogError> {
        match self.prev_index {
            Some(prev_index) if index <= prev_index => Err(LogError::Pruned { index, prev_index }),
            _ => Ok(()),
        }
    }
}

impl<E: Entry> InMemoryLog<E> {
    pub fn new(logger: slog::Logger) -> Self {
        InMemoryLog {
            logger,
            inner: RwLock::new(Inner {
                entries: VecDeque::new(),
                prev_index: None,
                prev_term: Term::default(),
            }),
            _pd: PhantomData,
        }
    }

    fn read_inner(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().expect("InMemoryLog read lock poison")
    }

    fn write_inner(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().expect("InMemoryLog write lock poison")
    }

    fn decode(index: Index, bytes: Vec<u8>) -> Result<E, LogError> {
        E::try_from(bytes).map_err(|source| LogError::Corrupt { index, source })
    }
}

impl<E: Entry> Log<E> for InMemoryLog<E> {
    fn append(&self, entry: E) -> Result<Index, LogError> {
        let mut inner = self.write_inner();
        let index = Index::after(inner.append_index());
        inner.entries.push_back(entry.into());

        Ok(index)
    }

    fn read(&self, index: Index) -> Result<Option<E>, LogError> {
        let opt_bytes = {
            let inner = self.read_inner();
            inner.check_not_pruned(index)?;
            let offset = inner.offset(index);
            inner.entries.get(offset).cloned()
        };

        match opt_bytes {
            None => Ok(None),
            Some(bytes) => Self::decode(index, bytes).map(Some),
        }
    }

    fn read_entry_term(&self, index: Index) -> Result<Option<Term>, LogError> {
        let opt_bytes = {
            let inner = self.read_inner();
            if Some(index) == inner.prev_index {
                return Ok(Some(inner.prev_term));
            }
            inner.check_not_pruned(index)?;
            let offset = inner.offset(index);
            inner.entries.get(offset).cloned()
        };

        match opt_bytes {
            None => Ok(None),
            Some(bytes) => Self::decode(index, bytes).map(|entry| Some(entry.term())),
        }
    }

    fn truncate(&self, index: Index) -> Result<(), LogError> {
        let mut inner = self.write_inner();
        inner.check_not_pruned(index)?;
        let offset = inner.offset(index);
        inner.entries.truncate(offset);

        Ok(())
    }

    fn prune(&self, safe_index: Index) -> Result<Option<Index>, LogError> {
        let mut inner = self.write_inner();
        let new_prev_index = match inner.append_index() {
            None => return Ok(inner.prev_index),
            Some(append_index) => std::cmp::min(safe_index, append_index),
        };
        if Some(new_prev_index) <= inner.prev_index {
            return Ok(inner.prev_index);
        }

        let offset = inner.offset(new_prev_index);
        let new_prev_term = Self::decode(new_prev_index, inner.entries[offset].clone())?.term();
        inner.entries.drain(..=offset);
        inner.prev_index = Some(new_prev_index);
        inner.prev_term = new_prev_term;

        slog::debug!(self.logger, "Pruned log up to {:?}", new_prev_index);
        Ok(inner.prev_index)
    }

    fn append_index(&self) -> Option<Index> {
        self.read_inner().append_index()
    }

    fn prev_index(&self) -> Option<Index> {
        self.read_inner().prev_index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::Arc;

    #[derive(Clone, Debug, PartialEq)]
    struct TestEntry(u8);

    impl Entry for TestEntry {
        fn term(&self) -> Term {
            Term::new(self.0 as u64)
        }
    }

    impl From<TestEntry> for Vec<u8> {
        fn from(entry: TestEntry) -> Self {
            vec![entry.0]
        }
    }

    impl TryFrom<Vec<u8>> for TestEntry {
        type Error = io::Error;

        fn try_from(bytes: Vec<u8>) -> Result<Self, Self::Error> {
            match bytes.as_slice() {
                [b] => Ok(TestEntry(*b)),
                _ => Err(io::Error::new(io::ErrorKind::InvalidData, "expected 1 byte")),
            }
        }
    }

    fn log_with_terms(terms: &[u8]) -> InMemoryLog<TestEntry> {
        let log = InMemoryLog::new(slog::Logger::root(slog::Discard, slog::o!()));
        for term in terms {
            log.append(TestEntry(*term)).unwrap();
        }
        log
    }

    #[test]
    fn append_and_read() {
        let log = log_with_terms(&[]);
        assert_eq!(log.append_index(), None);
        assert_eq!(log.next_index(), Index::new(1));

        assert_eq!(log.append(TestEntry(1)).unwrap(), Index::new(1));
        assert_eq!(log.append(TestEntry(1)).unwrap(), Index::new(2));
        assert_eq!(log.append(TestEntry(2)).unwrap(), Index::new(3));

        assert_eq!(log.read(Index::new(3)).unwrap(), Some(TestEntry(2)));
        assert_eq!(log.read(Index::new(4)).unwrap(), None);
        assert_eq!(log.read_entry_term(Index::new(2)).unwrap(), Some(Term::new(1)));
        assert_eq!(log.append_index(), Some(Index::new(3)));
    }

    #[test]
    fn truncate_drops_suffix() {
        let log = log_with_terms(&[1, 1, 2, 2]);
        log.truncate(Index::new(3)).unwrap();

        assert_eq!(log.append_index(), Some(Index::new(2)));
        assert_eq!(log.read(Index::new(3)).unwrap(), None);
        assert_eq!(log.append(TestEntry(3)).unwrap(), Index::new(3));
    }

    #[test]
    fn prune_keeps_previous_term() {
        let log = log_with_terms(&[1, 2, 3, 4, 5]);
        assert_eq!(log.prune(Index::new(3)).unwrap(), Some(Index::new(3)));

        assert_eq!(log.prev_index(), Some(Index::new(3)));
        assert_eq!(log.append_index(), Some(Index::new(5)));
        assert_eq!(log.read_entry_term(Index::new(3)).unwrap(), Some(Term::new(3)));
        assert_eq!(log.read(Index::new(4)).unwrap(), Some(TestEntry(4)));

        match log.read(Index::new(3)) {
            Err(LogError::Pruned { index, prev_index }) => {
                assert_eq!(index, Index::new(3));
                assert_eq!(prev_index, Index::new(3));
            }
            other => panic!("Expected pruned error, got {:?}", other),
        }
        assert!(matches!(log.read_entry_term(Index::new(2)), Err(LogError::Pruned { .. })));
    }

    #[test]
    fn prune_is_clamped_and_never_goes_backwards() {
        let log = log_with_terms(&[1, 1, 1]);
        assert_eq!(log.prune(Index::new(10)).unwrap(), Some(Index::new(3)));
        assert_eq!(log.prune(Index::new(1)).unwrap(), Some(Index::new(3)));
        assert_eq!(log.append_index(), Some(Index::new(3)));
        assert_eq!(log.append(TestEntry(2)).unwrap(), Index::new(4));
    }

    #[test]
    fn concurrent_prune_and_read_fail_cleanly() {
        let log = Arc::new(log_with_terms(&[1; 200]));

        let reader_log = log.clone();
        let reader = std::thread::spawn(move || {
            for i in 1..=200 {
                match reader_log.read(Index::new(i)) {
                    Ok(Some(entry)) => assert_eq!(entry, TestEntry(1)),
                    Err(LogError::Pruned { .. }) => {}
                    other => panic!("Unexpected read result {:?}", other),
                }
            }
        });

        for i in (10..=200).step_by(10) {
            log.prune(Index::new(i)).unwrap();
        }
        reader.join().unwrap();

        assert_eq!(log.prev_index(), Some(Index::new(200)));
    }
}
